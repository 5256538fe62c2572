pub mod condition;
pub mod document;
pub mod engine;
pub mod failure;
pub mod polling;
pub mod record;
pub mod state;

pub use document::{audio_artifact_key, transcript_key, transcription_job_name, DocumentError, JobDocument, Phase};
pub use engine::{Engine, StateObserver, WorkflowConfig};
pub use failure::{Diagnostics, ErrorCode, Failure, FailureHandler, Fault};
pub use polling::{PollAttempt, PollTimeout, PollingController, TerminalStatus};
pub use record::{ExecutionOutcome, ExecutionRecord};
pub use state::{next_state, Signal, State, TRANSITIONS};
