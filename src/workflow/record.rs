use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::JobDocument;
use super::failure::Failure;
use super::state::State;
use crate::trigger::TriggerPayload;

/// The result an execution reports to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result")]
pub enum ExecutionOutcome {
    /// `artifact_key` is the synthesized translation, or the transcript when
    /// translation was skipped.
    Success { artifact_key: String },
    Failure(Failure),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }

    pub fn artifact_key(&self) -> Option<&str> {
        match self {
            ExecutionOutcome::Success { artifact_key } => Some(artifact_key),
            ExecutionOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ExecutionOutcome::Success { .. } => None,
            ExecutionOutcome::Failure(failure) => Some(failure),
        }
    }
}

/// Structured record produced at the end of every execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub execution_id: String,
    pub trigger: TriggerPayload,
    pub outcome: ExecutionOutcome,
    pub terminal_state: State,
    pub state_history: Vec<State>,
    pub poll_attempts: u32,
    pub document: JobDocument,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::failure::{Diagnostics, ErrorCode};

    #[test]
    fn outcome_serializes_with_result_tag() {
        let success = ExecutionOutcome::Success {
            artifact_key: "translations/a_job.mp3".into(),
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({"result": "Success", "artifact_key": "translations/a_job.mp3"})
        );

        let failure = ExecutionOutcome::Failure(Failure {
            code: ErrorCode::TranscriptionJobFailed,
            diagnostics: Diagnostics {
                state: State::Fail,
                transcription_status: None,
                poll_attempts: 2,
                cause: None,
            },
        });
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["result"], "Failure");
        assert_eq!(value["code"], "TranscriptionJobFailed");
    }

    #[test]
    fn outcome_accessors() {
        let success = ExecutionOutcome::Success {
            artifact_key: "k".into(),
        };
        assert!(success.is_success());
        assert_eq!(success.artifact_key(), Some("k"));
        assert!(success.failure().is_none());
    }
}
