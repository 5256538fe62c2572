pub mod error;
pub mod http;
pub mod scripted;
pub mod types;

use std::future::Future;

pub use error::AdapterError;
pub use http::HttpGateway;
pub use scripted::{CapabilityCall, ScriptedAdapter};
pub use types::{JobSnapshot, TranscriptionRequest, TranscriptionStatus};

/// The single seam between the workflow engine and every external capability.
///
/// Implementations only invoke and normalize errors. They never retry: retry
/// policy (the poll loop) belongs to the caller.
pub trait ServiceAdapter: Send + Sync {
    /// Submit an asynchronous transcription job. Resubmitting an existing job
    /// name must be accepted as already in progress.
    fn transcribe(
        &self,
        request: &TranscriptionRequest,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Observe the current state of a transcription job.
    fn poll_status(
        &self,
        job_name: &str,
    ) -> impl Future<Output = Result<JobSnapshot, AdapterError>> + Send;

    fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> impl Future<Output = Result<String, AdapterError>> + Send;

    /// Synthesize speech for `text`, returning the encoded audio.
    fn synthesize(
        &self,
        text: &str,
        voice: &str,
    ) -> impl Future<Output = Result<Vec<u8>, AdapterError>> + Send;

    fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send;
}
