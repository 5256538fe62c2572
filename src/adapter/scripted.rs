//! In-memory adapter that replays a scripted sequence of job observations.
//!
//! Used by the `demo` command and by the engine tests. Every capability call
//! is recorded so callers can assert on ordering.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::AdapterError;
use super::types::{JobSnapshot, TranscriptionRequest};
use super::ServiceAdapter;

/// One recorded invocation of a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityCall {
    Transcribe { job_name: String, media_uri: String },
    PollStatus { job_name: String },
    Translate { text: String, source: String, target: String },
    Synthesize { text: String, voice: String },
    Put { bucket: String, key: String, bytes: usize },
}

impl CapabilityCall {
    /// Short capability name, handy for ordering assertions.
    pub fn name(&self) -> &'static str {
        match self {
            CapabilityCall::Transcribe { .. } => "transcribe",
            CapabilityCall::PollStatus { .. } => "poll_status",
            CapabilityCall::Translate { .. } => "translate",
            CapabilityCall::Synthesize { .. } => "synthesize",
            CapabilityCall::Put { .. } => "put",
        }
    }
}

#[derive(Default)]
struct Inner {
    polls: VecDeque<Result<JobSnapshot, AdapterError>>,
    last_poll: Option<Result<JobSnapshot, AdapterError>>,
    submitted: HashSet<String>,
    objects: BTreeMap<(String, String), Vec<u8>>,
    calls: Vec<CapabilityCall>,
    transcribe_error: Option<AdapterError>,
    translate_error: Option<AdapterError>,
    synthesize_error: Option<AdapterError>,
    put_error: Option<AdapterError>,
}

/// Scripted [`ServiceAdapter`]. Cloning shares the underlying script and call
/// log.
#[derive(Clone, Default)]
pub struct ScriptedAdapter {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedAdapter {
    /// Create an adapter whose `poll_status` answers come from `polls` in order.
    /// Once the script is drained the last answer repeats.
    pub fn new(polls: impl IntoIterator<Item = Result<JobSnapshot, AdapterError>>) -> Self {
        let adapter = Self::default();
        adapter.lock().polls = polls.into_iter().collect();
        adapter
    }

    /// Shorthand for a script with no transient errors.
    pub fn with_snapshots(polls: impl IntoIterator<Item = JobSnapshot>) -> Self {
        Self::new(polls.into_iter().map(Ok))
    }

    pub fn fail_transcribe(self, err: AdapterError) -> Self {
        self.lock().transcribe_error = Some(err);
        self
    }

    pub fn fail_translate(self, err: AdapterError) -> Self {
        self.lock().translate_error = Some(err);
        self
    }

    pub fn fail_synthesize(self, err: AdapterError) -> Self {
        self.lock().synthesize_error = Some(err);
        self
    }

    pub fn fail_put(self, err: AdapterError) -> Self {
        self.lock().put_error = Some(err);
        self
    }

    pub fn calls(&self) -> Vec<CapabilityCall> {
        self.lock().calls.clone()
    }

    /// Capability names in call order, without `poll_status` noise.
    pub fn stage_calls(&self) -> Vec<&'static str> {
        self.lock()
            .calls
            .iter()
            .map(CapabilityCall::name)
            .filter(|name| *name != "poll_status")
            .collect()
    }

    pub fn poll_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, CapabilityCall::PollStatus { .. }))
            .count()
    }

    /// Number of distinct jobs accepted by `transcribe`.
    pub fn submitted_jobs(&self) -> usize {
        self.lock().submitted.len()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ServiceAdapter for ScriptedAdapter {
    async fn transcribe(&self, request: &TranscriptionRequest) -> Result<(), AdapterError> {
        let mut inner = self.lock();
        inner.calls.push(CapabilityCall::Transcribe {
            job_name: request.job_name.clone(),
            media_uri: request.media_uri.clone(),
        });
        if let Some(err) = inner.transcribe_error.clone() {
            return Err(err);
        }
        // Resubmitting an existing name is accepted without creating a new job.
        inner.submitted.insert(request.job_name.clone());
        Ok(())
    }

    async fn poll_status(&self, job_name: &str) -> Result<JobSnapshot, AdapterError> {
        let mut inner = self.lock();
        inner.calls.push(CapabilityCall::PollStatus {
            job_name: job_name.to_string(),
        });
        match inner.polls.pop_front() {
            Some(answer) => {
                inner.last_poll = Some(answer.clone());
                answer
            }
            None => inner
                .last_poll
                .clone()
                .unwrap_or_else(|| Ok(JobSnapshot::in_progress())),
        }
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, AdapterError> {
        let mut inner = self.lock();
        inner.calls.push(CapabilityCall::Translate {
            text: text.to_string(),
            source: source_language.to_string(),
            target: target_language.to_string(),
        });
        match inner.translate_error.clone() {
            Some(err) => Err(err),
            None => Ok(format!("[{source_language}->{target_language}] {text}")),
        }
    }

    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, AdapterError> {
        let mut inner = self.lock();
        inner.calls.push(CapabilityCall::Synthesize {
            text: text.to_string(),
            voice: voice.to_string(),
        });
        match inner.synthesize_error.clone() {
            Some(err) => Err(err),
            None => Ok(format!("{voice}:{text}").into_bytes()),
        }
    }

    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), AdapterError> {
        let mut inner = self.lock();
        inner.calls.push(CapabilityCall::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
            bytes: body.len(),
        });
        if let Some(err) = inner.put_error.clone() {
            return Err(err);
        }
        inner
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(job_name: &str) -> TranscriptionRequest {
        TranscriptionRequest {
            job_name: job_name.into(),
            media_uri: "s3://b/a".into(),
            output_bucket: "b".into(),
            output_key: format!("transcriptions/{job_name}.json"),
            identify_language: true,
        }
    }

    #[tokio::test]
    async fn replays_script_then_repeats_last_answer() {
        let adapter = ScriptedAdapter::with_snapshots([
            JobSnapshot::in_progress(),
            JobSnapshot::completed("hi", "en-US"),
        ]);

        assert_eq!(
            adapter.poll_status("a_job").await.unwrap(),
            JobSnapshot::in_progress()
        );
        for _ in 0..2 {
            assert_eq!(
                adapter.poll_status("a_job").await.unwrap(),
                JobSnapshot::completed("hi", "en-US")
            );
        }
        assert_eq!(adapter.poll_count(), 3);
    }

    #[tokio::test]
    async fn empty_script_reports_in_progress() {
        let adapter = ScriptedAdapter::default();
        assert_eq!(
            adapter.poll_status("a_job").await.unwrap(),
            JobSnapshot::in_progress()
        );
    }

    #[tokio::test]
    async fn resubmission_does_not_create_a_second_job() {
        let adapter = ScriptedAdapter::default();
        adapter.transcribe(&request("a_job")).await.unwrap();
        adapter.transcribe(&request("a_job")).await.unwrap();

        assert_eq!(adapter.submitted_jobs(), 1);
        assert_eq!(adapter.stage_calls(), vec!["transcribe", "transcribe"]);
    }

    #[tokio::test]
    async fn put_keeps_object_and_clones_share_state() {
        let adapter = ScriptedAdapter::default();
        let clone = adapter.clone();
        clone.put("b", "k", vec![9, 9]).await.unwrap();

        assert_eq!(adapter.object("b", "k"), Some(vec![9, 9]));
        assert_eq!(adapter.calls().len(), 1);
    }

    #[tokio::test]
    async fn configured_failures_are_returned() {
        let adapter = ScriptedAdapter::default()
            .fail_translate(AdapterError::Unavailable("down".into()));
        let err = adapter.translate("x", "fr-FR", "en").await.unwrap_err();
        assert_eq!(err, AdapterError::Unavailable("down".into()));
    }
}
