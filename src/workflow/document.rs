use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapter::TranscriptionStatus;

/// Suffix appended to the uploaded object key to name its transcription job.
pub const JOB_NAME_SUFFIX: &str = "_job";

/// Derive the transcription job name for an uploaded object key.
pub fn transcription_job_name(original_key: &str) -> String {
    format!("{original_key}{JOB_NAME_SUFFIX}")
}

/// Where the transcription service writes its output.
pub fn transcript_key(job_name: &str) -> String {
    format!("transcriptions/{job_name}.json")
}

/// Where the synthesized translation is stored.
pub fn audio_artifact_key(job_name: &str) -> String {
    format!("translations/{job_name}.mp3")
}

/// Position of a document in the pipeline. Variants are declared in pipeline
/// order; `Failed` is reachable from any non-terminal phase.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Phase {
    #[default]
    Created,
    Preprocessed,
    Submitted,
    Polling,
    Resolved,
    Translated,
    Synthesized,
    Stored,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Stored | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("field `{0}` is already set")]
    AlreadySet(&'static str),

    #[error("cannot move from phase {from} to {to}")]
    PhaseRegression { from: Phase, to: Phase },
}

/// The working record threaded through one execution.
///
/// Fields only grow: every optional field is written once, by the stage that
/// owns it. `transcription_status` is the exception and is refreshed on each
/// successful poll.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobDocument {
    pub original_key: String,
    pub transcription_job_name: String,
    pub transcription_status: Option<TranscriptionStatus>,
    pub transcript: Option<String>,
    pub language_code: Option<String>,
    pub translated_text: Option<String>,
    pub audio_artifact_key: Option<String>,
    pub failure_reason: Option<String>,
    pub phase: Phase,
}

fn write_once<T>(slot: &mut Option<T>, value: T, field: &'static str) -> Result<(), DocumentError> {
    if slot.is_some() {
        return Err(DocumentError::AlreadySet(field));
    }
    *slot = Some(value);
    Ok(())
}

impl JobDocument {
    /// Preprocess: record the key and derive the job name. Calling it again
    /// with the same key is a no-op; a different key is rejected.
    pub fn preprocess(&mut self, original_key: &str) -> Result<(), DocumentError> {
        if !self.original_key.is_empty() {
            if self.original_key == original_key {
                return Ok(());
            }
            return Err(DocumentError::AlreadySet("original_key"));
        }
        self.original_key = original_key.to_string();
        self.transcription_job_name = transcription_job_name(original_key);
        self.advance(Phase::Preprocessed)
    }

    pub fn record_status(&mut self, status: TranscriptionStatus) -> Result<(), DocumentError> {
        self.transcription_status = Some(status);
        let phase = if status == TranscriptionStatus::InProgress {
            Phase::Polling
        } else {
            Phase::Resolved
        };
        self.advance(phase)
    }

    pub fn capture_result(
        &mut self,
        transcript: String,
        language_code: String,
    ) -> Result<(), DocumentError> {
        write_once(&mut self.transcript, transcript, "transcript")?;
        write_once(&mut self.language_code, language_code, "language_code")
    }

    pub fn record_translation(&mut self, text: String) -> Result<(), DocumentError> {
        write_once(&mut self.translated_text, text, "translated_text")?;
        self.advance(Phase::Translated)
    }

    pub fn record_artifact(&mut self, key: String) -> Result<(), DocumentError> {
        if self.failure_reason.is_some() {
            return Err(DocumentError::AlreadySet("failure_reason"));
        }
        write_once(&mut self.audio_artifact_key, key, "audio_artifact_key")?;
        self.advance(Phase::Stored)
    }

    /// Record the terminal failure. Rejected once an artifact was stored, so
    /// the two outcomes stay mutually exclusive.
    pub fn record_failure(&mut self, reason: String) -> Result<(), DocumentError> {
        if self.audio_artifact_key.is_some() {
            return Err(DocumentError::AlreadySet("audio_artifact_key"));
        }
        write_once(&mut self.failure_reason, reason, "failure_reason")?;
        self.phase = Phase::Failed;
        Ok(())
    }

    /// Move forward in the pipeline. Staying in the same phase is allowed
    /// (repeated polls); moving backwards or out of a terminal phase is not.
    pub fn advance(&mut self, to: Phase) -> Result<(), DocumentError> {
        if to < self.phase || (self.phase.is_terminal() && to != self.phase) {
            return Err(DocumentError::PhaseRegression {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_name_appends_suffix() {
        assert_eq!(transcription_job_name("uploads/a.wav"), "uploads/a.wav_job");
        assert_eq!(transcription_job_name(""), "_job");
    }

    #[test]
    fn preprocess_is_idempotent() {
        let mut doc = JobDocument::default();
        doc.preprocess("uploads/a.wav").unwrap();
        let first = doc.clone();
        doc.preprocess("uploads/a.wav").unwrap();

        assert_eq!(doc, first);
        assert_eq!(doc.transcription_job_name, "uploads/a.wav_job");
        assert_eq!(doc.phase, Phase::Preprocessed);
    }

    #[test]
    fn preprocess_rejects_a_different_key() {
        let mut doc = JobDocument::default();
        doc.preprocess("uploads/a.wav").unwrap();
        assert_eq!(
            doc.preprocess("uploads/b.wav"),
            Err(DocumentError::AlreadySet("original_key"))
        );
        assert_eq!(doc.original_key, "uploads/a.wav");
    }

    #[test]
    fn artifact_naming_is_exact() {
        assert_eq!(
            transcript_key("uploads/a.wav_job"),
            "transcriptions/uploads/a.wav_job.json"
        );
        assert_eq!(
            audio_artifact_key("uploads/a.wav_job"),
            "translations/uploads/a.wav_job.mp3"
        );
    }

    #[test]
    fn status_is_refreshed_while_polling() {
        let mut doc = JobDocument::default();
        doc.preprocess("k").unwrap();
        doc.advance(Phase::Submitted).unwrap();
        doc.record_status(TranscriptionStatus::InProgress).unwrap();
        doc.record_status(TranscriptionStatus::InProgress).unwrap();
        assert_eq!(doc.phase, Phase::Polling);

        doc.record_status(TranscriptionStatus::Completed).unwrap();
        assert_eq!(doc.phase, Phase::Resolved);
        assert_eq!(doc.transcription_status, Some(TranscriptionStatus::Completed));
    }

    #[test]
    fn owned_fields_are_write_once() {
        let mut doc = JobDocument::default();
        doc.capture_result("hola".into(), "es-ES".into()).unwrap();
        assert_eq!(
            doc.capture_result("adios".into(), "es-ES".into()),
            Err(DocumentError::AlreadySet("transcript"))
        );
        assert_eq!(doc.transcript.as_deref(), Some("hola"));

        doc.record_translation("hello".into()).unwrap();
        assert_eq!(
            doc.record_translation("bye".into()),
            Err(DocumentError::AlreadySet("translated_text"))
        );
    }

    #[test]
    fn phase_cannot_move_backwards() {
        let mut doc = JobDocument::default();
        doc.advance(Phase::Translated).unwrap();
        assert_eq!(
            doc.advance(Phase::Polling),
            Err(DocumentError::PhaseRegression {
                from: Phase::Translated,
                to: Phase::Polling
            })
        );
    }

    #[test]
    fn stored_and_failed_are_mutually_exclusive() {
        let mut stored = JobDocument::default();
        stored.record_artifact("translations/k_job.mp3".into()).unwrap();
        assert!(stored.record_failure("Timeout".into()).is_err());
        assert!(stored.failure_reason.is_none());

        let mut failed = JobDocument::default();
        failed.record_failure("Timeout".into()).unwrap();
        assert!(failed.record_artifact("translations/k_job.mp3".into()).is_err());
        assert_eq!(failed.phase, Phase::Failed);
    }
}
