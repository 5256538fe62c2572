use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::document::DocumentError;
use super::polling::PollTimeout;
use super::state::{Signal, State};
use crate::adapter::{AdapterError, TranscriptionStatus};

/// Stable error codes reported for failed executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The transcription job itself reported a non-success status.
    TranscriptionJobFailed,
    SubmissionFailed,
    PollTimeout,
    ResultMissing,
    TranslationFailed,
    SynthesisFailed,
    StoreFailed,
    Timeout,
    InvariantViolation,
}

impl ErrorCode {
    /// Wire form of the code. Infrastructure failures carry the stage name.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TranscriptionJobFailed => "TranscriptionJobFailed",
            ErrorCode::SubmissionFailed => "Transcribe.SubmissionError",
            ErrorCode::PollTimeout => "PollTimeout",
            ErrorCode::ResultMissing => "CaptureResult.MissingField",
            ErrorCode::TranslationFailed => "Translate.ServiceError",
            ErrorCode::SynthesisFailed => "Synthesize.ServiceError",
            ErrorCode::StoreFailed => "Store.StoreError",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::InvariantViolation => "Document.InvariantViolation",
        }
    }

    pub const ALL: [ErrorCode; 9] = [
        ErrorCode::TranscriptionJobFailed,
        ErrorCode::SubmissionFailed,
        ErrorCode::PollTimeout,
        ErrorCode::ResultMissing,
        ErrorCode::TranslationFailed,
        ErrorCode::SynthesisFailed,
        ErrorCode::StoreFailed,
        ErrorCode::Timeout,
        ErrorCode::InvariantViolation,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_str() == raw)
    }

    /// Business outcomes are decisions of the pipeline; everything else is an
    /// infrastructure or service fault.
    pub fn is_business(self) -> bool {
        self == ErrorCode::TranscriptionJobFailed
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ErrorCode::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown error code `{raw}`")))
    }
}

/// Context attached to a failure for whoever consumes the execution result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// State that was active when the fault arose.
    pub state: State,
    /// Last transcription status observed, if any.
    pub transcription_status: Option<TranscriptionStatus>,
    pub poll_attempts: u32,
    pub cause: Option<String>,
}

/// A terminal failure: stable code plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub code: ErrorCode,
    pub diagnostics: Diagnostics,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.code, self.diagnostics.state)?;
        if let Some(status) = self.diagnostics.transcription_status {
            write!(f, " (status {status})")?;
        }
        if let Some(cause) = &self.diagnostics.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Everything that can end an execution early, as raised by the states.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error(
        "transcription job ended with status {}",
        .status.map_or("UNOBSERVED", |status| status.as_str())
    )]
    JobFailed { status: Option<TranscriptionStatus> },

    #[error("transcription submission failed: {0}")]
    Submission(#[source] AdapterError),

    #[error("{0}")]
    PollExhausted(#[source] PollTimeout),

    #[error("completed job has no {0}")]
    MissingField(&'static str),

    #[error("translation failed: {0}")]
    Translation(#[source] AdapterError),

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] AdapterError),

    #[error("storing the audio failed: {0}")]
    Store(#[source] AdapterError),

    #[error("execution exceeded {after_secs}s")]
    TimedOut { after_secs: u64 },

    #[error("{0}")]
    Document(#[from] DocumentError),

    #[error("no transition from {from} on {signal:?}")]
    NoTransition { from: State, signal: Signal },
}

impl Fault {
    pub fn code(&self) -> ErrorCode {
        match self {
            Fault::JobFailed { .. } => ErrorCode::TranscriptionJobFailed,
            Fault::Submission(_) => ErrorCode::SubmissionFailed,
            Fault::PollExhausted(_) => ErrorCode::PollTimeout,
            Fault::MissingField(_) => ErrorCode::ResultMissing,
            Fault::Translation(_) => ErrorCode::TranslationFailed,
            Fault::Synthesis(_) => ErrorCode::SynthesisFailed,
            Fault::Store(_) => ErrorCode::StoreFailed,
            Fault::TimedOut { .. } => ErrorCode::Timeout,
            Fault::Document(_) | Fault::NoTransition { .. } => ErrorCode::InvariantViolation,
        }
    }
}

/// Maps faults to stable `(code, diagnostics)` pairs.
pub struct FailureHandler;

impl FailureHandler {
    /// Build the failure for `fault`, raised while `state` was active.
    pub fn classify(
        fault: &Fault,
        state: State,
        transcription_status: Option<TranscriptionStatus>,
        poll_attempts: u32,
    ) -> Failure {
        let transcription_status = match fault {
            Fault::JobFailed { status } => status.or(transcription_status),
            _ => transcription_status,
        };
        Failure {
            code: fault.code(),
            diagnostics: Diagnostics {
                state,
                transcription_status,
                poll_attempts,
                cause: Some(fault.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failure_is_a_business_outcome() {
        let failure = FailureHandler::classify(
            &Fault::JobFailed {
                status: Some(TranscriptionStatus::Failed),
            },
            State::CheckJobStatus,
            None,
            3,
        );
        assert_eq!(failure.code, ErrorCode::TranscriptionJobFailed);
        assert!(failure.code.is_business());
        assert_eq!(
            failure.diagnostics.transcription_status,
            Some(TranscriptionStatus::Failed)
        );
        assert_eq!(failure.diagnostics.poll_attempts, 3);
        assert_eq!(
            failure.diagnostics.cause.as_deref(),
            Some("transcription job ended with status FAILED")
        );
    }

    #[test]
    fn service_failures_carry_the_stage() {
        let err = AdapterError::Unavailable("down".into());
        let cases = [
            (
                Fault::Submission(err.clone()),
                "Transcribe.SubmissionError",
                "transcription submission failed: service unavailable: down",
            ),
            (
                Fault::Translation(err.clone()),
                "Translate.ServiceError",
                "translation failed: service unavailable: down",
            ),
            (
                Fault::Synthesis(err.clone()),
                "Synthesize.ServiceError",
                "speech synthesis failed: service unavailable: down",
            ),
            (
                Fault::Store(err.clone()),
                "Store.StoreError",
                "storing the audio failed: service unavailable: down",
            ),
        ];
        for (fault, code, cause) in cases {
            let failure = FailureHandler::classify(&fault, State::Translate, None, 0);
            assert_eq!(failure.code.as_str(), code);
            assert!(!failure.code.is_business());
            assert_eq!(failure.diagnostics.cause.as_deref(), Some(cause));
            let source = std::error::Error::source(&fault).expect("adapter error is the source");
            assert_eq!(source.to_string(), "service unavailable: down");
        }
    }

    #[test]
    fn poll_timeout_reports_last_error() {
        let fault = Fault::PollExhausted(PollTimeout {
            job_name: "a_job".into(),
            attempts: 20,
            last_status: Some(TranscriptionStatus::InProgress),
            last_error: Some(AdapterError::Unavailable("reset".into())),
        });
        let failure = FailureHandler::classify(
            &fault,
            State::GetTranscriptionStatus,
            Some(TranscriptionStatus::InProgress),
            20,
        );
        assert_eq!(failure.code, ErrorCode::PollTimeout);
        assert_eq!(
            failure.diagnostics.cause.as_deref(),
            Some(
                "transcription job `a_job` still unresolved after 20 polls; last error: service unavailable: reset"
            )
        );
    }

    #[test]
    fn document_errors_convert_into_invariant_violations() {
        let fault: Fault = DocumentError::AlreadySet("original_key").into();
        assert_eq!(fault.code(), ErrorCode::InvariantViolation);
        assert_eq!(fault.to_string(), DocumentError::AlreadySet("original_key").to_string());
    }

    #[test]
    fn unobserved_job_failure_says_so() {
        let fault = Fault::JobFailed { status: None };
        assert_eq!(fault.to_string(), "transcription job ended with status UNOBSERVED");
    }

    #[test]
    fn codes_parse_from_wire_form() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::parse(code.as_str()), Some(code));
        }
        assert_eq!(ErrorCode::parse("Nope"), None);
    }

    #[test]
    fn failure_display() {
        let failure = FailureHandler::classify(
            &Fault::TimedOut { after_secs: 600 },
            State::Wait,
            Some(TranscriptionStatus::InProgress),
            19,
        );
        assert_eq!(
            failure.to_string(),
            "Timeout in Wait (status IN_PROGRESS): execution exceeded 600s"
        );
    }

    #[test]
    fn failure_serializes_for_callers() {
        let failure = FailureHandler::classify(
            &Fault::MissingField("transcript"),
            State::CaptureResult,
            Some(TranscriptionStatus::Completed),
            1,
        );
        let value = serde_json::to_value(&failure).unwrap();
        assert_eq!(value["code"], "CaptureResult.MissingField");
        assert_eq!(value["diagnostics"]["state"], "CaptureResult");
        assert_eq!(value["diagnostics"]["transcription_status"], "COMPLETED");
    }
}
