use std::fmt;

use serde::{Deserialize, Serialize};

/// The named states of the transcription/translation workflow.
///
/// Each execution flows through:
/// Preprocess → Transcribe → (Wait → GetTranscriptionStatus → CheckJobStatus)+
/// → CaptureResult → CheckLanguage → SkipTranslation | Translate → Synthesize → Store,
/// or ends in Fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Preprocess,
    Transcribe,
    Wait,
    GetTranscriptionStatus,
    CheckJobStatus,
    CaptureResult,
    CheckLanguage,
    SkipTranslation,
    Translate,
    Synthesize,
    Store,
    Fail,
}

impl State {
    /// States from which the execution does not continue.
    pub fn is_terminal(self) -> bool {
        matches!(self, State::SkipTranslation | State::Store | State::Fail)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            State::Preprocess => "Preprocess",
            State::Transcribe => "Transcribe",
            State::Wait => "Wait",
            State::GetTranscriptionStatus => "GetTranscriptionStatus",
            State::CheckJobStatus => "CheckJobStatus",
            State::CaptureResult => "CaptureResult",
            State::CheckLanguage => "CheckLanguage",
            State::SkipTranslation => "SkipTranslation",
            State::Translate => "Translate",
            State::Synthesize => "Synthesize",
            State::Store => "Store",
            State::Fail => "Fail",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a state reports after running; selects the outgoing edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Task state finished its work.
    Done,
    /// Job status is COMPLETED.
    Completed,
    /// Job is still running (or has not been observed yet).
    Pending,
    /// Detected language needs no translation.
    Untranslated,
    /// No other branch matched.
    Otherwise,
}

/// The workflow graph: `(from, signal) → to`. Terminal states have no
/// outgoing edges.
pub const TRANSITIONS: &[(State, Signal, State)] = &[
    (State::Preprocess, Signal::Done, State::Transcribe),
    (State::Transcribe, Signal::Done, State::Wait),
    (State::Wait, Signal::Done, State::GetTranscriptionStatus),
    (State::GetTranscriptionStatus, Signal::Done, State::CheckJobStatus),
    (State::CheckJobStatus, Signal::Completed, State::CaptureResult),
    (State::CheckJobStatus, Signal::Pending, State::Wait),
    (State::CheckJobStatus, Signal::Otherwise, State::Fail),
    (State::CaptureResult, Signal::Done, State::CheckLanguage),
    (State::CheckLanguage, Signal::Untranslated, State::SkipTranslation),
    (State::CheckLanguage, Signal::Otherwise, State::Translate),
    (State::Translate, Signal::Done, State::Synthesize),
    (State::Synthesize, Signal::Done, State::Store),
];

/// The state the execution starts in.
pub const START: State = State::Preprocess;

/// Look up the successor of `from` for `signal`.
pub fn next_state(from: State, signal: Signal) -> Option<State> {
    TRANSITIONS
        .iter()
        .find(|(state, edge, _)| *state == from && *edge == signal)
        .map(|(_, _, to)| *to)
}
