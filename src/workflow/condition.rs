//! Pure predicates evaluated by the branch states.

use super::document::JobDocument;
use crate::adapter::TranscriptionStatus;

/// True when the last observed transcription status equals `value`.
pub fn status_equals(doc: &JobDocument, value: TranscriptionStatus) -> bool {
    doc.transcription_status == Some(value)
}

/// True while the job is running or has not been observed yet (a transient
/// poll error before the first answer).
pub fn status_pending(doc: &JobDocument) -> bool {
    matches!(
        doc.transcription_status,
        None | Some(TranscriptionStatus::InProgress)
    )
}

/// True when the captured language code equals `value`.
pub fn language_equals(doc: &JobDocument, value: &str) -> bool {
    doc.language_code.as_deref() == Some(value)
}
