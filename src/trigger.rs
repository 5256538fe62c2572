//! Initiating events: parsing object-created notifications and applying the
//! event rule that decides which uploads start an execution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OBJECT_STORE_SOURCE: &str = "aws.s3";
pub const OBJECT_CREATED: &str = "Object Created";

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("malformed trigger event: {0}")]
    Malformed(String),

    #[error("trigger event names no bucket and no default bucket is configured")]
    MissingBucket,

    #[error("trigger event has an empty object key")]
    EmptyKey,

    #[error("event for `{key}` rejected: {reason}")]
    Rejected { key: String, reason: String },
}

/// What the engine needs to start: the bucket and key of the new object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub bucket: String,
    pub key: String,
}

impl TriggerPayload {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Result<Self, TriggerError> {
        let bucket = bucket.into();
        let key = key.into();
        if bucket.is_empty() {
            return Err(TriggerError::MissingBucket);
        }
        if key.is_empty() {
            return Err(TriggerError::EmptyKey);
        }
        Ok(Self { bucket, key })
    }

    /// `s3://{bucket}/{key}`, the media location handed to transcription.
    pub fn media_uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// An event as delivered, before the rule is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub source: Option<String>,
    pub detail_type: Option<String>,
    pub bucket: Option<String>,
    pub key: String,
}

#[derive(Deserialize)]
struct RequestParameters {
    #[serde(rename = "bucketName", default)]
    bucket_name: Option<String>,
    key: String,
}

#[derive(Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Deserialize)]
struct ObjectRef {
    key: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Object {
        bucket: BucketRef,
        object: ObjectRef,
    },
    ApiCall {
        #[serde(rename = "requestParameters")]
        request_parameters: RequestParameters,
    },
}

// Accepted shapes, tried in order.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Plain {
        bucket: String,
        key: String,
    },
    ApiCall {
        #[serde(rename = "requestParameters")]
        request_parameters: RequestParameters,
    },
    Event {
        #[serde(default)]
        source: Option<String>,
        #[serde(rename = "detail-type", default)]
        detail_type: Option<String>,
        detail: Detail,
    },
}

impl TriggerEvent {
    pub fn parse(json: &str) -> Result<Self, TriggerError> {
        let envelope: Envelope = serde_json::from_str(json).map_err(|_| {
            TriggerError::Malformed(
                "expected {bucket, key}, an object-created event or requestParameters".into(),
            )
        })?;
        let event = match envelope {
            Envelope::Plain { bucket, key } => TriggerEvent {
                source: None,
                detail_type: None,
                bucket: Some(bucket),
                key,
            },
            Envelope::ApiCall { request_parameters } => TriggerEvent {
                source: None,
                detail_type: None,
                bucket: request_parameters.bucket_name,
                key: request_parameters.key,
            },
            Envelope::Event {
                source,
                detail_type,
                detail,
            } => {
                let (bucket, key) = match detail {
                    Detail::Object { bucket, object } => (Some(bucket.name), object.key),
                    Detail::ApiCall { request_parameters } => {
                        (request_parameters.bucket_name, request_parameters.key)
                    }
                };
                TriggerEvent {
                    source,
                    detail_type,
                    bucket,
                    key,
                }
            }
        };
        Ok(event)
    }
}

/// The rule that routes object-created events to the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRule {
    pub source: String,
    pub detail_type: String,
    /// Watched bucket; also the fallback when an event names none.
    pub bucket: Option<String>,
    pub prefix: String,
}

impl EventRule {
    pub fn new(bucket: Option<String>, prefix: impl Into<String>) -> Self {
        Self {
            source: OBJECT_STORE_SOURCE.to_string(),
            detail_type: OBJECT_CREATED.to_string(),
            bucket,
            prefix: prefix.into(),
        }
    }

    /// Why `event` does not match, or `None` when it does. Envelope fields
    /// absent from the event are not checked.
    fn mismatch(&self, event: &TriggerEvent) -> Option<String> {
        if let Some(source) = &event.source {
            if *source != self.source {
                return Some(format!("source `{source}` is not `{}`", self.source));
            }
        }
        if let Some(detail_type) = &event.detail_type {
            if *detail_type != self.detail_type {
                return Some(format!("detail type `{detail_type}` is not `{}`", self.detail_type));
            }
        }
        if let (Some(watched), Some(bucket)) = (&self.bucket, &event.bucket) {
            if watched != bucket {
                return Some(format!("bucket `{bucket}` is not watched"));
            }
        }
        if !event.key.starts_with(&self.prefix) {
            return Some(format!("key is outside prefix `{}`", self.prefix));
        }
        None
    }

    pub fn matches(&self, event: &TriggerEvent) -> bool {
        self.mismatch(event).is_none()
    }

    /// Apply the rule and resolve the payload the engine runs with.
    pub fn accept(&self, event: TriggerEvent) -> Result<TriggerPayload, TriggerError> {
        if let Some(reason) = self.mismatch(&event) {
            return Err(TriggerError::Rejected {
                key: event.key,
                reason,
            });
        }
        let bucket = event
            .bucket
            .or_else(|| self.bucket.clone())
            .ok_or(TriggerError::MissingBucket)?;
        TriggerPayload::new(bucket, event.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> EventRule {
        EventRule::new(Some("audio-bucket".into()), "uploads/")
    }

    #[test]
    fn parses_plain_payload() {
        let event = TriggerEvent::parse(r#"{"bucket": "b", "key": "uploads/a.wav"}"#).unwrap();
        assert_eq!(event.bucket.as_deref(), Some("b"));
        assert_eq!(event.key, "uploads/a.wav");
        assert!(event.source.is_none());
    }

    #[test]
    fn parses_object_created_event() {
        let json = r#"{
            "version": "0",
            "source": "aws.s3",
            "detail-type": "Object Created",
            "detail": {
                "bucket": {"name": "audio-bucket"},
                "object": {"key": "uploads/talk.mp3", "size": 1024}
            }
        }"#;
        let event = TriggerEvent::parse(json).unwrap();
        assert_eq!(event.source.as_deref(), Some("aws.s3"));
        assert_eq!(event.detail_type.as_deref(), Some("Object Created"));
        assert_eq!(event.bucket.as_deref(), Some("audio-bucket"));
        assert_eq!(event.key, "uploads/talk.mp3");
    }

    #[test]
    fn parses_request_parameters_forms() {
        let top = TriggerEvent::parse(r#"{"requestParameters": {"key": "uploads/a.wav"}}"#).unwrap();
        assert_eq!(top.key, "uploads/a.wav");
        assert!(top.bucket.is_none());

        let nested = TriggerEvent::parse(
            r#"{"detail": {"requestParameters": {"bucketName": "b", "key": "uploads/a.wav"}}}"#,
        )
        .unwrap();
        assert_eq!(nested.bucket.as_deref(), Some("b"));
    }

    #[test]
    fn rejects_unrecognized_shape() {
        let err = TriggerEvent::parse(r#"{"hello": "world"}"#).unwrap_err();
        assert!(matches!(err, TriggerError::Malformed(_)));
    }

    #[test]
    fn rule_filters_on_prefix_and_bucket() {
        let inside = TriggerEvent::parse(r#"{"bucket": "audio-bucket", "key": "uploads/a.wav"}"#)
            .unwrap();
        let outside = TriggerEvent::parse(r#"{"bucket": "audio-bucket", "key": "translations/a.mp3"}"#)
            .unwrap();
        let other_bucket = TriggerEvent::parse(r#"{"bucket": "elsewhere", "key": "uploads/a.wav"}"#)
            .unwrap();

        assert!(rule().matches(&inside));
        assert!(!rule().matches(&outside));
        assert!(!rule().matches(&other_bucket));
    }

    #[test]
    fn rule_checks_envelope_type() {
        let deleted = TriggerEvent {
            source: Some("aws.s3".into()),
            detail_type: Some("Object Deleted".into()),
            bucket: Some("audio-bucket".into()),
            key: "uploads/a.wav".into(),
        };
        let err = rule().accept(deleted).unwrap_err();
        assert!(matches!(err, TriggerError::Rejected { .. }));
    }

    #[test]
    fn accept_falls_back_to_watched_bucket() {
        let event = TriggerEvent::parse(r#"{"requestParameters": {"key": "uploads/a.wav"}}"#).unwrap();
        let payload = rule().accept(event).unwrap();
        assert_eq!(payload, TriggerPayload::new("audio-bucket", "uploads/a.wav").unwrap());

        let event = TriggerEvent::parse(r#"{"requestParameters": {"key": "uploads/a.wav"}}"#).unwrap();
        let err = EventRule::new(None, "uploads/").accept(event).unwrap_err();
        assert!(matches!(err, TriggerError::MissingBucket));
    }

    #[test]
    fn payload_validation_and_media_uri() {
        assert!(matches!(TriggerPayload::new("b", ""), Err(TriggerError::EmptyKey)));
        assert!(matches!(TriggerPayload::new("", "k"), Err(TriggerError::MissingBucket)));
        let payload = TriggerPayload::new("b", "uploads/a.wav").unwrap();
        assert_eq!(payload.media_uri(), "s3://b/uploads/a.wav");
    }
}
