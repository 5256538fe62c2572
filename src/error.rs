use thiserror::Error;

use crate::adapter::AdapterError;
use crate::trigger::TriggerError;
use crate::workflow::{ErrorCode, PollTimeout};

#[derive(Debug, Error)]
pub enum VoxrelayError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),

    #[error("Gateway error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Polling error: {0}")]
    Poll(#[from] PollTimeout),

    #[error("Execution failed with {0}")]
    ExecutionFailed(ErrorCode),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
