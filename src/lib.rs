//! Workflow engine that turns an uploaded recording into an English voice
//! track: transcribe, translate when needed, synthesize, store.
//!
//! The [`workflow::Engine`] interprets a fixed state graph over a
//! [`adapter::ServiceAdapter`], which is the only way it reaches external
//! services.

pub mod adapter;
pub mod cli;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod trigger;
pub mod ui;
pub mod workflow;

pub use error::VoxrelayError;
