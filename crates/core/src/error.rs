//! Error types for evpump_core

/// Errors surfaced by the event subsystem.
///
/// Events dropped because their type is disabled or because the filter
/// rejected them are not errors; see [`crate::Admission`].
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event queue is full ({capacity} events), event dropped")]
    QueueFull { capacity: usize },

    #[error("invalid event type tag: {0}")]
    InvalidType(u8),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("event subsystem has been shut down")]
    ShutDown,

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EventError {
    /// Status code for callers that speak the 1 / 0 / -1 convention.
    pub fn code(&self) -> i32 {
        -1
    }
}

pub type Result<T> = std::result::Result<T, EventError>;
