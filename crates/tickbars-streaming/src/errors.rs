use thiserror::Error;
use tickbars_core::{CheckpointError, ProcessingError};

/// Errors that end or prevent a live session
#[derive(Debug, Error)]
pub enum StreamError {
    /// Every sender of the trade transport was dropped
    #[error("trade transport disconnected")]
    Disconnected,

    /// The bar receiver was dropped while the session was running
    #[error("bar channel closed by receiver")]
    BarChannelClosed,

    #[error("live session already started")]
    AlreadyStarted,

    #[error("live session not started")]
    NotStarted,

    #[error("ingestion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
