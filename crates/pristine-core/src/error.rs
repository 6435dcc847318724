//! Error types for the chat widget.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned status {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No visitor registered")]
    NoVisitor,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stream stalled for {0:?}")]
    StreamIdle(std::time::Duration),
}
