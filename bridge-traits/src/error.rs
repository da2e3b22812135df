use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Media session error: {0}")]
    MediaSession(String),

    #[error("Audio route unavailable: {0}")]
    AudioRoute(String),

    #[error("Request rejected by remote endpoint: {0}")]
    RequestRejected(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
