use thiserror::Error;

/// Camera subsystem errors.
#[derive(Debug, Error)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device input creation failed: {0}")]
    InputCreation(String),

    #[error("device enumeration failed: {0}")]
    Enumeration(String),

    #[error("session configuration rejected: {0}")]
    SessionConfiguration(String),

    #[error("stream start failed: {0}")]
    StreamStart(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CameraError>;
