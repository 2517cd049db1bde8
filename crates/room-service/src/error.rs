//! Service use errors.

/// Errors raised synchronously by service entry points.
///
/// Framing and transport errors never surface here; they are handled at
/// the pump boundaries (logged, and the affected loop ends or continues
/// per its policy).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("service disposed")]
    Disposed,

    #[error("service not running")]
    NotRunning,

    #[error("service already running")]
    AlreadyRunning,
}

pub type Result<T> = std::result::Result<T, ServiceError>;
