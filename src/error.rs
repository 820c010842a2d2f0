//! Seat error types

use thiserror::Error;

/// Result type for seat and display provisioning
pub type Result<T> = std::result::Result<T, SeatError>;

/// Seat and display provisioning errors
#[derive(Debug, Error)]
pub enum SeatError {
    /// A seat was constructed from an unusable session or settings
    #[error("Invalid construction argument: {0}")]
    InvalidConstructionArgument(String),

    /// A display server handle or display could not be built
    #[error("Display provisioning failed: {0}")]
    DisplayProvisioningFailed(String),

    /// add_display was called after the seat was stopped
    #[error("Seat stopped: {0}")]
    SeatStopped(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SeatError {
    pub(crate) fn provisioning(reason: impl Into<String>) -> Self {
        Self::DisplayProvisioningFailed(reason.into())
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidConstructionArgument(reason.into())
    }
}
