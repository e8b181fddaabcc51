//! Failure taxonomy for endpoint operations.
//!
//! Failures are explicit values carrying a fatal/retryable classification.
//! The retry machinery branches on [`Recoverable::is_fatal`] and nothing
//! else, so adding a variant means deciding its severity here, once.

use std::io;

use thiserror::Error;

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Never retried; surfaces to the top level immediately.
    Fatal,
    /// Handled by backoff and reconnection.
    Retryable,
}

/// Classification seam consumed by the backoff executor.
pub trait Recoverable {
    fn severity(&self) -> Severity;

    fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Unified failure type for endpoint open/read/write operations.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Target device or channel does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Insufficient privilege for the target.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// The endpoint rejected its configuration.
    #[error("configuration rejected: {0}")]
    Config(String),

    /// The channel has no free instance right now.
    #[error("busy: {0}")]
    Busy(String),

    /// The remote side of the channel dropped.
    #[error("remote side disconnected")]
    Disconnected,

    /// Any other I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Recoverable for EndpointError {
    fn severity(&self) -> Severity {
        match self {
            Self::NotFound(_) | Self::AccessDenied(_) | Self::Config(_) => Severity::Fatal,
            Self::Busy(_) | Self::Disconnected | Self::Io(_) => Severity::Retryable,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(EndpointError::NotFound("/dev/ttyUSB9".into()).is_fatal());
        assert!(EndpointError::AccessDenied("/dev/ttyS0".into()).is_fatal());
        assert!(EndpointError::Config("unsupported baud".into()).is_fatal());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(!EndpointError::Busy("no free instance".into()).is_fatal());
        assert!(!EndpointError::Disconnected.is_fatal());
        let io_err = EndpointError::Io(io::Error::new(io::ErrorKind::Other, "transient"));
        assert_eq!(io_err.severity(), Severity::Retryable);
    }

    #[test]
    fn test_display_includes_context() {
        let err = EndpointError::NotFound("/dev/ttyUSB0".into());
        assert_eq!(err.to_string(), "not found: /dev/ttyUSB0");

        let err = EndpointError::Disconnected;
        assert_eq!(err.to_string(), "remote side disconnected");
    }

    #[test]
    fn test_from_io_error() {
        let err: EndpointError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(err, EndpointError::Io(_)));
        assert!(!err.is_fatal());
    }
}
