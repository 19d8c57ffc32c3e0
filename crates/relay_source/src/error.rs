//! Error types for sources.

use relay_data::DataError;
use thiserror::Error;

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors that can occur while a source handles a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Error reported by the data layer or by a capability handler.
    #[error(transparent)]
    Data(#[from] DataError),

    /// A listener rejected an event.
    #[error("listener for {event} rejected: {message}")]
    Listener {
        /// Name of the event, e.g. `beforeUpdate`.
        event: String,
        /// Rejection message.
        message: String,
    },
}

impl SourceError {
    /// Creates a listener rejection.
    pub fn listener(event: impl ToString, message: impl Into<String>) -> Self {
        Self::Listener {
            event: event.to_string(),
            message: message.into(),
        }
    }

    /// Returns the data-layer error, if this is one.
    pub fn as_data(&self) -> Option<&DataError> {
        match self {
            SourceError::Data(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_errors_are_transparent() {
        let err: SourceError = DataError::network("offline").into();
        assert_eq!(err.to_string(), "network error: offline");
        assert_eq!(err.as_data(), Some(&DataError::network("offline")));
    }

    #[test]
    fn listener_display() {
        let err = SourceError::listener("beforePush", "read only");
        assert_eq!(err.to_string(), "listener for beforePush rejected: read only");
        assert!(err.as_data().is_none());
    }
}
