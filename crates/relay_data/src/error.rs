//! Error types shared by every source.

use crate::record::RecordIdentity;
use thiserror::Error;

/// Result type for data-layer operations.
pub type DataResult<T> = Result<T, DataError>;

/// Errors a source can report while answering a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    /// The request was rejected by the remote end (4xx equivalent).
    #[error("client error: {description}")]
    Client {
        /// Description of the failure.
        description: String,
        /// Status code, if the transport has one.
        status: Option<u16>,
    },

    /// The remote end failed to handle the request (5xx equivalent).
    #[error("server error: {description}")]
    Server {
        /// Description of the failure.
        description: String,
        /// Status code, if the transport has one.
        status: Option<u16>,
    },

    /// The remote end could not be reached.
    #[error("network error: {description}")]
    Network {
        /// Description of the failure.
        description: String,
    },

    /// A query expression could not be parsed.
    #[error("query expression parse error: {message} in {expression}")]
    QueryExpressionParse {
        /// The offending expression, as text.
        expression: String,
        /// Parser message.
        message: String,
    },

    /// The source refuses this query shape.
    #[error("query not allowed: {description}")]
    QueryNotAllowed {
        /// Why the query was refused.
        description: String,
    },

    /// The source refuses this transform shape.
    #[error("transform not allowed: {description}")]
    TransformNotAllowed {
        /// Why the transform was refused.
        description: String,
    },

    /// Schema error.
    #[error("schema error: {description}")]
    Schema {
        /// Description of the failure.
        description: String,
    },

    /// A model type is not defined by the schema.
    #[error("model not defined in schema: {model}")]
    ModelNotFound {
        /// The unknown model type.
        model: String,
    },

    /// A record does not exist.
    #[error("record not found: {record}")]
    RecordNotFound {
        /// The missing record.
        record: RecordIdentity,
    },

    /// A relationship does not exist on a record.
    #[error("relationship not found: {relationship} on {record}")]
    RelationshipNotFound {
        /// The record searched.
        record: RecordIdentity,
        /// The missing relationship.
        relationship: String,
    },

    /// A record already exists.
    #[error("record already exists: {record}")]
    RecordAlreadyExists {
        /// The existing record.
        record: RecordIdentity,
    },
}

impl DataError {
    /// Creates a client error without a status code.
    pub fn client(description: impl Into<String>) -> Self {
        Self::Client {
            description: description.into(),
            status: None,
        }
    }

    /// Creates a server error without a status code.
    pub fn server(description: impl Into<String>) -> Self {
        Self::Server {
            description: description.into(),
            status: None,
        }
    }

    /// Creates a network error.
    pub fn network(description: impl Into<String>) -> Self {
        Self::Network {
            description: description.into(),
        }
    }

    /// Returns true for transport-class errors (client, server, network).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            DataError::Client { .. } | DataError::Server { .. } | DataError::Network { .. }
        )
    }

    /// Returns true for errors about a specific record.
    pub fn is_record_exception(&self) -> bool {
        self.record_identity().is_some()
    }

    /// Returns the record a record-class error refers to.
    pub fn record_identity(&self) -> Option<&RecordIdentity> {
        match self {
            DataError::RecordNotFound { record }
            | DataError::RelationshipNotFound { record, .. }
            | DataError::RecordAlreadyExists { record } => Some(record),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classes() {
        assert!(DataError::client("bad request").is_transport());
        assert!(DataError::network("unreachable").is_transport());
        assert!(!DataError::network("unreachable").is_record_exception());

        let err = DataError::RelationshipNotFound {
            record: RecordIdentity::new("planet", "earth"),
            relationship: "moons".into(),
        };
        assert!(err.is_record_exception());
        assert_eq!(err.record_identity().map(|r| r.id.as_str()), Some("earth"));
    }

    #[test]
    fn error_display() {
        let err = DataError::RecordNotFound {
            record: RecordIdentity::new("planet", "pluto"),
        };
        assert_eq!(err.to_string(), "record not found: planet:pluto");

        let err = DataError::ModelNotFound {
            model: "comet".into(),
        };
        assert!(err.to_string().contains("comet"));
    }
}
