//! Error types and result aliases for fview.
//!
//! These errors describe failures of the shared plumbing: malformed identifiers,
//! bad configuration, and warehouse round trips. Feature-view level failures
//! (configuration, references, drift) live in `fview-catalog`.

/// The result type used throughout fview.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fview operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidIdentifier {
        /// Description of what made the identifier invalid.
        message: String,
    },

    /// A warehouse call (describe, show, DDL) failed.
    #[error("warehouse error: {message}")]
    Warehouse {
        /// Description of the warehouse failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new warehouse error with the given message.
    #[must_use]
    pub fn warehouse(message: impl Into<String>) -> Self {
        Self::Warehouse {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new warehouse error with a source cause.
    #[must_use]
    pub fn warehouse_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Warehouse {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new invalid identifier error.
    #[must_use]
    pub fn invalid_identifier(message: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warehouse_error_keeps_source() {
        let io = std::io::Error::other("connection reset");
        let err = Error::warehouse_with_source("describe failed", io);

        assert_eq!(err.to_string(), "warehouse error: describe failed");
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "connection reset");
    }
}
