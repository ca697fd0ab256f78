//! Error types for feature-view materialization.

use thiserror::Error;

/// Result type alias for feature store operations.
pub type Result<T> = std::result::Result<T, FeatureStoreError>;

/// Errors that can occur while registering entities or materializing feature views.
#[derive(Debug, Error)]
pub enum FeatureStoreError {
    /// A required field is missing or invalid. Raised before any DDL.
    #[error("configuration error: {field}: {message}")]
    Configuration {
        /// The offending field, e.g. `refresh.warehouse`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A referenced entity is not registered. Raised before any DDL.
    #[error("entity '{entity}' is not registered; register it before referencing it from a feature view")]
    Reference {
        /// The missing entity (upper-cased).
        entity: String,
    },

    /// An entity was re-declared with different join keys.
    #[error(
        "entity '{entity}' is already registered with join keys [{registered}]; declared [{declared}]"
    )]
    EntityConflict {
        /// The entity (upper-cased).
        entity: String,
        /// Comma-joined registered keys.
        registered: String,
        /// Comma-joined declared keys.
        declared: String,
    },

    /// Drift detected under the `fail` change policy. Nothing was altered.
    #[error(
        "state conflict on {object}: {drift}; rerun with a forced full refresh to rebuild it"
    )]
    StateConflict {
        /// Physical object name.
        object: String,
        /// Human-readable drift description.
        drift: String,
    },

    /// Describing the object failed; its state is unknown (not absent).
    #[error("failed to observe {object}: {source}")]
    Observation {
        /// Physical object name.
        object: String,
        /// Underlying warehouse error.
        #[source]
        source: fview_core::Error,
    },

    /// A statement failed after earlier statements of the same run took effect.
    ///
    /// The object is left in a mixed state; nothing is rolled back or retried.
    #[error("{object} partially updated ({applied} of {total} statements applied): {source}")]
    PartialApply {
        /// Physical object name.
        object: String,
        /// Statements that succeeded before the failure.
        applied: usize,
        /// Statements planned for this run.
        total: usize,
        /// Underlying warehouse error.
        #[source]
        source: fview_core::Error,
    },

    /// Metadata could not be encoded.
    #[error("metadata encoding failed: {message}")]
    Metadata {
        /// Description of the encoding failure.
        message: String,
    },

    /// Shared plumbing failed (warehouse call, identifier, configuration).
    #[error(transparent)]
    Core(#[from] fview_core::Error),
}

impl FeatureStoreError {
    /// Creates a configuration error for `field`.
    #[must_use]
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error was raised before any DDL was issued.
    #[must_use]
    pub fn is_pre_ddl(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::Reference { .. }
                | Self::EntityConflict { .. }
                | Self::StateConflict { .. }
                | Self::Observation { .. }
        )
    }
}

impl From<serde_json::Error> for FeatureStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Metadata {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_item() {
        let err = FeatureStoreError::configuration("refresh.warehouse", "required when refresh is set");
        assert_eq!(
            err.to_string(),
            "configuration error: refresh.warehouse: required when refresh is set"
        );

        let err = FeatureStoreError::Reference {
            entity: "CUSTOMER".into(),
        };
        assert!(err.to_string().contains("'CUSTOMER' is not registered"));
        assert!(err.is_pre_ddl());
    }

    #[test]
    fn partial_apply_reports_progress() {
        let err = FeatureStoreError::PartialApply {
            object: "FV$1_0".into(),
            applied: 1,
            total: 2,
            source: fview_core::Error::warehouse("warehouse WH2 does not exist"),
        };
        assert_eq!(
            err.to_string(),
            "FV$1_0 partially updated (1 of 2 statements applied): warehouse error: warehouse WH2 does not exist"
        );
        assert!(!err.is_pre_ddl());
    }
}
