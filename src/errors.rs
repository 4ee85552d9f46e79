//! Typed error definitions for workflow_courier.
//! Provides the small set of well-known failure modes callers see, for better logs and tests.

use thiserror::Error;

use crate::normalizer::NormalizationFailure;
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum CourierError {
    /// Neither channel could reach the host. Retrying is pointless until connectivity returns.
    #[error("cannot reach the host ({detail}); check that the host process is running and the address is correct")]
    TransportUnavailable { detail: String },

    /// The host understood the request and refused it.
    #[error("host refused {operation}: {reason}")]
    OperationRejected { operation: String, reason: String },

    #[error("{operation} cancelled by user")]
    UserCancelled { operation: String },

    #[error("{operation} skipped by user")]
    UserSkipped { operation: String },

    #[error("document format not recognized: {0}")]
    FormatUnrecognized(String),

    #[error("document is malformed: {0}")]
    FormatMalformed(String),

    #[error("path '{path}' no longer exists on the host and could not be recovered; refresh the listing")]
    PathStale { path: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("'{decision}' cannot be applied to {operation}")]
    UnsupportedDecision { operation: String, decision: String },
}

impl CourierError {
    /// Stable short code used in structured log fields.
    pub fn code(&self) -> &'static str {
        match self {
            CourierError::TransportUnavailable { .. } => "transport_unavailable",
            CourierError::OperationRejected { .. } => "operation_rejected",
            CourierError::UserCancelled { .. } => "user_cancelled",
            CourierError::UserSkipped { .. } => "user_skipped",
            CourierError::FormatUnrecognized(_) => "format_unrecognized",
            CourierError::FormatMalformed(_) => "format_malformed",
            CourierError::PathStale { .. } => "path_stale",
            CourierError::InvalidName { .. } => "invalid_name",
            CourierError::UnsupportedDecision { .. } => "unsupported_decision",
        }
    }

    /// Operator-directed stops are not faults.
    pub fn is_user_directed(&self) -> bool {
        matches!(
            self,
            CourierError::UserCancelled { .. } | CourierError::UserSkipped { .. }
        )
    }

    /// Process exit status for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            CourierError::UserCancelled { .. } | CourierError::UserSkipped { .. } => 2,
            CourierError::OperationRejected { .. }
            | CourierError::PathStale { .. }
            | CourierError::InvalidName { .. }
            | CourierError::UnsupportedDecision { .. } => 3,
            CourierError::TransportUnavailable { .. } => 4,
            CourierError::FormatUnrecognized(_) | CourierError::FormatMalformed(_) => 5,
        }
    }

    /// Collapse a dispatcher failure for `operation` into the caller-facing taxonomy.
    pub fn from_transport(operation: &str, err: TransportError) -> Self {
        if err.is_unreachable() {
            CourierError::TransportUnavailable {
                detail: err.to_string(),
            }
        } else {
            CourierError::OperationRejected {
                operation: operation.to_string(),
                reason: err.to_string(),
            }
        }
    }
}

impl From<NormalizationFailure> for CourierError {
    fn from(failure: NormalizationFailure) -> Self {
        CourierError::FormatMalformed(failure.to_string())
    }
}
