//! Error types module
//!
//! This module provides the core error types used throughout the Kemia upload
//! pipeline. Validation failures are detected before any network activity and
//! are never retried; transport failures settle the affected items as failed
//! and stay eligible for an explicit retry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ItemState;

/// Rejection produced by the validation gate. Purely advisory: surfacing the
/// rejection to the user is the caller's responsibility.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported content type: {content_type} (allowed: {allowed:?})")]
    UnsupportedType {
        content_type: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("File too small: {size} bytes (min: {min} bytes)")]
    TooSmall { size: u64, min: u64 },

    #[error("Batch capacity exceeded: {count} items selected, capacity is {capacity}")]
    CapacityExceeded { count: usize, capacity: usize },
}

/// Failure of one logical transport call, or of one position within it.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network failure: {0}")]
    Network(String),

    #[error("Server rejected upload (status {status}): {message}")]
    ServerRejected { status: u16, message: String },

    #[error("Upload cancelled")]
    Cancelled,

    #[error("Transport contract violation: {0}")]
    ContractViolation(String),
}

/// Per-item failure reason, kept on the item while it is in the failed state
/// and cleared on retry. Serializable so UI layers can persist snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureReason {
    NetworkFailure(String),
    ServerRejected(String),
    Cancelled,
    ContractViolation(String),
}

impl FailureReason {
    /// Whether a retry of this item is worth offering. Contract violations
    /// indicate a transport-layer breach rather than a transient fault.
    pub fn is_retryable(&self) -> bool {
        match self {
            FailureReason::NetworkFailure(_) => true,
            FailureReason::ServerRejected(_) => true,
            FailureReason::Cancelled => true,
            FailureReason::ContractViolation(_) => false,
        }
    }

    /// Machine-readable reason code (e.g. "NETWORK_FAILURE").
    pub fn code(&self) -> &'static str {
        match self {
            FailureReason::NetworkFailure(_) => "NETWORK_FAILURE",
            FailureReason::ServerRejected(_) => "SERVER_REJECTED",
            FailureReason::Cancelled => "CANCELLED",
            FailureReason::ContractViolation(_) => "CONTRACT_VIOLATION",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NetworkFailure(msg) => write!(f, "Network failure: {}", msg),
            FailureReason::ServerRejected(msg) => write!(f, "Server rejected upload: {}", msg),
            FailureReason::Cancelled => write!(f, "Upload cancelled"),
            FailureReason::ContractViolation(msg) => {
                write!(f, "Transport contract violation: {}", msg)
            }
        }
    }
}

impl From<&TransportError> for FailureReason {
    fn from(err: &TransportError) -> Self {
        match err {
            TransportError::Network(msg) => FailureReason::NetworkFailure(msg.clone()),
            TransportError::ServerRejected { status, message } => {
                FailureReason::ServerRejected(format!("status {}: {}", status, message))
            }
            TransportError::Cancelled => FailureReason::Cancelled,
            TransportError::ContractViolation(msg) => {
                FailureReason::ContractViolation(msg.clone())
            }
        }
    }
}

/// Errors raised by the session/orchestration layer itself.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Illegal state transition for item {id}: {from} -> {to}")]
    IllegalTransition {
        id: Uuid,
        from: ItemState,
        to: ItemState,
    },

    #[error("Unknown item: {0}")]
    UnknownItem(Uuid),

    #[error("A batch is already in flight")]
    BatchInFlight,

    #[error("Cannot remove item {0} while it is uploading")]
    RemoveWhileUploading(Uuid),
}
