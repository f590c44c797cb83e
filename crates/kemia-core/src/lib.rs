//! Kemia Core Library
//!
//! This crate provides the domain models, error types, configuration, and the
//! upload validation gate shared across all Kemia components.

pub mod config;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::UploaderConfig;
pub use error::{FailureReason, SessionError, TransportError, ValidationError};
pub use models::{
    BatchProgress, CandidateFile, ItemProgress, ItemState, PreviewHandle, RemoteAsset, UploadItem,
};
pub use validation::{RejectedCandidate, UploadPolicy};
