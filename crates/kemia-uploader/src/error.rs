//! Uploader-level error type.

use kemia_core::{SessionError, TransportError};

use crate::preview::PreviewError;

#[derive(Debug, thiserror::Error)]
pub enum UploaderError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Preview error: {0}")]
    Preview(#[from] PreviewError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
