//! Batch upload transport contract.
//!
//! One logical call per batch: the result list's length and order always match
//! the input list, even on partial failure, so every submitted file has a
//! success-or-error outcome and nothing is silently dropped. Batch-level
//! progress percentages are reported over a channel and are monotonically
//! non-decreasing.

mod http;

pub use http::{DispatchMode, HttpTransport};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kemia_core::{CandidateFile, FailureReason, RemoteAsset, TransportError};

/// Per-position outcomes for one logical batch call, in submission order.
pub type BatchOutcomes = Vec<Result<RemoteAsset, FailureReason>>;

/// Channel for batch-level progress percentages (0-100).
pub type ProgressSender = mpsc::Sender<u8>;

/// Transform/dispatch options forwarded with an upload.
#[derive(Clone, Debug)]
pub struct UploadOptions {
    pub resize: bool,
    pub compress: bool,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub quality: Option<u8>,
    /// Bound on parallel physical transfers when the client splits a logical
    /// batch into multiple physical calls.
    pub concurrency: usize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            resize: false,
            compress: false,
            max_width: None,
            max_height: None,
            quality: None,
            concurrency: 3,
        }
    }
}

/// Network transfer of one batch of files to a remote endpoint.
///
/// A top-level `Err` means the call produced no outcomes (connection failure,
/// total rejection, cancellation); `Ok` carries exactly one outcome per input
/// file. Implementations do not re-validate content, only the structural
/// well-formedness of the request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_batch(
        &self,
        files: &[CandidateFile],
        destination_path: &str,
        options: &UploadOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<BatchOutcomes, TransportError>;
}

/// Upload API response envelope.
#[derive(Debug, Deserialize)]
pub struct UploadEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<EnvelopeData>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of a successful envelope: the multi-file variant or the
/// single-file variant, depending on the endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Files { files: Vec<UploadedFile> },
    Single(UploadedFile),
}

/// One per-file entry in the envelope. On partial failure a position carries
/// `error` instead of `url`.
#[derive(Debug, Deserialize)]
pub struct UploadedFile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl UploadedFile {
    fn into_outcome(self) -> Result<RemoteAsset, FailureReason> {
        match self.url {
            Some(url) => Ok(RemoteAsset {
                url,
                size: self.size,
                content_type: self.content_type,
            }),
            None => Err(FailureReason::ServerRejected(
                self.error
                    .unwrap_or_else(|| "rejected by server".to_string()),
            )),
        }
    }
}

/// Map an envelope into per-position outcomes for a call that submitted
/// `expected` files. A length mismatch is a transport-contract breach.
pub(crate) fn outcomes_from_envelope(
    envelope: UploadEnvelope,
    expected: usize,
) -> Result<BatchOutcomes, TransportError> {
    if !envelope.success {
        return Err(TransportError::ServerRejected {
            status: 200,
            message: envelope
                .message
                .unwrap_or_else(|| "upload rejected".to_string()),
        });
    }

    let files = match envelope.data {
        Some(EnvelopeData::Files { files }) => files,
        Some(EnvelopeData::Single(file)) => vec![file],
        None => {
            return Err(TransportError::ContractViolation(
                "successful envelope carried no data".to_string(),
            ))
        }
    };

    if files.len() != expected {
        tracing::error!(
            expected,
            got = files.len(),
            "upload endpoint returned a result list of the wrong length"
        );
        return Err(TransportError::ContractViolation(format!(
            "expected {} outcomes, got {}",
            expected,
            files.len()
        )));
    }

    Ok(files.into_iter().map(UploadedFile::into_outcome).collect())
}
