//! Reqwest-backed transport.
//!
//! Two physical dispatch modes behind the one-logical-call contract:
//! `Batched` sends a single multipart POST carrying every file; `PerFile`
//! fans out one POST per file under a semaphore bounded by
//! `options.concurrency` and reassembles outcomes in submission order. The
//! orchestrator never observes the difference.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use kemia_core::{CandidateFile, FailureReason, RemoteAsset, TransportError};

use super::{outcomes_from_envelope, BatchOutcomes, ProgressSender, Transport, UploadOptions};
use crate::{api_prefix, ApiClient};

/// How a logical batch is mapped onto physical HTTP calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchMode {
    /// One multipart POST for the whole batch. Progress is coarse (0 then 100)
    /// because a single POST yields no byte-level telemetry.
    Batched,
    /// One POST per file against the single-file endpoint, bounded by
    /// `options.concurrency`. Progress advances as files complete.
    PerFile,
}

#[derive(Clone)]
pub struct HttpTransport {
    api: ApiClient,
    mode: DispatchMode,
}

impl HttpTransport {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            mode: DispatchMode::Batched,
        }
    }

    pub fn with_mode(api: ApiClient, mode: DispatchMode) -> Self {
        Self { api, mode }
    }

    fn batch_path() -> String {
        format!("{}/assets/batch", api_prefix())
    }

    fn single_path() -> String {
        format!("{}/assets", api_prefix())
    }

    fn transform_fields(
        mut form: reqwest::multipart::Form,
        options: &UploadOptions,
    ) -> reqwest::multipart::Form {
        if options.resize {
            if let Some(width) = options.max_width {
                form = form.text("width", width.to_string());
            }
            if let Some(height) = options.max_height {
                form = form.text("height", height.to_string());
            }
        }
        if options.compress {
            if let Some(quality) = options.quality {
                form = form.text("quality", quality.to_string());
            }
        }
        form
    }

    fn file_part(file: &CandidateFile) -> Result<reqwest::multipart::Part, TransportError> {
        reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                TransportError::ContractViolation(format!(
                    "invalid content type '{}': {}",
                    file.content_type, e
                ))
            })
    }

    async fn send_batched(
        &self,
        files: &[CandidateFile],
        destination_path: &str,
        options: &UploadOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<BatchOutcomes, TransportError> {
        let mut form = reqwest::multipart::Form::new()
            .text("destination_path", destination_path.to_string());
        form = Self::transform_fields(form, options);
        for file in files {
            form = form.part("files", Self::file_part(file)?);
        }

        let _ = progress.send(0).await;

        let batch_path = Self::batch_path();
        let envelope = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = self.api.post_multipart::<super::UploadEnvelope>(&batch_path, form) => result?,
        };

        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        let outcomes = outcomes_from_envelope(envelope, files.len())?;
        let _ = progress.send(100).await;
        Ok(outcomes)
    }

    async fn send_one(
        api: &ApiClient,
        file: &CandidateFile,
        destination_path: &str,
        options: &UploadOptions,
    ) -> Result<RemoteAsset, FailureReason> {
        let part = Self::file_part(file).map_err(|e| FailureReason::from(&e))?;
        let mut form = reqwest::multipart::Form::new()
            .text("destination_path", destination_path.to_string())
            .part("file", part);
        form = Self::transform_fields(form, options);

        let envelope: super::UploadEnvelope = api
            .post_multipart(&Self::single_path(), form)
            .await
            .map_err(|e| FailureReason::from(&e))?;

        let mut outcomes =
            outcomes_from_envelope(envelope, 1).map_err(|e| FailureReason::from(&e))?;
        outcomes
            .pop()
            .unwrap_or_else(|| Err(FailureReason::ContractViolation("empty outcome".to_string())))
    }

    async fn send_per_file(
        &self,
        files: &[CandidateFile],
        destination_path: &str,
        options: &UploadOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<BatchOutcomes, TransportError> {
        let total = files.len();
        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        // Completion counter and sender share a lock so percentages leave the
        // channel in non-decreasing order.
        let completed = Arc::new(Mutex::new(0usize));

        let mut join_set = JoinSet::new();
        for (index, file) in files.iter().cloned().enumerate() {
            let api = self.api.clone();
            let semaphore = Arc::clone(&semaphore);
            let completed = Arc::clone(&completed);
            let cancel = cancel.clone();
            let progress = progress.clone();
            let destination_path = destination_path.to_string();
            let options = options.clone();

            join_set.spawn(async move {
                let permit = semaphore.acquire_owned().await;
                if permit.is_err() || cancel.is_cancelled() {
                    return (index, Err(FailureReason::Cancelled));
                }

                let outcome = Self::send_one(&api, &file, &destination_path, &options).await;

                let mut done = completed.lock().await;
                *done += 1;
                let percent = ((*done * 100) / total) as u8;
                let _ = progress.send(percent).await;
                drop(done);

                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<RemoteAsset, FailureReason>>> =
            (0..total).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "upload worker task failed");
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        Ok(outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| {
                    Err(FailureReason::ContractViolation(
                        "upload worker produced no outcome".to_string(),
                    ))
                })
            })
            .collect())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_batch(
        &self,
        files: &[CandidateFile],
        destination_path: &str,
        options: &UploadOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<BatchOutcomes, TransportError> {
        if files.is_empty() {
            return Err(TransportError::ContractViolation(
                "batch must contain at least one file".to_string(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        match self.mode {
            DispatchMode::Batched => {
                self.send_batched(files, destination_path, options, progress, cancel)
                    .await
            }
            DispatchMode::PerFile => {
                self.send_per_file(files, destination_path, options, progress, cancel)
                    .await
            }
        }
    }
}
