//! Batch orchestrator.
//!
//! Coordinates the validation gate, preview spool, item store, and transport:
//! `submit` validates and dispatches, `retry_failed` re-sends exactly the
//! failed set, and cancellation is cooperative through a token the caller can
//! clone for teardown. The orchestrator is the session's single writer; while
//! a dispatch is awaited, progress flows in over a channel and is fanned out
//! to items size-weighted in submission order.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use kemia_api_client::{ApiClient, HttpTransport, Transport, UploadOptions};
use kemia_core::{
    BatchProgress, CandidateFile, FailureReason, ItemState, SessionError, TransportError,
    UploadItem, UploadPolicy, UploaderConfig,
};
use kemia_core::validation::RejectedCandidate;

use crate::error::UploaderError;
use crate::observer::UploadObserver;
use crate::preview::PreviewStore;
use crate::session::BatchSession;

/// Outcome of a `submit` call: which candidates were admitted, and why the
/// others were turned away. `accepted.len() + rejected.len()` always equals
/// the number of submitted candidates.
#[derive(Debug)]
pub struct SubmitReport {
    pub accepted: Vec<Uuid>,
    pub rejected: Vec<RejectedCandidate>,
}

pub struct BatchUploader {
    session: BatchSession,
    previews: PreviewStore,
    transport: Arc<dyn Transport>,
    observer: Arc<dyn UploadObserver>,
    policy: UploadPolicy,
    options: UploadOptions,
    destination_path: String,
    auto_start: bool,
    cancel: CancellationToken,
    /// Source payloads retained for dispatch and retry; dropped once an item
    /// uploads or is removed.
    sources: HashMap<Uuid, CandidateFile>,
}

impl BatchUploader {
    pub fn new(
        transport: Arc<dyn Transport>,
        previews: PreviewStore,
        policy: UploadPolicy,
        destination_path: impl Into<String>,
        observer: Arc<dyn UploadObserver>,
    ) -> Self {
        Self {
            session: BatchSession::new(),
            previews,
            transport,
            observer,
            policy,
            options: UploadOptions::default(),
            destination_path: destination_path.into(),
            auto_start: true,
            cancel: CancellationToken::new(),
            sources: HashMap::new(),
        }
    }

    /// Build an uploader wired to the HTTP transport described by `config`.
    pub async fn from_config(
        config: &UploaderConfig,
        destination_path: impl Into<String>,
        observer: Arc<dyn UploadObserver>,
    ) -> Result<Self, UploaderError> {
        let api = ApiClient::from_config(config)?;
        let previews = PreviewStore::new(config.preview_dir.clone()).await?;
        let options = UploadOptions {
            concurrency: config.upload_concurrency,
            ..UploadOptions::default()
        };
        let mut uploader = Self::new(
            Arc::new(HttpTransport::new(api)),
            previews,
            config.policy(),
            destination_path,
            observer,
        );
        uploader.auto_start = config.auto_start;
        uploader.options = options;
        Ok(uploader)
    }

    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// When disabled, `submit` stages items and [`start`](Self::start)
    /// triggers the upload.
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Token the caller holds to cancel in-flight work on teardown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn items(&self) -> &[UploadItem] {
        self.session.items()
    }

    pub fn snapshot(&self) -> BatchProgress {
        self.session.snapshot()
    }

    pub fn is_settled(&self) -> bool {
        self.session.is_settled()
    }

    pub fn uploaded_urls(&self) -> Vec<String> {
        self.session.uploaded_urls()
    }

    /// Preview handles currently live. Zero after teardown.
    pub fn outstanding_previews(&self) -> usize {
        self.previews.outstanding()
    }

    /// Run the validation gate over `candidates` in selection order, admit
    /// the accepted ones as pending items with spooled previews, and (unless
    /// auto-start is off) dispatch them. Rejections never reach the transport.
    pub async fn submit(
        &mut self,
        candidates: Vec<CandidateFile>,
    ) -> Result<SubmitReport, UploaderError> {
        if self.session.has_in_flight() {
            return Err(SessionError::BatchInFlight.into());
        }

        let (accepted, rejected) = self.policy.partition(candidates, self.session.len());

        let mut accepted_ids = Vec::with_capacity(accepted.len());
        for candidate in accepted {
            let preview = self
                .previews
                .acquire(&candidate.file_name, &candidate.data)
                .await?;
            let item = UploadItem::new(
                candidate.file_name.clone(),
                candidate.size(),
                candidate.content_type.clone(),
                Some(preview),
            );
            accepted_ids.push(item.id);
            self.sources.insert(item.id, candidate);
            self.session.push(item);
        }

        if !accepted_ids.is_empty() {
            self.emit_progress().await;
            if self.auto_start {
                self.dispatch(accepted_ids.clone()).await?;
            }
        }

        Ok(SubmitReport {
            accepted: accepted_ids,
            rejected,
        })
    }

    /// Dispatch every staged (pending) item. Explicit trigger for sessions
    /// configured without auto-start.
    pub async fn start(&mut self) -> Result<(), UploaderError> {
        if self.session.has_in_flight() {
            return Err(SessionError::BatchInFlight.into());
        }
        let ids = self.session.ids_in_state(ItemState::Pending);
        self.dispatch(ids).await
    }

    /// Re-send exactly the failed items. Uploaded items are never re-sent.
    /// With nothing failed this is a no-op: no state change, no callback.
    pub async fn retry_failed(&mut self) -> Result<(), UploaderError> {
        if self.session.has_in_flight() {
            return Err(SessionError::BatchInFlight.into());
        }
        let ids = self.session.ids_in_state(ItemState::Failed);
        if ids.is_empty() {
            return Ok(());
        }
        for id in &ids {
            self.session
                .get_mut(*id)
                .ok_or(SessionError::UnknownItem(*id))?
                .reset_for_retry()?;
        }
        self.dispatch(ids).await
    }

    /// Signal cancellation and settle anything left uploading. In-flight
    /// dispatches observe the token at their next progress or completion
    /// boundary; callers holding [`cancel_token`](Self::cancel_token) get the
    /// same effect from outside.
    pub async fn cancel(&mut self) {
        self.cancel.cancel();
        let uploading = self.session.ids_in_state(ItemState::Uploading);
        if uploading.is_empty() {
            return;
        }
        self.settle_with(&uploading, FailureReason::Cancelled).await;
    }

    /// Remove one item, releasing its preview. Refused while the item is in
    /// flight. Removing an uploaded item re-emits the URL list.
    pub async fn remove(&mut self, id: Uuid) -> Result<(), UploaderError> {
        let state = self
            .session
            .get(id)
            .ok_or(SessionError::UnknownItem(id))?
            .state;
        if state == ItemState::Uploading {
            return Err(SessionError::RemoveWhileUploading(id).into());
        }

        let item = self
            .session
            .remove(id)
            .ok_or(SessionError::UnknownItem(id))?;
        if let Some(preview) = &item.preview {
            self.previews.release(preview).await;
        }
        self.sources.remove(&id);

        self.emit_progress().await;
        if state == ItemState::Uploaded {
            self.emit_urls().await;
        }
        Ok(())
    }

    /// Full teardown: cancel in-flight work, drop every item, and release
    /// every preview handle.
    pub async fn clear(&mut self) {
        self.cancel.cancel();
        for item in self.session.drain() {
            if let Some(preview) = &item.preview {
                self.previews.release(preview).await;
            }
        }
        self.previews.release_all().await;
        self.sources.clear();
        self.emit_progress().await;
        self.emit_urls().await;
    }

    /// Drive one logical transport call for `ids`, streaming progress into
    /// the items and settling each per its positional outcome.
    async fn dispatch(&mut self, ids: Vec<Uuid>) -> Result<(), UploaderError> {
        if ids.is_empty() {
            return Ok(());
        }

        for id in &ids {
            let item = self
                .session
                .get_mut(*id)
                .ok_or(SessionError::UnknownItem(*id))?;
            if item.state == ItemState::Pending {
                item.start()?;
            }
        }
        self.emit_progress().await;

        if self.cancel.is_cancelled() {
            self.settle_with(&ids, FailureReason::Cancelled).await;
            return Ok(());
        }

        let files: Vec<CandidateFile> = ids
            .iter()
            .filter_map(|id| self.sources.get(id).cloned())
            .collect();
        if files.len() != ids.len() {
            tracing::error!(
                expected = ids.len(),
                got = files.len(),
                "source payloads missing at dispatch"
            );
            self.settle_with(
                &ids,
                FailureReason::ContractViolation("source payload missing".to_string()),
            )
            .await;
            return Ok(());
        }

        let (progress_tx, mut progress_rx) = mpsc::channel::<u8>(32);
        let transport = Arc::clone(&self.transport);
        let destination = self.destination_path.clone();
        let options = self.options.clone();
        let cancel = self.cancel.clone();
        let mut call = tokio::spawn(async move {
            transport
                .send_batch(&files, &destination, &options, progress_tx, cancel)
                .await
        });

        // Single-writer loop: progress events mutate items here, never in the
        // transport task. The channel closing means the call is wrapping up.
        let result = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    call.abort();
                    break None;
                }
                event = progress_rx.recv() => match event {
                    Some(percent) => {
                        self.fan_out_progress(&ids, percent);
                        self.emit_progress().await;
                    }
                    None => break Some((&mut call).await),
                },
            }
        };

        match result {
            None => {
                self.settle_with(&ids, FailureReason::Cancelled).await;
            }
            Some(Err(join_error)) => {
                tracing::error!(error = %join_error, "transport task failed");
                self.settle_with(
                    &ids,
                    FailureReason::ContractViolation(format!(
                        "transport task failed: {}",
                        join_error
                    )),
                )
                .await;
            }
            Some(Ok(Err(TransportError::Cancelled))) => {
                self.settle_with(&ids, FailureReason::Cancelled).await;
            }
            Some(Ok(Err(error))) => {
                if matches!(error, TransportError::ContractViolation(_)) {
                    tracing::error!(%error, "transport contract breach");
                }
                let reason = FailureReason::from(&error);
                self.settle_with(&ids, reason).await;
            }
            Some(Ok(Ok(outcomes))) => {
                if self.cancel.is_cancelled() {
                    self.settle_with(&ids, FailureReason::Cancelled).await;
                } else if outcomes.len() != ids.len() {
                    tracing::error!(
                        expected = ids.len(),
                        got = outcomes.len(),
                        "transport returned a result list of the wrong length"
                    );
                    self.settle_with(
                        &ids,
                        FailureReason::ContractViolation(format!(
                            "expected {} outcomes, got {}",
                            ids.len(),
                            outcomes.len()
                        )),
                    )
                    .await;
                } else {
                    for (id, outcome) in ids.iter().zip(outcomes) {
                        let item = self
                            .session
                            .get_mut(*id)
                            .ok_or(SessionError::UnknownItem(*id))?;
                        match outcome {
                            Ok(asset) => {
                                item.complete(asset)?;
                                self.sources.remove(id);
                            }
                            Err(reason) => item.fail(reason)?,
                        }
                    }
                    self.emit_progress().await;
                    self.emit_urls().await;
                }
            }
        }

        Ok(())
    }

    /// Settle every still-uploading item in `ids` with `reason`, then emit a
    /// snapshot and the reconciled URL list.
    async fn settle_with(&mut self, ids: &[Uuid], reason: FailureReason) {
        for id in ids {
            if let Some(item) = self.session.get_mut(*id) {
                if item.state == ItemState::Uploading {
                    let _ = item.fail(reason.clone());
                }
            }
        }
        self.emit_progress().await;
        self.emit_urls().await;
    }

    /// Redistribute a batch-level percentage to the in-flight items,
    /// size-weighted in submission order: the reported fraction of the
    /// batch's total bytes fills items front to back. Per-item progress is
    /// clamped monotone, so reordered telemetry cannot move a bar backwards.
    fn fan_out_progress(&mut self, ids: &[Uuid], percent: u8) {
        let percent = percent.min(100) as u64;
        let total: u64 = ids
            .iter()
            .filter_map(|id| self.session.get(*id))
            .map(|item| item.source_size)
            .sum();

        if total == 0 {
            for id in ids {
                if let Some(item) = self.session.get_mut(*id) {
                    item.observe_progress(percent as u8);
                }
            }
            return;
        }

        let mut remaining = total * percent / 100;
        for id in ids {
            let Some(item) = self.session.get_mut(*id) else {
                continue;
            };
            let size = item.source_size.max(1);
            let filled = remaining.min(size);
            item.observe_progress(((filled * 100) / size) as u8);
            remaining -= filled;
        }
    }

    async fn emit_progress(&self) {
        self.observer
            .on_batch_progress(&self.session.snapshot())
            .await;
    }

    async fn emit_urls(&self) {
        self.observer
            .on_uploaded_urls_changed(&self.session.uploaded_urls())
            .await;
    }
}

impl Drop for BatchUploader {
    // The preview store's own drop sweeps any handles still live.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
