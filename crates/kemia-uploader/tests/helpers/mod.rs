//! Test helpers: scripted mock transport, recording observer, and fixtures.
//!
//! Run from workspace root: `cargo test -p kemia-uploader`.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use kemia_api_client::{BatchOutcomes, ProgressSender, Transport, UploadOptions};
use kemia_core::{
    BatchProgress, CandidateFile, FailureReason, RemoteAsset, TransportError, UploadPolicy,
};
use kemia_uploader::{BatchUploader, PreviewStore, UploadObserver};

/// One scripted transport response, consumed per logical call.
pub enum MockCall {
    /// Succeed every position with `https://cdn.test/{file_name}`.
    SucceedAll,
    /// Explicit per-position outcomes (`Ok(url)` or `Err(reason)`).
    Outcomes(Vec<Result<String, FailureReason>>),
    /// Whole-call connection failure: no outcomes produced.
    NetworkFail(String),
    /// Whole-call server rejection.
    Reject { status: u16, message: String },
    /// Violate the contract: return an empty result list.
    ShortOutcomes,
    /// Block until the cancellation token fires, then report cancelled.
    HangUntilCancelled,
}

pub struct MockTransport {
    script: Mutex<VecDeque<MockCall>>,
    /// File names of each logical call, in submission order.
    calls: Mutex<Vec<Vec<String>>>,
    /// Progress percentages emitted before each call completes.
    progress_steps: Vec<u8>,
}

impl MockTransport {
    pub fn new(script: Vec<MockCall>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            progress_steps: Vec::new(),
        }
    }

    pub fn with_progress(mut self, steps: Vec<u8>) -> Self {
        self.progress_steps = steps;
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_batch(
        &self,
        files: &[CandidateFile],
        _destination_path: &str,
        _options: &UploadOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<BatchOutcomes, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(files.iter().map(|f| f.file_name.clone()).collect());

        let call = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more times than scripted");

        for step in &self.progress_steps {
            let _ = progress.send(*step).await;
        }

        match call {
            MockCall::SucceedAll => Ok(files
                .iter()
                .map(|f| Ok(RemoteAsset::new(format!("https://cdn.test/{}", f.file_name))))
                .collect()),
            MockCall::Outcomes(list) => {
                Ok(list.into_iter().map(|r| r.map(RemoteAsset::new)).collect())
            }
            MockCall::NetworkFail(message) => Err(TransportError::Network(message)),
            MockCall::Reject { status, message } => {
                Err(TransportError::ServerRejected { status, message })
            }
            MockCall::ShortOutcomes => Ok(Vec::new()),
            MockCall::HangUntilCancelled => {
                cancel.cancelled().await;
                Err(TransportError::Cancelled)
            }
        }
    }
}

/// Observer that records every callback for later assertions.
#[derive(Default)]
pub struct RecordingObserver {
    pub progress_events: Mutex<Vec<BatchProgress>>,
    pub url_events: Mutex<Vec<Vec<String>>>,
}

impl RecordingObserver {
    pub fn progress_events(&self) -> Vec<BatchProgress> {
        self.progress_events.lock().unwrap().clone()
    }

    pub fn url_events(&self) -> Vec<Vec<String>> {
        self.url_events.lock().unwrap().clone()
    }

    /// Assert the aggregate recomputation law on every recorded snapshot:
    /// overall is exactly the floored mean of the per-file percentages.
    pub fn assert_aggregate_law(&self) {
        for snapshot in self.progress_events() {
            if snapshot.per_file.is_empty() {
                assert_eq!(snapshot.overall_percent, 0);
                continue;
            }
            let sum: u32 = snapshot.per_file.iter().map(|p| p.percent as u32).sum();
            assert_eq!(
                snapshot.overall_percent as u32,
                sum / snapshot.per_file.len() as u32,
                "aggregate progress must be recomputed from item state"
            );
        }
    }
}

#[async_trait]
impl UploadObserver for RecordingObserver {
    async fn on_batch_progress(&self, progress: &BatchProgress) {
        self.progress_events.lock().unwrap().push(progress.clone());
    }

    async fn on_uploaded_urls_changed(&self, urls: &[String]) {
        self.url_events.lock().unwrap().push(urls.to_vec());
    }
}

/// A valid PNG candidate of the given payload size.
pub fn png(name: &str, size: usize) -> CandidateFile {
    CandidateFile::new(name, "image/png", vec![0xABu8; size])
}

/// Build an uploader over a scripted transport and a temp preview spool.
/// The `TempDir` must stay alive for the duration of the test.
pub async fn build_uploader(
    transport: Arc<MockTransport>,
    capacity: usize,
) -> (BatchUploader, Arc<RecordingObserver>, TempDir) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let dir = TempDir::new().unwrap();
    let previews = PreviewStore::new(dir.path()).await.unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let policy = UploadPolicy {
        capacity,
        ..UploadPolicy::default()
    };
    let uploader = BatchUploader::new(
        transport,
        previews,
        policy,
        "media/products",
        observer.clone(),
    );
    (uploader, observer, dir)
}
