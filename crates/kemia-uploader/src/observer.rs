//! Caller-facing callback surface.
//!
//! The UI layer implements this trait to receive progress snapshots and the
//! reconciled list of uploaded URLs. Methods default to no-ops so observers
//! implement only what they need.

use async_trait::async_trait;

use kemia_core::BatchProgress;

#[async_trait]
pub trait UploadObserver: Send + Sync {
    /// Invoked on every state change with a recomputed batch snapshot.
    async fn on_batch_progress(&self, _progress: &BatchProgress) {}

    /// Invoked at each settle (and after removals of uploaded items) with the
    /// full ordered list of uploaded URLs.
    async fn on_uploaded_urls_changed(&self, _urls: &[String]) {}
}

/// No-op implementation for callers that poll snapshots instead.
pub struct NoOpObserver;

#[async_trait]
impl UploadObserver for NoOpObserver {}
