//! Kemia Uploader
//!
//! Client-side orchestration of batch asset uploads: validation, local
//! previews, dispatch through a [`Transport`](kemia_api_client::Transport),
//! progress fan-in/fan-out, retry of failed items, and resource cleanup on
//! teardown. A [`BatchUploader`] owns its session exclusively; all mutation
//! funnels through its entry points.

pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod preview;
pub mod session;

pub use error::UploaderError;
pub use observer::{NoOpObserver, UploadObserver};
pub use orchestrator::{BatchUploader, SubmitReport};
pub use preview::{PreviewError, PreviewStore};
pub use session::BatchSession;
