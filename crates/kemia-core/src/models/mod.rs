//! Domain models for the upload pipeline.

pub mod asset;
pub mod candidate;
pub mod item;
pub mod progress;

pub use asset::RemoteAsset;
pub use candidate::CandidateFile;
pub use item::{ItemState, PreviewHandle, UploadItem};
pub use progress::{BatchProgress, ItemError, ItemProgress};
