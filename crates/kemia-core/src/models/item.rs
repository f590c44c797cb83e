//! Upload item: one file's journey through validation, preview, transfer, and
//! settlement, with the state machine enforced at the type level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{FailureReason, SessionError};
use crate::models::RemoteAsset;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    Pending,
    Uploading,
    Uploaded,
    Failed,
}

impl ItemState {
    /// Terminal states for a settling sweep.
    pub fn is_settled(&self) -> bool {
        matches!(self, ItemState::Uploaded | ItemState::Failed)
    }
}

impl Display for ItemState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ItemState::Pending => write!(f, "pending"),
            ItemState::Uploading => write!(f, "uploading"),
            ItemState::Uploaded => write!(f, "uploaded"),
            ItemState::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ItemState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemState::Pending),
            "uploading" => Ok(ItemState::Uploading),
            "uploaded" => Ok(ItemState::Uploaded),
            "failed" => Ok(ItemState::Failed),
            _ => Err(anyhow::anyhow!("Invalid item state: {}", s)),
        }
    }
}

/// Locally-addressable preview reference for rendering a file before/while it
/// is persisted remotely. Data only; the preview store owns the file on disk
/// and release bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHandle {
    pub id: Uuid,
    pub path: PathBuf,
}

/// One upload item. Exactly one of {remote set, failure set, neither} holds,
/// keyed to `state`; the transition methods preserve that invariant.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub id: Uuid,
    pub source_name: String,
    pub source_size: u64,
    pub source_content_type: String,
    pub state: ItemState,
    /// 0-100, monotonically non-decreasing while uploading.
    pub progress: u8,
    pub remote: Option<RemoteAsset>,
    pub failure: Option<FailureReason>,
    pub preview: Option<PreviewHandle>,
    pub accepted_at: DateTime<Utc>,
}

impl UploadItem {
    pub fn new(
        source_name: impl Into<String>,
        source_size: u64,
        source_content_type: impl Into<String>,
        preview: Option<PreviewHandle>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_name: source_name.into(),
            source_size,
            source_content_type: source_content_type.into(),
            state: ItemState::Pending,
            progress: 0,
            remote: None,
            failure: None,
            preview,
            accepted_at: Utc::now(),
        }
    }

    fn illegal(&self, to: ItemState) -> SessionError {
        SessionError::IllegalTransition {
            id: self.id,
            from: self.state,
            to,
        }
    }

    /// Pending -> Uploading, on orchestrator dispatch.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            ItemState::Pending => {
                self.state = ItemState::Uploading;
                Ok(())
            }
            _ => Err(self.illegal(ItemState::Uploading)),
        }
    }

    /// Uploading -> Uploaded, on a successful per-position outcome.
    pub fn complete(&mut self, asset: RemoteAsset) -> Result<(), SessionError> {
        match self.state {
            ItemState::Uploading => {
                self.state = ItemState::Uploaded;
                self.progress = 100;
                self.remote = Some(asset);
                self.failure = None;
                Ok(())
            }
            _ => Err(self.illegal(ItemState::Uploaded)),
        }
    }

    /// Uploading -> Failed, on a per-position error or a whole-call failure.
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), SessionError> {
        match self.state {
            ItemState::Uploading => {
                self.state = ItemState::Failed;
                self.remote = None;
                self.failure = Some(reason);
                Ok(())
            }
            _ => Err(self.illegal(ItemState::Failed)),
        }
    }

    /// Failed -> Uploading, only on an explicit retry. Progress resets and the
    /// failure reason clears.
    pub fn reset_for_retry(&mut self) -> Result<(), SessionError> {
        match self.state {
            ItemState::Failed => {
                self.state = ItemState::Uploading;
                self.progress = 0;
                self.failure = None;
                Ok(())
            }
            _ => Err(self.illegal(ItemState::Uploading)),
        }
    }

    /// Record a progress observation. Only meaningful while uploading; clamped
    /// to 100 and monotone, so out-of-order telemetry cannot move a bar backwards.
    pub fn observe_progress(&mut self, percent: u8) {
        if self.state == ItemState::Uploading {
            self.progress = self.progress.max(percent.min(100));
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    /// State/field consistency check used by tests and debug assertions.
    pub fn invariant_holds(&self) -> bool {
        match self.state {
            ItemState::Uploaded => self.remote.is_some() && self.failure.is_none(),
            ItemState::Failed => self.remote.is_none() && self.failure.is_some(),
            ItemState::Pending | ItemState::Uploading => {
                self.remote.is_none() && self.failure.is_none()
            }
        }
    }
}
