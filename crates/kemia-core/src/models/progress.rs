//! Progress snapshots delivered to the caller on every state change.
//!
//! The aggregate is always recomputed from item state, never stored, so a
//! snapshot stays consistent however many physical transfers are in flight.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FailureReason;
use crate::models::{ItemState, UploadItem};

/// Progress of a single item within a batch snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub id: Uuid,
    pub file_name: String,
    pub state: ItemState,
    pub percent: u8,
}

/// Per-item error surfaced in a batch snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    pub id: Uuid,
    pub file_name: String,
    pub reason: FailureReason,
}

/// Aggregate batch progress for runtime and presentation consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub total_files: usize,
    pub completed_files: usize,
    /// `sum(item.percent) / total_files`, floored. 0 for an empty batch.
    pub overall_percent: u8,
    pub per_file: Vec<ItemProgress>,
    pub errors: Vec<ItemError>,
}

impl BatchProgress {
    /// Recompute the aggregate from item state.
    pub fn from_items(items: &[UploadItem]) -> Self {
        let per_file: Vec<ItemProgress> = items
            .iter()
            .map(|item| ItemProgress {
                id: item.id,
                file_name: item.source_name.clone(),
                state: item.state,
                percent: item.progress,
            })
            .collect();

        let errors: Vec<ItemError> = items
            .iter()
            .filter_map(|item| {
                item.failure.as_ref().map(|reason| ItemError {
                    id: item.id,
                    file_name: item.source_name.clone(),
                    reason: reason.clone(),
                })
            })
            .collect();

        let completed_files = items
            .iter()
            .filter(|item| item.state == ItemState::Uploaded)
            .count();

        let overall_percent = if items.is_empty() {
            0
        } else {
            let sum: u32 = items.iter().map(|item| item.progress as u32).sum();
            (sum / items.len() as u32) as u8
        };

        Self {
            total_files: items.len(),
            completed_files,
            overall_percent,
            per_file,
            errors,
        }
    }

    /// True when every item has reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.per_file.iter().all(|p| p.state.is_settled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteAsset;

    fn item(name: &str, size: u64) -> UploadItem {
        UploadItem::new(name, size, "image/png", None)
    }

    #[test]
    fn test_empty_batch_snapshot() {
        let snapshot = BatchProgress::from_items(&[]);
        assert_eq!(snapshot.total_files, 0);
        assert_eq!(snapshot.overall_percent, 0);
        assert!(snapshot.is_settled());
    }

    #[test]
    fn test_aggregate_is_sum_over_count() {
        let mut a = item("a.png", 100);
        let mut b = item("b.png", 100);
        a.start().unwrap();
        b.start().unwrap();
        a.observe_progress(100);
        b.observe_progress(50);

        let snapshot = BatchProgress::from_items(&[a, b]);
        assert_eq!(snapshot.overall_percent, 75);

        let sum: u32 = snapshot.per_file.iter().map(|p| p.percent as u32).sum();
        assert_eq!(
            snapshot.overall_percent as u32,
            sum / snapshot.per_file.len() as u32
        );
    }

    #[test]
    fn test_completed_counts_only_uploaded() {
        let mut a = item("a.png", 100);
        let mut b = item("b.png", 100);
        a.start().unwrap();
        a.complete(RemoteAsset::new("https://cdn.example/a.png"))
            .unwrap();
        b.start().unwrap();
        b.fail(FailureReason::NetworkFailure("x".to_string()))
            .unwrap();

        let snapshot = BatchProgress::from_items(&[a, b]);
        assert_eq!(snapshot.completed_files, 1);
        assert_eq!(snapshot.errors.len(), 1);
        assert!(snapshot.is_settled());
    }

    #[test]
    fn test_not_settled_while_uploading() {
        let mut a = item("a.png", 100);
        a.start().unwrap();
        let snapshot = BatchProgress::from_items(&[a]);
        assert!(!snapshot.is_settled());
    }
}
