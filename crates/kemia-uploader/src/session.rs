//! Batch session: the ordered, exclusively-owned collection of upload items.
//!
//! Insertion order is meaningful; it determines display order and the order
//! of the final URL list. Only the orchestrator mutates a session (single
//! writer); readers get recomputed snapshots.

use uuid::Uuid;

use kemia_core::{BatchProgress, ItemState, UploadItem};

#[derive(Default)]
pub struct BatchSession {
    items: Vec<UploadItem>,
}

impl BatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&UploadItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: Uuid) -> Option<&mut UploadItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub(crate) fn push(&mut self, item: UploadItem) {
        self.items.push(item);
    }

    pub(crate) fn remove(&mut self, id: Uuid) -> Option<UploadItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub(crate) fn drain(&mut self) -> Vec<UploadItem> {
        std::mem::take(&mut self.items)
    }

    pub fn ids_in_state(&self, state: ItemState) -> Vec<Uuid> {
        self.items
            .iter()
            .filter(|item| item.state == state)
            .map(|item| item.id)
            .collect()
    }

    pub fn has_in_flight(&self) -> bool {
        self.items
            .iter()
            .any(|item| item.state == ItemState::Uploading)
    }

    /// True when every item is terminal (uploaded or failed). An empty
    /// session counts as settled.
    pub fn is_settled(&self) -> bool {
        self.items.iter().all(|item| item.is_settled())
    }

    /// Remote URLs of all uploaded items, in insertion order.
    pub fn uploaded_urls(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|item| item.state == ItemState::Uploaded)
            .filter_map(|item| item.remote.as_ref().map(|asset| asset.url.clone()))
            .collect()
    }

    pub fn snapshot(&self) -> BatchProgress {
        BatchProgress::from_items(&self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kemia_core::{FailureReason, RemoteAsset};

    fn item(name: &str) -> UploadItem {
        UploadItem::new(name, 64, "image/png", None)
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut session = BatchSession::new();
        session.push(item("a.png"));
        session.push(item("b.png"));
        session.push(item("c.png"));

        let names: Vec<&str> = session
            .items()
            .iter()
            .map(|i| i.source_name.as_str())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_uploaded_urls_follow_insertion_order() {
        let mut session = BatchSession::new();
        session.push(item("a.png"));
        session.push(item("b.png"));
        let ids: Vec<Uuid> = session.items().iter().map(|i| i.id).collect();

        // Settle in reverse order; the URL list must still follow insertion order.
        for id in ids.iter().rev() {
            let entry = session.get_mut(*id).unwrap();
            entry.start().unwrap();
            entry
                .complete(RemoteAsset::new(format!(
                    "https://cdn.example/{}",
                    entry.source_name
                )))
                .unwrap();
        }

        assert_eq!(
            session.uploaded_urls(),
            vec![
                "https://cdn.example/a.png".to_string(),
                "https://cdn.example/b.png".to_string()
            ]
        );
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut session = BatchSession::new();
        session.push(item("a.png"));
        session.push(item("b.png"));
        session.push(item("c.png"));
        let middle = session.items()[1].id;

        let removed = session.remove(middle).unwrap();
        assert_eq!(removed.source_name, "b.png");
        let names: Vec<&str> = session
            .items()
            .iter()
            .map(|i| i.source_name.as_str())
            .collect();
        assert_eq!(names, vec!["a.png", "c.png"]);
    }

    #[test]
    fn test_settled_and_in_flight() {
        let mut session = BatchSession::new();
        assert!(session.is_settled());

        session.push(item("a.png"));
        assert!(!session.is_settled());
        assert!(!session.has_in_flight());

        let id = session.items()[0].id;
        session.get_mut(id).unwrap().start().unwrap();
        assert!(session.has_in_flight());

        session
            .get_mut(id)
            .unwrap()
            .fail(FailureReason::NetworkFailure("x".to_string()))
            .unwrap();
        assert!(session.is_settled());
        assert_eq!(session.ids_in_state(ItemState::Failed), vec![id]);
    }
}
