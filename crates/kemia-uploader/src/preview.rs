//! Local preview spool.
//!
//! Accepted files are written to a spool directory so the UI can render them
//! before and while they are persisted remotely. Handles are exclusively
//! owned: two acquisitions for the same source yield independent handles, and
//! release happens exactly once per handle. A double release is a no-op but
//! is logged, since it points at a bookkeeping bug in the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use kemia_core::PreviewHandle;

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Failed to create preview directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Spool-directory preview store.
pub struct PreviewStore {
    root: PathBuf,
    live: HashMap<Uuid, PathBuf>,
}

impl PreviewStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, PreviewError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| PreviewError::CreateDir(root.clone(), e))?;
        Ok(Self {
            root,
            live: HashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Spool `data` and return a fresh handle. The file name only contributes
    /// its extension; the on-disk name is the handle id, so keys can never
    /// traverse outside the spool directory.
    pub async fn acquire(
        &mut self,
        file_name: &str,
        data: &[u8],
    ) -> Result<PreviewHandle, PreviewError> {
        let id = Uuid::new_v4();
        let extension = sanitize_extension(file_name);
        let path = self.root.join(format!("{}.{}", id, extension));
        fs::write(&path, data).await?;
        self.live.insert(id, path.clone());
        Ok(PreviewHandle { id, path })
    }

    /// Release a handle and delete its spool file. Releasing an already
    /// released handle is a no-op.
    pub async fn release(&mut self, handle: &PreviewHandle) {
        if self.live.remove(&handle.id).is_none() {
            tracing::warn!(preview_id = %handle.id, "double release of preview handle");
            return;
        }
        if let Err(e) = fs::remove_file(&handle.path).await {
            tracing::warn!(
                path = %handle.path.display(),
                error = %e,
                "failed to remove preview file"
            );
        }
    }

    /// Handles acquired and not yet released.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    /// Release every live handle. Used at session teardown.
    pub async fn release_all(&mut self) {
        for (_, path) in self.live.drain() {
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove preview file"
                );
            }
        }
    }
}

impl Drop for PreviewStore {
    // Backstop sweep if the owner is dropped without an explicit teardown.
    fn drop(&mut self) {
        for (id, path) in self.live.drain() {
            tracing::warn!(preview_id = %id, "preview handle leaked to store drop");
            let _ = std::fs::remove_file(&path);
        }
    }
}

fn sanitize_extension(file_name: &str) -> String {
    let extension: String = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect::<String>()
        .to_lowercase();
    if extension.is_empty() {
        "bin".to_string()
    } else {
        extension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_acquire_writes_and_release_deletes() {
        let dir = TempDir::new().unwrap();
        let mut store = PreviewStore::new(dir.path()).await.unwrap();

        let handle = store.acquire("a.png", b"payload").await.unwrap();
        assert!(handle.path.exists());
        assert_eq!(store.outstanding(), 1);

        store.release(&handle).await;
        assert!(!handle.path.exists());
        assert_eq!(store.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_same_source_yields_independent_handles() {
        let dir = TempDir::new().unwrap();
        let mut store = PreviewStore::new(dir.path()).await.unwrap();

        let first = store.acquire("a.png", b"payload").await.unwrap();
        let second = store.acquire("a.png", b"payload").await.unwrap();
        assert_ne!(first.id, second.id);
        assert_ne!(first.path, second.path);
        assert_eq!(store.outstanding(), 2);

        store.release(&first).await;
        assert!(second.path.exists());
    }

    #[tokio::test]
    async fn test_double_release_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut store = PreviewStore::new(dir.path()).await.unwrap();

        let handle = store.acquire("a.png", b"payload").await.unwrap();
        store.release(&handle).await;
        store.release(&handle).await;
        assert_eq!(store.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_release_all() {
        let dir = TempDir::new().unwrap();
        let mut store = PreviewStore::new(dir.path()).await.unwrap();

        let a = store.acquire("a.png", b"one").await.unwrap();
        let b = store.acquire("b.jpg", b"two").await.unwrap();
        store.release_all().await;
        assert_eq!(store.outstanding(), 0);
        assert!(!a.path.exists());
        assert!(!b.path.exists());
    }

    #[test]
    fn test_sanitize_extension() {
        assert_eq!(sanitize_extension("a.PNG"), "png");
        assert_eq!(sanitize_extension("noextension"), "bin");
        assert_eq!(sanitize_extension("weird.p/../ng"), "bin");
        assert_eq!(sanitize_extension("a.j$p(g"), "jpg");
    }
}
