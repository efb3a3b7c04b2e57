//! Local destination for delivered notes.
//!
//! Paths handed to a [`LocalStore`] are relative to its vault root.

use crate::error::LocalStoreError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub type LocalStoreResult<T> = Result<T, LocalStoreError>;

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Creates `folder` (and parents) if missing. Calling it again is a no-op.
    async fn ensure_folder(&self, folder: &Path) -> LocalStoreResult<()>;

    async fn exists(&self, path: &Path) -> LocalStoreResult<bool>;

    /// Creates a new file with `content`. Fails with
    /// [`LocalStoreError::AlreadyExists`] rather than overwriting.
    async fn create_file(&self, path: &Path, content: &str) -> LocalStoreResult<()>;
}

/// [`LocalStore`] backed by a directory on disk.
#[derive(Clone, Debug)]
pub struct FsLocalStore {
    root: PathBuf,
}

impl FsLocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

fn io_error(path: PathBuf) -> impl FnOnce(std::io::Error) -> LocalStoreError {
    move |source| LocalStoreError::Io { path, source }
}

#[async_trait]
impl LocalStore for FsLocalStore {
    async fn ensure_folder(&self, folder: &Path) -> LocalStoreResult<()> {
        let full = self.resolve(folder);
        if tokio::fs::try_exists(&full)
            .await
            .map_err(io_error(full.clone()))?
        {
            return Ok(());
        }
        debug!("creating folder {}", full.display());
        tokio::fs::create_dir_all(&full)
            .await
            .map_err(io_error(full))
    }

    async fn exists(&self, path: &Path) -> LocalStoreResult<bool> {
        let full = self.resolve(path);
        tokio::fs::try_exists(&full).await.map_err(io_error(full))
    }

    async fn create_file(&self, path: &Path, content: &str) -> LocalStoreResult<()> {
        let full = self.resolve(path);
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&full)
            .await
        {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(LocalStoreError::AlreadyExists(path.to_path_buf()));
            }
            Err(e) => return Err(LocalStoreError::Io { path: full, source: e }),
        };

        file.write_all(content.as_bytes())
            .await
            .map_err(io_error(full.clone()))?;
        file.flush().await.map_err(io_error(full.clone()))?;
        debug!("wrote {} bytes to {}", content.len(), full.display());
        Ok(())
    }
}
