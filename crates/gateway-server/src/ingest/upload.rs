//! Temporary files holding uploaded request bodies

use std::path::{Path, PathBuf};
use tokio::fs::File;
use tracing::{debug, warn};
use uuid::Uuid;

/// An uploaded file on local disk, deleted exactly once.
///
/// [`UploadedFile::cleanup`] removes the file asynchronously. A value dropped
/// without cleanup (a cancelled request, a panicking handler) removes it
/// synchronously in `Drop` instead.
#[derive(Debug)]
pub struct UploadedFile {
    path: PathBuf,
    removed: bool,
}

impl UploadedFile {
    /// Take ownership of an existing file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            removed: false,
        }
    }

    /// Create an empty file with a random name inside `dir`
    pub async fn create(dir: &Path) -> std::io::Result<(Self, File)> {
        let path = dir.join(Uuid::new_v4().simple().to_string());
        let file = File::create(&path).await?;
        Ok((Self::new(path), file))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file. Failures are logged and otherwise ignored.
    pub async fn cleanup(mut self) {
        self.removed = true;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed temporary upload"),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove temporary upload"),
        }
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove abandoned upload");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_create_then_cleanup_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let (upload, mut file) = UploadedFile::create(dir.path()).await.unwrap();
        file.write_all(b"name,population\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let path = upload.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());

        upload.cleanup().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_drop_without_cleanup_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abandoned.csv");
        std::fs::write(&path, "name\nParis\n").unwrap();

        drop(UploadedFile::new(&path));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_cleanup_of_missing_file_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        UploadedFile::new(dir.path().join("never-written.csv")).cleanup().await;
    }
}
