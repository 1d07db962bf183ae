use std::{
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_UPLOAD_DIR: &str = "/uploads";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Failed to create upload directory {path:?}: {source}")]
    StorageUnavailable { path: PathBuf, source: io::Error },
    #[error("Failed to write uploaded file to {path:?}: {source}")]
    StorageWriteFailed { path: PathBuf, source: io::Error },
}

/// A file received with a request. Empty when no bytes were sent.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct UploadedFile {
    pub original_filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UploadDirectory {
    path: PathBuf,
}

impl UploadDirectory {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the directory and its parents if missing, returning its absolute path.
    pub async fn ensure(&self) -> Result<PathBuf, UploadError> {
        let unavailable = |source| {
            error!(
                path = %self.path.display(),
                error = %source,
                "Failed to create upload directory"
            );
            UploadError::StorageUnavailable {
                path: self.path.clone(),
                source,
            }
        };

        fs::create_dir_all(&self.path).await.map_err(unavailable)?;
        fs::canonicalize(&self.path).await.map_err(unavailable)
    }

    /// Writes `file` under a fresh name and returns the absolute path it was stored at.
    pub async fn store(&self, file: &UploadedFile) -> Result<PathBuf, UploadError> {
        let destination = self
            .ensure()
            .await?
            .join(unique_file_name(&file.original_filename));
        info!(path = %destination.display(), "Saving uploaded file");

        if let Err(source) = fs::write(&destination, &file.bytes).await {
            error!(
                path = %destination.display(),
                error = %source,
                "Failed to save uploaded file"
            );
            return Err(UploadError::StorageWriteFailed {
                path: destination,
                source,
            });
        }

        Ok(destination)
    }
}

/// Deletes a previously stored upload if it is still on disk. Failures are only logged.
pub async fn remove_stored_file(path: &Path) {
    match fs::try_exists(path).await {
        Ok(true) => {
            if let Err(error) = fs::remove_file(path).await {
                warn!(path = %path.display(), %error, "Failed to delete uploaded file");
            }
        }
        Ok(false) => debug!(path = %path.display(), "Uploaded file already gone"),
        Err(error) => warn!(path = %path.display(), %error, "Could not check uploaded file"),
    }
}

/// `<uuid>_<name>`, keeping only the last path component of what the client sent.
fn unique_file_name(original_filename: &str) -> String {
    let name = Path::new(original_filename)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or_default();

    format!("{}_{name}", Uuid::new_v4())
}
