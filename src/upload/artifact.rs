//! Transient upload artifacts.
//!
//! # Responsibilities
//! - Receive the single file part of a multipart upload
//! - Persist it under a server-assigned unique name
//! - Remove it once the downstream call is over
//!
//! # Design Decisions
//! - Files are created with create-new semantics; concurrent uploads never share a path
//! - `UploadArtifact` removes its file on drop unless explicit removal succeeded,
//!   so early returns, panics and cancelled tasks cannot leak storage

use std::io;
use std::path::{Path, PathBuf};
use std::pin::pin;

use axum::{body::Bytes, extract::Multipart};
use futures_util::{Stream, StreamExt};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::http::response::RelayError;
use crate::observability::metrics;

pub const NO_FILE_UPLOADED: &str = "No file uploaded";
pub const MULTIPLE_FILES: &str = "Only one file may be uploaded per request";

/// Directory holding in-flight artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    field_name: String,
}

impl ArtifactStore {
    /// Create the store, making sure its directory exists.
    pub fn new(config: &UploadConfig) -> io::Result<Self> {
        let dir = config.resolved_temp_dir();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            field_name: config.field_name.clone(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Read the multipart body, persisting exactly one file part.
    ///
    /// Fields with other names and parts without a filename are skipped. A
    /// second file part rejects the request, and the first artifact is
    /// removed as it goes out of scope.
    pub async fn receive(&self, multipart: &mut Multipart) -> Result<UploadArtifact, RelayError> {
        let mut artifact: Option<UploadArtifact> = None;

        while let Some(field) = multipart.next_field().await? {
            if field.name() != Some(self.field_name.as_str()) {
                tracing::debug!(field = ?field.name(), "Skipping multipart field");
                continue;
            }
            // A part without a filename is a plain form value, not a file.
            let Some(file_name) = field
                .file_name()
                .filter(|name| !name.is_empty())
                .map(str::to_owned)
            else {
                tracing::debug!(field = %self.field_name, "Skipping part without a filename");
                continue;
            };
            if artifact.is_some() {
                return Err(RelayError::bad_request(MULTIPLE_FILES));
            }

            let content_type = field.content_type().map(str::to_owned);

            artifact = Some(self.persist(file_name, content_type, field).await?);
        }

        artifact.ok_or_else(|| RelayError::bad_request(NO_FILE_UPLOADED))
    }

    /// Write `chunks` to a fresh artifact file.
    pub async fn persist<S, E>(
        &self,
        file_name: String,
        content_type: Option<String>,
        chunks: S,
    ) -> Result<UploadArtifact, RelayError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        RelayError: From<E>,
    {
        let path = self.dir.join(format!("relay-{}.upload", Uuid::new_v4()));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;

        let mut artifact = UploadArtifact::new(path, file_name, content_type);
        let mut chunks = pin!(chunks);
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            artifact.len += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(
            path = ?artifact.path,
            size = artifact.len,
            "Upload artifact written"
        );
        Ok(artifact)
    }
}

/// One upload persisted for the lifetime of a single request.
#[derive(Debug)]
pub struct UploadArtifact {
    path: PathBuf,
    file_name: String,
    content_type: Option<String>,
    len: u64,
    removed: bool,
}

impl UploadArtifact {
    fn new(path: PathBuf, file_name: String, content_type: Option<String>) -> Self {
        metrics::artifact_created();
        Self {
            path,
            file_name,
            content_type,
            len: 0,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Client-supplied filename (untrusted).
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Client-declared content type (untrusted).
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Open the artifact for a streaming read.
    pub async fn open(&self) -> io::Result<File> {
        File::open(&self.path).await
    }

    /// Delete the file. An already missing file counts as removed.
    pub async fn remove(mut self) -> io::Result<()> {
        let result = match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        };
        self.removed = result.is_ok();
        if self.removed {
            metrics::artifact_released("removed");
        }
        result
    }
}

impl Drop for UploadArtifact {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = ?self.path, "Upload artifact removed on drop");
                metrics::artifact_released("dropped");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                metrics::artifact_released("dropped");
            }
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to remove upload artifact");
                metrics::artifact_released("leaked");
            }
        }
    }
}
