//! Shared handler state.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Bytes;

use crate::config::RelayConfig;
use crate::downstream::{DownstreamClient, DownstreamError};
use crate::upload::ArtifactStore;

const DEFAULT_INDEX_HTML: &str = include_str!("../../static/index.html");

/// Error building a relay context from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("downstream client: {0}")]
    Downstream(#[from] DownstreamError),

    #[error("upload directory {path:?}: {source}")]
    UploadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("entry page {path:?}: {source}")]
    IndexPage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a request needs, built from one configuration snapshot.
#[derive(Debug)]
pub struct RelayContext {
    pub config: RelayConfig,
    pub downstream: DownstreamClient,
    pub artifacts: ArtifactStore,
    pub index_html: Bytes,
}

impl RelayContext {
    pub fn from_config(config: RelayConfig) -> Result<Self, ContextError> {
        let downstream = DownstreamClient::new(&config.downstream)?;
        let artifacts =
            ArtifactStore::new(&config.uploads).map_err(|source| ContextError::UploadDir {
                path: config.uploads.resolved_temp_dir(),
                source,
            })?;
        let index_html = match &config.site.index_path {
            Some(path) => std::fs::read(path)
                .map(Bytes::from)
                .map_err(|source| ContextError::IndexPage {
                    path: path.clone(),
                    source,
                })?,
            None => Bytes::from_static(DEFAULT_INDEX_HTML.as_bytes()),
        };

        Ok(Self {
            config,
            downstream,
            artifacts,
            index_html,
        })
    }
}

/// Application state injected into handlers.
///
/// Handlers take one snapshot per request; reloads swap the whole context.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<ArcSwap<RelayContext>>,
}

impl AppState {
    pub fn new(context: RelayContext) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(context)),
        }
    }

    pub fn context(&self) -> Arc<RelayContext> {
        self.inner.load_full()
    }

    pub fn replace(&self, context: RelayContext) {
        self.inner.store(Arc::new(context));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> RelayConfig {
        let mut config = RelayConfig::default();
        config.uploads.temp_dir = Some(dir.join("artifacts"));
        config
    }

    #[test]
    fn builds_context_and_creates_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let context = RelayContext::from_config(config(dir.path())).unwrap();

        assert!(dir.path().join("artifacts").is_dir());
        assert!(context.index_html.starts_with(b"<!DOCTYPE html>"));
    }

    #[test]
    fn missing_index_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.site.index_path = Some(dir.path().join("missing.html"));

        assert!(matches!(
            RelayContext::from_config(config),
            Err(ContextError::IndexPage { .. })
        ));
    }

    #[test]
    fn replace_swaps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(RelayContext::from_config(config(dir.path())).unwrap());
        let before = state.context();

        let mut next = config(dir.path());
        next.downstream.base_url = "http://analysis:9000".into();
        state.replace(RelayContext::from_config(next).unwrap());

        assert_eq!(before.downstream.base_url().as_str(), "http://localhost:8000/");
        assert_eq!(
            state.context().downstream.base_url().as_str(),
            "http://analysis:9000/"
        );
    }
}
