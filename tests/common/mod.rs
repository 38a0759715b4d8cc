//! Shared utilities for integration tests.

use std::path::PathBuf;

use reqwest::multipart::{Form, Part};
use tempfile::TempDir;
use tokio::sync::mpsc;
use upload_relay::config::RelayConfig;
use upload_relay::http::HttpServer;
use upload_relay::lifecycle::Shutdown;
use wiremock::MockServer;

/// A relay running on an ephemeral port in front of a mock downstream API.
pub struct TestRelay {
    pub base_url: String,
    pub downstream: MockServer,
    pub client: reqwest::Client,
    upload_dir: TempDir,
    shutdown: Shutdown,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Files currently left in the transient upload directory.
    #[allow(dead_code)]
    pub fn leftover_artifacts(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.upload_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a relay pointed at a fresh mock downstream.
pub async fn start_relay() -> TestRelay {
    start_relay_with(|_| {}).await
}

/// Start a relay, letting the caller adjust its config first.
#[allow(dead_code)]
pub async fn start_relay_with(customize: impl FnOnce(&mut RelayConfig)) -> TestRelay {
    let downstream = MockServer::start().await;
    let upload_dir = tempfile::tempdir().unwrap();

    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.downstream.base_url = downstream.uri();
    config.downstream.request_timeout_secs = 5;
    config.timeouts.request_secs = 10;
    config.uploads.temp_dir = Some(upload_dir.path().to_path_buf());
    customize(&mut config);

    let server = HttpServer::new(config).unwrap();
    let listener = upload_relay::net::bind(&server.config().listener)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (_updates_tx, updates) = mpsc::unbounded_channel();
    tokio::spawn(server.run(listener, updates, shutdown.subscribe()));

    TestRelay {
        base_url: format!("http://{addr}"),
        downstream,
        client: reqwest::Client::new(),
        upload_dir,
        shutdown,
    }
}

/// A multipart form carrying one file under `file`.
#[allow(dead_code)]
pub fn file_form(name: &str, mime: &str, contents: &[u8]) -> Form {
    Form::new().part(
        "file",
        Part::bytes(contents.to_vec())
            .file_name(name.to_owned())
            .mime_str(mime)
            .unwrap(),
    )
}
