//! HTTP client for the downstream API.
//!
//! Every call receives its credentials explicitly through [`Outbound`];
//! nothing is injected globally.

use std::time::{Duration, Instant};

use axum::{
    body::Bytes,
    http::{header, Method},
};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use tokio_util::io::ReaderStream;
use url::Url;

use crate::auth::BearerToken;
use crate::config::DownstreamConfig;
use crate::downstream::{DownstreamError, DownstreamReply};
use crate::http::request::X_REQUEST_ID;
use crate::observability::metrics;
use crate::resilience::with_deadline;
use crate::upload::UploadArtifact;

/// Downstream path accepting file uploads.
pub const ANALYZE_PATH: &str = "/analyze";
/// Multipart field name the downstream expects.
const ANALYZE_FIELD: &str = "file";
const OCTET_STREAM: &str = "application/octet-stream";

/// Per-call context carried onto the outbound request.
#[derive(Debug, Clone, Copy, Default)]
pub struct Outbound<'a> {
    pub token: Option<&'a BearerToken>,
    pub request_id: Option<&'a str>,
}

impl Outbound<'_> {
    fn apply(&self, mut builder: RequestBuilder) -> RequestBuilder {
        if let Some(token) = self.token {
            builder = builder.header(header::AUTHORIZATION, token.header_value().clone());
        }
        if let Some(id) = self.request_id {
            builder = builder.header(X_REQUEST_ID, id);
        }
        builder
    }
}

/// A request forwarded as-is apart from its target.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub path: &'static str,
    /// Raw query string, forwarded unchanged.
    pub query: Option<String>,
    /// JSON body bytes, forwarded unchanged.
    pub body: Option<Bytes>,
}

/// Client for the downstream identity/analysis API.
#[derive(Debug, Clone)]
pub struct DownstreamClient {
    http: reqwest::Client,
    base_url: Url,
    deadline: Duration,
}

impl DownstreamClient {
    pub fn new(config: &DownstreamConfig) -> Result<Self, DownstreamError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("upload-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(DownstreamError::Client)?;

        Ok(Self {
            http,
            base_url,
            deadline: Duration::from_secs(config.request_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a downstream path against the base URL, keeping any prefix.
    pub fn endpoint(&self, path: &str) -> Result<Url, DownstreamError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Forward a request with the same method, query and body.
    pub async fn forward(
        &self,
        request: ForwardRequest,
        outbound: Outbound<'_>,
    ) -> Result<DownstreamReply, DownstreamError> {
        let mut url = self.endpoint(request.path)?;
        url.set_query(request.query.as_deref());

        let mut builder = self.http.request(request.method, url);
        if let Some(body) = request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        self.execute(request.path, builder, outbound).await
    }

    /// Stream an upload artifact to the analysis endpoint.
    pub async fn analyze(
        &self,
        artifact: &UploadArtifact,
        outbound: Outbound<'_>,
    ) -> Result<DownstreamReply, DownstreamError> {
        let url = self.endpoint(ANALYZE_PATH)?;
        let form = Form::new().part(ANALYZE_FIELD, file_part(artifact).await?);

        tracing::debug!(
            request_id = ?outbound.request_id,
            file_name = %artifact.file_name(),
            size = artifact.len(),
            "Streaming artifact to downstream"
        );

        let builder = self.http.post(url).multipart(form);
        self.execute(ANALYZE_PATH, builder, outbound).await
    }

    async fn execute(
        &self,
        endpoint: &'static str,
        builder: RequestBuilder,
        outbound: Outbound<'_>,
    ) -> Result<DownstreamReply, DownstreamError> {
        let start = Instant::now();
        let builder = outbound.apply(builder);

        let result = match with_deadline(self.deadline, async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(DownstreamReply { status, body })
        })
        .await
        {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(DownstreamError::from_transport(e)),
            Err(deadline) => Err(DownstreamError::Timeout(deadline)),
        };

        let outcome = match &result {
            Ok(reply) if reply.is_success() => "success",
            Ok(_) => "error_status",
            Err(DownstreamError::Timeout(_)) => "timeout",
            Err(_) => "transport_error",
        };
        metrics::record_downstream(endpoint, outcome, start);

        match &result {
            Ok(reply) => tracing::debug!(
                request_id = ?outbound.request_id,
                endpoint,
                status = %reply.status,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Downstream replied"
            ),
            Err(e) => tracing::warn!(
                request_id = ?outbound.request_id,
                endpoint,
                error = %e,
                "Downstream call failed"
            ),
        }

        result
    }
}

/// Ensure the base path ends with `/` so joins append instead of replacing
/// the last segment.
fn normalize_base_url(raw: &str) -> Result<Url, DownstreamError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn stream_part(artifact: &UploadArtifact) -> Result<Part, DownstreamError> {
    let file = artifact.open().await.map_err(DownstreamError::Artifact)?;
    let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
    Ok(Part::stream_with_length(body, artifact.len()).file_name(artifact.file_name().to_owned()))
}

/// Build the outbound file part, keeping the declared content type when it
/// parses as a MIME type.
async fn file_part(artifact: &UploadArtifact) -> Result<Part, DownstreamError> {
    let declared = artifact.content_type().unwrap_or(OCTET_STREAM);
    match stream_part(artifact).await?.mime_str(declared) {
        Ok(part) => Ok(part),
        Err(_) => {
            tracing::debug!(content_type = %declared, "Unparseable content type, sending as octet-stream");
            stream_part(artifact)
                .await?
                .mime_str(OCTET_STREAM)
                .map_err(DownstreamError::Client)
        }
    }
}
