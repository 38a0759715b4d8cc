//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, limits, timeouts, headers)
//! - Serve plain HTTP or TLS on a bound listener
//! - Apply configuration reloads to the shared relay context

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::{DefaultBodyLimit, Request},
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::{timeout::TimeoutLayer, ServiceBuilder};
use tower_http::trace::TraceLayer;

use crate::auth::handlers as auth;
use crate::config::RelayConfig;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::site;
use crate::http::state::{AppState, ContextError, RelayContext};
use crate::lifecycle::shutdown;
use crate::net::load_tls_config;
use crate::observability::metrics;
use crate::security::{self, cors_layer, limit_in_flight, InFlightLimiter};
use crate::upload::handler as upload;

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, ContextError> {
        let state = AppState::new(RelayContext::from_config(config.clone())?);
        let router = Self::build_router(&config, state.clone());

        Ok(Self {
            router,
            state,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let limiter = InFlightLimiter::new(config.listener.max_in_flight_requests);

        let router = Router::new()
            .route("/", get(site::index))
            .route("/health", get(site::health))
            .route("/api/auth/login", get(auth::login))
            .route("/api/auth/callback", post(auth::callback))
            .route("/api/auth/me", get(auth::me))
            .route("/api/auth/logout", post(auth::logout))
            .route("/upload", post(upload::upload))
            .fallback(site::not_found)
            .method_not_allowed_fallback(site::method_not_allowed)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.uploads.max_body_size))
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(middleware::from_fn_with_state(limiter, limit_in_flight));

        let router = security::headers::apply(router, &config.security);
        let router = match cors_layer(&config.cors) {
            Some(cors) => router.layer(cors),
            None => router,
        };

        // The query string is left out of the span: OAuth callbacks carry codes in it.
        router.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = request.headers().request_id().unwrap_or("-"),
                    )
                }))
                .layer(propagate_request_id_layer())
                .layer(HandleErrorLayer::new(site::request_failed))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.timeouts.request_secs,
                ))),
        )
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let Self {
            router,
            state,
            config,
        } = self;
        let addr = listener.local_addr()?;
        let tls_config = match &config.listener.tls {
            Some(tls) => Some(load_tls_config(tls).await?),
            None => None,
        };

        let reload = tokio::spawn(async move {
            while let Some(next) = config_updates.recv().await {
                apply_reload(&state, next);
            }
        });

        let result = match tls_config {
            Some(tls_config) => {
                let handle = axum_server::Handle::new();
                let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);

                let trigger = handle.clone();
                tokio::spawn(async move {
                    shutdown::wait(shutdown).await;
                    trigger.graceful_shutdown(Some(grace));
                });

                tracing::info!(address = %addr, "HTTPS server starting");
                axum_server::from_tcp_rustls(listener.into_std()?, tls_config)
                    .handle(handle)
                    .serve(router.into_make_service())
                    .await
            }
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, router.into_make_service())
                    .with_graceful_shutdown(shutdown::wait(shutdown))
                    .await
            }
        };

        reload.abort();
        tracing::info!("HTTP server stopped");
        result
    }

    /// Shared state, for swapping the relay context.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}

/// Swap in a context built from `config`, keeping the current one on failure.
///
/// Listener, limits and middleware keep their startup values.
fn apply_reload(state: &AppState, config: RelayConfig) {
    match RelayContext::from_config(config) {
        Ok(context) => {
            let downstream = context.downstream.base_url().to_string();
            state.replace(context);
            tracing::info!(downstream = %downstream, "Relay context reloaded");
        }
        Err(e) => {
            tracing::error!(error = %e, "Rejected config reload, keeping current context");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use futures_util::{stream, StreamExt};
    use tower::ServiceExt;

    fn server(dir: &std::path::Path) -> HttpServer {
        let mut config = RelayConfig::default();
        config.uploads.temp_dir = Some(dir.to_path_buf());
        config.downstream.base_url = "http://127.0.0.1:9".into();
        HttpServer::new(config).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok_with_request_id_and_security_headers() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .router()
            .oneshot(HttpRequest::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn client_request_id_is_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .router()
            .oneshot(
                HttpRequest::get("/health")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn unknown_route_is_json_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .router()
            .oneshot(HttpRequest::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Not found" })
        );
    }

    #[tokio::test]
    async fn index_serves_html() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .router()
            .oneshot(HttpRequest::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }

    #[tokio::test]
    async fn upload_without_multipart_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .router()
            .oneshot(
                HttpRequest::post("/upload")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "No file uploaded" })
        );
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RelayConfig::default();
        config.uploads.temp_dir = Some(dir.path().to_path_buf());
        config.uploads.max_body_size = 1024;
        let server = HttpServer::new(config).unwrap();

        let body = format!(
            "--XBOUNDARY\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"big.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {}\r\n--XBOUNDARY--\r\n",
            "x".repeat(8 * 1024)
        );
        let response = server
            .router()
            .oneshot(
                HttpRequest::post("/upload")
                    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let response = server(dir.path())
            .router()
            .oneshot(HttpRequest::get("/upload").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Method not allowed" })
        );
    }

    #[tokio::test]
    async fn stalled_upload_times_out_with_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RelayConfig::default();
        config.uploads.temp_dir = Some(dir.path().to_path_buf());
        config.timeouts.request_secs = 1;
        let server = HttpServer::new(config).unwrap();

        let head = axum::body::Bytes::from_static(
            b"--XBOUNDARY\r\n\
              Content-Disposition: form-data; name=\"file\"; filename=\"slow.bin\"\r\n\
              Content-Type: application/octet-stream\r\n\r\n\
              partial contents",
        );
        let stalled = stream::once(async move { Ok::<_, std::io::Error>(head) })
            .chain(stream::pending());

        let response = server
            .router()
            .oneshot(
                HttpRequest::post("/upload")
                    .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
                    .body(Body::from_stream(stalled))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Request timed out" })
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn oversized_callback_body_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RelayConfig::default();
        config.uploads.temp_dir = Some(dir.path().to_path_buf());
        config.uploads.max_body_size = 1024;
        let server = HttpServer::new(config).unwrap();

        let response = server
            .router()
            .oneshot(
                HttpRequest::post("/api/auth/callback")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!("{{\"code\":\"{}\"}}", "x".repeat(8 * 1024))))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Request body is too large" })
        );
    }

    #[test]
    fn reload_swaps_downstream_and_rejects_broken_config() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let mut next = server.config().clone();
        next.downstream.base_url = "http://analysis:9000".into();
        apply_reload(server.state(), next);
        assert_eq!(
            server.state().context().downstream.base_url().as_str(),
            "http://analysis:9000/"
        );

        let mut broken = server.config().clone();
        broken.site.index_path = Some(dir.path().join("missing.html"));
        apply_reload(server.state(), broken);
        assert_eq!(
            server.state().context().downstream.base_url().as_str(),
            "http://analysis:9000/"
        );
    }
}
