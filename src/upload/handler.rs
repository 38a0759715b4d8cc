//! `POST /upload`: relay one file to the downstream analysis endpoint.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::HeaderMap,
    response::Response,
};

use crate::auth::{BearerToken, ForwardedAuth};
use crate::downstream::Outbound;
use crate::http::request::RequestIdExt;
use crate::http::response::RelayError;
use crate::http::state::{AppState, RelayContext};
use crate::upload::artifact::{UploadArtifact, NO_FILE_UPLOADED};

pub const PROCESS_FAILED: &str = "Failed to process file";

/// Accept a multipart upload and relay it downstream.
///
/// The downstream call and the artifact cleanup run on their own task, so a
/// client disconnect (which drops this future) cannot interrupt them.
pub async fn upload(
    State(state): State<AppState>,
    ForwardedAuth(token): ForwardedAuth,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, RelayError> {
    let context = state.context();
    let request_id = headers.request_id().map(str::to_owned);

    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(request_id = ?request_id, error = %rejection, "Upload is not a multipart body");
        RelayError::bad_request(NO_FILE_UPLOADED)
    })?;

    let artifact = context.artifacts.receive(&mut multipart).await?;

    tracing::info!(
        request_id = ?request_id,
        file_name = %artifact.file_name(),
        size = artifact.len(),
        authorized = token.is_some(),
        "Upload received, relaying to downstream"
    );

    let relay = tokio::spawn(relay_artifact(context, artifact, token, request_id));
    match relay.await {
        Ok(result) => result,
        Err(e) => Err(RelayError::internal(PROCESS_FAILED, e)),
    }
}

async fn relay_artifact(
    context: Arc<RelayContext>,
    artifact: UploadArtifact,
    token: Option<BearerToken>,
    request_id: Option<String>,
) -> Result<Response, RelayError> {
    let outbound = Outbound {
        token: token.as_ref(),
        request_id: request_id.as_deref(),
    };
    let outcome = context.downstream.analyze(&artifact, outbound).await;

    if let Err(e) = artifact.remove().await {
        // The drop guard retries once more; the response is unaffected.
        tracing::warn!(request_id = ?request_id, error = %e, "Failed to remove upload artifact");
    }

    let reply = outcome.map_err(|e| RelayError::internal(PROCESS_FAILED, e))?;
    if !reply.is_success() {
        tracing::warn!(
            request_id = ?request_id,
            status = %reply.status,
            detail = ?reply.error_message(),
            "Downstream rejected upload"
        );
        return Err(RelayError::internal(
            PROCESS_FAILED,
            format!("downstream answered {}", reply.status),
        ));
    }

    reply
        .into_json_response()
        .map_err(|e| RelayError::internal(PROCESS_FAILED, e))
}
