//! Downstream replies and how they are relayed to the browser.

use axum::{
    body::Bytes,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::IgnoredAny;
use serde_json::Value;

use crate::downstream::DownstreamError;

/// Fields checked, in order, for a human-readable error message.
const MESSAGE_FIELDS: [&str; 3] = ["error", "detail", "message"];

/// Status and raw body of one downstream response.
#[derive(Debug, Clone)]
pub struct DownstreamReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl DownstreamReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Extract a message from an error payload such as `{"detail": "..."}`.
    ///
    /// Returns `None` when the body is not JSON or carries no non-empty
    /// string under any known field.
    pub fn error_message(&self) -> Option<String> {
        let value: Value = serde_json::from_slice(&self.body).ok()?;
        MESSAGE_FIELDS.iter().find_map(|field| {
            value
                .get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        })
    }

    /// Relay status and body verbatim. Fails if the body is not JSON.
    pub fn into_json_response(self) -> Result<Response, DownstreamError> {
        serde_json::from_slice::<IgnoredAny>(&self.body).map_err(|source| {
            DownstreamError::MalformedBody {
                status: self.status,
                source,
            }
        })?;

        Ok((
            self.status,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            self.body,
        )
            .into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &'static str) -> DownstreamReply {
        DownstreamReply {
            status: StatusCode::from_u16(status).unwrap(),
            body: Bytes::from_static(body.as_bytes()),
        }
    }

    #[test]
    fn extracts_fastapi_detail() {
        let r = reply(401, r#"{"detail":"Could not validate credentials"}"#);
        assert_eq!(r.error_message().as_deref(), Some("Could not validate credentials"));
    }

    #[test]
    fn prefers_error_field() {
        let r = reply(400, r#"{"message":"later","error":"first"}"#);
        assert_eq!(r.error_message().as_deref(), Some("first"));
    }

    #[test]
    fn ignores_non_string_and_non_json_payloads() {
        let validation = reply(422, r#"{"detail":[{"loc":["query","code"],"msg":"field required"}]}"#);
        assert_eq!(validation.error_message(), None);
        assert_eq!(reply(502, "<html>Bad Gateway</html>").error_message(), None);
        assert_eq!(reply(500, r#"{"error":"   "}"#).error_message(), None);
    }

    #[tokio::test]
    async fn relays_json_body_verbatim() {
        let body = r#"{"text": "TOTAL 12.50",  "usage": {}}"#;
        let response = reply(200, body).into_json_response().unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, body.as_bytes());
    }

    #[test]
    fn rejects_malformed_success_body() {
        let err = reply(200, "not json").into_json_response().unwrap_err();
        assert!(matches!(err, DownstreamError::MalformedBody { .. }));
    }
}
