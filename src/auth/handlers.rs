//! Auth proxy endpoints under `/api/auth`.
//!
//! Each endpoint maps to one downstream call with the same method. The raw
//! query string is forwarded on every route.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, RawQuery, State},
    http::{HeaderMap, Method},
    response::Response,
};

use crate::auth::{BearerToken, ForwardedAuth};
use crate::downstream::{ForwardRequest, Outbound};
use crate::http::request::RequestIdExt;
use crate::http::response::RelayError;
use crate::http::state::AppState;

/// Browser-facing auth operation and its downstream counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEndpoint {
    Login,
    Callback,
    Me,
    Logout,
}

impl AuthEndpoint {
    pub fn method(self) -> Method {
        match self {
            AuthEndpoint::Login | AuthEndpoint::Me => Method::GET,
            AuthEndpoint::Callback | AuthEndpoint::Logout => Method::POST,
        }
    }

    pub fn downstream_path(self) -> &'static str {
        match self {
            AuthEndpoint::Login => "/auth/login",
            AuthEndpoint::Callback => "/auth/callback",
            AuthEndpoint::Me => "/auth/me",
            AuthEndpoint::Logout => "/auth/logout",
        }
    }

    /// Whether the session token travels with this call.
    pub fn forwards_authorization(self) -> bool {
        matches!(self, AuthEndpoint::Me | AuthEndpoint::Logout)
    }

    /// Shown when the downstream gave no usable message.
    pub fn failure_message(self) -> &'static str {
        match self {
            AuthEndpoint::Login => "Failed to initiate login",
            AuthEndpoint::Callback => "Authentication failed",
            AuthEndpoint::Me => "Failed to get user info",
            AuthEndpoint::Logout => "Failed to logout",
        }
    }
}

/// `GET /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    proxy(&state, AuthEndpoint::Login, query, None, None, &headers).await
}

/// `POST /api/auth/callback`
pub async fn callback(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, RelayError> {
    let body = body?;
    let body = (!body.is_empty()).then_some(body);
    proxy(&state, AuthEndpoint::Callback, query, body, None, &headers).await
}

/// `GET /api/auth/me`
pub async fn me(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    ForwardedAuth(token): ForwardedAuth,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    proxy(&state, AuthEndpoint::Me, query, None, token, &headers).await
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    ForwardedAuth(token): ForwardedAuth,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    proxy(&state, AuthEndpoint::Logout, query, None, token, &headers).await
}

async fn proxy(
    state: &AppState,
    endpoint: AuthEndpoint,
    query: Option<String>,
    body: Option<Bytes>,
    token: Option<BearerToken>,
    headers: &HeaderMap,
) -> Result<Response, RelayError> {
    let context = state.context();
    let token = token.filter(|_| endpoint.forwards_authorization());
    let request_id = headers.request_id();

    let request = ForwardRequest {
        method: endpoint.method(),
        path: endpoint.downstream_path(),
        query,
        body,
    };
    let outbound = Outbound {
        token: token.as_ref(),
        request_id,
    };

    let reply = context
        .downstream
        .forward(request, outbound)
        .await
        .map_err(|e| RelayError::internal(endpoint.failure_message(), e))?;

    if reply.is_success() {
        return reply
            .into_json_response()
            .map_err(|e| RelayError::internal(endpoint.failure_message(), e));
    }

    let message = reply
        .error_message()
        .unwrap_or_else(|| endpoint.failure_message().to_string());
    Err(RelayError::Downstream {
        status: reply.status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_routes_forward_the_token() {
        assert!(!AuthEndpoint::Login.forwards_authorization());
        assert!(!AuthEndpoint::Callback.forwards_authorization());
        assert!(AuthEndpoint::Me.forwards_authorization());
        assert!(AuthEndpoint::Logout.forwards_authorization());
    }

    #[test]
    fn methods_match_downstream() {
        assert_eq!(AuthEndpoint::Login.method(), Method::GET);
        assert_eq!(AuthEndpoint::Callback.method(), Method::POST);
        assert_eq!(AuthEndpoint::Me.downstream_path(), "/auth/me");
        assert_eq!(AuthEndpoint::Logout.method(), Method::POST);
    }
}
