//! Pass-through session credentials.
//!
//! The relay never parses or validates the token. It carries the complete
//! `Authorization` header value so it can be forwarded byte-for-byte.

use std::convert::Infallible;
use std::fmt;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderValue},
};

/// Opaque `Authorization` header value received from the browser.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(HeaderValue);

impl BearerToken {
    /// Wrap a header value, marking it sensitive so it is redacted by
    /// header-aware formatters.
    pub fn from_header_value(mut value: HeaderValue) -> Self {
        value.set_sensitive(true);
        Self(value)
    }

    /// The value to put on the outbound `Authorization` header.
    pub fn header_value(&self) -> &HeaderValue {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([redacted])")
    }
}

/// Extractor for the inbound `Authorization` header, if any.
///
/// Never rejects: a missing header simply means nothing is forwarded.
#[derive(Debug, Clone, Default)]
pub struct ForwardedAuth(pub Option<BearerToken>);

impl<S> FromRequestParts<S> for ForwardedAuth
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .headers
                .get(AUTHORIZATION)
                .cloned()
                .map(BearerToken::from_header_value),
        ))
    }
}
