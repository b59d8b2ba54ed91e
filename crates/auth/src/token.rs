//! Token extraction helpers

use axum::extract::Query;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderValue, Uri};
use serde::Deserialize;

use crate::error::AuthError;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Extract bearer token from Authorization header
pub(crate) fn extract_bearer_token(header: &HeaderValue) -> Result<String, AuthError> {
    let header_str = header
        .to_str()
        .map_err(|_| AuthError::InvalidAuthorizationFormat)?;

    match header_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(AuthError::InvalidAuthorizationFormat),
    }
}

/// Extract `token` from the query string.
///
/// Browsers cannot set headers on a WebSocket upgrade, so the upgrade
/// route accepts the token here instead.
pub(crate) fn extract_query_token(uri: &Uri) -> Option<String> {
    let Query(query) = Query::<TokenQuery>::try_from_uri(uri).ok()?;
    query.token.filter(|value| !value.is_empty())
}

/// Header first, then the query string
pub(crate) fn request_token(parts: &Parts) -> Result<String, AuthError> {
    if let Some(header) = parts.headers.get(AUTHORIZATION) {
        return extract_bearer_token(header);
    }

    extract_query_token(&parts.uri).ok_or(AuthError::MissingAuthorization)
}
