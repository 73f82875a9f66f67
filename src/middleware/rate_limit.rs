use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{models::ClientIdentity, state::AppState};

/// Header consulted when the service sits behind a trusted proxy
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Derives the rate-limit identity for a request.
///
/// With `trust_forwarded_for`, the first `x-forwarded-for` entry wins. Otherwise
/// the peer IP from `ConnectInfo` is used, and requests without either share
/// the `unknown` identity.
pub fn client_identity(request: &Request, trust_forwarded_for: bool) -> ClientIdentity {
    if trust_forwarded_for {
        let forwarded = request
            .headers()
            .get(FORWARDED_FOR_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(forwarded) = forwarded {
            return ClientIdentity::new(forwarded);
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| ClientIdentity::new(addr.ip().to_string()))
        .unwrap_or_else(ClientIdentity::unknown)
}

/// Admission control. Rejected requests get the fixed 429 response and never
/// reach the inner service; admitted ones pass through untouched.
///
/// The identity is recorded on the enclosing request span as `client`.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let identity = client_identity(&request, state.trust_forwarded_for);
    tracing::Span::current().record("client", identity.as_str());

    match state.rate_limiter.consume(&identity).await {
        Ok(_) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}
