//! API middleware

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

use domain_workflow::ReviewerRef;

use crate::AppState;

/// Resolves the bearer token to the acting reviewer
///
/// The resolved [`ReviewerRef`] is stored in request extensions. A token that
/// is valid but names no reviewer id or no role is treated like a bad token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    else {
        warn!(uri = %request.uri(), "Request without bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let reviewer = crate::auth::validate_token(token, &state.config.jwt_secret)
        .and_then(|claims| claims.reviewer())
        .map_err(|e| {
            warn!(error = %e, "Rejected bearer token");
            StatusCode::UNAUTHORIZED
        })?;

    request.extensions_mut().insert(reviewer);
    Ok(next.run(request).await)
}

/// Logs each workflow call with the reviewer, role and outcome
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let reviewer = request.extensions().get::<ReviewerRef>().cloned();
    let started = Instant::now();

    let response = next.run(request).await;

    let (reviewer_id, role) = reviewer
        .map(|r| (r.id.to_string(), r.role.to_string()))
        .unwrap_or_default();
    info!(
        method = %method,
        uri = %uri,
        reviewer = %reviewer_id,
        role = %role,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        "Workflow API call"
    );

    response
}
