//! Admin shared-secret middleware.
//!
//! Gates the admin routes behind a single configured secret, presented via
//! the `x-admin-key` header or the `admin_key` query parameter. Every
//! failure answers with the same generic 403 so callers cannot distinguish
//! a missing key from a wrong one.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app::AppState;
use crate::error::ApiError;

/// Middleware that requires the admin shared secret.
///
/// When no secret is configured the routes stay open outside production
/// deployments; in production an unset secret locks them entirely (the
/// config loader also rejects that combination at startup).
pub async fn require_admin_key(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let configured = state.config.security.admin_key.as_deref().unwrap_or("");

    if configured.is_empty() {
        if state.config.security.environment == "production" {
            warn!("Admin route called with no admin key configured in production");
            return forbidden();
        }
        return next.run(req).await;
    }

    let presented = presented_key(&req);
    match presented {
        Some(key) if shared::crypto::secrets_match(&key, configured) => next.run(req).await,
        _ => {
            warn!(path = %req.uri().path(), "Admin authentication failed");
            forbidden()
        }
    }
}

fn presented_key(req: &Request<Body>) -> Option<String> {
    if let Some(header) = req
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
    {
        return Some(header.to_string());
    }

    // Query values arrive percent-encoded; decode before comparing so a
    // secret with reserved characters works through either channel.
    let query = req.uri().query()?;
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .find(|(key, _)| key == "admin_key")
        .map(|(_, value)| value)
}

fn forbidden() -> Response {
    ApiError::Forbidden("Admin access denied".to_string()).into_response()
}
