//! Admin privileged endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use persistence::repositories::IdentityClaimRepository;

use crate::app::AppState;
use crate::error::ApiError;

/// Request body for setting an identity claim. Fields are optional so a
/// missing one maps to a 400 rather than a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetClaimRequest {
    pub uid: Option<String>,
    pub claim_key: Option<String>,
    pub claim_value: Option<serde_json::Value>,
}

/// Set a custom claim for an identity. Admin only.
///
/// POST /api/admin/set-claim
///
/// Setting the `admin` claim also rewrites the user's authoritative role,
/// so claim and role cannot diverge.
pub async fn set_claim(
    State(state): State<AppState>,
    Json(body): Json<SetClaimRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let uid = body
        .uid
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("uid is required".to_string()))?;
    let claim_key = body
        .claim_key
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("claimKey is required".to_string()))?;

    let claim_value = match &body.claim_value {
        None => "true".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    let repo = IdentityClaimRepository::new(state.pool.clone(), state.notifier.clone());
    let claim = repo.set_claim(uid, claim_key, &claim_value).await?;

    info!(
        uid = %claim.uid,
        claim_key = %claim.claim_key,
        "Identity claim set"
    );

    Ok(Json(json!({ "success": true })))
}
