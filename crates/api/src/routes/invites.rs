//! Invite routes: issuance, validation, redemption, and the audit listing.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use validator::Validate;

use domain::models::invite::{
    expiry_for, generate_invite_token, is_token_shaped, Invite, InviteError, SendInviteRequest,
    SendInviteResponse, ValidateInviteResponse,
};
use persistence::repositories::{InviteRepository, RedeemOutcome};

use crate::app::AppState;
use crate::error::ApiError;

/// Issue a new invite for an email address.
///
/// POST /api/invites/send
pub async fn send_invite(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<SendInviteResponse>, ApiError> {
    let request: SendInviteRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;
    request.validate()?;

    let repo = InviteRepository::new(state.pool.clone());

    let token = generate_invite_token();
    let created_at = Utc::now();
    let expires_at = expiry_for(created_at);

    let entity = repo
        .create(
            &token,
            &shared::validation::normalize_email(&request.email),
            Some(&request.full_name),
            request.request_id,
            created_at,
            expires_at,
        )
        .await?;

    let invite: Invite = entity.into();

    info!(
        token = %invite.token,
        email = %invite.email,
        expires_at = %invite.expires_at,
        "Invite issued"
    );

    let signup_link = signup_link(&state, &invite.token);
    Ok(Json(SendInviteResponse {
        invite,
        signup_link,
    }))
}

/// Validate an invite token without consuming it.
///
/// GET /api/invites/validate/:token
pub async fn validate_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    let invite = lookup_invite(&state, &token).await?;

    match domain::models::invite::classify_invite(invite.as_ref(), Utc::now()) {
        Ok(()) => Ok(Json(ValidateInviteResponse {
            valid: true,
            invite,
            error: None,
        })
        .into_response()),
        Err(err) => {
            let status = match err {
                InviteError::NotFound => StatusCode::NOT_FOUND,
                InviteError::Expired | InviteError::AlreadyUsed => StatusCode::BAD_REQUEST,
            };
            Ok((
                status,
                Json(ValidateInviteResponse {
                    valid: false,
                    invite: None,
                    error: Some(err.code().to_string()),
                }),
            )
                .into_response())
        }
    }
}

/// Redeem an invite, consuming its single use.
///
/// POST /api/invites/:token/redeem
pub async fn redeem_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, ApiError> {
    if !is_token_shaped(&token) {
        return Ok(invite_error_response(InviteError::NotFound));
    }

    let repo = InviteRepository::new(state.pool.clone());
    match repo.redeem(&token).await? {
        RedeemOutcome::Redeemed(entity) => {
            let invite: Invite = entity.into();
            info!(token = %invite.token, email = %invite.email, "Invite redeemed");
            Ok(Json(invite).into_response())
        }
        RedeemOutcome::NotFound => Ok(invite_error_response(InviteError::NotFound)),
        RedeemOutcome::Expired => Ok(invite_error_response(InviteError::Expired)),
        RedeemOutcome::AlreadyUsed => Ok(invite_error_response(InviteError::AlreadyUsed)),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListInvitesQuery {
    #[serde(default = "default_include_used")]
    pub include_used: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_include_used() -> bool {
    true
}
fn default_limit() -> i64 {
    50
}

/// List invites for auditing. Admin only.
///
/// GET /api/invites
pub async fn list_invites(
    State(state): State<AppState>,
    Query(query): Query<ListInvitesQuery>,
) -> Result<Json<Vec<Invite>>, ApiError> {
    let repo = InviteRepository::new(state.pool.clone());
    let entities = repo
        .list(query.include_used, query.limit.clamp(1, 200), query.offset)
        .await?;

    Ok(Json(entities.into_iter().map(Invite::from).collect()))
}

async fn lookup_invite(state: &AppState, token: &str) -> Result<Option<Invite>, ApiError> {
    if !is_token_shaped(token) {
        return Ok(None);
    }
    let repo = InviteRepository::new(state.pool.clone());
    Ok(repo.find_by_token(token).await?.map(Invite::from))
}

/// Maps a redemption failure to its status and stable error code. Status
/// differs from validation: a consumed invite is a 409 here because the
/// caller attempted a state change, not a read.
fn invite_error_response(err: InviteError) -> Response {
    let status = match err {
        InviteError::NotFound => StatusCode::NOT_FOUND,
        InviteError::Expired => StatusCode::BAD_REQUEST,
        InviteError::AlreadyUsed => StatusCode::CONFLICT,
    };
    (
        status,
        Json(json!({
            "error": err.code(),
            "message": err.to_string(),
        })),
    )
        .into_response()
}

pub(crate) fn signup_link(state: &AppState, token: &str) -> String {
    format!(
        "{}/signup?invite={}",
        state.config.server.app_base_url.trim_end_matches('/'),
        token
    )
}
