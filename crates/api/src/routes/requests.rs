//! Membership request routes: public intake plus the admin review surface.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::invite::{expiry_for, generate_invite_token, Invite};
use domain::models::request::{
    MembershipRequest, RequestStatus, SetStatusPayload, SubmitRequestPayload,
};
use persistence::entities::MembershipRequestEntity;
use persistence::repositories::{ApproveOutcome, MembershipRequestRepository, SetStatusOutcome};

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::invites::signup_link;

/// Submit a membership application.
///
/// POST /api/requests
pub async fn submit_request(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<MembershipRequest>), ApiError> {
    let payload: SubmitRequestPayload = serde_json::from_value(body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;
    payload.validate()?;

    let repo = MembershipRequestRepository::new(state.pool.clone());
    let entity = repo
        .create(
            &payload.full_name,
            &shared::validation::normalize_email(&payload.email),
            payload.phone.as_deref(),
            payload.department.as_deref(),
            &payload.skills,
            payload.reason.as_deref(),
        )
        .await?;

    let request = into_model(entity)?;
    info!(request_id = %request.id, email = %request.email, "Membership request submitted");

    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// List membership applications. Admin only.
///
/// GET /api/requests
pub async fn list_requests(
    State(state): State<AppState>,
    Query(query): Query<ListRequestsQuery>,
) -> Result<Json<Vec<MembershipRequest>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(RequestStatus::from_str)
        .transpose()
        .map_err(ApiError::Validation)?;

    let repo = MembershipRequestRepository::new(state.pool.clone());
    let entities = repo
        .list(status, query.limit.clamp(1, 200), query.offset)
        .await?;

    entities
        .into_iter()
        .map(into_model)
        .collect::<Result<Vec<_>, _>>()
        .map(Json)
}

/// Transition a pending application to approved or rejected. Admin only.
///
/// POST /api/requests/:id/status
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusPayload>,
) -> Result<Json<MembershipRequest>, ApiError> {
    if payload.status == RequestStatus::Pending {
        return Err(ApiError::Validation(
            "status must be approved or rejected".to_string(),
        ));
    }

    let repo = MembershipRequestRepository::new(state.pool.clone());
    match repo.set_status(id, payload.status).await? {
        SetStatusOutcome::Updated(entity) => {
            let request = into_model(entity)?;
            info!(request_id = %id, status = %payload.status, "Request status updated");
            Ok(Json(request))
        }
        SetStatusOutcome::NotFound => Err(ApiError::NotFound("Request not found".to_string())),
        SetStatusOutcome::InvalidTransition(entity) => Err(ApiError::Conflict(format!(
            "Request already {}",
            entity.status
        ))),
    }
}

/// Response for the composite approve-and-invite operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveResponse {
    pub request: MembershipRequest,
    pub invite: Invite,
    pub signup_link: String,
}

/// Approve an application and issue its invite in one step. Admin only.
///
/// POST /api/requests/:id/approve
pub async fn approve_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let repo = MembershipRequestRepository::new(state.pool.clone());

    let token = generate_invite_token();
    let created_at = Utc::now();
    let expires_at = expiry_for(created_at);

    match repo
        .approve_and_invite(id, &token, created_at, expires_at)
        .await?
    {
        ApproveOutcome::Approved { request, invite } => {
            let request = into_model(request)?;
            let invite: Invite = invite.into();
            info!(
                request_id = %id,
                token = %invite.token,
                email = %invite.email,
                "Request approved and invite issued"
            );

            let signup_link = signup_link(&state, &invite.token);
            Ok(Json(ApproveResponse {
                request,
                invite,
                signup_link,
            }))
        }
        ApproveOutcome::NotFound => Err(ApiError::NotFound("Request not found".to_string())),
        ApproveOutcome::InvalidTransition(entity) => Err(ApiError::Conflict(format!(
            "Request already {}",
            entity.status
        ))),
    }
}

fn into_model(entity: MembershipRequestEntity) -> Result<MembershipRequest, ApiError> {
    entity.into_model().map_err(ApiError::Internal)
}
