// Request handlers for Threshold Recovery Node
//
// Thin wrappers mapping HTTP requests onto the façade. Octet fields travel
// hex-encoded; a mailbox pickup answers with the blob bytes verbatim.

use crate::api::ApiError;
use crate::service::RecoveryService;
use crate::types::{
    LivenessRequest, ParticipantRequest, PickupRequest, RegisterRequest, ReleaseRequest,
};

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Node health probe
#[axum::debug_handler]
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Register a wallet under dead-man-switch protection
#[axum::debug_handler]
pub async fn register(
    State(service): State<Arc<RecoveryService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let marker = service.register(request).await?;
    Ok((StatusCode::CREATED, Json(marker)))
}

/// Accept a signed proof of life
#[axum::debug_handler]
pub async fn liveness(
    State(service): State<Arc<RecoveryService>>,
    Json(request): Json<LivenessRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let marker = service.liveness(request).await?;
    Ok((StatusCode::OK, Json(marker)))
}

/// Report a wallet's recovery status
#[axum::debug_handler]
pub async fn status(
    State(service): State<Arc<RecoveryService>>,
    Path(pubkey): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = service.status(&pubkey).await?;
    Ok((StatusCode::OK, Json(status)))
}

/// Release a friend's mailbox blob
#[axum::debug_handler]
pub async fn pickup(
    State(service): State<Arc<RecoveryService>>,
    Json(request): Json<PickupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let blob = service.pickup(request).await?;
    Ok((StatusCode::OK, blob))
}

/// Release the node's own share
#[axum::debug_handler]
pub async fn release(
    State(service): State<Arc<RecoveryService>>,
    Json(request): Json<ReleaseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = service.release(request).await?;
    Ok((StatusCode::OK, Json(response)))
}

/// Add a shareholder to the participant directory
#[axum::debug_handler]
pub async fn add_participant(
    State(service): State<Arc<RecoveryService>>,
    Json(request): Json<ParticipantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let marker = service.register_participant(request).await?;
    Ok((StatusCode::CREATED, Json(marker)))
}

/// Look up participant keys: `GET /participants?ids=alice,bob`
#[axum::debug_handler]
pub async fn list_participants(
    State(service): State<Arc<RecoveryService>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let ids: Vec<&str> = params
        .get("ids")
        .map(|v| v.split(',').filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let keys = service.participant_keys(&ids).await?;
    Ok((StatusCode::OK, Json(keys)))
}
