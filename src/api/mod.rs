// API module for Threshold Recovery Node
//
// This module implements the HTTP API for the node

use crate::error::{RecoveryNodeError, Result};
use crate::service::RecoveryService;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

mod handlers;

pub use handlers::*;

/// Requests larger than this are rejected unread
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// API Error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    /// Error message
    pub message: String,
    /// Error code
    pub code: String,
    /// Optional additional details
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.code.as_str() {
            "BAD_REQUEST" | "INVALID_COMMITMENT" => StatusCode::BAD_REQUEST,
            "INVALID_SIGNATURE" | "MALFORMED_SIGNATURE" | "STALE_TIMESTAMP" => {
                StatusCode::UNAUTHORIZED
            }
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "NOT_A_FRIEND" | "RECOVERY_LOCKED" => StatusCode::FORBIDDEN,
            "ALREADY_REGISTERED" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(self);

        (status, body).into_response()
    }
}

/// Convert a node error to an API error.
///
/// The first eight kinds are client-visible with a short reason; storage and
/// internal failures are logged in full here and surfaced opaquely.
impl From<RecoveryNodeError> for ApiError {
    fn from(err: RecoveryNodeError) -> Self {
        let (code, message, details) = match err {
            RecoveryNodeError::BadRequest(msg) => ("BAD_REQUEST", msg, None),
            RecoveryNodeError::InvalidPointEncoding(msg) | RecoveryNodeError::ScalarOutOfRange(msg) => {
                ("BAD_REQUEST", msg, None)
            }
            RecoveryNodeError::InvalidCommitment(msg) => ("INVALID_COMMITMENT", msg, None),
            RecoveryNodeError::InvalidSignature(msg) => ("INVALID_SIGNATURE", msg, None),
            RecoveryNodeError::MalformedSignature(msg) => ("MALFORMED_SIGNATURE", msg, None),
            RecoveryNodeError::StaleTimestamp(msg) => ("STALE_TIMESTAMP", msg, None),
            RecoveryNodeError::AlreadyRegistered(msg) => ("ALREADY_REGISTERED", msg, None),
            RecoveryNodeError::NotFound(msg) => ("NOT_FOUND", msg, None),
            RecoveryNodeError::NotAFriend(msg) => ("NOT_A_FRIEND", msg, None),
            RecoveryNodeError::RecoveryLocked {
                last_activity,
                time_until_recovery,
            } => (
                "RECOVERY_LOCKED",
                "recovery is locked while the owner is live".to_string(),
                // Same shape as the status response, so callers can poll
                Some(serde_json::json!({
                    "recoverable": false,
                    "last_activity": last_activity,
                    "time_until_recovery": time_until_recovery,
                })),
            ),
            RecoveryNodeError::Storage(msg)
            | RecoveryNodeError::Config(msg)
            | RecoveryNodeError::Serialization(msg)
            | RecoveryNodeError::IO(msg)
            | RecoveryNodeError::Internal(msg) => {
                error!("Internal error: {}", msg);
                ("INTERNAL", "internal error".to_string(), None)
            }
        };

        Self {
            message,
            code: code.to_string(),
            details,
        }
    }
}

/// API Server
pub struct ApiServer {
    /// Request façade
    service: Arc<RecoveryService>,
    /// Server bind address
    bind_address: String,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(service: Arc<RecoveryService>, bind_address: String) -> Self {
        Self {
            service,
            bind_address,
        }
    }

    /// Start the API server
    pub async fn start(&self) -> Result<()> {
        let app = self.create_router().layer(TraceLayer::new_for_http());

        let addr = self
            .bind_address
            .parse()
            .map_err(|e| RecoveryNodeError::Config(format!("Invalid bind address: {}", e)))?;

        info!("Starting API server on {}", self.bind_address);

        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .map_err(|e| RecoveryNodeError::Config(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Create the API router
    fn create_router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health_check))
            // Wallet lifecycle
            .route("/register", post(handlers::register))
            .route("/liveness", post(handlers::liveness))
            .route("/status/:pubkey", get(handlers::status))
            // Recovery
            .route("/mailbox/pickup", post(handlers::pickup))
            .route("/recover", post(handlers::release))
            // Participant directory
            .route(
                "/participants",
                post(handlers::add_participant).get(handlers::list_participants),
            )
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(self.service.clone())
    }
}
