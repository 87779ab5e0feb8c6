//! REST endpoints for the campaign builder.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::CampaignError;

use super::prompts::InputOrigin;
use super::service::CampaignService;

/// Shared state for campaign routes.
#[derive(Clone)]
pub struct CampaignRouteState {
    pub service: Arc<CampaignService>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    text: String,
    #[serde(default)]
    origin: InputOrigin,
}

fn error_response(err: CampaignError) -> Response {
    let status = match err {
        CampaignError::EmptyInput => StatusCode::BAD_REQUEST,
        CampaignError::UnknownMailbox(_) => StatusCode::NOT_FOUND,
        CampaignError::RequestInFlight { .. }
        | CampaignError::NoPendingRequest { .. }
        | CampaignError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CampaignError::ReplyRejected(_) => StatusCode::BAD_GATEWAY,
        CampaignError::TurnFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

/// GET /api/campaign
///
/// Current configuration, conversation, status and quick actions.
async fn get_campaign(State(state): State<CampaignRouteState>) -> impl IntoResponse {
    Json(state.service.snapshot().await)
}

/// POST /api/campaign/message
///
/// Send a user message and return the session after the AI turn.
async fn post_message(
    State(state): State<CampaignRouteState>,
    Json(body): Json<MessageBody>,
) -> Response {
    match state.service.submit(&body.text, body.origin).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/campaign/mailboxes
async fn get_mailboxes(State(state): State<CampaignRouteState>) -> impl IntoResponse {
    let directory = state.service.directory().await;
    Json(serde_json::json!({
        "accounts": directory.accounts(),
        "selected": state.service.snapshot().await.config.mailbox.selected,
    }))
}

/// POST /api/campaign/mailboxes/{id}/toggle
async fn toggle_mailbox(
    State(state): State<CampaignRouteState>,
    Path(id): Path<String>,
) -> Response {
    match state.service.toggle_mailbox(&id).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/campaign/launch
async fn launch(State(state): State<CampaignRouteState>) -> Response {
    match state.service.launch().await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/campaign/sequence
///
/// Flow graph for the cadence gathered so far.
async fn get_cadence_sequence(State(state): State<CampaignRouteState>) -> impl IntoResponse {
    Json(state.service.cadence_graph().await)
}

/// Build the campaign REST routes.
pub fn campaign_routes(state: CampaignRouteState) -> Router {
    Router::new()
        .route("/api/campaign", get(get_campaign))
        .route("/api/campaign/message", post(post_message))
        .route("/api/campaign/mailboxes", get(get_mailboxes))
        .route("/api/campaign/mailboxes/{id}/toggle", post(toggle_mailbox))
        .route("/api/campaign/launch", post(launch))
        .route("/api/campaign/sequence", get(get_cadence_sequence))
        .with_state(state)
}
