//! REST endpoints for the sequence builder canvas.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::SequenceError;

use super::editor::{Connection, EditOutcome, GraphIssue, SequenceEditor};
use super::layout::{Bounds, bounds};
use super::model::{SequenceGraph, StepKind, WaitDays};

/// Shared state for sequence routes.
#[derive(Clone, Default)]
pub struct SequenceRouteState {
    pub editor: Arc<RwLock<SequenceEditor>>,
}

#[derive(Debug, Deserialize)]
struct ParseBody {
    text: String,
}

#[derive(Debug, Deserialize)]
struct DropBody {
    #[serde(rename = "type")]
    kind: StepKind,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WaitBody {
    wait_days: WaitDays,
}

#[derive(Debug, Deserialize)]
struct DetailsBody {
    details: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphView {
    graph: SequenceGraph,
    issues: Vec<GraphIssue>,
    bounds: Option<Bounds>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditView {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    outcome: EditOutcome,
    graph: SequenceGraph,
}

fn graph_view(editor: &SequenceEditor) -> GraphView {
    GraphView {
        graph: editor.graph().clone(),
        issues: editor.validate(),
        bounds: bounds(editor.graph().nodes()),
    }
}

fn edit_view(editor: &SequenceEditor, id: Option<String>, outcome: EditOutcome) -> Response {
    Json(EditView {
        id,
        outcome,
        graph: editor.graph().clone(),
    })
    .into_response()
}

fn error_response(err: SequenceError) -> Response {
    let status = match err {
        SequenceError::NodeNotFound(_) | SequenceError::EdgeNotFound(_) => StatusCode::NOT_FOUND,
        SequenceError::DuplicateEdge { .. } | SequenceError::HandleInUse { .. } => StatusCode::CONFLICT,
        SequenceError::SelfLoop { .. }
        | SequenceError::InvalidHandle { .. }
        | SequenceError::StartNode(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(serde_json::json!({"error": err.to_string()}))).into_response()
}

/// POST /api/sequence/parse
///
/// Replace the canvas with the graph parsed from a cadence description.
async fn parse(State(state): State<SequenceRouteState>, Json(body): Json<ParseBody>) -> impl IntoResponse {
    let mut editor = state.editor.write().await;
    *editor = SequenceEditor::from_cadence(&body.text);
    tracing::info!(nodes = editor.graph().nodes().len(), "Parsed cadence into sequence");
    Json(graph_view(&editor))
}

/// GET /api/sequence
async fn get_sequence(State(state): State<SequenceRouteState>) -> impl IntoResponse {
    Json(graph_view(&*state.editor.read().await))
}

/// GET /api/sequence/steps
///
/// The sequence flattened into ordered step rows.
async fn get_steps(State(state): State<SequenceRouteState>) -> impl IntoResponse {
    Json(state.editor.read().await.linear_steps())
}

/// POST /api/sequence/nodes
async fn drop_node(State(state): State<SequenceRouteState>, Json(body): Json<DropBody>) -> Response {
    let mut editor = state.editor.write().await;
    match editor.drop_node(body.kind) {
        Ok((id, outcome)) => edit_view(&editor, Some(id), outcome),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/sequence/nodes/{id}
async fn delete_node(State(state): State<SequenceRouteState>, Path(id): Path<String>) -> Response {
    let mut editor = state.editor.write().await;
    match editor.delete_node(&id) {
        Ok(outcome) => edit_view(&editor, None, outcome),
        Err(e) => error_response(e),
    }
}

/// PATCH /api/sequence/nodes/{id}/wait
async fn set_wait(
    State(state): State<SequenceRouteState>,
    Path(id): Path<String>,
    Json(body): Json<WaitBody>,
) -> Response {
    let mut editor = state.editor.write().await;
    match editor.set_wait(&id, body.wait_days) {
        Ok(outcome) => edit_view(&editor, None, outcome),
        Err(e) => error_response(e),
    }
}

/// PATCH /api/sequence/nodes/{id}/details
async fn set_details(
    State(state): State<SequenceRouteState>,
    Path(id): Path<String>,
    Json(body): Json<DetailsBody>,
) -> Response {
    let mut editor = state.editor.write().await;
    match editor.set_details(&id, &body.details) {
        Ok(outcome) => edit_view(&editor, None, outcome),
        Err(e) => error_response(e),
    }
}

/// POST /api/sequence/edges
async fn connect(State(state): State<SequenceRouteState>, Json(body): Json<Connection>) -> Response {
    let mut editor = state.editor.write().await;
    match editor.connect(&body) {
        Ok((id, outcome)) => edit_view(&editor, Some(id), outcome),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/sequence/edges/{id}
async fn delete_edge(State(state): State<SequenceRouteState>, Path(id): Path<String>) -> Response {
    let mut editor = state.editor.write().await;
    match editor.delete_edge(&id) {
        Ok(outcome) => edit_view(&editor, None, outcome),
        Err(e) => error_response(e),
    }
}

/// Build the sequence REST routes.
pub fn sequence_routes(state: SequenceRouteState) -> Router {
    Router::new()
        .route("/api/sequence", get(get_sequence))
        .route("/api/sequence/parse", post(parse))
        .route("/api/sequence/steps", get(get_steps))
        .route("/api/sequence/nodes", post(drop_node))
        .route("/api/sequence/nodes/{id}", delete(delete_node))
        .route("/api/sequence/nodes/{id}/wait", patch(set_wait))
        .route("/api/sequence/nodes/{id}/details", patch(set_details))
        .route("/api/sequence/edges", post(connect))
        .route("/api/sequence/edges/{id}", delete(delete_edge))
        .with_state(state)
}
