//! HTTP surface — merges the feature routers behind a permissive CORS layer.

use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::campaign::CampaignService;
use crate::campaign::routes::{CampaignRouteState, campaign_routes};
use crate::sequence::routes::{SequenceRouteState, sequence_routes};

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "campaign-assist"
    }))
}

/// Build the full application router.
pub fn app_router(campaign: Arc<CampaignService>, sequence: SequenceRouteState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .merge(campaign_routes(CampaignRouteState { service: campaign }))
        .merge(sequence_routes(sequence))
        .layer(cors)
}

/// Bind `addr` and serve until the task is dropped.
pub async fn serve(addr: &str, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server started");
    axum::serve(listener, app).await
}
