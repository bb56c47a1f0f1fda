//! REST API endpoints for the gateway

pub mod attachment;
pub mod health;

use axum::{http::StatusCode, routing::get, Router};
use crate::state::GatewayState;
use std::sync::Arc;

/// Create all REST API routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(attachment::create_attachment_routes())
}

/// Fallback for every unmatched request, including refused downloads
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub use attachment::*;
pub use health::*;
