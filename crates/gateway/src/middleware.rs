//! Middleware for sessions, download interception and request tracing

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use msgat_attachments::{DownloadRoute, NO_SESSION};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{warn, Level};

use crate::rest::attachment::download_response;
use crate::state::GatewayState;

/// The user making the request. `Viewer(0)` means no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer(pub i64);

impl Viewer {
    pub fn anonymous() -> Self {
        Self(NO_SESSION)
    }

    pub fn is_anonymous(self) -> bool {
        self.0 == NO_SESSION
    }
}

/// Resolve the bearer token, if any, and attach a [`Viewer`] to the request.
///
/// Missing, unknown and expired tokens all make the request anonymous.
pub async fn session_middleware(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let viewer = match token {
        Some(token) => match state.sessions.resolve_user(token).await {
            Ok(Some(user_id)) => Viewer(user_id),
            Ok(None) => Viewer::anonymous(),
            Err(error) => {
                warn!(%error, "session lookup failed, treating request as anonymous");
                Viewer::anonymous()
            }
        },
        None => Viewer::anonymous(),
    };

    request.extensions_mut().insert(viewer);
    next.run(request).await
}

/// Serve `GET /messages/{thread_id}/attachment/{attachment_id}`.
///
/// When the viewer may download the attachment the file is streamed and
/// nothing further down the stack runs. Any denial hands the request on
/// untouched, so the caller sees whatever the router would have answered.
pub async fn attachment_download_middleware(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }
    let Some(route) = DownloadRoute::parse(request.uri().path()) else {
        return next.run(request).await;
    };

    let viewer = request
        .extensions()
        .get::<Viewer>()
        .copied()
        .unwrap_or_else(Viewer::anonymous);

    match state.access.open(route, viewer.0).await {
        Ok(download) => match download_response(download) {
            Some(response) => response,
            None => next.run(request).await,
        },
        Err(_) => next.run(request).await,
    }
}

/// Create tracing middleware
pub fn create_trace_middleware() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

/// CORS for read-only cross-origin access
pub fn create_cors_middleware() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
}
