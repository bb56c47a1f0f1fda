//! # msgat Gateway Crate
//!
//! HTTP surface of the attachment service: streams attachment downloads to
//! thread participants and serves file-type and upload-limit information.
//!
//! ## Architecture
//!
//! - **REST**: JSON endpoints with OpenAPI documentation
//! - **Middleware**: Session resolution, download interception, tracing, CORS
//! - **State**: Services shared by every request
//!
//! A refused download is indistinguishable from a request to a path that
//! does not exist: both get an empty 404.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use msgat_gateway::{create_gateway_state, create_router};
//!
//! let state = create_gateway_state(access, sessions, classifier, options);
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;

pub use error::{ErrorResponse, GatewayError, GatewayResult};
pub use middleware::{attachment_download_middleware, session_middleware, Viewer};
pub use state::{create_gateway_state, GatewayState};

use axum::{middleware as axum_middleware, Router};
use std::sync::Arc;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Create the main application router with all routes
pub fn create_router(state: Arc<GatewayState>) -> Router {
    #[allow(unused_mut)]
    let mut router = Router::new()
        .merge(rest::create_rest_routes())
        .fallback(rest::not_found);

    #[cfg(debug_assertions)]
    {
        #[derive(OpenApi)]
        #[openapi(
            paths(
                rest::health::health_check,
                rest::attachment::list_file_types,
                rest::attachment::classify_file,
                rest::attachment::validate_upload,
            ),
            components(
                schemas(
                    rest::health::HealthResponse,
                    rest::attachment::FileTypeGroupResponse,
                    rest::attachment::UploadHintsResponse,
                    rest::attachment::FileTypesResponse,
                    rest::attachment::ClassifyResponse,
                    rest::attachment::ValidateUploadRequest,
                    rest::attachment::ValidateUploadResponse,
                    error::ErrorResponse,
                )
            ),
            tags(
                (name = "Health", description = "Liveness"),
                (name = "Attachments", description = "File types and upload limits"),
            )
        )]
        struct ApiDoc;

        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
    }

    // The last layer added runs first: CORS, tracing, sessions, downloads.
    router
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::attachment_download_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .layer(middleware::create_trace_middleware())
        .layer(middleware::create_cors_middleware())
        .with_state(state)
}
