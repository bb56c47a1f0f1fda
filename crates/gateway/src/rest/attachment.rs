//! Attachment endpoints: file downloads, file-type table and upload checks

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use msgat_attachments::{DownloadFile, FileTypeGroup, UploadHints};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ErrorResponse, GatewayError, GatewayResult};
use crate::state::GatewayState;

const CONTENT_DESCRIPTION: HeaderName = HeaderName::from_static("content-description");

#[derive(Debug, Serialize, ToSchema)]
pub struct FileTypeGroupResponse {
    pub key: String,
    pub label: String,
    pub extensions: Vec<String>,
}

impl From<&FileTypeGroup> for FileTypeGroupResponse {
    fn from(group: &FileTypeGroup) -> Self {
        Self {
            key: group.key.clone(),
            label: group.label.clone(),
            extensions: group.extensions.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadHintsResponse {
    pub max_size_mb: u64,
    pub max_size_bytes: u64,
    pub load_css: bool,
    /// Allowed extensions grouped by file type
    pub allowed: Vec<FileTypeGroupResponse>,
}

impl From<UploadHints> for UploadHintsResponse {
    fn from(hints: UploadHints) -> Self {
        Self {
            max_size_mb: hints.max_size_mb,
            max_size_bytes: hints.max_size_bytes,
            load_css: hints.load_css,
            allowed: hints
                .groups
                .into_iter()
                .map(|group| FileTypeGroupResponse {
                    key: group.key,
                    label: group.label,
                    extensions: group.extensions,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FileTypesResponse {
    /// Every file-type group, in classification order
    pub groups: Vec<FileTypeGroupResponse>,
    pub upload: UploadHintsResponse,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClassifyQuery {
    /// File name or bare extension
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClassifyResponse {
    pub group: String,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateUploadRequest {
    pub file_name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateUploadResponse {
    pub allowed: bool,
    pub group: String,
}

/// Create attachment routes
pub fn create_attachment_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/attachments/file-types", get(list_file_types))
        .route("/api/attachments/classify", get(classify_file))
        .route("/api/attachments/validate", post(validate_upload))
}

/// Build the download response for an authorized attachment.
///
/// Headers are emitted in a fixed order. `None` if the stored name or MIME
/// type cannot be expressed as a header value.
pub fn download_response(download: DownloadFile) -> Option<Response> {
    let DownloadFile {
        download,
        file,
        length,
    } = download;

    let disposition =
        HeaderValue::from_bytes(format!("attachment; filename={}", download.file_name).as_bytes())
            .ok()?;
    let content_type = HeaderValue::from_str(&download.mime_type).ok()?;

    // Never send more than was measured, even if the file grows meanwhile.
    let body = Body::from_stream(ReaderStream::new(file.take(length)));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CACHE_CONTROL, "cache, must-revalidate")
        .header(header::PRAGMA, "public")
        .header(CONTENT_DESCRIPTION, "File Transfer")
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_TYPE, content_type)
        .body(body)
        .ok()?;

    info!(
        thread_id = download.thread_id,
        attachment_id = download.attachment_id,
        bytes = length,
        "streaming attachment"
    );
    Some(response)
}

#[utoipa::path(
    get,
    path = "/api/attachments/file-types",
    tag = "Attachments",
    responses(
        (status = 200, description = "File-type groups and upload limits", body = FileTypesResponse)
    )
)]
pub async fn list_file_types(State(state): State<Arc<GatewayState>>) -> Json<FileTypesResponse> {
    let groups = state
        .classifier
        .all_file_types()
        .iter()
        .map(FileTypeGroupResponse::from)
        .collect();
    let upload = state.upload_policy().hints(&state.classifier).into();

    Json(FileTypesResponse { groups, upload })
}

#[utoipa::path(
    get,
    path = "/api/attachments/classify",
    tag = "Attachments",
    params(ClassifyQuery),
    responses(
        (status = 200, description = "File-type group of the name", body = ClassifyResponse),
        (status = 400, description = "Empty name", body = ErrorResponse)
    )
)]
pub async fn classify_file(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ClassifyQuery>,
) -> GatewayResult<Json<ClassifyResponse>> {
    let name = query.name.trim();
    if name.is_empty() {
        return Err(GatewayError::InvalidRequest("name cannot be empty".to_string()));
    }

    let group = state.classifier.classify_name(name);
    let label = state.classifier.group_label(&group);

    Ok(Json(ClassifyResponse { group, label }))
}

#[utoipa::path(
    post,
    path = "/api/attachments/validate",
    tag = "Attachments",
    request_body = ValidateUploadRequest,
    responses(
        (status = 200, description = "Upload would be accepted", body = ValidateUploadResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 422, description = "File type not allowed", body = ErrorResponse)
    )
)]
pub async fn validate_upload(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<ValidateUploadRequest>,
) -> GatewayResult<Json<ValidateUploadResponse>> {
    let group = state
        .upload_policy()
        .check(&state.classifier, &request.file_name, request.size_bytes)
        .map_err(|rejection| {
            debug!(file_name = %request.file_name, %rejection, "upload rejected");
            GatewayError::from(rejection)
        })?;

    Ok(Json(ValidateUploadResponse {
        allowed: true,
        group,
    }))
}
