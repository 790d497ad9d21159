//! Admin media upload: fans a multipart batch out to the asset host.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{map_service_error, success_response};
use crate::services::uploads::UploadFile;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Public URLs in the same order the files were submitted
    pub urls: Vec<String>,
}

/// Upload a batch of media files (admin).
///
/// All files upload in parallel and the request only succeeds if every one
/// of them does; on failure no URL is returned for any file.
#[utoipa::path(
    post,
    path = "/api/v1/admin/upload",
    request_body(content = Vec<u8>, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "All files stored", body = UploadResponse),
        (status = 400, description = "Empty or malformed upload"),
        (status = 502, description = "Asset host failure")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn upload_media(
    State(state): State<AppState>,
    _admin: AdminUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::ValidationError(format!("Malformed multipart body: {}", e)))?
    {
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upload-{}", files.len()));
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::ValidationError(format!("Failed to read upload: {}", e)))?;

        if bytes.is_empty() {
            return Err(ApiError::ValidationError(format!(
                "File {} is empty",
                file_name
            )));
        }

        files.push(UploadFile {
            file_name,
            content_type,
            bytes,
        });
    }

    if files.is_empty() {
        return Err(ApiError::ValidationError(
            "No files provided".to_string(),
        ));
    }

    let urls = state
        .services
        .uploads
        .upload_many(files)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(UploadResponse { urls }))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/upload", post(upload_media))
}
