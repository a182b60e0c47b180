// Optional HTTP companion: the same upload and listing flow behind two JSON
// endpoints. The storage client is blocking, so every call into the
// `Uploader` runs on the blocking pool.

use crate::error::UploadError;
use crate::upload::{mime_type, UploadOutcome, Uploader, MAX_FILE_SIZE};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Images returned by `GET /api/images`.
pub const IMAGE_LIST_LIMIT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub uploader: Arc<Uploader>,
}

#[derive(Serialize, Debug)]
pub struct UploadData {
    pub key: String,
    pub hash: String,
    pub url: String,
    pub file_size: i64,
    pub mime_type: String,
}

#[derive(Serialize, Debug)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UploadData>,
}

#[derive(Serialize, Debug)]
pub struct ImageInfo {
    pub id: String,
    pub key: String,
    pub url: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded: String,
}

#[derive(Serialize, Debug)]
pub struct ImageListResponse {
    pub success: bool,
    pub data: Vec<ImageInfo>,
    pub total: usize,
}

#[derive(Deserialize)]
pub struct ImagesQuery {
    #[serde(default)]
    pub prefix: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upload(UploadError::PolicyRejected(_) | UploadError::InvalidInput(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Upload(UploadError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Upload(UploadError::RemoteUploadFailed(_) | UploadError::ListFailed(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Upload(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!("Error response: {} - {}", status, self);
        let body = UploadResponse {
            success: false,
            message: self.to_string(),
            data: None,
        };
        (status, Json(body)).into_response()
    }
}

fn upload_response(outcome: UploadOutcome, file_name: &str) -> UploadResponse {
    UploadResponse {
        success: outcome.success,
        message: outcome.message,
        data: Some(UploadData {
            key: outcome.remote_key,
            hash: outcome.hash,
            url: outcome.url,
            file_size: outcome.size_bytes,
            mime_type: mime_type(file_name).to_string(),
        }),
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(upload_image))
        .route("/api/images", get(list_images))
        // Multipart framing on top of the largest accepted file.
        .layer(DefaultBodyLimit::max(MAX_FILE_SIZE as usize + 64 * 1024))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to process upload: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((file_name, data.to_vec()));
        break;
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing form field 'file'".to_string()))?;

    let uploader = state.uploader.clone();
    let name = file_name.clone();
    let outcome = tokio::task::spawn_blocking(move || uploader.upload_bytes(&name, data))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(upload_response(outcome, &file_name)))
}

async fn list_images(
    State(state): State<AppState>,
    Query(query): Query<ImagesQuery>,
) -> Response {
    let uploader = state.uploader.clone();
    let result =
        tokio::task::spawn_blocking(move || uploader.list(&query.prefix, IMAGE_LIST_LIMIT)).await;

    match result {
        Ok(Ok(files)) => {
            let data: Vec<ImageInfo> = files
                .into_iter()
                .map(|f| ImageInfo {
                    id: f.hash,
                    uploaded: f.uploaded.map(|t| t.to_rfc3339()).unwrap_or_default(),
                    key: f.key,
                    url: f.url,
                    file_size: f.size_bytes,
                    mime_type: f.mime_type,
                })
                .collect();
            let total = data.len();
            Json(ImageListResponse {
                success: true,
                data,
                total,
            })
            .into_response()
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "listing failed");
            empty_listing()
        }
        Err(e) => {
            tracing::error!(error = %e, "listing task failed");
            empty_listing()
        }
    }
}

fn empty_listing() -> Response {
    let body = ImageListResponse {
        success: false,
        data: Vec::new(),
        total: 0,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Run the HTTP server on its own runtime until it fails.
pub fn serve_blocking(uploader: Arc<Uploader>, port: u16) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let state = AppState {
        uploader: uploader.clone(),
    };
    runtime.block_on(async move {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Server listening on {}", addr);
        println!("Listening on http://localhost:{}", port);
        axum::serve(listener, create_router(state)).await?;
        Ok::<_, anyhow::Error>(())
    })
}
