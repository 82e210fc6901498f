use std::net::SocketAddr;

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        ConnectInfo, DefaultBodyLimit, Multipart, Path, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{
    AnalysisResponse, AnalysisView, DeleteResponse, ErrorBody, HistoryResponse, UploadResponse,
    HISTORY_LIMIT,
};
use super::repo_types::Location;
use super::services::{process_upload, UploadItem};
use crate::images::services::{allowed_file, extension, mime_from_ext, sanitize_filename};
use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorBody>);

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/history", get(history))
        .route("/analysis/:id", get(get_analysis))
        .route("/delete/:id", delete(delete_analysis))
}

pub fn write_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// POST /upload (multipart): `file`, optional `latitude` + `longitude`.
#[instrument(skip(state, mp))]
pub async fn upload(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let Ok(mut mp) = mp else {
        return Err(bad_request("No file selected"));
    };
    let max = state.config.max_content_length;

    let mut file: Option<(String, Bytes)> = None;
    let mut latitude: Option<String> = None;
    let mut longitude: Option<String> = None;
    while let Some(field) = mp.next_field().await.map_err(|e| multipart_error(e, max))? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let body = field.bytes().await.map_err(|e| multipart_error(e, max))?;
                file = Some((filename, body));
            }
            Some("latitude") => {
                latitude = Some(field.text().await.map_err(|e| multipart_error(e, max))?);
            }
            Some("longitude") => {
                longitude = Some(field.text().await.map_err(|e| multipart_error(e, max))?);
            }
            _ => {}
        }
    }

    let Some((raw_filename, body)) = file.filter(|(name, _)| !name.is_empty()) else {
        return Err(bad_request("No file selected"));
    };
    if !allowed_file(&raw_filename) {
        warn!(filename = %raw_filename, "rejected file type");
        return Err(bad_request(
            "Invalid file type. Please upload JPG, PNG, GIF, BMP, or WebP files.",
        ));
    }
    if body.is_empty() {
        return Err(bad_request("Uploaded file is empty"));
    }
    let location = parse_location(latitude.as_deref(), longitude.as_deref())
        .map_err(bad_request)?;

    // allowed_file guarantees an extension on the raw name.
    let ext = extension(&raw_filename).unwrap_or_default();
    let mut original_filename = sanitize_filename(&raw_filename);
    if extension(&original_filename).as_deref() != Some(ext.as_str()) {
        original_filename = format!("upload.{ext}");
    }

    let result = process_upload(
        &state,
        UploadItem {
            original_filename: original_filename.clone(),
            mime_type: mime_from_ext(&ext),
            body,
            location,
            user_session: connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()),
        },
    )
    .await;
    info!(analysis_id = ?result.analysis_id, "upload processed");

    Ok(Json(UploadResponse {
        success: true,
        food_data: result.food_data,
        image_base64: format!("data:{};base64,{}", result.mime_type, result.image_base64),
        original_filename,
    }))
}

#[instrument(skip(state))]
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, ApiError> {
    let records = state.store.list_recent(HISTORY_LIMIT).await.map_err(|e| {
        error!(error = %e, "history failed");
        internal(format!("Error fetching history: {e}"))
    })?;
    Ok(Json(HistoryResponse {
        success: true,
        analyses: records.into_iter().map(AnalysisView::from).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.find(id).await {
        Ok(Some(record)) => Ok(Json(AnalysisResponse {
            success: true,
            analysis: record.into(),
        })),
        Ok(None) => Err(not_found()),
        Err(e) => {
            error!(error = %e, %id, "get_analysis failed");
            Err(internal(format!("Error fetching analysis: {e}")))
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_id(&id)?;
    match state.store.delete(id).await {
        Ok(true) => {
            info!(%id, "analysis deleted");
            Ok(Json(DeleteResponse {
                success: true,
                message: "Analysis deleted successfully",
            }))
        }
        Ok(false) => Err(not_found()),
        Err(e) => {
            error!(error = %e, %id, "delete_analysis failed");
            Err(internal(format!("Error deleting analysis: {e}")))
        }
    }
}

// A malformed id cannot name any record.
fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

fn parse_location(lat: Option<&str>, lon: Option<&str>) -> Result<Option<Location>, &'static str> {
    let (Some(lat), Some(lon)) = (lat.map(str::trim), lon.map(str::trim)) else {
        return Ok(None);
    };
    if lat.is_empty() || lon.is_empty() {
        return Ok(None);
    }
    let latitude: f64 = lat.parse().map_err(|_| "Invalid latitude")?;
    let longitude: f64 = lon.parse().map_err(|_| "Invalid longitude")?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err("Invalid latitude");
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err("Invalid longitude");
    }
    Ok(Some(Location {
        latitude,
        longitude,
    }))
}

fn multipart_error(e: MultipartError, max_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let mb = max_bytes / (1024 * 1024);
        let limit = if mb > 0 {
            format!("{mb}MB")
        } else {
            format!("{}KB", max_bytes / 1024)
        };
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ErrorBody::new(format!("File too large. Maximum size is {limit}."))),
        );
    }
    warn!(error = %e, "malformed multipart body");
    bad_request("Malformed upload")
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::new(msg)))
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Analysis not found")))
}

fn internal(msg: String) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(msg)))
}
