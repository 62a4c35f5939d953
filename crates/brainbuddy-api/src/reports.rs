use axum::{
    Extension, Json,
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use brainbuddy_db::queries::NewReport;
use brainbuddy_types::api::{MessageResponse, ReportListResponse, ReportResponse, UploadResponse};

use crate::error::ApiError;
use crate::session::CurrentSession;
use crate::storage::{allowed_file, sanitize_filename};
use crate::{AppState, run_db};

const MISSING_FIELDS: &str = "title and file are required";
const UNSUPPORTED_TYPE: &str = "Unsupported file type";

struct UploadedFile {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// POST /api/reports: multipart upload with `title`, optional
/// `description`, and `file`.
pub async fn upload_report(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::validation(MISSING_FIELDS))?;

    let mut title = String::new();
    let mut description = String::new();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = field.text().await?.trim().to_string(),
            "description" => description = field.text().await?.trim().to_string(),
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await?;

                // Browsers send an empty, unnamed part when no file was picked.
                if !filename.is_empty() {
                    file = Some(UploadedFile {
                        filename,
                        content_type,
                        data,
                    });
                }
            }
            _ => {}
        }
    }

    let upload = match file {
        Some(upload) if !title.is_empty() => upload,
        _ => return Err(ApiError::validation(MISSING_FIELDS)),
    };

    let safe_name = sanitize_filename(&upload.filename);
    if !allowed_file(&upload.filename) || !allowed_file(&safe_name) {
        return Err(ApiError::validation(UNSUPPORTED_TYPE));
    }

    let stored = state.storage.save_unique(&safe_name, &upload.data).await?;

    let user_id = current.user.id;
    let filename = stored.filename.clone();
    let content_type = upload.content_type;
    let size_bytes = stored.size as i64;
    let inserted = run_db(&state, move |db| {
        db.insert_report(&NewReport {
            user_id,
            title: &title,
            description: &description,
            filename: &filename,
            content_type: &content_type,
            size_bytes,
        })
    })
    .await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            // No record points at the file, so nothing could ever remove it.
            state.storage.delete_file(&stored.filename).await.ok();
            return Err(e);
        }
    };

    info!(
        "User {} uploaded report {} as {} ({} bytes)",
        user_id, row.id, row.filename, row.size_bytes
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Uploaded",
            report: row.into_public()?,
        }),
    ))
}

/// GET /api/reports: the caller's reports, newest first.
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<ReportListResponse>, ApiError> {
    let user_id = current.user.id;
    let rows = run_db(&state, move |db| db.list_reports(user_id)).await?;

    let reports = rows
        .into_iter()
        .map(|row| row.into_public())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(ReportListResponse { reports }))
}

/// GET /api/reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<i64>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<ReportResponse>, ApiError> {
    let row = find_owned(&state, report_id, current.user.id).await?;
    Ok(Json(ReportResponse {
        report: row.into_public()?,
    }))
}

/// GET /api/reports/{id}/download: stream the stored file as an attachment.
pub async fn download_report(
    State(state): State<AppState>,
    Path(report_id): Path<i64>,
    Extension(current): Extension<CurrentSession>,
) -> Result<impl IntoResponse, ApiError> {
    let row = find_owned(&state, report_id, current.user.id).await?;

    let file = state.storage.open(&row.filename).await?.ok_or_else(|| {
        warn!("Report {} has no backing file {}", row.id, row.filename);
        ApiError::NotFound
    })?;

    let headers = [
        (header::CONTENT_TYPE, row.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", row.filename),
        ),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))))
}

/// DELETE /api/reports/{id}: remove the stored file (best effort) and the
/// record.
pub async fn delete_report(
    State(state): State<AppState>,
    Path(report_id): Path<i64>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<MessageResponse>, ApiError> {
    let user_id = current.user.id;
    let row = find_owned(&state, report_id, user_id).await?;

    // The record goes regardless; a file we cannot remove is only logged.
    if let Err(e) = state.storage.delete_file(&row.filename).await {
        warn!("Could not remove {} for report {}: {:#}", row.filename, row.id, e);
    }

    run_db(&state, move |db| db.delete_report(report_id, user_id)).await?;
    info!("User {} deleted report {}", user_id, report_id);

    Ok(Json(MessageResponse { message: "Deleted" }))
}

/// Ownership is part of the lookup, so another user's report is a plain 404.
async fn find_owned(
    state: &AppState,
    report_id: i64,
    user_id: i64,
) -> Result<brainbuddy_db::models::ReportRow, ApiError> {
    run_db(state, move |db| db.get_report(report_id, user_id))
        .await?
        .ok_or(ApiError::NotFound)
}
