//! Upload routes - PDF file upload handling.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use axum_extra::extract::Multipart;
use pdf_merger_core::{UploadedFile, probe_page_count};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{SESSION_NOT_FOUND, respond, session_url};
use crate::helpers::{OptionExt, ResultExt, RouteResult, redirect, upload_file_name};
use crate::state::{AppState, FlashKind};

/// Collect the uploaded files from a multipart body.
///
/// Accepts repeated `files` fields (and a single `file` field). Empty parts
/// without a filename are what browsers send for an empty file input and
/// are ignored.
async fn read_uploads(multipart: &mut Multipart) -> RouteResult<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        let name = field.name().unwrap_or("").to_string();
        if name != "files" && name != "file" {
            continue;
        }

        let raw_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.or_bad_request()?;

        if data.is_empty() && raw_name.as_deref().is_none_or(str::is_empty) {
            continue;
        }

        files.push(UploadedFile::new(upload_file_name(raw_name.as_deref()), data));
    }

    Ok(files)
}

/// Probe page counts for display, in a blocking task.
///
/// A file that cannot be read gets `None` and is still kept; the merge
/// reports it by name.
async fn probe_uploads(files: Vec<UploadedFile>) -> RouteResult<Vec<(UploadedFile, Option<usize>)>> {
    tokio::task::spawn_blocking(move || {
        files
            .into_iter()
            .map(|file| {
                let pages = probe_page_count(file.bytes());
                debug!("Probed {}: {:?} pages", file.name(), pages);
                (file, pages)
            })
            .collect()
    })
    .await
    .map_err(|e| {
        error!("PDF probing task panicked: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "PDF probing failed".to_string(),
        )
    })
}

/// Upload the first PDFs - creates a session and redirects to it
/// (POST-Redirect-GET pattern).
///
/// Supports both HTMX requests (HX-Redirect header) and standard form submissions
/// (HTTP 303 See Other redirect) for graceful degradation without JavaScript.
pub async fn upload_pdfs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> RouteResult<Response> {
    let files = read_uploads(&mut multipart).await?;
    if files.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    let uploads = probe_uploads(files).await?;

    let id = state.create_session().await;
    let session = state
        .get_session(&id.to_string())
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    let summary = session
        .with_session_mut(|s| s.add_uploads(uploads))
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    info!(
        "Created session {} with {} file(s) ({} skipped)",
        id,
        summary.added.len(),
        summary.duplicates.len() + summary.rejected.len()
    );

    redirect(&headers, &session_url(id))
}

/// Add more PDFs to an existing session.
pub async fn add_files(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    let files = read_uploads(&mut multipart).await?;

    if files.is_empty() {
        session
            .with_session_mut(|s| s.set_flash(FlashKind::Warning, "No files selected"))
            .await
            .or_not_found(SESSION_NOT_FOUND)?;
    } else {
        let uploads = probe_uploads(files).await?;
        let summary = session
            .with_session_mut(|s| s.add_uploads(uploads))
            .await
            .or_not_found(SESSION_NOT_FOUND)?;
        info!(
            "Session {}: added {} file(s)",
            session_id,
            summary.added.len()
        );
    }

    respond(&state, &session, &headers).await
}
