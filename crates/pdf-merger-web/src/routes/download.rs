//! Download route - merged PDF delivery.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use std::sync::Arc;
use tracing::info;

use super::SESSION_NOT_FOUND;
use crate::helpers::{OptionExt, ResultExt, RouteResult, attachment_disposition};
use crate::state::AppState;

/// Download the merged PDF.
///
/// Repeatable until the file list changes or the session is reset.
pub async fn download_pdf(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    let (output, filename) = session
        .with_session_mut(|s| s.merge.download())
        .await
        .or_not_found(SESSION_NOT_FOUND)?
        .or_not_found("Nothing merged yet")?;

    info!(
        "Session {}: downloading {} ({} pages, {} bytes)",
        session_id,
        filename,
        output.page_count(),
        output.size()
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&filename))
        .header(header::CONTENT_LENGTH, output.size())
        .body(Body::from(output.to_bytes()))
        .or_internal_error()
}
