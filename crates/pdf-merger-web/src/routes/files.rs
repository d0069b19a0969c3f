//! File list routes - reorder and remove.

use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use std::sync::Arc;
use tracing::debug;

use super::{MoveForm, SESSION_NOT_FOUND, respond};
use crate::helpers::{OptionExt, RouteResult};
use crate::state::AppState;

/// Move one file to a new position (move-and-shift).
///
/// An out-of-range index (stale page) is reported as a flash message.
pub async fn move_file(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Form(form): Form<MoveForm>,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    session
        .with_session_mut(|s| {
            if let Err(e) = s.merge.reorder(form.from, form.to) {
                s.flash_error(&e);
            }
        })
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    debug!("Session {}: moved {} -> {}", session_id, form.from, form.to);
    respond(&state, &session, &headers).await
}

/// Remove the file at `index`.
pub async fn remove_file(
    State(state): State<Arc<AppState>>,
    Path((session_id, index)): Path<(String, usize)>,
    headers: HeaderMap,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    session
        .with_session_mut(|s| match s.remove_file(index) {
            Ok(file) => {
                debug!("Session {}: removed {}", session_id, file.name());
            }
            Err(e) => s.flash_error(&e),
        })
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    respond(&state, &session, &headers).await
}
