//! Merge routes - run the merge, start over, clear.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use std::sync::Arc;
use tracing::{info, warn};

use super::{SESSION_NOT_FOUND, respond};
use crate::helpers::{OptionExt, RouteResult};
use crate::state::{AppState, FlashKind};

/// Merge the session's files in list order, then compress.
///
/// The session lock is released while the merge runs. Merge errors end up
/// in the flash message; compression problems only add a warning.
pub async fn merge_pdfs(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    let prepared = session
        .with_session(|s| s.merge.prepare_merge())
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    match prepared {
        Ok(job) => {
            info!(
                "Session {}: merging {} file(s) at level {}",
                session_id,
                job.files.len(),
                job.compression
            );

            let result = state.merger.run(&job.files, job.compression).await;
            if let Err(e) = &result {
                warn!("Session {}: merge failed: {}", session_id, e);
            }

            session
                .with_session_mut(|s| s.finish_merge(&job, result))
                .await
                .or_not_found(SESSION_NOT_FOUND)?;
        }
        Err(e) => {
            session
                .with_session_mut(|s| s.flash_error(&e))
                .await
                .or_not_found(SESSION_NOT_FOUND)?;
        }
    }

    respond(&state, &session, &headers).await
}

/// Discard the merged output but keep the files ("New Merge").
pub async fn start_over(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    session
        .with_session_mut(|s| s.merge.start_over())
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    respond(&state, &session, &headers).await
}

/// Remove every file and reset the session ("Clear All").
pub async fn clear_files(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    session
        .with_session_mut(|s| {
            s.clear();
            s.set_flash(FlashKind::Info, "All files cleared");
        })
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    respond(&state, &session, &headers).await
}
