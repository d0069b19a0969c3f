//! Settings routes - compression level and output name.

use axum::extract::{Form, Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use pdf_merger_core::CompressionLevel;
use std::sync::Arc;

use super::{SESSION_NOT_FOUND, SettingsForm, respond};
use crate::helpers::{OptionExt, RouteResult};
use crate::state::{AppState, FlashKind};

/// Update session settings.
///
/// Missing fields are left alone; an empty output name keeps the current
/// one. Settings apply to the next merge and do not discard a finished one.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Form(update): Form<SettingsForm>,
) -> RouteResult<Response> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    session
        .with_session_mut(|s| {
            if let Some(ref compression) = update.compression {
                match CompressionLevel::from_name(compression) {
                    Some(level) => s.merge.set_compression(level),
                    None => s.set_flash(
                        FlashKind::Error,
                        format!("Unknown compression level '{compression}'"),
                    ),
                }
            }
            if let Some(ref name) = update.output_name
                && !name.trim().is_empty()
                && let Err(e) = s.merge.set_output_name(name)
            {
                s.flash_error(&e);
            }
        })
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    respond(&state, &session, &headers).await
}
