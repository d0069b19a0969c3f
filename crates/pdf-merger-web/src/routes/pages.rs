//! Page routes - full HTML page renders.

use axum::extract::{Path, State};
use std::sync::Arc;

use super::SESSION_NOT_FOUND;
use crate::helpers::{OptionExt, RouteResult};
use crate::state::AppState;
use crate::templates::{IndexTemplate, SessionTemplate, WorkspaceView, tool_hint};

/// Landing page with upload form.
pub async fn index(State(state): State<Arc<AppState>>) -> IndexTemplate {
    IndexTemplate {
        tool_hint: tool_hint(state.tool_version.as_deref()),
        tool_available: state.tool_version.is_some(),
        max_upload_mb: state.config.max_upload_mb,
    }
}

/// Full session page (target of every redirect).
pub async fn view_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> RouteResult<SessionTemplate> {
    let session = state
        .get_session(&session_id)
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    let id = session.id();
    let view = session
        .with_session_mut(|s| WorkspaceView::take(id, s))
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    Ok(SessionTemplate {
        view,
        tool_hint: tool_hint(state.tool_version.as_deref()),
        tool_available: state.tool_version.is_some(),
        max_upload_mb: state.config.max_upload_mb,
    })
}
