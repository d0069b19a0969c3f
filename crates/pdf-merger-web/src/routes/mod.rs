//! HTTP route handlers for the PDF merger web application.
//!
//! Session actions answer htmx requests with the re-rendered workspace
//! fragment and plain form posts with a redirect to the session page.
//! The PDF download is the only binary response.

mod download;
mod files;
mod merge;
mod pages;
mod settings;
mod upload;

pub use download::download_pdf;
pub use files::{move_file, remove_file};
pub use merge::{clear_files, merge_pdfs, start_over};
pub use pages::{index, view_session};
pub use settings::update_settings;
pub use upload::{add_files, upload_pdfs};

use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize as SerdeDeserialize;
use uuid::Uuid;

use crate::helpers::{OptionExt, RouteResult, is_htmx, redirect};
use crate::state::{AppState, SessionRef};
use crate::templates::{WorkspaceTemplate, WorkspaceView};

const SESSION_NOT_FOUND: &str = "Session not found";

/// Form data for moving one file.
#[derive(SerdeDeserialize)]
pub struct MoveForm {
    pub from: usize,
    pub to: usize,
}

/// Settings update from form data.
#[derive(SerdeDeserialize)]
pub struct SettingsForm {
    pub compression: Option<String>,
    pub output_name: Option<String>,
}

/// Canonical URL of a session page.
pub fn session_url(id: Uuid) -> String {
    format!("/session/{id}")
}

/// Answer a session action.
///
/// HTMX: returns the workspace fragment (consuming the flash message).
/// Plain forms: redirects to the session page, which shows the flash.
async fn respond(
    state: &AppState,
    session: &SessionRef<'_>,
    headers: &HeaderMap,
) -> RouteResult<Response> {
    let id = session.id();

    if !is_htmx(headers) {
        return redirect(headers, &session_url(id));
    }

    let view = session
        .with_session_mut(|s| WorkspaceView::take(id, s))
        .await
        .or_not_found(SESSION_NOT_FOUND)?;

    Ok(WorkspaceTemplate {
        view,
        max_upload_mb: state.config.max_upload_mb,
    }
    .into_response())
}
