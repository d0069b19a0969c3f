//! Askama templates for HTMX responses.
//!
//! ## HTMX Patterns Used
//!
//! - **Fragment swaps**: Every session action targets `#workspace` and gets
//!   the re-rendered workspace back, so the server stays the only source of
//!   UI state
//!
//! - **Graceful degradation**: Forms carry a plain `action`, so without
//!   JavaScript the same handlers answer with `303 See Other`
//!
//! - **Disabled Elements**: `hx-disabled-elt` prevents double submits while
//!   a merge is running
//!
//! ## Template Structure
//!
//! - `base.html` - Common layout with CSS/JS
//! - `index.html` - Landing page with upload form
//! - `session.html` - Full page for one session
//! - `partials/workspace.html` - File list, settings and result

use askama::Template;
use askama_web::WebTemplate;
use pdf_merger_core::{
    CompressionOption, MergeStats, SessionStage, compression_options, format_size,
};
use uuid::Uuid;

use crate::state::{Flash, Session};

// =============================================================================
// View Models
// =============================================================================

/// One row of the file list.
pub struct FileRow {
    /// 0-based position, used in form values
    pub index: usize,
    /// 1-based position, shown to the user
    pub position: usize,
    pub name: String,
    pub size: String,
    /// `None` if the file could not be read at upload time
    pub pages: Option<usize>,
    pub is_first: bool,
    pub is_last: bool,
}

impl FileRow {
    /// Target index for the "move up" button.
    pub const fn up(&self) -> usize {
        self.index.saturating_sub(1)
    }

    /// Target index for the "move down" button.
    pub const fn down(&self) -> usize {
        self.index + 1
    }
}

pub struct FlashView {
    pub kind: &'static str,
    pub message: String,
}

impl From<Flash> for FlashView {
    fn from(flash: Flash) -> Self {
        Self {
            kind: flash.kind.css_class(),
            message: flash.message,
        }
    }
}

/// Size figures of the last merge, preformatted.
pub struct StatsView {
    pub files: usize,
    pub pages: usize,
    pub original_size: String,
    pub final_size: String,
    pub compressed: bool,
    pub level: &'static str,
    /// e.g. "42.5%"; `None` when the output is not smaller
    pub reduction: Option<String>,
}

impl From<&MergeStats> for StatsView {
    fn from(stats: &MergeStats) -> Self {
        let percent = stats.reduction_percent();
        Self {
            files: stats.files,
            pages: stats.pages,
            original_size: format_size(stats.original_size),
            final_size: format_size(stats.final_size),
            compressed: stats.compressed,
            level: stats.level.label(),
            reduction: (percent > 0.0).then(|| format!("{percent:.1}%")),
        }
    }
}

/// Everything the workspace partial renders.
pub struct WorkspaceView {
    pub session_id: String,
    pub files: Vec<FileRow>,
    pub total_size: String,
    pub total_pages: usize,
    pub options: Vec<CompressionOption>,
    pub output_name: String,
    pub stage: &'static str,
    pub failure: Option<String>,
    pub flash: Option<FlashView>,
    pub stats: Option<StatsView>,
    pub can_merge: bool,
    pub has_output: bool,
}

impl WorkspaceView {
    /// Build the view and consume the pending flash message.
    pub fn take(id: Uuid, session: &mut Session) -> Self {
        let flash = session.flash.take().map(FlashView::from);
        let merge = &session.merge;
        let count = merge.files().len();

        let files: Vec<FileRow> = merge
            .files()
            .iter()
            .enumerate()
            .map(|(index, file)| FileRow {
                index,
                position: index + 1,
                name: file.name().to_string(),
                size: format_size(file.size()),
                pages: session.page_counts.get(&file.id()).copied().flatten(),
                is_first: index == 0,
                is_last: index + 1 == count,
            })
            .collect();

        let total_pages = files.iter().filter_map(|row| row.pages).sum();

        let (stage, failure) = match merge.stage() {
            SessionStage::Idle => ("No files yet", None),
            SessionStage::FilesLoaded => ("Ready to merge", None),
            SessionStage::Merged => ("Merged", None),
            SessionStage::Compressed => ("Merged and compressed", None),
            SessionStage::Downloaded => ("Downloaded", None),
            SessionStage::Failed(reason) => ("Merge failed", Some(reason.clone())),
        };

        Self {
            session_id: id.to_string(),
            files,
            total_size: format_size(merge.files().total_size()),
            total_pages,
            options: compression_options(merge.settings().compression),
            output_name: merge.settings().output_name().to_string(),
            stage,
            failure,
            flash,
            stats: merge.report().map(|report| StatsView::from(&report.stats)),
            can_merge: count > 0,
            has_output: merge.stage().has_output(),
        }
    }
}

/// Availability hint for the compression tool.
pub fn tool_hint(version: Option<&str>) -> String {
    match version {
        Some(version) => format!("Ghostscript {version} found: compression is available."),
        None => "Ghostscript not found: merged files will be delivered uncompressed.".to_string(),
    }
}

// =============================================================================
// Full Page Templates
// =============================================================================

/// Landing page with upload form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub tool_hint: String,
    pub tool_available: bool,
    pub max_upload_mb: usize,
}

/// Full session page.
///
/// Renders the workspace partial inline via `{% include %}`.
#[derive(Template, WebTemplate)]
#[template(path = "session.html")]
pub struct SessionTemplate {
    pub view: WorkspaceView,
    pub tool_hint: String,
    pub tool_available: bool,
    pub max_upload_mb: usize,
}

// =============================================================================
// Fragment Templates (HTMX partial responses)
// =============================================================================

/// Workspace fragment returned by every session action.
#[derive(Template, WebTemplate)]
#[template(path = "partials/workspace.html")]
pub struct WorkspaceTemplate {
    pub view: WorkspaceView,
    pub max_upload_mb: usize,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pdf_merger_core::{CompressionLevel, MergeSession, UploadedFile};
    use std::collections::HashMap;
    use std::time::Instant;

    fn session(names: &[&str]) -> Session {
        let mut merge = MergeSession::new(CompressionLevel::High);
        let mut page_counts = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            let file = UploadedFile::new(*name, vec![0u8; 2048]);
            page_counts.insert(file.id(), (i % 2 == 0).then_some(3));
            merge.add_file(file).unwrap();
        }
        Session {
            merge,
            page_counts,
            flash: None,
            last_active: Instant::now(),
        }
    }

    #[test]
    fn test_rows_follow_list_order() {
        let mut s = session(&["a.pdf", "b.pdf", "c.pdf"]);
        let view = WorkspaceView::take(Uuid::nil(), &mut s);

        let names: Vec<_> = view.files.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf", "c.pdf"]);
        assert!(view.files[0].is_first);
        assert!(view.files[2].is_last);
        assert_eq!(view.files[1].pages, None);
        assert_eq!(view.total_pages, 6);
        assert_eq!(view.files[0].size, "2.0 KB");
        assert!(view.can_merge);
        assert!(!view.has_output);
    }

    #[test]
    fn test_flash_is_consumed() {
        let mut s = session(&["a.pdf"]);
        s.set_flash(crate::state::FlashKind::Error, "boom");

        let first = WorkspaceView::take(Uuid::nil(), &mut s);
        assert_eq!(first.flash.unwrap().kind, "error");

        let second = WorkspaceView::take(Uuid::nil(), &mut s);
        assert!(second.flash.is_none());
    }

    #[test]
    fn test_selected_compression() {
        let mut s = session(&[]);
        let view = WorkspaceView::take(Uuid::nil(), &mut s);

        let selected: Vec<_> = view.options.iter().filter(|o| o.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].value, "high");
        assert!(!view.can_merge);
    }

    #[test]
    fn test_workspace_renders_rows() {
        let mut s = session(&["first.pdf", "second.pdf"]);
        let html = WorkspaceTemplate {
            view: WorkspaceView::take(Uuid::nil(), &mut s),
            max_upload_mb: 300,
        }
        .render()
        .unwrap();

        let first = html.find("first.pdf").unwrap();
        let second = html.find("second.pdf").unwrap();
        assert!(first < second);
        assert!(html.contains("id=\"workspace\""));
    }
}
