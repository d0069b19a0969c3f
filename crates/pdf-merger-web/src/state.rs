use pdf_merger_core::{
    AppConfig, Error, GhostscriptCompressor, MergeJob, MergeReport, MergeSession, PdfMerger,
    UploadedFile, format_size,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Severity of a one-shot message shown above the file list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Info,
    Success,
    Warning,
    Error,
}

impl FlashKind {
    /// CSS modifier used by the templates
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Message carried across a POST-Redirect-GET round trip
#[derive(Debug, Clone)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

/// Session data for one user's merge
pub struct Session {
    pub merge: MergeSession,
    /// Page counts probed at upload time, keyed by file id.
    /// `None` means the file could not be read.
    pub page_counts: HashMap<Uuid, Option<usize>>,
    pub flash: Option<Flash>,
    pub last_active: Instant,
}

/// What happened to the files of one upload request
#[derive(Debug, Default)]
pub struct UploadSummary {
    pub added: Vec<String>,
    pub duplicates: Vec<String>,
    pub rejected: Vec<String>,
}

impl Session {
    fn new(merge: MergeSession) -> Self {
        Self {
            merge,
            page_counts: HashMap::new(),
            flash: None,
            last_active: Instant::now(),
        }
    }

    pub fn set_flash(&mut self, kind: FlashKind, message: impl Into<String>) {
        self.flash = Some(Flash {
            kind,
            message: message.into(),
        });
    }

    pub fn flash_error(&mut self, error: &Error) {
        self.set_flash(FlashKind::Error, error.to_string());
    }

    /// Append uploaded files, skipping names that are already listed.
    pub fn add_uploads(&mut self, uploads: Vec<(UploadedFile, Option<usize>)>) -> UploadSummary {
        let mut summary = UploadSummary::default();

        for (file, pages) in uploads {
            let name = file.name().to_string();
            if self.merge.files().contains_name(&name) {
                summary.duplicates.push(name);
                continue;
            }

            let id = file.id();
            match self.merge.add_file(file) {
                Ok(_) => {
                    self.page_counts.insert(id, pages);
                    summary.added.push(name);
                }
                Err(_) => summary.rejected.push(name),
            }
        }

        self.flash = upload_flash(&summary);
        summary
    }

    /// Record a finished merge unless the file list changed while it ran.
    pub fn finish_merge(&mut self, job: &MergeJob, result: pdf_merger_core::Result<MergeReport>) {
        let unchanged = job.files.len() == self.merge.files().len()
            && job
                .files
                .iter()
                .zip(self.merge.files())
                .all(|(a, b)| a.id() == b.id());

        if !unchanged {
            self.set_flash(
                FlashKind::Warning,
                "The file list changed while merging. Merge again to include the changes.",
            );
            return;
        }

        match self.merge.complete_merge(result) {
            Ok(report) => {
                let stats = &report.stats;
                let flash = match &report.notice {
                    Some(notice) => Flash {
                        kind: FlashKind::Warning,
                        message: format!(
                            "Merged {} files into {} pages. Compression was skipped: {notice}",
                            stats.files, stats.pages
                        ),
                    },
                    None => Flash {
                        kind: FlashKind::Success,
                        message: format!(
                            "Merged {} files into {} pages ({})",
                            stats.files,
                            stats.pages,
                            format_size(stats.final_size)
                        ),
                    },
                };
                self.flash = Some(flash);
            }
            Err(e) => self.flash_error(&e),
        }
    }

    /// Remove the file at `index` along with its probe result.
    pub fn remove_file(&mut self, index: usize) -> pdf_merger_core::Result<UploadedFile> {
        let file = self.merge.remove(index)?;
        self.page_counts.remove(&file.id());
        Ok(file)
    }

    pub fn clear(&mut self) {
        self.merge.reset();
        self.page_counts.clear();
    }
}

fn upload_flash(summary: &UploadSummary) -> Option<Flash> {
    let mut parts = Vec::new();
    if !summary.added.is_empty() {
        parts.push(format!("Added {} file(s)", summary.added.len()));
    }
    if !summary.duplicates.is_empty() {
        parts.push(format!(
            "skipped already listed: {}",
            summary.duplicates.join(", ")
        ));
    }
    if !summary.rejected.is_empty() {
        parts.push(format!("rejected empty: {}", summary.rejected.join(", ")));
    }
    if parts.is_empty() {
        return None;
    }

    let kind = if summary.duplicates.is_empty() && summary.rejected.is_empty() {
        FlashKind::Info
    } else {
        FlashKind::Warning
    };
    Some(Flash {
        kind,
        message: parts.join("; "),
    })
}

/// Global application state
pub struct AppState {
    /// Active sessions indexed by UUID
    sessions: RwLock<HashMap<Uuid, Session>>,
    pub config: AppConfig,
    pub merger: Arc<PdfMerger>,
    /// `gs --version` output at startup, `None` if the tool is missing
    pub tool_version: Option<String>,
}

impl AppState {
    /// Build state from configuration, probing the compression tool once.
    pub async fn new(config: AppConfig) -> Self {
        let tool_version = GhostscriptCompressor::from_config(&config.compression)
            .version()
            .await;
        let merger = Arc::new(PdfMerger::new(&config.compression));
        Self::with_merger(config, merger, tool_version)
    }

    pub fn with_merger(
        config: AppConfig,
        merger: Arc<PdfMerger>,
        tool_version: Option<String>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
            merger,
            tool_version,
        }
    }

    /// Create an empty session and return its ID.
    pub async fn create_session(&self) -> Uuid {
        let id = Uuid::new_v4();
        let session = Session::new(MergeSession::new(
            self.config.compression.default_level,
        ));
        self.sessions.write().await.insert(id, session);
        id
    }

    /// Get a session by ID string.
    ///
    /// Returns `None` if the ID is not a valid UUID or session doesn't exist.
    pub async fn get_session(&self, id: &str) -> Option<SessionRef<'_>> {
        let uuid = Uuid::parse_str(id).ok()?;
        let sessions = self.sessions.read().await;
        if sessions.contains_key(&uuid) {
            Some(SessionRef {
                id: uuid,
                state: self,
            })
        } else {
            None
        }
    }

    /// Drop sessions idle for longer than the configured maximum age.
    ///
    /// Returns the number of sessions removed.
    pub async fn cleanup_old_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let now = Instant::now();
        let max_age = self.config.session.max_age();

        let before = sessions.len();
        sessions.retain(|_, session| now.duration_since(session.last_active) < max_age);
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// A borrowed reference to a session that provides safe access patterns.
///
/// Locks are only taken inside synchronous closures, so no guard is ever
/// held across an `.await`:
///
/// ```ignore
/// // Lock is released before the merge runs
/// let job = session.with_session(|s| s.merge.prepare_merge()).await?;
/// let result = merger.run(&job.files, job.compression).await;
/// session.with_session_mut(|s| s.finish_merge(&job, result)).await;
/// ```
pub struct SessionRef<'a> {
    id: Uuid,
    state: &'a AppState,
}

impl SessionRef<'_> {
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Access session data immutably within a closure.
    ///
    /// The closure runs synchronously while holding a read lock.
    /// The lock is released before this method returns.
    pub async fn with_session<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&Session) -> R,
    {
        let sessions = self.state.sessions.read().await;
        sessions.get(&self.id).map(f)
    }

    /// Access session data mutably within a closure.
    ///
    /// Also marks the session as active, postponing its expiry.
    pub async fn with_session_mut<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.state.sessions.write().await;
        sessions.get_mut(&self.id).map(|session| {
            session.last_active = Instant::now();
            f(session)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pdf_merger_core::CompressionLevel;
    use std::time::Duration;

    fn session() -> Session {
        Session::new(MergeSession::new(CompressionLevel::None))
    }

    fn upload(name: &str) -> (UploadedFile, Option<usize>) {
        (UploadedFile::new(name, name.as_bytes().to_vec()), Some(1))
    }

    #[test]
    fn test_duplicate_names_are_skipped() {
        let mut session = session();
        session.add_uploads(vec![upload("a.pdf"), upload("b.pdf")]);

        let summary = session.add_uploads(vec![upload("a.pdf"), upload("c.pdf")]);

        assert_eq!(summary.added, ["c.pdf"]);
        assert_eq!(summary.duplicates, ["a.pdf"]);
        assert_eq!(session.merge.files().names(), ["a.pdf", "b.pdf", "c.pdf"]);
        assert_eq!(session.flash.unwrap().kind, FlashKind::Warning);
    }

    #[test]
    fn test_empty_upload_is_rejected() {
        let mut session = session();
        let summary = session.add_uploads(vec![(UploadedFile::new("empty.pdf", Vec::new()), None)]);

        assert_eq!(summary.rejected, ["empty.pdf"]);
        assert!(session.merge.files().is_empty());
        assert!(session.page_counts.is_empty());
    }

    #[test]
    fn test_remove_drops_page_count() {
        let mut session = session();
        session.add_uploads(vec![upload("a.pdf")]);
        assert_eq!(session.page_counts.len(), 1);

        session.remove_file(0).unwrap();
        assert!(session.page_counts.is_empty());
    }

    #[test]
    fn test_stale_merge_result_is_dropped() {
        let mut session = session();
        session.add_uploads(vec![upload("a.pdf"), upload("b.pdf")]);
        let job = session.merge.prepare_merge().unwrap();

        session.remove_file(0).unwrap();
        session.finish_merge(&job, Err(Error::EmptyInput));

        assert!(session.merge.report().is_none());
        assert_eq!(session.flash.unwrap().kind, FlashKind::Warning);
    }

    #[test]
    fn test_failed_merge_sets_error_flash() {
        let mut session = session();
        session.add_uploads(vec![upload("a.pdf")]);
        let job = session.merge.prepare_merge().unwrap();

        session.finish_merge(
            &job,
            Err(Error::CorruptInput {
                name: "a.pdf".to_string(),
                reason: "no header".to_string(),
            }),
        );

        let flash = session.flash.unwrap();
        assert_eq!(flash.kind, FlashKind::Error);
        assert!(flash.message.contains("a.pdf"));
    }

    #[tokio::test]
    async fn test_cleanup_removes_idle_sessions() {
        let mut config = AppConfig::default();
        config.session.max_age_secs = 0;
        let merger = Arc::new(PdfMerger::new(&config.compression));
        let state = AppState::with_merger(config, merger, None);

        state.create_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(state.cleanup_old_sessions().await, 1);
        assert_eq!(state.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_session_lookup() {
        let state = AppState::with_merger(
            AppConfig::default(),
            Arc::new(PdfMerger::new(&AppConfig::default().compression)),
            None,
        );
        assert!(state.get_session("not-a-uuid").await.is_none());
        assert!(state.get_session(&Uuid::new_v4().to_string()).await.is_none());

        let id = state.create_session().await;
        assert!(state.get_session(&id.to_string()).await.is_some());
    }
}
