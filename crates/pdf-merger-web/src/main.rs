//! PDF Merger Web - Web server for merging PDF documents.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::http::{HeaderValue, header};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use clap::Parser;
use pdf_merger_core::AppConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use state::AppState;

/// Resolve the static files directory.
///
/// Priority:
/// 1. Explicit path if provided
/// 2. ./static if it exists
/// 3. Crate's built-in static directory
fn resolve_static_dir(explicit_path: Option<&str>) -> PathBuf {
    if let Some(path) = explicit_path {
        return PathBuf::from(path);
    }

    // Try ./static first (works in development and when running from crate dir)
    let local_static = PathBuf::from("static");
    if local_static.exists() && local_static.is_dir() {
        return local_static;
    }

    // Fall back to compiled-in path (useful for cargo run)
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}

#[derive(Parser, Debug)]
#[command(name = "pdf-merger-web")]
#[command(author, version, about = "PDF Merger Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Ghostscript executable (overrides config)
    #[arg(long, env = "GHOSTSCRIPT_PATH")]
    gs_path: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Static files directory (defaults to ./static or crate's static dir)
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<String>,
}

/// Build the application router.
fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let body_limit = state.config.max_upload_mb.saturating_mul(1024 * 1024);

    Router::new()
        // Pages
        .route("/", get(routes::index))
        .route("/session/{session_id}", get(routes::view_session))
        // API endpoints - redirects or HTML fragments (HTMX)
        .route("/api/upload", post(routes::upload_pdfs))
        .route("/api/session/{session_id}/upload", post(routes::add_files))
        .route("/api/session/{session_id}/move", post(routes::move_file))
        .route(
            "/api/session/{session_id}/remove/{index}",
            post(routes::remove_file),
        )
        .route("/api/session/{session_id}/settings", post(routes::update_settings))
        .route("/api/session/{session_id}/merge", post(routes::merge_pdfs))
        .route("/api/session/{session_id}/start-over", post(routes::start_over))
        .route("/api/session/{session_id}/clear", post(routes::clear_files))
        // API endpoints - binary responses
        .route("/api/session/{session_id}/download", get(routes::download_pdf))
        // Static files with Cache-Control: no-cache (cache but always revalidate via ETag)
        .nest_service(
            "/static",
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-cache"),
                ))
                .service(ServeDir::new(static_dir)),
        )
        // Middleware
        // Cache-Control for HTML fragments - prevents bfcache issues with HTMX
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    if let Some(gs_path) = args.gs_path {
        config.compression.ghostscript_path = gs_path;
    }

    let state = Arc::new(AppState::new(config).await);

    match &state.tool_version {
        Some(version) => info!(
            "Using Ghostscript {} ({})",
            version,
            state.config.compression.ghostscript_path.display()
        ),
        None => warn!(
            "Ghostscript not found at {}; merges will not be compressed",
            state.config.compression.ghostscript_path.display()
        ),
    }

    // Spawn background task for session cleanup
    let cleanup_state = Arc::clone(&state);
    tokio::spawn(async move {
        let cleanup_interval = cleanup_state.config.session.cleanup_interval();
        loop {
            tokio::time::sleep(cleanup_interval).await;
            let removed = cleanup_state.cleanup_old_sessions().await;
            debug!("Completed session cleanup ({} expired)", removed);
        }
    });

    let static_dir = resolve_static_dir(args.static_dir.as_deref());
    let app = build_router(state, &static_dir);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Document, Object, Stream};
    use pdf_merger_core::{CompressionLevel, GhostscriptCompressor, PdfMerger};
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "pdf-merger-test-boundary";

    fn test_router() -> Router {
        let config = AppConfig::default();
        let compressor = GhostscriptCompressor::new(
            "/nonexistent/pdf-merger-test/gs",
            Duration::from_secs(5),
        );
        let merger = PdfMerger::with_compressor(Arc::new(compressor), config.compression.clone());
        let state = AppState::with_merger(config, Arc::new(merger), None);
        build_router(Arc::new(state), &resolve_static_dir(None))
    }

    /// One-page PDF showing `label`.
    fn make_pdf(label: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(label)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            (
                "Resources",
                Object::Dictionary(Dictionary::from_iter([(
                    "Font",
                    Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
                )])),
            ),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; \
                     filename=\"{name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, files: &[(&str, &[u8])], htmx: bool) -> Request<Body> {
        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if htmx {
            builder = builder.header("HX-Request", "true");
        }
        builder.body(Body::from(multipart_body(files))).unwrap()
    }

    fn form_request(uri: &str, form: &str, htmx: bool) -> Request<Body> {
        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        if htmx {
            builder = builder.header("HX-Request", "true");
        }
        builder.body(Body::from(form.to_string())).unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn body_text(response: axum::response::Response) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    /// Upload files to a new session and return the session page URL.
    async fn create_session(app: &Router, files: &[(&str, &[u8])]) -> String {
        let response = app
            .clone()
            .oneshot(upload_request("/api/upload", files, false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    fn api_url(session_url: &str, action: &str) -> String {
        let id = session_url.trim_start_matches("/session/");
        format!("/api/session/{id}/{action}")
    }

    #[tokio::test]
    async fn test_index_page() {
        let response = test_router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store, max-age=0");
        let html = body_text(response).await;
        assert!(html.contains("action=\"/api/upload\""));
        assert!(html.contains("Ghostscript not found"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = test_router();
        for uri in [
            "/session/not-a-uuid".to_string(),
            format!("/session/{}", uuid::Uuid::new_v4()),
            format!("/api/session/{}/download", uuid::Uuid::new_v4()),
        ] {
            let response = app
                .clone()
                .oneshot(Request::get(uri.as_str()).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_upload_without_files_is_rejected() {
        let response = test_router()
            .oneshot(upload_request("/api/upload", &[], false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_htmx_upload_redirects_with_header() {
        let a = make_pdf("A");
        let response = test_router()
            .oneshot(upload_request("/api/upload", &[("a.pdf", a.as_slice())], true))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let target = response.headers()["HX-Redirect"].to_str().unwrap();
        assert!(target.starts_with("/session/"));
    }

    #[tokio::test]
    async fn test_upload_merge_download_flow() {
        let app = test_router();
        let (a, b) = (make_pdf("Alpha"), make_pdf("Beta"));
        let session_url = create_session(&app, &[("a.pdf", a.as_slice()), ("b.pdf", b.as_slice())]).await;

        // Session page lists both files in upload order
        let response = app
            .clone()
            .oneshot(Request::get(session_url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.find("a.pdf").unwrap() < html.find("b.pdf").unwrap());

        // Nothing to download before merging
        let response = app
            .clone()
            .oneshot(
                Request::get(api_url(&session_url, "download"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(form_request(
                &api_url(&session_url, "settings"),
                "compression=none&output_name=combined",
                false,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "merge"), "", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], session_url.as_str());

        let response = app
            .clone()
            .oneshot(
                Request::get(api_url(&session_url, "download"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.contains("filename=\"combined.pdf\""));

        let pdf = body_bytes(response).await;
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn test_htmx_move_returns_reordered_fragment() {
        let app = test_router();
        let (a, b) = (make_pdf("A"), make_pdf("B"));
        let session_url = create_session(&app, &[("first.pdf", a.as_slice()), ("second.pdf", b.as_slice())]).await;

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "move"), "from=1&to=0", true))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("id=\"workspace\""));
        assert!(!html.contains("<html"));
        assert!(html.find("second.pdf").unwrap() < html.find("first.pdf").unwrap());
    }

    #[tokio::test]
    async fn test_move_out_of_range_shows_error() {
        let app = test_router();
        let a = make_pdf("A");
        let session_url = create_session(&app, &[("a.pdf", a.as_slice())]).await;

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "move"), "from=0&to=5", true))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("flash-error"));
    }

    #[tokio::test]
    async fn test_merge_empty_session_shows_error() {
        let app = test_router();
        let a = make_pdf("A");
        let session_url = create_session(&app, &[("a.pdf", a.as_slice())]).await;

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "remove/0"), "", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "merge"), "", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("flash-error"));
        assert!(!html.contains("/download"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_named_in_failure() {
        let app = test_router();
        let a = make_pdf("A");
        let session_url =
            create_session(&app, &[("a.pdf", a.as_slice()), ("broken.pdf", &b"definitely not a pdf"[..])]).await;

        // Unreadable files are listed, not rejected
        let response = app
            .clone()
            .oneshot(Request::get(session_url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("unreadable"));

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "merge"), "", true))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("Merge failed"));
        assert!(html.contains("broken.pdf"));
    }

    #[tokio::test]
    async fn test_missing_tool_still_delivers_pdf() {
        let app = test_router();
        let (a, b) = (make_pdf("A"), make_pdf("B"));
        let session_url = create_session(&app, &[("a.pdf", a.as_slice()), ("b.pdf", b.as_slice())]).await;

        let level = CompressionLevel::High.as_str();
        app.clone()
            .oneshot(form_request(
                &api_url(&session_url, "settings"),
                &format!("compression={level}"),
                true,
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "merge"), "", true))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("flash-warning"));
        assert!(html.contains("/download"));
    }

    #[tokio::test]
    async fn test_duplicate_upload_is_skipped() {
        let app = test_router();
        let a = make_pdf("A");
        let session_url = create_session(&app, &[("a.pdf", a.as_slice())]).await;

        let response = app
            .clone()
            .oneshot(upload_request(&api_url(&session_url, "upload"), &[("a.pdf", a.as_slice())], true))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("skipped already listed: a.pdf"));
        assert_eq!(html.matches("class=\"file-row\"").count(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_session() {
        let app = test_router();
        let a = make_pdf("A");
        let session_url = create_session(&app, &[("a.pdf", a.as_slice())]).await;

        let response = app
            .clone()
            .oneshot(form_request(&api_url(&session_url, "clear"), "", true))
            .await
            .unwrap();
        let html = body_text(response).await;
        assert!(html.contains("All files cleared"));
        assert!(html.contains("No files yet"));
    }
}
