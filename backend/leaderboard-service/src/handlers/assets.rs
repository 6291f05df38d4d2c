//! Static asset serving for the web client.

use actix_web::{web, HttpRequest, HttpResponse};
use mime::Mime;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::messages;

const INDEX_DOCUMENT: &str = "index.html";

pub struct StaticAssets {
    pub root: PathBuf,
}

impl StaticAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Map a request path onto a file under `root`.
///
/// Returns `None` when the path is not valid UTF-8 once percent-decoded or
/// when `..` segments would climb above `root`.
pub fn resolve_asset_path(root: &Path, request_path: &str) -> Option<PathBuf> {
    if request_path == "/" {
        return Some(root.join(INDEX_DOCUMENT));
    }

    let decoded = urlencoding::decode(request_path).ok()?;
    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(&['/', '\\'][..]) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s if s.contains('\0') => return None,
            s => segments.push(s),
        }
    }

    Some(segments.iter().fold(root.to_path_buf(), |path, s| path.join(s)))
}

pub fn content_type_for(path: &Path) -> Mime {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html") => mime::TEXT_HTML_UTF_8,
        Some("js") => mime::APPLICATION_JAVASCRIPT_UTF_8,
        Some("css") => mime::TEXT_CSS_UTF_8,
        Some("json") => mime::APPLICATION_JSON,
        Some("svg") => mime::IMAGE_SVG,
        Some("png") => mime::IMAGE_PNG,
        Some("jpg") | Some("jpeg") => mime::IMAGE_JPEG,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type(mime::TEXT_PLAIN_UTF_8)
        .body("Not Found")
}

/// Fallback handler for every path outside the API.
pub async fn serve_asset(req: HttpRequest, assets: web::Data<StaticAssets>) -> HttpResponse {
    let Some(file_path) = resolve_asset_path(&assets.root, req.path()) else {
        debug!("Rejected asset path: {}", req.path());
        return HttpResponse::BadRequest()
            .content_type(mime::TEXT_PLAIN_UTF_8)
            .body(messages::INVALID_PATH);
    };

    match fs::metadata(&file_path).await {
        Ok(meta) if meta.is_file() => {}
        _ => return not_found(),
    }

    match fs::read(&file_path).await {
        Ok(bytes) => HttpResponse::Ok()
            .content_type(content_type_for(&file_path))
            .body(bytes),
        Err(e) => {
            debug!("Failed to read asset {}: {}", file_path.display(), e);
            not_found()
        }
    }
}
