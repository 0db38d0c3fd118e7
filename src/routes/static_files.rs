//! Browser scripts served from the public directory
//!
//! `/` maps to `index.html`. Only plain file names under the public
//! directory are served; anything with a path separator or `..` is
//! refused before touching the filesystem.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

use crate::routes::response::{error_response, not_found_response};

/// Whether a request path names a servable asset
pub fn is_asset_path(path: &str) -> bool {
    path == "/" || asset_name(path).is_some()
}

/// File name for a request path, if it is a plain, known asset
fn asset_name(path: &str) -> Option<&str> {
    let name = if path == "/" {
        "index.html"
    } else {
        path.strip_prefix('/')?
    };

    let plain = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..");

    (plain && guess_content_type(name).is_some()).then_some(name)
}

/// MIME type from file extension; `None` for files that are never served
fn guess_content_type(name: &str) -> Option<&'static str> {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("html") | Some("htm") => Some("text/html; charset=utf-8"),
        Some("css") => Some("text/css; charset=utf-8"),
        Some("js") | Some("mjs") => Some("application/javascript; charset=utf-8"),
        _ => None,
    }
}

/// Serve `request_path` from `public_dir`
pub async fn serve(public_dir: &Path, method: &Method, request_path: &str) -> Response<Full<Bytes>> {
    let Some(name) = asset_name(request_path) else {
        warn!(path = request_path, "Refused asset path");
        return not_found_response(request_path);
    };
    let content_type = guess_content_type(name).unwrap_or("application/octet-stream");

    let content = match tokio::fs::read(public_dir.join(name)).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(file = name, "Asset not found");
            return not_found_response(request_path);
        }
        Err(e) => {
            warn!(file = name, error = %e, "Failed to read asset");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let body = if method == Method::HEAD {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Cache-Control", "no-cache")
        .body(Full::new(body))
        .unwrap()
}
