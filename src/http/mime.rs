//! Content-type lookup for static assets

use std::path::Path;

/// Guess the `Content-Type` of a file from its extension
///
/// # Examples
/// ```
/// use std::path::Path;
/// use tinyroute::http::mime::content_type_for;
/// assert_eq!(content_type_for(Path::new("index.html")), "text/html; charset=utf-8");
/// assert_eq!(content_type_for(Path::new("app.JS")), "application/javascript");
/// assert_eq!(content_type_for(Path::new("LICENSE")), "application/octet-stream");
/// ```
pub fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt") => "text/plain; charset=utf-8",
        Some("js" | "mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
