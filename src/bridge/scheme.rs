//! Asset scheme handler.
//!
//! The UI host resolves `http://prism/<relative-path>` URLs against the
//! process working directory; the MIME type derives from the file
//! extension.

use std::path::{Path, PathBuf};

/// Host name the scheme handler claims.
pub const SCHEME_HOST: &str = "prism";

/// Resolves a scheme URL to a filesystem path under `base_dir`.
///
/// Returns `None` for URLs outside the scheme, and for paths that escape
/// the base directory through parent components.
#[must_use]
pub fn resolve_scheme_url(url: &str, base_dir: &Path) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))?;
    let relative = rest.strip_prefix(SCHEME_HOST)?;
    let relative = relative.strip_prefix('/').unwrap_or(relative);
    let relative = relative.split(['?', '#']).next().unwrap_or(relative);

    let path = Path::new(relative);
    if path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return None;
    }
    Some(base_dir.join(path))
}

/// MIME type for a file extension; unknown extensions fall back to
/// `application/octet-stream`.
#[must_use]
pub fn mime_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("html" | "htm") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        Some("txt") => "text/plain",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths() {
        let base = Path::new("/srv/app");
        assert_eq!(
            resolve_scheme_url("http://prism/ui/index.html", base),
            Some(PathBuf::from("/srv/app/ui/index.html"))
        );
    }

    #[test]
    fn strips_query_and_fragment() {
        let base = Path::new("/srv/app");
        assert_eq!(
            resolve_scheme_url("http://prism/ui/app.js?v=3", base),
            Some(PathBuf::from("/srv/app/ui/app.js"))
        );
    }

    #[test]
    fn rejects_foreign_hosts_and_escapes() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_scheme_url("http://example.com/x", base), None);
        assert_eq!(resolve_scheme_url("http://prism/../etc/passwd", base), None);
    }

    #[test]
    fn mime_lookup() {
        assert_eq!(mime_from_extension(Path::new("a/index.html")), "text/html");
        assert_eq!(
            mime_from_extension(Path::new("a.bin")),
            "application/octet-stream"
        );
    }
}
