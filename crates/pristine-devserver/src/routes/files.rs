//! Static file handler.
//!
//! URL mapping:
//! - `/` serves `index.html`
//! - extension-less paths get `.html` appended, except under `/frontend/`
//! - `/frontend/...` is served from the project root's `frontend` directory
//! - everything else is served from the serve directory
//!
//! Paths are resolved lexically and must stay inside the project root (the
//! parent of the serve directory); anything else is 403.

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, warn};

const FRONTEND_PREFIX: &str = "/frontend/";

/// Directories the server may read from.
#[derive(Debug, Clone)]
pub struct FileRoot {
    serve_dir: PathBuf,
    project_root: PathBuf,
}

impl FileRoot {
    /// Canonicalizes `serve_dir`, which must exist.
    pub fn new(serve_dir: &Path) -> io::Result<Self> {
        let serve_dir = std::fs::canonicalize(serve_dir)?;
        let project_root = serve_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| serve_dir.clone());
        Ok(Self {
            serve_dir,
            project_root,
        })
    }

    pub fn serve_dir(&self) -> &Path {
        &self.serve_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn frontend_dir(&self) -> PathBuf {
        self.project_root.join("frontend")
    }

    /// Map a request path to a file, or `None` if it escapes the project root.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut url_path = if request_path == "/" {
            "/index.html".to_string()
        } else {
            request_path.to_string()
        };

        let frontend = url_path.starts_with(FRONTEND_PREFIX);
        if !frontend && Path::new(&url_path).extension().is_none() {
            url_path.push_str(".html");
        }

        let base = if frontend {
            &self.project_root
        } else {
            &self.serve_dir
        };
        let resolved = normalize(&base.join(url_path.trim_start_matches('/')));
        resolved.starts_with(&self.project_root).then_some(resolved)
    }
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Content type by file extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub async fn serve(State(root): State<Arc<FileRoot>>, method: Method, uri: Uri) -> Response {
    if method != Method::GET {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET")],
            "405 Method Not Allowed",
        )
            .into_response();
    }

    let request_path = uri.path();
    let Some(path) = root.resolve(request_path) else {
        warn!(target: "pristine::server", "Rejected path outside project root: {}", request_path);
        return (StatusCode::FORBIDDEN, "403 Forbidden").into_response();
    };
    debug!(target: "pristine::server", "{} -> {}", request_path, path.display());

    match tokio::fs::read(&path).await {
        Ok(content) => ([(header::CONTENT_TYPE, content_type(&path))], content).into_response(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => (
            StatusCode::NOT_FOUND,
            format!("404 File Not Found: {request_path}"),
        )
            .into_response(),
        Err(e) => {
            error!(target: "pristine::server", "Failed to read {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> FileRoot {
        FileRoot {
            serve_dir: PathBuf::from("/srv/project/demo"),
            project_root: PathBuf::from("/srv/project"),
        }
    }

    #[test]
    fn test_resolve_mapping() {
        let root = root();
        let cases = [
            ("/", Some("/srv/project/demo/index.html")),
            ("/test", Some("/srv/project/demo/test.html")),
            ("/styles/site.css", Some("/srv/project/demo/styles/site.css")),
            ("/frontend/widget.js", Some("/srv/project/frontend/widget.js")),
            ("/frontend/assets/logo", Some("/srv/project/frontend/assets/logo")),
            ("/./nested/../page.html", Some("/srv/project/demo/page.html")),
            ("//double", Some("/srv/project/demo/double.html")),
            ("/../README.md", Some("/srv/project/README.md")),
        ];
        for (input, expected) in cases {
            assert_eq!(root.resolve(input), expected.map(PathBuf::from), "{input}");
        }
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let root = root();
        assert_eq!(root.resolve("/../../etc/passwd"), None);
        assert_eq!(root.resolve("/frontend/../../etc/passwd"), None);
        // Sibling directory sharing the root's name as a string prefix
        assert_eq!(root.resolve("/../../project-evil/x.js"), None);
    }

    #[test]
    fn test_content_types() {
        assert_eq!(content_type(Path::new("a/index.html")), "text/html");
        assert_eq!(content_type(Path::new("widget.js")), "text/javascript");
        assert_eq!(content_type(Path::new("photo.jpg")), "image/jpeg");
        assert_eq!(content_type(Path::new("icon.svg")), "image/svg+xml");
        assert_eq!(content_type(Path::new("archive.tar.gz")), "application/octet-stream");
        assert_eq!(content_type(Path::new("LICENSE")), "application/octet-stream");
    }
}
