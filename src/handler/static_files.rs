//! Static file serving module
//!
//! [`StaticFiles`] is meant for a catch-all wildcard route registered last,
//! so files under a root directory are served for any path no other route
//! claimed.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::HandlerError;
use crate::http::{cache, mime, Request, Response};
use crate::logger;
use crate::routing::{Handler, HandlerResult, PathParams};

/// Serves files below `root`, resolving directories to an index file
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_files: Vec<String>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_files: vec!["index.html".to_string(), "index.htm".to_string()],
        }
    }

    #[must_use]
    pub fn with_index_files(mut self, index_files: Vec<String>) -> Self {
        self.index_files = index_files;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a request path to a file inside the root
    ///
    /// Returns `None` for missing files and for paths escaping the root.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = request_path.trim_start_matches('/');
        let mut file_path = self.root.join(relative);

        if file_path.is_dir() {
            file_path = self
                .index_files
                .iter()
                .map(|index| file_path.join(index))
                .find(|candidate| candidate.is_file())?;
        }

        let root = match self.root.canonicalize() {
            Ok(p) => p,
            Err(e) => {
                logger::log_warning(&format!(
                    "Static directory not found or inaccessible '{}': {e}",
                    self.root.display()
                ));
                return None;
            }
        };

        // Missing files are routine 404s, not worth a log line
        let canonical = file_path.canonicalize().ok()?;
        if !canonical.starts_with(&root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {request_path} -> {}",
                canonical.display()
            ));
            return None;
        }
        canonical.is_file().then_some(canonical)
    }
}

impl Handler for StaticFiles {
    fn handle(&self, request: &Request, _params: &PathParams) -> HandlerResult {
        let Some(path) = self.resolve(&request.path) else {
            return Ok(crate::http::build_404_response());
        };

        let data = fs::read(&path).map_err(|e| {
            HandlerError::new(format!("failed to read '{}': {e}", path.display()))
        })?;
        let etag = cache::generate_etag(&data);

        if cache::etag_matches(request.header("if-none-match"), &etag) {
            return Ok(Response::ok(Vec::<u8>::new())
                .with_status(304)
                .with_header("ETag", etag));
        }

        Ok(Response::ok(data)
            .with_header("Content-Type", mime::content_type_for(&path))
            .with_header("ETag", etag)
            .with_header("Cache-Control", "public, max-age=3600"))
    }
}
