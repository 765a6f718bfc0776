//! Single-page application fallback.
//!
//! Functionally a glorified not-found handler: it only runs after routing
//! and the resource chain have both missed, and answers browser navigation
//! requests with a pre-loaded application shell.

use std::fs;

use crate::config::ConfigError;
use crate::http::RequestContext;

struct PageEntry {
    mount_path: String,
    document: String,
}

/// Registered single-page entries, matched in registration order.
///
/// Documents are read once at registration; later edits to the file on disk
/// are not observed. Prefix matching is deliberately order-sensitive: the
/// first registered entry whose mount path prefixes the request wins, so an
/// entry for `/` registered first shadows every later, more specific entry.
/// Register specific prefixes before general ones.
pub struct SinglePageHandler {
    entries: Vec<PageEntry>,
}

impl SinglePageHandler {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a fallback document for a mount path prefix.
    ///
    /// The file is loaded eagerly; a missing file fails registration rather
    /// than the first matching request.
    pub fn add(&mut self, mount_path: &str, file: &str) -> Result<(), ConfigError> {
        let document = fs::read_to_string(file).map_err(|_| ConfigError::MissingSinglePageFile {
            path: file.to_string(),
        })?;

        tracing::info!(mount_path, file, "single-page fallback added");

        self.entries.push(PageEntry {
            mount_path: mount_path.to_string(),
            document,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serve the fallback document if one applies.
    ///
    /// Only browser navigations qualify: the request's `Accept` header must
    /// admit HTML, so API clients still receive their not-found response.
    pub fn handle(&self, ctx: &mut RequestContext) -> bool {
        if !ctx.accepts_html() {
            return false;
        }
        for entry in &self.entries {
            if ctx.path().starts_with(entry.mount_path.as_str()) {
                ctx.html(&entry.document);
                return true;
            }
        }
        false
    }
}

impl Default for SinglePageHandler {
    fn default() -> Self {
        Self::new()
    }
}
