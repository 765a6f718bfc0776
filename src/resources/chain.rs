//! Ordered chain of static resource roots.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::config::{ConfigError, RootKind, StaticRootConfig};
use crate::http::{cache, mime, RequestContext};
use crate::resources::compress;

/// Cache lifetime, in seconds, for immutable and vendor assets (~1 year).
const LONG_MAX_AGE: u64 = 31_622_400;

/// Request paths under this namespace are served with the long-lived cache
/// policy regardless of which root resolved them.
const IMMUTABLE_PREFIX: &str = "/immutable/";

/// One configured static-serving root.
///
/// Immutable for the process lifetime once registered.
pub struct ResourceRoot {
    mount_path: String,
    base_dir: PathBuf,
    kind: RootKind,
}

impl ResourceRoot {
    /// Map a request path into this root, refusing traversal components.
    ///
    /// `Directory` roots resolve the full request path beneath the base
    /// (resource-base semantics); `Vendor` roots strip their mount prefix
    /// first, re-rooting third-party content.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = match self.kind {
            RootKind::Directory => request_path,
            RootKind::Vendor => request_path.strip_prefix(self.mount_path.as_str())?,
        };

        let mut resolved = self.base_dir.clone();
        for component in Path::new(relative.trim_start_matches('/')).components() {
            match component {
                Component::Normal(segment) => resolved.push(segment),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(resolved)
    }

    /// Find the file this root would serve for a request path, if any.
    ///
    /// A hit is an existing regular file, or a directory containing the
    /// welcome document at the trailing-slash-adjusted path.
    fn lookup(&self, request_path: &str, ignore_trailing_slashes: bool) -> Option<PathBuf> {
        if !request_path.starts_with(self.mount_path.as_str()) {
            return None;
        }

        let resolved = self.resolve(request_path)?;
        if resolved.is_file() {
            return Some(resolved);
        }
        if resolved.is_dir() {
            let welcome = welcome_file_path(request_path, ignore_trailing_slashes);
            let welcome_resolved = self.resolve(&welcome)?;
            if welcome_resolved.is_file() {
                return Some(welcome_resolved);
            }
        }
        None
    }

    fn long_cache(&self, request_path: &str) -> bool {
        self.kind == RootKind::Vendor || request_path.starts_with(IMMUTABLE_PREFIX)
    }
}

/// Welcome-document path for a directory request. Appends `/index.html`
/// when the request lacks a trailing slash and normalization is enabled,
/// plain `index.html` otherwise (which only resolves for slash-terminated
/// paths).
fn welcome_file_path(request_path: &str, ignore_trailing_slashes: bool) -> String {
    if !request_path.ends_with('/') && ignore_trailing_slashes {
        format!("{request_path}/index.html")
    } else {
        format!("{request_path}index.html")
    }
}

/// An ordered list of resource roots; first match across the chain wins.
pub struct ResourceChain {
    roots: Vec<ResourceRoot>,
    ignore_trailing_slashes: bool,
}

impl ResourceChain {
    pub fn new(ignore_trailing_slashes: bool) -> Self {
        Self {
            roots: Vec::new(),
            ignore_trailing_slashes,
        }
    }

    /// Register a root. Precedence is registration order.
    ///
    /// Fails fast when the base directory does not exist; a root is never
    /// allowed to defer that discovery to the first request.
    pub fn add_root(&mut self, config: &StaticRootConfig) -> Result<(), ConfigError> {
        let base_dir = PathBuf::from(&config.directory);
        if !base_dir.is_dir() {
            return Err(ConfigError::MissingStaticRoot {
                path: config.directory.clone(),
            });
        }

        tracing::info!(
            mount_path = %config.mount_path,
            directory = %base_dir.display(),
            kind = ?config.kind,
            "static resource root added"
        );

        self.roots.push(ResourceRoot {
            mount_path: config.mount_path.clone(),
            base_dir,
            kind: config.kind,
        });
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Attempt to serve a request from the chain.
    ///
    /// Returns true when some root produced the response. A false return is
    /// the expected negative feeding the next pipeline stage, not an error;
    /// per-root I/O failures are logged and treated as misses for that root
    /// only.
    pub fn try_serve(&self, ctx: &mut RequestContext) -> bool {
        for root in &self.roots {
            let Some(file_path) = root.lookup(ctx.path(), self.ignore_trailing_slashes) else {
                continue;
            };
            match serve_file(root, &file_path, ctx) {
                Ok(()) => {
                    ctx.mark_served_as_static();
                    return true;
                }
                Err(error) => {
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        path = %file_path.display(),
                        error = %error,
                        "failed to serve static resource"
                    );
                }
            }
        }
        false
    }
}

fn serve_file(
    root: &ResourceRoot,
    file_path: &Path,
    ctx: &mut RequestContext,
) -> std::io::Result<()> {
    // All fallible work happens before the context is touched; a failed
    // read or encode leaves nothing behind for later stages.
    let bytes = fs::read(file_path)?;

    let content_type =
        mime::content_type_for(file_path.extension().and_then(|ext| ext.to_str()));
    let use_gzip = ctx.accepts_gzip() && compress::should_compress(content_type, bytes.len());

    let (body, etag) = if use_gzip {
        let compressed = compress::gzip(&bytes)?;
        let etag = cache::encoded_etag(&cache::generate_etag(&bytes), "gzip");
        (compressed, etag)
    } else {
        let etag = cache::generate_etag(&bytes);
        (bytes, etag)
    };

    let max_age = if root.long_cache(ctx.path()) {
        LONG_MAX_AGE
    } else {
        0
    };
    ctx.set_header("Cache-Control", &format!("max-age={max_age}"));
    ctx.set_header("ETag", &etag);
    if cache::etag_matches(ctx.header("if-none-match"), &etag) {
        ctx.status(304);
        ctx.result(Vec::new());
        return Ok(());
    }

    ctx.content_type(content_type);
    if use_gzip {
        ctx.set_header("Content-Encoding", "gzip");
    }
    ctx.result(body);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn root_config(dir: &TempDir, kind: RootKind, mount_path: &str) -> StaticRootConfig {
        StaticRootConfig {
            mount_path: mount_path.to_string(),
            directory: dir.path().to_string_lossy().into_owned(),
            kind,
        }
    }

    fn write_file(dir: &TempDir, relative: &str, contents: &[u8]) {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    fn get(path: &str) -> RequestContext {
        RequestContext::new("GET", path)
    }

    #[test]
    fn missing_root_fails_at_registration() {
        let mut chain = ResourceChain::new(true);
        let config = StaticRootConfig {
            mount_path: "/".to_string(),
            directory: "/no/such/directory".to_string(),
            kind: RootKind::Directory,
        };

        let err = chain.add_root(&config).unwrap_err();
        assert!(err.to_string().contains("/no/such/directory"));
    }

    #[test]
    fn first_root_wins_and_second_covers_its_misses() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write_file(&first, "shared.txt", b"from first");
        write_file(&second, "shared.txt", b"from second");
        write_file(&second, "only-second.txt", b"second only");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&first, RootKind::Directory, "/"))
            .unwrap();
        chain
            .add_root(&root_config(&second, RootKind::Directory, "/"))
            .unwrap();

        let mut ctx = get("/shared.txt");
        assert!(chain.try_serve(&mut ctx));
        assert_eq!(ctx.body(), b"from first");

        let mut ctx = get("/only-second.txt");
        assert!(chain.try_serve(&mut ctx));
    }

    #[test]
    fn directory_welcome_file_honors_trailing_slash_flag() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "docs/index.html", b"<h1>docs</h1>");

        let mut normalized = ResourceChain::new(true);
        normalized
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();
        let mut ctx = get("/docs");
        assert!(normalized.try_serve(&mut ctx));

        let mut strict = ResourceChain::new(false);
        strict
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();
        let mut ctx = get("/docs");
        assert!(!strict.try_serve(&mut ctx));

        // Slash-terminated requests resolve either way.
        let mut ctx = get("/docs/");
        assert!(strict.try_serve(&mut ctx));
    }

    #[test]
    fn directory_without_welcome_file_is_a_miss() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "empty/placeholder.txt", b"x");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();

        let mut ctx = get("/empty");
        assert!(!chain.try_serve(&mut ctx));
    }

    #[test]
    fn immutable_namespace_gets_long_cache() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "immutable/app.js", b"console.log('x')");
        write_file(&dir, "plain.txt", b"plain");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();

        let mut ctx = get("/immutable/app.js");
        assert!(chain.try_serve(&mut ctx));
        assert_eq!(ctx.response_header("Cache-Control"), Some("max-age=31622400"));

        let mut ctx = get("/plain.txt");
        assert!(chain.try_serve(&mut ctx));
        assert_eq!(ctx.response_header("Cache-Control"), Some("max-age=0"));
    }

    #[test]
    fn vendor_root_strips_mount_prefix_and_long_caches() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "lib/lib.js", b"vendor lib");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Vendor, "/webjars"))
            .unwrap();

        // /webjars/lib/lib.js resolves to <base>/lib/lib.js.
        let mut ctx = get("/webjars/lib/lib.js");
        assert!(chain.try_serve(&mut ctx));
        assert_eq!(ctx.response_header("Cache-Control"), Some("max-age=31622400"));

        let mut ctx = get("/other/lib/lib.js");
        assert!(!chain.try_serve(&mut ctx));
    }

    #[test]
    fn traversal_components_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "safe.txt", b"safe");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();

        let mut ctx = get("/../etc/passwd");
        assert!(!chain.try_serve(&mut ctx));
    }

    #[test]
    fn repeat_requests_are_byte_and_header_identical() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "stable.txt", b"stable body");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();

        let mut first = get("/stable.txt");
        assert!(chain.try_serve(&mut first));
        let mut second = get("/stable.txt");
        assert!(chain.try_serve(&mut second));

        assert_eq!(
            first.response_header("Cache-Control"),
            second.response_header("Cache-Control")
        );
        assert_eq!(first.response_header("ETag"), second.response_header("ETag"));
    }

    #[test]
    fn if_none_match_yields_304() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "cached.txt", b"cached body");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();

        let mut probe = get("/cached.txt");
        assert!(chain.try_serve(&mut probe));
        let etag = probe.response_header("ETag").unwrap().to_string();

        let mut revalidate = get("/cached.txt");
        revalidate.add_request_header("If-None-Match", &etag);
        assert!(chain.try_serve(&mut revalidate));
        assert_eq!(revalidate.status_code(), 304);
    }

    #[test]
    fn failed_read_sets_nothing_on_the_context() {
        let dir = TempDir::new().unwrap();
        let root = ResourceRoot {
            mount_path: "/".to_string(),
            base_dir: dir.path().to_path_buf(),
            kind: RootKind::Directory,
        };

        let mut ctx = get("/gone.txt");
        assert!(serve_file(&root, Path::new("/no/such/file.txt"), &mut ctx).is_err());
        assert_eq!(ctx.response_header("Cache-Control"), None);
        assert_eq!(ctx.response_header("ETag"), None);
    }

    #[test]
    fn gzip_representation_gets_its_own_validator() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "big.html", "<p>hello</p>".repeat(200).as_bytes());

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();

        let mut plain = get("/big.html");
        assert!(chain.try_serve(&mut plain));
        let plain_etag = plain.response_header("ETag").unwrap().to_string();

        let mut gzipped = get("/big.html");
        gzipped.add_request_header("Accept-Encoding", "gzip");
        assert!(chain.try_serve(&mut gzipped));
        let gzip_etag = gzipped.response_header("ETag").unwrap().to_string();

        assert_ne!(plain_etag, gzip_etag);

        // Revalidation against the gzip tag still yields 304.
        let mut revalidate = get("/big.html");
        revalidate.add_request_header("Accept-Encoding", "gzip");
        revalidate.add_request_header("If-None-Match", &gzip_etag);
        assert!(chain.try_serve(&mut revalidate));
        assert_eq!(revalidate.status_code(), 304);
    }

    #[test]
    fn gzip_applied_when_negotiated_and_eligible() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "big.html", "<p>hello</p>".repeat(200).as_bytes());
        write_file(&dir, "tiny.html", b"<p>hi</p>");

        let mut chain = ResourceChain::new(true);
        chain
            .add_root(&root_config(&dir, RootKind::Directory, "/"))
            .unwrap();

        let mut ctx = get("/big.html");
        ctx.add_request_header("Accept-Encoding", "gzip, deflate");
        assert!(chain.try_serve(&mut ctx));
        assert_eq!(ctx.response_header("Content-Encoding"), Some("gzip"));

        let mut ctx = get("/tiny.html");
        ctx.add_request_header("Accept-Encoding", "gzip");
        assert!(chain.try_serve(&mut ctx));
        assert_eq!(ctx.response_header("Content-Encoding"), None);

        let mut ctx = get("/big.html");
        assert!(chain.try_serve(&mut ctx));
        assert_eq!(ctx.response_header("Content-Encoding"), None);
    }
}
