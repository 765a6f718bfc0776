//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure consumed by the
//! server core. All types derive Serde traits for deserialization from
//! config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Context path prefix the application is mounted under. Requests below
    /// it are answered by the not-found fallback.
    pub context_path: String,

    /// Worker pool bounds for request execution.
    pub worker_pool: WorkerPoolConfig,

    /// Static resource roots, in precedence order (first match wins).
    pub static_roots: Vec<StaticRootConfig>,

    /// Single-page entries, in registration order (first prefix match wins).
    pub single_page: Vec<SinglePageConfig>,

    /// When true, a request for a directory without a trailing slash is
    /// still resolved to its welcome file.
    pub ignore_trailing_slashes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            context_path: "/".to_string(),
            worker_pool: WorkerPoolConfig::default(),
            static_roots: Vec::new(),
            single_page: Vec::new(),
            ignore_trailing_slashes: true,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to bind to. Port 0 requests an ephemeral port; the real port is
    /// discoverable after `start()`.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 7000,
        }
    }
}

impl ListenerConfig {
    /// Render the configured bind address as `host:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Bounds for the worker pool that executes request pipelines.
///
/// Handlers may block; concurrency is bounded by the pool rather than
/// unbounded task-per-request.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    /// Minimum number of workers kept alive.
    pub min_workers: usize,

    /// Maximum number of concurrently executing workers.
    pub max_workers: usize,

    /// Idle time in seconds before a worker above the minimum is reclaimed.
    pub idle_timeout_secs: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            min_workers: 8,
            max_workers: 250,
            idle_timeout_secs: 60,
        }
    }
}

/// Kind of a static resource root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RootKind {
    /// A plain directory root. The full request path is resolved beneath the
    /// base directory.
    Directory,

    /// A third-party asset root. The mount prefix is stripped before
    /// resolution and every hit is served with a long-lived cache policy.
    Vendor,
}

/// One configured static resource root.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticRootConfig {
    /// Mount path prefix this root answers under.
    #[serde(default = "default_mount_path")]
    pub mount_path: String,

    /// Base directory resources are resolved in.
    pub directory: String,

    /// Root kind.
    #[serde(default = "default_root_kind")]
    pub kind: RootKind,
}

fn default_mount_path() -> String {
    "/".to_string()
}

fn default_root_kind() -> RootKind {
    RootKind::Directory
}

/// One configured single-page entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SinglePageConfig {
    /// Mount path prefix the document answers under.
    pub mount_path: String,

    /// File the document is loaded from, once, at registration time.
    pub file: String,
}
