//! Server composition and request execution.
//!
//! # Responsibilities
//! - Compose the embedder's collaborators with the builtin pipeline stages
//! - Bind the listener and run the accept loop
//! - Execute request pipelines on a bounded worker pool
//! - Top-level panic boundary for request handling
//!
//! # Design Decisions
//! - The pipeline is grafted into the embedder's handler tree BEFORE the
//!   listener binds; no request can observe a half-composed server
//! - Handlers may block, so pipelines run on blocking worker threads and
//!   concurrency is bounded by a semaphore rather than task-per-request
//! - A panic in a handler is converted to a bare 500 at the outermost
//!   boundary; the connection and the worker pool survive it

pub mod composer;
pub mod listener;
pub mod tree;

pub use composer::{Dispatcher, Server};
pub use listener::Listener;
pub use tree::{Handler, HandlerTree};

use std::time::Duration;

use thiserror::Error;

use crate::config::{ConfigError, WorkerPoolConfig};

/// Errors raised while composing or starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind, most commonly because the port is
    /// already in use.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// `start()` was called on a server that already started.
    #[error("server already started")]
    AlreadyStarted,

    /// Configuration was rejected during composition.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Listener or connection I/O failed outside of bind.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Build a runtime sized from the worker pool configuration.
///
/// Async worker threads track the pool minimum; blocking threads, where
/// request pipelines execute, track the maximum. Idle blocking threads are
/// reclaimed after the configured timeout.
pub fn runtime(pool: &WorkerPoolConfig) -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(pool.min_workers.max(1))
        .max_blocking_threads(pool.max_workers.max(1))
        .thread_keep_alive(Duration::from_secs(pool.idle_timeout_secs))
        .build()
}
