//! Hearth, an embeddable HTTP application server core.
//!
//! Hearth is not a router and not an application framework: it is the
//! request-lifecycle machinery an embedding application wires its own routing
//! and handlers into. The embedder supplies a [`server::Dispatcher`] (the
//! routing collaborator) and an upgrade collaborator; Hearth owns everything
//! around them.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  HEARTH SERVER                   │
//!                        │                                                  │
//!    Client Request      │  ┌──────────┐    ┌───────────────────────────┐   │
//!    ────────────────────┼─▶│ listener │───▶│       handler tree        │   │
//!                        │  └──────────┘    │  (embedder handlers + the │   │
//!                        │                  │   grafted pipeline group) │   │
//!                        │                  └──────────┬────────────────┘   │
//!                        │                             │                    │
//!                        │         upgrade? ◀──────────┤                    │
//!                        │             │               ▼                    │
//!                        │             │       ┌──────────────┐             │
//!                        │             │       │  dispatcher  │ (embedder)  │
//!                        │             │       └──────┬───────┘             │
//!                        │             │        miss  │  failure            │
//!                        │             │              ▼         ▼           │
//!                        │             │     ┌──────────────┐ ┌─────────┐   │
//!                        │             │     │resource chain│ │exception│   │
//!                        │             │     └──────┬───────┘ │resolver │   │
//!                        │             │       miss │         └─────────┘   │
//!                        │             │            ▼                       │
//!                        │             │     ┌──────────────┐               │
//!    Client Response     │             │     │ single-page  │──▶ 404        │
//!    ◀───────────────────┼─────────────┴─────│   fallback   │               │
//!                        │                   └──────────────┘               │
//!                        └──────────────────────────────────────────────────┘
//! ```
//!
//! # Request Lifecycle
//!
//! Within one request the stages run strictly in order: upgrade check →
//! dispatch → (on miss) resource chain → (on miss) single-page fallback →
//! (on miss) default 404. A failure raised at any stage runs the exception
//! resolver exactly once before the response is finalized. Requests are
//! independent; no cross-request ordering is guaranteed.
//!
//! # Embedding
//!
//! ```no_run
//! use std::sync::Arc;
//! use hearth::config::ServerConfig;
//! use hearth::exception::Failure;
//! use hearth::http::RequestContext;
//! use hearth::server::Server;
//!
//! let config = ServerConfig::default();
//! let runtime = hearth::server::runtime(&config.worker_pool).unwrap();
//! runtime.block_on(async {
//!     let mut server = Server::new(config).unwrap();
//!     let dispatcher = Arc::new(
//!         |_ctx: &mut RequestContext| -> Result<bool, Box<dyn Failure>> { Ok(false) },
//!     );
//!     let upgrade = Arc::new(|_ctx: &mut RequestContext| {});
//!     server.start(dispatcher, upgrade).await.unwrap();
//! });
//! ```

// Core subsystems
pub mod config;
pub mod exception;
pub mod http;
pub mod resources;
pub mod server;

// Cross-cutting concerns
pub mod observability;

pub use config::{ConfigError, ServerConfig};
pub use exception::{ExceptionResolver, Failure, FailureKind, HttpResponseError};
pub use http::RequestContext;
pub use resources::{ResourceChain, SinglePageHandler};
pub use server::{Dispatcher, Handler, HandlerTree, Server, ServerError};
