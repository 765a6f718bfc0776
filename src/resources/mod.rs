//! Static resource serving.
//!
//! # Responsibilities
//! - Resolve request paths across an ordered chain of resource roots
//! - Apply cache-control policy and strong validators
//! - Compress eligible responses
//! - Serve the single-page fallback document when everything else misses
//!
//! # Data Flow
//! ```text
//! request path ──▶ root 1 ──miss──▶ root 2 ──miss──▶ ... ──▶ not served
//!                    │hit
//!                    ▼
//!        cache policy → ETag → gzip → response
//! ```
//!
//! # Design Decisions
//! - Roots are immutable after registration; existence is checked at
//!   add-time so misconfiguration fails at startup, not at first request
//! - A per-root I/O failure is a logged non-match, never an abort of the
//!   remaining chain
//! - Directory listings are never produced; a directory without a welcome
//!   file is a miss

pub mod chain;
pub mod compress;
pub mod single_page;

pub use chain::{ResourceChain, ResourceRoot};
pub use single_page::SinglePageHandler;
