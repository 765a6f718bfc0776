//! HTTP request/response facade.
//!
//! # Responsibilities
//! - Present one mutable context object per request to every pipeline stage
//! - Content negotiation queries (HTML, gzip, upgrade intent)
//! - MIME type detection and strong validators for static responses
//!
//! # Design Decisions
//! - Stages communicate through the context, never through the raw
//!   hyper types; the facade is what embedder handlers see
//! - Header names are lowercased on ingest so lookups are case-insensitive

pub mod cache;
pub mod context;
pub mod mime;

pub use context::{DeferredResultError, RequestContext};
