//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker bounds, mount paths)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//!
//! Filesystem checks (static roots exist, single-page files readable) are
//! deliberately not performed here; those happen at registration time so the
//! error can name the offending root.

use thiserror::Error;

use crate::config::schema::ServerConfig;

/// One semantic problem found in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("context_path '{0}' must start with '/'")]
    ContextPath(String),

    #[error("worker_pool.max_workers must be at least 1")]
    NoWorkers,

    #[error("worker_pool.min_workers ({min}) exceeds max_workers ({max})")]
    WorkerBounds { min: usize, max: usize },

    #[error("static root mount_path '{0}' must start with '/'")]
    StaticMountPath(String),

    #[error("single-page mount_path '{0}' must start with '/'")]
    SinglePageMountPath(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !config.context_path.starts_with('/') {
        errors.push(ValidationError::ContextPath(config.context_path.clone()));
    }

    if config.worker_pool.max_workers == 0 {
        errors.push(ValidationError::NoWorkers);
    } else if config.worker_pool.min_workers > config.worker_pool.max_workers {
        errors.push(ValidationError::WorkerBounds {
            min: config.worker_pool.min_workers,
            max: config.worker_pool.max_workers,
        });
    }

    for root in &config.static_roots {
        if !root.mount_path.starts_with('/') {
            errors.push(ValidationError::StaticMountPath(root.mount_path.clone()));
        }
    }

    for entry in &config.single_page {
        if !entry.mount_path.starts_with('/') {
            errors.push(ValidationError::SinglePageMountPath(entry.mount_path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
