//! Configuration subsystem.
//!
//! # Responsibilities
//! - Define the configuration schema consumed by the server core
//! - Load configuration from TOML files
//! - Semantic validation before the config enters the system
//!
//! # Design Decisions
//! - Setup-time errors are fatal and never downgraded; anything that can be
//!   rejected at configuration time is rejected there, not at first request
//! - Validation returns all errors, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_config;
pub use schema::{
    ListenerConfig, RootKind, ServerConfig, SinglePageConfig, StaticRootConfig, WorkerPoolConfig,
};
pub use validation::{validate_config, ValidationError};

use thiserror::Error;

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while configuring the server. All of these are fatal at
/// setup time.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A static resource root points at a directory that does not exist.
    #[error("static resource directory '{path}' does not exist")]
    MissingStaticRoot { path: String },

    /// A single-page entry points at a file that does not exist.
    #[error("single-page file '{path}' not found")]
    MissingSinglePageFile { path: String },

    /// The embedder attached a handler tree the pipeline cannot be grafted
    /// into.
    #[error("cannot insert pipeline into unrecognized handler shape")]
    UnrecognizedHandlerShape,

    /// Failed to read a configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantic validation rejected the configuration.
    #[error("config validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}
