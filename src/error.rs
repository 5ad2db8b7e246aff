//! Error handling module
//!
//! Provides the typed errors for every stage of the engine: registry
//! discovery, template rendering, DDL generation/execution, database access
//! and the boot-time table guard.

use std::path::PathBuf;
use thiserror::Error;

/// A single table accessor failed while the registry was scanned.
///
/// Always absorbed by discovery; it only surfaces through debug logs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Accessor {accessor} is not registered")]
    UnknownAccessor { accessor: String },

    #[error("Accessor {accessor} failed: {reason}")]
    AccessorFailed { accessor: String, reason: String },
}

/// Errors raised while building a capability registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Invalid table prefix: {0}")]
    InvalidPrefix(String),
}

/// A DDL template could not be loaded, parsed or rendered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("No template named {0}")]
    NotFound(String),

    #[error("Template {template}, line {line}: {message}")]
    Syntax {
        template: String,
        line: usize,
        message: String,
    },

    #[error("Template {template}: unknown variable '{name}'")]
    UnknownVariable { template: String, name: String },

    #[error("Template {template}: unknown flag '{name}'")]
    UnknownFlag { template: String, name: String },

    #[error("Failed to read template {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Database access error
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Connection not established: {0}")]
    NotConnected(String),

    #[error("Statement rejected: {0}")]
    Statement(String),
}

/// DDL synthesis or execution failed.
///
/// Every variant names the feature and template that produced the failing
/// DDL, so a caller never sees a bare driver error.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to render template {template} for feature {feature}: {source}")]
    Render {
        feature: String,
        template: String,
        #[source]
        source: TemplateError,
    },

    #[error("Feature {feature} (template {template}) failed executing `{statement}`: {source}")]
    Execute {
        feature: String,
        template: String,
        statement: String,
        #[source]
        source: DbError,
    },

    #[error("Failed to write migration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Policy-level failure surfaced to the boot sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    /// The strict outcome. The message is shown verbatim.
    #[error("{0}")]
    Configuration(String),
}

/// Result type alias for generation paths
pub type GenerationResult<T> = Result<T, GenerationError>;
