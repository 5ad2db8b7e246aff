//! authschema - Schema discovery and migration synthesis for auth features
//!
//! An authentication toolkit is assembled from features (remember-me,
//! lockout, OTP, ...), each of which needs its own tables. This crate:
//!
//! - discovers which tables the enabled features need, from the registry's
//!   table accessors and from the features' DDL templates
//! - synthesizes the DDL that creates (and drops) the missing ones, in an
//!   order that respects foreign keys
//! - guards application boot, reacting to missing tables by warning,
//!   raising, halting, or generating a migration
//!
//! The registry is an explicit interface ([`CapabilityRegistry`]); templates
//! are rendered by a sandboxed interpreter over a fixed variable set.

pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod guard;
pub mod introspection;
pub mod models;
pub mod registry;
pub mod synthesis;
pub mod template;

pub use connection::{Dialect, Environment};
pub use db::{Database, DialectCapabilities, MemoryDatabase, PgDatabase};
pub use error::{DbError, GenerationError, GuardError, TemplateError};
pub use guard::{GuardMode, Outcome, PolicyDecision, SequelMode, TableGuard, TableGuardConfig};
pub use introspection::TableInspector;
pub use models::{TableDescriptor, TableName};
pub use registry::{AuthRegistry, CapabilityRegistry, FeatureDescriptor};
pub use synthesis::{MigrationGenerator, SchemaSynthesizer};
pub use template::{TemplateInspector, TemplateStore};
