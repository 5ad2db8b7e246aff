//! Database access
//!
//! The engine only needs four things from a live connection: its dialect,
//! whether it supports partial indexes (and citext), the list of existing
//! tables, and a way to run DDL. [`Database`] captures exactly that.

pub mod memory;
pub mod postgres;

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

use crate::connection::Dialect;
use crate::error::DbError;
use serde::{Deserialize, Serialize};

/// Feature flags of the target dialect, as seen by templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialectCapabilities {
    pub dialect: Dialect,
    pub partial_indexes: bool,
    pub citext: bool,
}

impl DialectCapabilities {
    /// Capabilities assumed when no connection is available yet.
    pub fn assumed(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Postgres => Self {
                dialect,
                partial_indexes: true,
                citext: true,
            },
            Dialect::Sqlite => Self {
                dialect,
                partial_indexes: true,
                citext: false,
            },
            Dialect::Mysql => Self {
                dialect,
                partial_indexes: false,
                citext: false,
            },
        }
    }
}

/// A live database handle.
#[allow(async_fn_in_trait)]
pub trait Database {
    fn dialect(&self) -> Dialect;

    fn supports_partial_indexes(&self) -> bool;

    /// Whether a case-insensitive text type is available.
    async fn supports_citext(&self) -> bool {
        false
    }

    async fn capabilities(&self) -> DialectCapabilities {
        DialectCapabilities {
            dialect: self.dialect(),
            partial_indexes: self.supports_partial_indexes(),
            citext: self.supports_citext().await,
        }
    }

    /// Names of all base tables visible to the connection.
    async fn list_tables(&self) -> Result<Vec<String>, DbError>;

    async fn table_exists(&self, table: &str) -> Result<bool, DbError> {
        Ok(self.list_tables().await?.iter().any(|t| t == table))
    }

    /// Run one DDL statement.
    async fn execute(&self, sql: &str) -> Result<(), DbError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assumed_capabilities() {
        let pg = DialectCapabilities::assumed(Dialect::Postgres);
        assert!(pg.partial_indexes);
        assert!(pg.citext);

        let mysql = DialectCapabilities::assumed(Dialect::Mysql);
        assert!(!mysql.partial_indexes);
        assert!(!mysql.citext);
    }

    #[tokio::test]
    async fn test_default_capabilities_from_handle() {
        let db = MemoryDatabase::new(Dialect::Sqlite);
        let caps = db.capabilities().await;
        assert_eq!(caps.dialect, Dialect::Sqlite);
        assert!(caps.partial_indexes);
        assert!(!caps.citext);
    }
}
