//! In-process database
//!
//! Keeps a set of table names and applies `CREATE TABLE` / `DROP TABLE`
//! statements to it. Every executed statement is recorded. Used for offline
//! planning and throughout the tests.

use crate::connection::Dialect;
use crate::db::{Database, DialectCapabilities};
use crate::error::DbError;
use crate::template::ddl::{Statement, StatementKind};
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    tables: BTreeSet<String>,
    executed: Vec<String>,
}

#[derive(Debug)]
pub struct MemoryDatabase {
    capabilities: DialectCapabilities,
    state: RwLock<State>,
    fail_on: Option<String>,
    reachable: bool,
}

impl MemoryDatabase {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            capabilities: DialectCapabilities::assumed(dialect),
            state: RwLock::new(State::default()),
            fail_on: None,
            reachable: true,
        }
    }

    pub fn with_tables<I, S>(self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.into_inner();
        state.tables.extend(tables.into_iter().map(Into::into));
        Self {
            state: RwLock::new(state),
            ..self
        }
    }

    pub fn with_partial_indexes(mut self, supported: bool) -> Self {
        self.capabilities.partial_indexes = supported;
        self
    }

    pub fn with_citext(mut self, supported: bool) -> Self {
        self.capabilities.citext = supported;
        self
    }

    /// Reject any statement containing `pattern`
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.fail_on = Some(pattern.into());
        self
    }

    /// Every call fails as if the server could not be reached
    pub fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    /// Statements executed so far, in order
    pub async fn executed(&self) -> Vec<String> {
        self.state.read().await.executed.clone()
    }

    pub async fn tables(&self) -> Vec<String> {
        self.state.read().await.tables.iter().cloned().collect()
    }

    fn check_reachable(&self) -> Result<(), DbError> {
        if self.reachable {
            Ok(())
        } else {
            Err(DbError::NotConnected("memory database is unreachable".to_string()))
        }
    }
}

impl Database for MemoryDatabase {
    fn dialect(&self) -> Dialect {
        self.capabilities.dialect
    }

    fn supports_partial_indexes(&self) -> bool {
        self.capabilities.partial_indexes
    }

    async fn supports_citext(&self) -> bool {
        self.capabilities.citext
    }

    async fn list_tables(&self) -> Result<Vec<String>, DbError> {
        self.check_reachable()?;
        Ok(self.tables().await)
    }

    async fn execute(&self, sql: &str) -> Result<(), DbError> {
        self.check_reachable()?;
        if let Some(pattern) = &self.fail_on {
            if sql.contains(pattern.as_str()) {
                return Err(DbError::Statement(format!("rejected statement matching '{}'", pattern)));
            }
        }

        debug!("Executing DDL: {}", sql);
        let mut state = self.state.write().await;
        match Statement::parse(sql).kind {
            StatementKind::CreateTable(table) => {
                state.tables.insert(table);
            }
            StatementKind::DropTable(table) => {
                state.tables.remove(&table);
            }
            _ => {}
        }
        state.executed.push(sql.to_string());
        Ok(())
    }
}
