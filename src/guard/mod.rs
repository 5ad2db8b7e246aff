//! Boot-time table guard
//!
//! Checks once, at startup, that every table the enabled features need
//! exists, and reacts according to the configured [`GuardMode`]. Optionally
//! runs a generation side action ([`SequelMode`]) first. The default mode is
//! silent: nothing is checked unless a host opts in.
//!
//! The guard never terminates the process itself. A halt is reported as
//! [`Outcome::Halt`] and left to the caller.

pub mod models;

pub use models::*;

use crate::db::{Database, DialectCapabilities, MemoryDatabase};
use crate::error::GuardError;
use crate::introspection::TableInspector;
use crate::models::{Ownership, TableName};
use crate::registry::CapabilityRegistry;
use crate::synthesis::SchemaSynthesizer;
use crate::template::TemplateInspector;
use crate::connection::Dialect;
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, error, info, warn};

/// Message used for every strict outcome unless a handler supplies one
pub fn standard_message(missing: &[TableName]) -> String {
    format!("Missing required database tables: {}", missing.join(", "))
}

pub struct TableGuard {
    config: TableGuardConfig,
    state: GuardState,
}

impl TableGuard {
    pub fn new(config: TableGuardConfig) -> Self {
        Self {
            config,
            state: GuardState::Idle,
        }
    }

    pub fn config(&self) -> &TableGuardConfig {
        &self.config
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Run the guard without a connection. Every table is `Unknown`.
    pub async fn check_offline<R>(&mut self, registry: &R) -> Result<PolicyDecision, GuardError>
    where
        R: CapabilityRegistry + ?Sized,
    {
        self.check::<R, MemoryDatabase>(registry, None).await
    }

    /// Run one guard pass
    pub async fn check<R, D>(&mut self, registry: &R, db: Option<&D>) -> Result<PolicyDecision, GuardError>
    where
        R: CapabilityRegistry + ?Sized,
        D: Database,
    {
        if self.config.mode.is_silent() {
            self.state = GuardState::Idle;
            return Ok(PolicyDecision::silent());
        }

        self.state = GuardState::Discovering;
        let dialect = db.map_or(self.config.dialect, |db| db.dialect());
        let required = self.required_tables(registry, dialect);

        self.state = GuardState::Evaluating;
        let mut records = evaluate(&required, db).await;
        let mut missing = tables_with(&records, TableStatus::Missing);

        if missing.is_empty() {
            self.state = GuardState::Finished(Outcome::Continue);
            return Ok(self.decision(Outcome::Continue, None, records, None));
        }

        let side_action = match self.config.sequel_mode {
            Some(action) => Some(self.run_side_action(action, registry, db, &missing).await),
            None => None,
        };

        let mutated = side_action.as_ref().is_some_and(|report| {
            report.succeeded && matches!(report.action, SequelMode::Create | SequelMode::Sync)
        });
        if mutated {
            records = evaluate(&required, db).await;
            missing = tables_with(&records, TableStatus::Missing);
            if missing.is_empty() {
                info!("✅ All required tables are present after {}", self.config.sequel_mode.map_or("", |m| m.as_str()));
                self.state = GuardState::Finished(Outcome::Continue);
                return Ok(self.decision(Outcome::Continue, None, records, side_action));
            }
        }

        let message = standard_message(&missing);
        match self.apply_mode(&missing, &message) {
            Ok(outcome) => {
                self.state = GuardState::Finished(outcome);
                Ok(self.decision(outcome, Some(message), records, side_action))
            }
            Err(e) => {
                self.state = GuardState::Finished(Outcome::Raised);
                Err(e)
            }
        }
    }

    /// Presence of every required table, regardless of mode
    pub async fn report<R, D>(&self, registry: &R, db: Option<&D>) -> Vec<TableStatusRecord>
    where
        R: CapabilityRegistry + ?Sized,
        D: Database,
    {
        let dialect = db.map_or(self.config.dialect, |db| db.dialect());
        evaluate(&self.required_tables(registry, dialect), db).await
    }

    /// Template tables first, then accessor tables, minus the skip list
    fn required_tables<R>(&self, registry: &R, dialect: Dialect) -> Vec<(TableName, Ownership)>
    where
        R: CapabilityRegistry + ?Sized,
    {
        let inspector = TemplateInspector::new(registry.templates());
        let mut tables: Vec<(TableName, Ownership)> = Vec::new();

        for feature in registry.enabled_features() {
            for table in inspector.extract_tables(feature, registry.table_prefix(), dialect) {
                if !tables.iter().any(|(t, _)| *t == table) {
                    tables.push((table, Ownership::verified(&feature.name)));
                }
            }
        }

        for (accessor, table) in TableInspector::discover_tables(registry) {
            if !tables.iter().any(|(t, _)| *t == table) {
                let owner = TableInspector::owner_of(registry, &accessor);
                tables.push((table, owner));
            }
        }

        tables.retain(|(table, _)| !self.config.skip_tables.contains(table));
        tables
    }

    async fn run_side_action<R, D>(
        &self,
        action: SequelMode,
        registry: &R,
        db: Option<&D>,
        missing: &[TableName],
    ) -> SideActionReport
    where
        R: CapabilityRegistry + ?Sized,
        D: Database,
    {
        let capabilities = match db {
            Some(db) => db.capabilities().await,
            None => DialectCapabilities::assumed(self.config.dialect),
        };
        let synthesizer = SchemaSynthesizer::new(registry, capabilities);

        let result: Result<String, String> = match (action, db) {
            (SequelMode::Log, _) => synthesizer
                .generate_migration(missing)
                .map(|text| {
                    info!("📜 DDL for missing tables:\n{}", text);
                    text.to_string()
                })
                .map_err(|e| e.to_string()),
            (SequelMode::Migration, _) => synthesizer
                .write_migration(&self.config.migration_dir, missing, Utc::now())
                .map(|path| path.display().to_string())
                .map_err(|e| e.to_string()),
            (SequelMode::Sync, _) if self.config.environment.is_production() => Err(format!(
                "sync is not allowed in the {} environment",
                self.config.environment
            )),
            (SequelMode::Create | SequelMode::Sync, None) => {
                Err("no database connection available".to_string())
            }
            (SequelMode::Create, Some(db)) => synthesizer
                .execute_creates(db, missing)
                .await
                .map(|tables| tables.join(", "))
                .map_err(|e| e.to_string()),
            (SequelMode::Sync, Some(db)) => synthesizer
                .sync(db, missing)
                .await
                .map(|tables| tables.join(", "))
                .map_err(|e| e.to_string()),
        };

        match result {
            Ok(detail) => SideActionReport {
                action,
                succeeded: true,
                detail: Some(detail),
            },
            Err(reason) => {
                error!("❌ Table guard {} action failed: {}", action, reason);
                SideActionReport {
                    action,
                    succeeded: false,
                    detail: Some(reason),
                }
            }
        }
    }

    fn apply_mode(&self, missing: &[TableName], message: &str) -> Result<Outcome, GuardError> {
        match &self.config.mode {
            GuardMode::Silent => Ok(Outcome::Continue),
            GuardMode::Warn => {
                warn!("⚠️  {}", message);
                Ok(Outcome::Warned)
            }
            GuardMode::Error => {
                error!("❌ TABLE GUARD: {}", message);
                Ok(Outcome::Errored)
            }
            GuardMode::Raise => {
                error!("❌ {}", message);
                Err(GuardError::Configuration(message.to_string()))
            }
            GuardMode::Halt => {
                error!("🛑 {}. Halting.", message);
                Ok(Outcome::Halt)
            }
            GuardMode::Custom(handler) => match handler(missing) {
                HandlerVerdict::Continue => Ok(Outcome::Continue),
                HandlerVerdict::Error | HandlerVerdict::Raise => {
                    Err(GuardError::Configuration(message.to_string()))
                }
                HandlerVerdict::Message(custom) => Err(GuardError::Configuration(custom)),
            },
        }
    }

    fn decision(
        &self,
        outcome: Outcome,
        message: Option<String>,
        records: Vec<TableStatusRecord>,
        side_action: Option<SideActionReport>,
    ) -> PolicyDecision {
        PolicyDecision {
            outcome,
            message,
            missing_tables: tables_with(&records, TableStatus::Missing),
            unknown_tables: tables_with(&records, TableStatus::Unknown),
            records,
            side_action,
        }
    }
}

async fn evaluate<D: Database>(required: &[(TableName, Ownership)], db: Option<&D>) -> Vec<TableStatusRecord> {
    let existing: Option<HashSet<String>> = match db {
        Some(db) => match db.list_tables().await {
            Ok(tables) => Some(tables.into_iter().collect()),
            Err(e) => {
                debug!("Table existence unknown, listing failed: {}", e);
                None
            }
        },
        None => {
            debug!("Table existence unknown, no database connection");
            None
        }
    };

    required
        .iter()
        .map(|(table, owner)| {
            let exists = existing.as_ref().map(|set| set.contains(table));
            TableStatusRecord {
                name: table.clone(),
                owning_feature: Some(owner.feature.clone()),
                verified: owner.verified,
                status: match exists {
                    Some(true) => TableStatus::Present,
                    Some(false) => TableStatus::Missing,
                    None => TableStatus::Unknown,
                },
                exists,
            }
        })
        .collect()
}

fn tables_with(records: &[TableStatusRecord], status: TableStatus) -> Vec<TableName> {
    records
        .iter()
        .filter(|r| r.status == status)
        .map(|r| r.name.clone())
        .collect()
}
