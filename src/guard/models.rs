//! Table guard types

use crate::connection::{Dialect, Environment};
use crate::models::{FeatureId, TableName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// What a custom handler asks the guard to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerVerdict {
    /// Resume boot
    Continue,
    /// Raise with the standard message
    Error,
    /// Raise with the standard message
    Raise,
    /// Raise with exactly this message
    Message(String),
}

impl From<Option<String>> for HandlerVerdict {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Continue, Self::Message)
    }
}

impl From<String> for HandlerVerdict {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<&str> for HandlerVerdict {
    fn from(value: &str) -> Self {
        Self::Message(value.to_string())
    }
}

pub type HandlerFn = Arc<dyn Fn(&[TableName]) -> HandlerVerdict + Send + Sync>;

/// Response when required tables are missing
#[derive(Clone, Default)]
pub enum GuardMode {
    /// Do not check at all
    #[default]
    Silent,
    Warn,
    Error,
    Raise,
    /// Ask the host to terminate the process
    Halt,
    Custom(HandlerFn),
}

impl GuardMode {
    pub fn custom<F>(handler: F) -> Self
    where
        F: Fn(&[TableName]) -> HandlerVerdict + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(handler))
    }

    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Silent)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "silent",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Raise => "raise",
            Self::Halt => "halt",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for GuardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuardMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "silent" | "off" | "disabled" | "false" => Ok(Self::Silent),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "raise" => Ok(Self::Raise),
            "halt" | "exit" => Ok(Self::Halt),
            other => Err(format!("unknown table guard mode '{}'", other)),
        }
    }
}

/// Generation side action run when tables are missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequelMode {
    /// Log the DDL
    Log,
    /// Write a migration file
    Migration,
    /// Run the DDL
    Create,
    /// Drop and recreate. Refused in production.
    Sync,
}

impl SequelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Migration => "migration",
            Self::Create => "create",
            Self::Sync => "sync",
        }
    }
}

impl fmt::Display for SequelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SequelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "migration" => Ok(Self::Migration),
            "create" => Ok(Self::Create),
            "sync" => Ok(Self::Sync),
            other => Err(format!("unknown sequel mode '{}'", other)),
        }
    }
}

/// Existence of one required table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableStatus {
    Present,
    Missing,
    /// Existence could not be checked
    Unknown,
}

/// One row of a presence report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStatusRecord {
    pub name: TableName,
    pub owning_feature: Option<FeatureId>,
    /// False when the owner was guessed from an accessor name
    pub verified: bool,
    pub status: TableStatus,
    /// `None` when existence is unknown
    pub exists: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Continue,
    Warned,
    Errored,
    Raised,
    /// The host should terminate the process
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideActionReport {
    pub action: SequelMode,
    pub succeeded: bool,
    /// Generated DDL, migration path or failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Result of one guard pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecision {
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub missing_tables: Vec<TableName>,
    pub unknown_tables: Vec<TableName>,
    pub records: Vec<TableStatusRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side_action: Option<SideActionReport>,
}

impl PolicyDecision {
    /// Decision of a guard that never ran
    pub fn silent() -> Self {
        Self {
            outcome: Outcome::Continue,
            message: None,
            missing_tables: Vec::new(),
            unknown_tables: Vec::new(),
            records: Vec::new(),
            side_action: None,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.missing_tables.len()
    }

    pub fn should_halt(&self) -> bool {
        self.outcome == Outcome::Halt
    }
}

/// Where the guard is in its single pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    Discovering,
    Evaluating,
    Finished(Outcome),
}

/// Table guard settings
#[derive(Debug, Clone)]
pub struct TableGuardConfig {
    pub mode: GuardMode,
    pub sequel_mode: Option<SequelMode>,
    /// Tables never reported missing
    pub skip_tables: BTreeSet<TableName>,
    pub migration_dir: PathBuf,
    pub environment: Environment,
    /// Dialect assumed when no connection is available
    pub dialect: Dialect,
}

impl Default for TableGuardConfig {
    fn default() -> Self {
        Self {
            mode: GuardMode::Silent,
            sequel_mode: None,
            skip_tables: BTreeSet::new(),
            migration_dir: PathBuf::from("db/migrate"),
            environment: Environment::Development,
            dialect: Dialect::Postgres,
        }
    }
}

impl TableGuardConfig {
    pub fn new(mode: GuardMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn sequel_mode(mut self, mode: SequelMode) -> Self {
        self.sequel_mode = Some(mode);
        self
    }

    pub fn skip(mut self, table: impl Into<String>) -> Self {
        self.skip_tables.insert(table.into());
        self
    }

    pub fn migration_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migration_dir = dir.into();
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert!("exit".parse::<GuardMode>().unwrap().as_str() == "halt");
        assert!("".parse::<GuardMode>().unwrap().is_silent());
        assert_eq!("Raise".parse::<GuardMode>().unwrap().as_str(), "raise");
        assert!("explode".parse::<GuardMode>().is_err());
        assert_eq!("sync".parse::<SequelMode>(), Ok(SequelMode::Sync));
    }

    #[test]
    fn test_handler_verdict_conversions() {
        assert_eq!(HandlerVerdict::from(None), HandlerVerdict::Continue);
        assert_eq!(
            HandlerVerdict::from("deploy blocked"),
            HandlerVerdict::Message("deploy blocked".to_string())
        );
    }

    #[test]
    fn test_record_serialization() {
        let record = TableStatusRecord {
            name: "accounts".to_string(),
            owning_feature: Some("base".to_string()),
            verified: true,
            status: TableStatus::Unknown,
            exists: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["owningFeature"], "base");
        assert_eq!(json["status"], "unknown");
        assert!(json["exists"].is_null());
    }
}
