//! Application configuration module
//!
//! Loads guard and registry settings from an optional `authschema.toml` and
//! `AUTHSCHEMA__*` environment variables, plus the `DATABASE_URL` of the
//! target database.

use crate::connection::{ConnectionParams, Dialect, Environment};
use crate::error::RegistryError;
use crate::guard::{GuardMode, SequelMode, TableGuardConfig};
use crate::registry::AuthRegistry;
use crate::template::TemplateStore;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings file looked up in the working directory, extension optional
pub const DEFAULT_CONFIG_FILE: &str = "authschema";
pub const ENV_PREFIX: &str = "AUTHSCHEMA";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Source(#[from] ::config::ConfigError),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid registry configuration: {0}")]
    Registry(#[from] RegistryError),
}

/// Table guard and registry settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    /// `silent`, `warn`, `error`, `raise` or `halt`
    pub mode: String,
    pub sequel_mode: Option<SequelMode>,
    pub skip_tables: Vec<String>,
    pub migration_path: PathBuf,
    pub environment: Environment,
    pub table_prefix: String,
    pub features: Vec<String>,
    /// Directory whose `<name>.sql` files override the built-in templates
    pub template_dir: Option<PathBuf>,
    /// Dialect used when no connection string is configured
    pub dialect: Option<Dialect>,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            mode: "silent".to_string(),
            sequel_mode: None,
            skip_tables: Vec::new(),
            migration_path: PathBuf::from("db/migrate"),
            environment: Environment::default(),
            table_prefix: "account".to_string(),
            features: Vec::new(),
            template_dir: None,
            dialect: None,
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub guard: GuardSettings,
    pub database: Option<ConnectionParams>,
}

impl Settings {
    /// Load settings from `.env`, the settings file and the environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        let file = match config_file {
            Some(path) => ::config::File::from(path).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let guard = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("features")
                    .with_list_parse_key("skip_tables"),
            )
            .build()?
            .try_deserialize::<GuardSettings>()?;

        let database = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(Self::parse_database_url(&url)?),
            _ => None,
        };

        Ok(Self { guard, database })
    }

    /// Settings from TOML text, without touching the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let guard = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize::<GuardSettings>()?;

        Ok(Self {
            guard,
            database: None,
        })
    }

    pub fn with_database_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.database = Some(Self::parse_database_url(url)?);
        Ok(self)
    }

    fn parse_database_url(url: &str) -> Result<ConnectionParams, ConfigError> {
        ConnectionParams::from_connection_string(url)
            .map_err(|e| ConfigError::InvalidValue(format!("DATABASE_URL: {}", e)))
    }

    /// Dialect of the configured database, else the configured default
    pub fn dialect(&self) -> Dialect {
        self.database
            .as_ref()
            .map(|params| params.dialect)
            .or(self.guard.dialect)
            .unwrap_or_default()
    }

    pub fn guard_mode(&self) -> Result<GuardMode, ConfigError> {
        self.guard.mode.parse().map_err(ConfigError::InvalidValue)
    }

    pub fn to_guard_config(&self) -> Result<TableGuardConfig, ConfigError> {
        let mut config = TableGuardConfig::new(self.guard_mode()?)
            .migration_dir(&self.guard.migration_path)
            .environment(self.guard.environment.clone())
            .dialect(self.dialect());

        if let Some(mode) = self.guard.sequel_mode {
            config = config.sequel_mode(mode);
        }
        for table in &self.guard.skip_tables {
            config = config.skip(table.clone());
        }
        Ok(config)
    }

    pub fn build_registry(&self) -> Result<AuthRegistry, ConfigError> {
        let mut templates = TemplateStore::builtin();
        if let Some(dir) = &self.guard.template_dir {
            templates = templates.with_directory(dir);
        }

        let registry = AuthRegistry::builder()
            .prefix(&self.guard.table_prefix)
            .enable_all(&self.guard.features)
            .templates(templates)
            .build()?;
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CapabilityRegistry;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_guard_settings() {
        let settings = Settings::default();
        assert_eq!(settings.guard.mode, "silent");
        assert_eq!(settings.guard.table_prefix, "account");
        assert_eq!(settings.dialect(), Dialect::Postgres);
        assert!(settings.to_guard_config().unwrap().mode.is_silent());
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = Settings::from_toml_str(
            r#"
            mode = "raise"
            sequel_mode = "migration"
            skip_tables = ["account_audit_logs"]
            migration_path = "migrations"
            environment = "production"
            table_prefix = "user"
            features = ["remember", "otp"]
            dialect = "sqlite"
            "#,
        )
        .unwrap();

        let config = settings.to_guard_config().unwrap();
        assert_eq!(config.mode.as_str(), "raise");
        assert_eq!(config.sequel_mode, Some(SequelMode::Migration));
        assert!(config.skip_tables.contains("account_audit_logs"));
        assert_eq!(config.migration_dir, PathBuf::from("migrations"));
        assert!(config.environment.is_production());
        assert_eq!(config.dialect, Dialect::Sqlite);

        let registry = settings.build_registry().unwrap();
        assert_eq!(registry.table_prefix(), "user");
        assert_eq!(registry.feature_names(), vec!["base", "remember", "otp"]);
    }

    #[test]
    fn test_database_url_sets_dialect() {
        let settings = Settings::from_toml_str("dialect = \"sqlite\"")
            .unwrap()
            .with_database_url("mysql://app:secret@db:3306/auth")
            .unwrap();
        assert_eq!(settings.dialect(), Dialect::Mysql);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let settings = Settings::from_toml_str("mode = \"explode\"").unwrap();
        assert!(matches!(settings.to_guard_config(), Err(ConfigError::InvalidValue(_))));

        let settings = Settings::from_toml_str("features = [\"telepathy\"]").unwrap();
        assert!(matches!(
            settings.build_registry(),
            Err(ConfigError::Registry(RegistryError::UnknownFeature(_)))
        ));

        assert!(Settings::default().with_database_url("redis://cache/0").is_err());
    }
}
