//! DDL templates
//!
//! Every feature that persists data ships a parameterized DDL template.
//! Templates are rendered by a small sandboxed interpreter ([`engine`])
//! against a fixed [`TemplateContext`]: the table prefix, a pluralization
//! helper and the dialect's capability flags. Nothing in a template can
//! reach outside that context.
//!
//! Built-in templates are embedded at compile time; a host can override
//! any of them from a directory or register extra ones in memory.

pub mod ddl;
pub mod engine;
pub mod inspector;

pub use engine::Template;
pub use inspector::TemplateInspector;

use crate::connection::Dialect;
use crate::db::DialectCapabilities;
use crate::error::TemplateError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("base", include_str!("../../templates/base.sql")),
    ("remember", include_str!("../../templates/remember.sql")),
    ("verify_account", include_str!("../../templates/verify_account.sql")),
    ("verify_login_change", include_str!("../../templates/verify_login_change.sql")),
    ("reset_password", include_str!("../../templates/reset_password.sql")),
    ("lockout", include_str!("../../templates/lockout.sql")),
    ("email_auth", include_str!("../../templates/email_auth.sql")),
    ("otp", include_str!("../../templates/otp.sql")),
    ("otp_unlock", include_str!("../../templates/otp_unlock.sql")),
    ("recovery_codes", include_str!("../../templates/recovery_codes.sql")),
    ("sms_codes", include_str!("../../templates/sms_codes.sql")),
    ("webauthn", include_str!("../../templates/webauthn.sql")),
    ("active_sessions", include_str!("../../templates/active_sessions.sql")),
    ("account_expiration", include_str!("../../templates/account_expiration.sql")),
    ("audit_logging", include_str!("../../templates/audit_logging.sql")),
    ("password_expiration", include_str!("../../templates/password_expiration.sql")),
    ("disallow_password_reuse", include_str!("../../templates/disallow_password_reuse.sql")),
    ("single_session", include_str!("../../templates/single_session.sql")),
    ("jwt_refresh", include_str!("../../templates/jwt_refresh.sql")),
];

/// Source of template text, keyed by template name
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    directory: Option<PathBuf>,
    overrides: HashMap<String, String>,
}

impl TemplateStore {
    /// Store serving only the embedded templates
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Look in `dir` for `<name>.sql` before falling back to the embedded set
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Register a template held in memory. Takes precedence over everything else.
    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), source.into());
        self
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Names of the embedded templates
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN_TEMPLATES.iter().map(|(name, _)| *name)
    }

    /// Raw template text
    pub fn source(&self, name: &str) -> Result<String, TemplateError> {
        if let Some(source) = self.overrides.get(name) {
            return Ok(source.clone());
        }

        if let Some(dir) = &self.directory {
            let path = dir.join(format!("{}.sql", name));
            match std::fs::read_to_string(&path) {
                Ok(source) => {
                    debug!("Loaded template {} from {}", name, path.display());
                    return Ok(source);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(TemplateError::Io {
                        path,
                        message: e.to_string(),
                    })
                }
            }
        }

        BUILTIN_TEMPLATES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, source)| source.to_string())
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    /// Load and compile a template
    pub fn load(&self, name: &str) -> Result<Template, TemplateError> {
        Template::parse(name, &self.source(name)?)
    }
}

/// English pluralization for table names
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if word.is_empty() {
        String::new()
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        format!("{}es", word)
    } else if lower.ends_with('y')
        && !lower[..lower.len() - 1].ends_with(|c: char| "aeiou".contains(c))
    {
        format!("{}ies", &word[..word.len() - 1])
    } else {
        format!("{}s", word)
    }
}

/// Column type snippets for one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectTypes {
    /// Auto-incrementing primary key column definition
    pub primary_key: &'static str,
    /// Auto-incrementing integer type, without the key constraint
    pub serial: &'static str,
    /// Type of a column referencing an auto-incrementing key
    pub fk_type: &'static str,
    pub string: &'static str,
    /// Case-insensitive string for the login column
    pub ci_string: &'static str,
    pub text: &'static str,
    pub json: &'static str,
    pub timestamp: &'static str,
    pub now: &'static str,
    /// `IF NOT EXISTS ` for `CREATE INDEX`, empty where unsupported
    pub index_guard: &'static str,
}

impl DialectTypes {
    pub fn for_capabilities(caps: &DialectCapabilities) -> Self {
        let string = "VARCHAR(255)";
        match caps.dialect {
            Dialect::Postgres => Self {
                primary_key: "BIGSERIAL PRIMARY KEY",
                serial: "BIGSERIAL",
                fk_type: "BIGINT",
                string,
                ci_string: if caps.citext { "citext" } else { string },
                text: "TEXT",
                json: "JSONB",
                timestamp: "TIMESTAMP",
                now: "CURRENT_TIMESTAMP",
                index_guard: "IF NOT EXISTS ",
            },
            Dialect::Mysql => Self {
                primary_key: "BIGINT AUTO_INCREMENT PRIMARY KEY",
                serial: "BIGINT AUTO_INCREMENT",
                fk_type: "BIGINT",
                string,
                ci_string: string,
                text: "TEXT",
                json: "JSON",
                timestamp: "DATETIME",
                now: "CURRENT_TIMESTAMP",
                index_guard: "",
            },
            Dialect::Sqlite => Self {
                primary_key: "INTEGER PRIMARY KEY AUTOINCREMENT",
                serial: "INTEGER",
                fk_type: "INTEGER",
                string,
                ci_string: if caps.citext { "TEXT COLLATE NOCASE" } else { string },
                text: "TEXT",
                json: "TEXT",
                timestamp: "TIMESTAMP",
                now: "CURRENT_TIMESTAMP",
                index_guard: "IF NOT EXISTS ",
            },
        }
    }

    pub fn quote(&self, dialect: Dialect, ident: &str) -> String {
        match dialect {
            Dialect::Mysql => format!("`{}`", ident),
            _ => format!("\"{}\"", ident),
        }
    }
}

/// Everything a template can see
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    pub prefix: &'a str,
    pub capabilities: DialectCapabilities,
    types: DialectTypes,
}

impl<'a> TemplateContext<'a> {
    pub fn new(prefix: &'a str, capabilities: DialectCapabilities) -> Self {
        Self {
            prefix,
            capabilities,
            types: DialectTypes::for_capabilities(&capabilities),
        }
    }

    pub fn types(&self) -> &DialectTypes {
        &self.types
    }

    pub(crate) fn variable(&self, name: &str) -> Option<String> {
        let t = &self.types;
        let value = match name {
            "prefix" => self.prefix,
            "dialect" => self.capabilities.dialect.as_str(),
            "primary_key" => t.primary_key,
            "serial" => t.serial,
            "fk_type" => t.fk_type,
            "string" => t.string,
            "ci_string" => t.ci_string,
            "text" => t.text,
            "json" => t.json,
            "timestamp" => t.timestamp,
            "now" => t.now,
            "index_guard" => t.index_guard,
            _ => return None,
        };
        Some(value.to_string())
    }

    pub(crate) fn flag(&self, name: &str) -> Option<bool> {
        let caps = &self.capabilities;
        let value = match name {
            "partial_indexes" => caps.partial_indexes,
            "citext" => caps.citext,
            "postgres" => caps.dialect == Dialect::Postgres,
            "mysql" => caps.dialect == Dialect::Mysql,
            "sqlite" => caps.dialect == Dialect::Sqlite,
            _ => return None,
        };
        Some(value)
    }

    pub(crate) fn helper(&self, helper: &str, value: &str) -> Option<String> {
        match helper {
            "pluralize" => Some(pluralize(value)),
            "quote" => Some(self.types.quote(self.capabilities.dialect, value)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("account"), "accounts");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("identity"), "identities");
        assert_eq!(pluralize("key"), "keys");
        assert_eq!(pluralize("admin_user"), "admin_users");
        assert_eq!(pluralize(""), "");
    }

    #[test]
    fn test_every_builtin_template_compiles() {
        let store = TemplateStore::builtin();
        for name in TemplateStore::builtin_names() {
            let template = store.load(name);
            assert!(template.is_ok(), "{} failed: {:?}", name, template.err());
        }
    }

    #[test]
    fn test_missing_template() {
        let store = TemplateStore::builtin();
        assert_eq!(
            store.source("nope").unwrap_err(),
            TemplateError::NotFound("nope".to_string())
        );
    }

    #[test]
    fn test_directory_override_wins_over_builtin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("remember.sql"), "CREATE TABLE custom_remember (id INTEGER);").unwrap();

        let store = TemplateStore::builtin().with_directory(dir.path());
        assert!(store.source("remember").unwrap().contains("custom_remember"));
        // not overridden on disk, still served from the embedded set
        assert!(store.source("otp").unwrap().contains("_otp_keys"));
    }

    #[test]
    fn test_ci_string_follows_citext_flag() {
        let mut caps = DialectCapabilities::assumed(Dialect::Postgres);
        assert_eq!(DialectTypes::for_capabilities(&caps).ci_string, "citext");

        caps.citext = false;
        assert_eq!(DialectTypes::for_capabilities(&caps).ci_string, "VARCHAR(255)");
    }
}
