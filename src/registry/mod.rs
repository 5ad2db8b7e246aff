//! Capability registry
//!
//! The engine never scans a live object for table accessors. Instead every
//! feature registers, up front, the accessors it defines, the table each one
//! resolves to and the DDL template it ships. [`CapabilityRegistry`] is the
//! read-only query surface the rest of the crate consumes; [`AuthRegistry`]
//! is the concrete registry built from the catalogue in [`catalog`].

pub mod catalog;

use crate::error::{DiscoveryError, RegistryError};
use crate::models::{AccessorId, FeatureId, TableName};
use crate::template::{pluralize, TemplateStore};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Feature every other feature builds on
pub const PRIMARY_FEATURE: &str = "base";

/// Accessor resolving to the primary identity table
pub const PRIMARY_ACCESSOR: &str = "accounts_table";

/// Suffix shared by all table accessor ids
pub const ACCESSOR_SUFFIX: &str = "_table";

static PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid prefix pattern"));

/// How an accessor derives its default table name from the prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultTable {
    /// `pluralize(prefix)`, e.g. `accounts`
    Pluralized,
    /// `prefix` followed by a suffix, e.g. `account_remember_keys`
    Suffixed(String),
}

impl DefaultTable {
    pub fn suffixed(suffix: impl Into<String>) -> Self {
        Self::Suffixed(suffix.into())
    }

    pub fn resolve(&self, prefix: &str) -> TableName {
        match self {
            Self::Pluralized => pluralize(prefix),
            Self::Suffixed(suffix) => format!("{}{}", prefix, suffix),
        }
    }
}

/// A table accessor declared by a feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorSpec {
    pub id: AccessorId,
    pub table: DefaultTable,
    /// Column names the feature reads and writes. Only consulted when no
    /// template describes the table.
    pub columns: Vec<String>,
}

impl AccessorSpec {
    pub fn new(id: impl Into<String>, table: DefaultTable, columns: &[&str]) -> Self {
        Self {
            id: id.into(),
            table,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// A feature and everything it declares about persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDescriptor {
    pub name: FeatureId,
    pub table_accessors: Vec<AccessorSpec>,
    /// Name of the DDL template in the [`TemplateStore`]
    pub template: Option<String>,
    pub depends_on: Vec<FeatureId>,
}

impl FeatureDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_accessors: Vec::new(),
            template: None,
            depends_on: Vec::new(),
        }
    }

    pub fn accessor(mut self, spec: AccessorSpec) -> Self {
        self.table_accessors.push(spec);
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn depends_on(mut self, feature: impl Into<String>) -> Self {
        self.depends_on.push(feature.into());
        self
    }

    /// Exact membership test: does this feature declare `accessor`?
    pub fn defines_accessor(&self, accessor: &str) -> bool {
        self.table_accessors.iter().any(|a| a.id == accessor)
    }

    pub fn accessor_spec(&self, accessor: &str) -> Option<&AccessorSpec> {
        self.table_accessors.iter().find(|a| a.id == accessor)
    }
}

/// Read-only query surface of a configured auth instance
pub trait CapabilityRegistry {
    /// Prefix every table name derives from
    fn table_prefix(&self) -> &str;

    /// Enabled features, dependencies before dependents
    fn enabled_features(&self) -> Vec<&FeatureDescriptor>;

    /// Every registered table accessor id
    fn table_accessors(&self) -> Vec<AccessorId>;

    /// Resolve one accessor to its table name. May fail per accessor.
    fn resolve_table(&self, accessor: &str) -> Result<TableName, DiscoveryError>;

    fn templates(&self) -> &TemplateStore;

    fn feature(&self, name: &str) -> Option<&FeatureDescriptor> {
        self.enabled_features().into_iter().find(|f| f.name == name)
    }

    fn primary_feature(&self) -> Option<&FeatureDescriptor> {
        self.feature(PRIMARY_FEATURE)
    }

    fn primary_table(&self) -> Option<TableName> {
        self.resolve_table(PRIMARY_ACCESSOR).ok()
    }
}

type AccessorFn = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Host-supplied accessor, called with the table prefix
#[derive(Clone)]
struct CustomAccessor {
    id: AccessorId,
    resolve: AccessorFn,
}

impl fmt::Debug for CustomAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAccessor").field("id", &self.id).finish()
    }
}

/// Registry assembled from the built-in catalogue plus host registrations
#[derive(Debug, Clone)]
pub struct AuthRegistry {
    prefix: String,
    features: Vec<FeatureDescriptor>,
    custom_accessors: Vec<CustomAccessor>,
    templates: TemplateStore,
}

impl AuthRegistry {
    pub fn builder() -> AuthRegistryBuilder {
        AuthRegistryBuilder::default()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }
}

impl CapabilityRegistry for AuthRegistry {
    fn table_prefix(&self) -> &str {
        &self.prefix
    }

    fn enabled_features(&self) -> Vec<&FeatureDescriptor> {
        self.features.iter().collect()
    }

    fn table_accessors(&self) -> Vec<AccessorId> {
        let mut ids: Vec<AccessorId> = Vec::new();
        let declared = self
            .features
            .iter()
            .flat_map(|f| f.table_accessors.iter().map(|a| &a.id));
        let custom = self.custom_accessors.iter().map(|a| &a.id);
        for id in declared.chain(custom) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    fn resolve_table(&self, accessor: &str) -> Result<TableName, DiscoveryError> {
        if let Some(custom) = self.custom_accessors.iter().find(|a| a.id == accessor) {
            return (custom.resolve)(&self.prefix).map_err(|reason| DiscoveryError::AccessorFailed {
                accessor: accessor.to_string(),
                reason,
            });
        }

        self.features
            .iter()
            .find_map(|f| f.accessor_spec(accessor))
            .map(|spec| spec.table.resolve(&self.prefix))
            .ok_or_else(|| DiscoveryError::UnknownAccessor {
                accessor: accessor.to_string(),
            })
    }

    fn templates(&self) -> &TemplateStore {
        &self.templates
    }
}

/// Builder for [`AuthRegistry`]
#[derive(Debug, Clone, Default)]
pub struct AuthRegistryBuilder {
    prefix: Option<String>,
    requested: Vec<FeatureId>,
    custom_features: Vec<FeatureDescriptor>,
    custom_accessors: Vec<CustomAccessor>,
    templates: TemplateStore,
}

impl AuthRegistryBuilder {
    /// Table prefix, `account` when unset
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Enable a feature by name. Its dependencies are enabled with it.
    pub fn enable(mut self, feature: impl Into<String>) -> Self {
        self.requested.push(feature.into());
        self
    }

    pub fn enable_all<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested.extend(features.into_iter().map(Into::into));
        self
    }

    /// Register and enable a feature that is not in the built-in catalogue.
    /// Replaces a catalogue entry of the same name.
    pub fn feature(mut self, descriptor: FeatureDescriptor) -> Self {
        self.requested.push(descriptor.name.clone());
        self.custom_features.push(descriptor);
        self
    }

    /// Register an accessor resolved by host code. Overrides the default
    /// resolution of a declared accessor with the same id.
    pub fn accessor<F>(mut self, id: impl Into<String>, resolve: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        self.custom_accessors.push(CustomAccessor {
            id: id.into(),
            resolve: Arc::new(resolve),
        });
        self
    }

    pub fn templates(mut self, templates: TemplateStore) -> Self {
        self.templates = templates;
        self
    }

    pub fn build(self) -> Result<AuthRegistry, RegistryError> {
        let prefix = self.prefix.unwrap_or_else(|| "account".to_string());
        if !PREFIX_PATTERN.is_match(&prefix) {
            return Err(RegistryError::InvalidPrefix(prefix));
        }

        let mut resolver = FeatureResolver {
            custom: &self.custom_features,
            seen: HashSet::new(),
            ordered: Vec::new(),
        };
        resolver.visit(PRIMARY_FEATURE)?;
        for name in &self.requested {
            resolver.visit(name)?;
        }
        let features = resolver.ordered;

        debug!(
            "Registry built with prefix '{}' and features: {}",
            prefix,
            features.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        Ok(AuthRegistry {
            prefix,
            features,
            custom_accessors: self.custom_accessors,
            templates: self.templates,
        })
    }
}

/// Depth-first expansion of `depends_on`, dependencies first
struct FeatureResolver<'a> {
    custom: &'a [FeatureDescriptor],
    seen: HashSet<String>,
    ordered: Vec<FeatureDescriptor>,
}

impl FeatureResolver<'_> {
    fn visit(&mut self, name: &str) -> Result<(), RegistryError> {
        if !self.seen.insert(name.to_string()) {
            return Ok(());
        }

        let descriptor = self
            .custom
            .iter()
            .rev()
            .find(|f| f.name == name)
            .or_else(|| catalog::lookup(name))
            .cloned()
            .ok_or_else(|| RegistryError::UnknownFeature(name.to_string()))?;

        for dependency in &descriptor.depends_on {
            self.visit(dependency)?;
        }
        self.ordered.push(descriptor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_base_is_always_enabled_first() {
        let registry = AuthRegistry::builder().enable("remember").build().unwrap();
        assert_eq!(registry.feature_names(), vec!["base", "remember"]);
        assert_eq!(registry.primary_table().as_deref(), Some("accounts"));
    }

    #[test]
    fn test_dependencies_precede_dependents() {
        let registry = AuthRegistry::builder()
            .enable("otp_unlock")
            .enable("otp")
            .build()
            .unwrap();
        assert_eq!(registry.feature_names(), vec!["base", "otp", "otp_unlock"]);
    }

    #[test]
    fn test_unknown_feature_is_rejected() {
        let err = AuthRegistry::builder().enable("telepathy").build().unwrap_err();
        assert_eq!(err, RegistryError::UnknownFeature("telepathy".to_string()));
    }

    #[test]
    fn test_invalid_prefix_is_rejected() {
        let err = AuthRegistry::builder().prefix("Bad Prefix").build().unwrap_err();
        assert_eq!(err, RegistryError::InvalidPrefix("Bad Prefix".to_string()));
    }

    #[test]
    fn test_tables_follow_prefix() {
        let registry = AuthRegistry::builder()
            .prefix("user")
            .enable("remember")
            .build()
            .unwrap();
        assert_eq!(registry.resolve_table("accounts_table").unwrap(), "users");
        assert_eq!(registry.resolve_table("remember_table").unwrap(), "user_remember_keys");
    }

    #[test]
    fn test_custom_accessor_failure_is_reported_per_accessor() {
        let registry = AuthRegistry::builder()
            .accessor("broken_table", |_| Err("needs a request".to_string()))
            .accessor("legacy_table", |prefix| Ok(format!("{}_legacy", prefix)))
            .build()
            .unwrap();

        assert!(matches!(
            registry.resolve_table("broken_table"),
            Err(DiscoveryError::AccessorFailed { .. })
        ));
        assert_eq!(registry.resolve_table("legacy_table").unwrap(), "account_legacy");
        assert!(matches!(
            registry.resolve_table("nope_table"),
            Err(DiscoveryError::UnknownAccessor { .. })
        ));
        assert!(registry.table_accessors().contains(&"legacy_table".to_string()));
    }

    #[test]
    fn test_custom_feature_replaces_catalogue_entry() {
        let registry = AuthRegistry::builder()
            .feature(
                FeatureDescriptor::new("remember")
                    .accessor(AccessorSpec::new("remember_table", DefaultTable::suffixed("_tokens"), &["id"]))
                    .depends_on("base"),
            )
            .build()
            .unwrap();
        assert_eq!(registry.resolve_table("remember_table").unwrap(), "account_tokens");
        assert_eq!(registry.feature("remember").unwrap().template, None);
    }
}
