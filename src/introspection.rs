//! Accessor-based table discovery
//!
//! Walks the registered table accessors of a capability registry, resolves
//! each to a table name and attributes it to the feature that declares it.
//! A failing accessor is logged and skipped; the scan itself never fails.

use crate::db::DialectCapabilities;
use crate::models::{AccessorId, Ownership, TableDescriptor, TableName};
use crate::registry::{CapabilityRegistry, ACCESSOR_SUFFIX};
use crate::synthesis::inference::ColumnInference;
use std::collections::BTreeMap;
use tracing::debug;

pub struct TableInspector;

impl TableInspector {
    /// Map every resolvable accessor to its table name
    pub fn discover_tables<R: CapabilityRegistry + ?Sized>(registry: &R) -> BTreeMap<AccessorId, TableName> {
        let mut tables = BTreeMap::new();
        for accessor in registry.table_accessors() {
            match registry.resolve_table(&accessor) {
                Ok(table) => {
                    tables.insert(accessor, table);
                }
                Err(e) => debug!("Skipping accessor during discovery: {}", e),
            }
        }
        tables
    }

    /// Owner of an accessor: the enabled feature declaring it, or a name
    /// derived from the accessor id, flagged unverified
    pub fn owner_of<R: CapabilityRegistry + ?Sized>(registry: &R, accessor: &str) -> Ownership {
        registry
            .enabled_features()
            .into_iter()
            .find(|feature| feature.defines_accessor(accessor))
            .map(|feature| Ownership::verified(&feature.name))
            .unwrap_or_else(|| {
                let guess = accessor.strip_suffix(ACCESSOR_SUFFIX).unwrap_or(accessor);
                Ownership::unverified(guess)
            })
    }

    /// Descriptor per discovered accessor. Structure comes from the column
    /// inference fallback and is flagged as inferred.
    pub fn table_information<R: CapabilityRegistry + ?Sized>(
        registry: &R,
        capabilities: DialectCapabilities,
    ) -> BTreeMap<AccessorId, TableDescriptor> {
        let inference = ColumnInference::new(capabilities, registry.primary_table());

        Self::discover_tables(registry)
            .into_iter()
            .map(|(accessor, table)| {
                let owner = Self::owner_of(registry, &accessor);
                let columns = registry
                    .feature(&owner.feature)
                    .and_then(|feature| feature.accessor_spec(&accessor))
                    .map(|spec| spec.columns.clone())
                    .unwrap_or_default();
                let descriptor = inference.describe(&table, &columns).with_owner(owner);
                (accessor, descriptor)
            })
            .collect()
    }

    /// Accessor-discovered tables owned by `feature`
    pub fn owned_tables<R: CapabilityRegistry + ?Sized>(registry: &R, feature: &str) -> Vec<TableName> {
        Self::discover_tables(registry)
            .into_iter()
            .filter(|(accessor, _)| {
                registry
                    .feature(feature)
                    .is_some_and(|f| f.defines_accessor(accessor))
            })
            .map(|(_, table)| table)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Dialect;
    use crate::models::TableSource;
    use crate::registry::AuthRegistry;
    use pretty_assertions::assert_eq;

    fn registry() -> AuthRegistry {
        AuthRegistry::builder()
            .enable("lockout")
            .accessor("broken_table", |_| Err("called outside a request".to_string()))
            .accessor("legacy_audit_table", |prefix| Ok(format!("{}_legacy_audits", prefix)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_failing_accessor_is_excluded() {
        let tables = TableInspector::discover_tables(&registry());

        assert!(!tables.contains_key("broken_table"));
        assert_eq!(tables["accounts_table"], "accounts");
        assert_eq!(tables["account_lockouts_table"], "account_lockouts");
        assert_eq!(tables["legacy_audit_table"], "account_legacy_audits");
        assert_eq!(tables.len(), 5);
    }

    #[test]
    fn test_ownership_by_exact_membership() {
        let info = TableInspector::table_information(&registry(), DialectCapabilities::assumed(Dialect::Postgres));

        let lockouts = &info["account_lockouts_table"];
        assert_eq!(lockouts.owning_feature, Some(Ownership::verified("lockout")));
        assert_eq!(lockouts.source, TableSource::Inferred);

        let legacy = &info["legacy_audit_table"];
        assert_eq!(legacy.owning_feature, Some(Ownership::unverified("legacy_audit")));
    }

    #[test]
    fn test_inferred_structure_uses_configured_columns() {
        let info = TableInspector::table_information(&registry(), DialectCapabilities::assumed(Dialect::Sqlite));
        let failures = &info["account_login_failures_table"];

        assert_eq!(failures.primary_key, Some(vec!["id".to_string()]));
        assert!(failures.is_one_to_one_with("accounts"));
        assert_eq!(failures.column("number").unwrap().data_type, "VARCHAR(255)");
    }

    #[test]
    fn test_owned_tables() {
        assert_eq!(
            TableInspector::owned_tables(&registry(), "lockout"),
            vec!["account_lockouts", "account_login_failures"]
        );
        assert!(TableInspector::owned_tables(&registry(), "otp").is_empty());
    }
}
