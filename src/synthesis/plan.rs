//! Create and drop ordering
//!
//! Tables are ranked into dependency tiers and then sorted topologically
//! over their foreign keys. Ties are broken by tier, then by the order the
//! tables were discovered in, so a plan is deterministic.

use crate::models::{TableDescriptor, TableName};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Dependency tier of a table, in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TableTier {
    /// Referenced by the primary table, e.g. account statuses
    Lookup,
    /// The primary identity table
    Primary,
    /// 1:1 with the primary table and owned by the primary feature
    Auxiliary,
    Feature,
}

/// Classify `table` relative to the primary table of the same set
pub fn classify(
    table: &TableDescriptor,
    primary: Option<&TableDescriptor>,
    primary_feature: &str,
) -> TableTier {
    let Some(primary) = primary else {
        return TableTier::Feature;
    };

    if table.table_name == primary.table_name {
        TableTier::Primary
    } else if primary.references(&table.table_name) {
        TableTier::Lookup
    } else if table.is_one_to_one_with(&primary.table_name)
        && table.feature_name() == Some(primary_feature)
    {
        TableTier::Auxiliary
    } else {
        TableTier::Feature
    }
}

/// A table with its tier
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTable {
    pub tier: TableTier,
    pub table: TableDescriptor,
}

impl PlannedTable {
    pub fn name(&self) -> &str {
        &self.table.table_name
    }
}

/// Ordered tables for creation and, separately, for dropping
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationPlan {
    pub create: Vec<PlannedTable>,
    pub drop: Vec<PlannedTable>,
}

impl MigrationPlan {
    /// Plan `create_set` for creation and `drop_set` for dropping. Each
    /// order is computed over its own set.
    pub fn build(
        create_set: Vec<TableDescriptor>,
        drop_set: Vec<TableDescriptor>,
        primary_table: Option<&str>,
        primary_feature: &str,
    ) -> Self {
        let create = create_order(create_set, primary_table, primary_feature);
        let mut drop = create_order(drop_set, primary_table, primary_feature);
        drop.reverse();
        Self { create, drop }
    }

    pub fn create_names(&self) -> Vec<&str> {
        self.create.iter().map(PlannedTable::name).collect()
    }

    pub fn drop_names(&self) -> Vec<&str> {
        self.drop.iter().map(PlannedTable::name).collect()
    }

    /// Position of a table in the create order
    pub fn create_position(&self, table: &str) -> Option<usize> {
        self.create.iter().position(|t| t.name() == table)
    }
}

/// Deduplicate, classify and topologically sort `tables`
pub fn create_order(
    tables: Vec<TableDescriptor>,
    primary_table: Option<&str>,
    primary_feature: &str,
) -> Vec<PlannedTable> {
    let mut unique: Vec<TableDescriptor> = Vec::new();
    for table in tables {
        if !unique.iter().any(|t| t.table_name == table.table_name) {
            unique.push(table);
        }
    }

    let primary = primary_table.and_then(|name| unique.iter().find(|t| t.table_name == name));
    let tiers: Vec<TableTier> = unique
        .iter()
        .map(|t| classify(t, primary, primary_feature))
        .collect();

    let index: HashMap<&str, usize> = unique
        .iter()
        .enumerate()
        .map(|(i, t)| (t.table_name.as_str(), i))
        .collect();

    // dependencies inside the set only
    let mut pending: Vec<BTreeSet<usize>> = unique
        .iter()
        .map(|t| {
            t.referenced_tables()
                .filter_map(|name| index.get(name).copied())
                .collect()
        })
        .collect();

    let mut placed = vec![false; unique.len()];
    let mut order: Vec<usize> = Vec::with_capacity(unique.len());

    while order.len() < unique.len() {
        let ready = (0..unique.len())
            .filter(|&i| !placed[i] && pending[i].is_empty())
            .min_by_key(|&i| (tiers[i], i));

        let next = match ready {
            Some(i) => i,
            None => {
                let Some(i) = (0..unique.len())
                    .filter(|&i| !placed[i])
                    .min_by_key(|&i| (tiers[i], i))
                else {
                    break;
                };
                warn!(
                    "⚠️  Foreign key cycle involving {}, ordering by tier",
                    unique[i].table_name
                );
                i
            }
        };

        placed[next] = true;
        order.push(next);
        for deps in pending.iter_mut() {
            deps.remove(&next);
        }
    }

    let mut slots: Vec<Option<TableDescriptor>> = unique.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| {
            slots[i].take().map(|table| PlannedTable {
                tier: tiers[i],
                table,
            })
        })
        .collect()
}

/// Names in plan order
pub fn names(tables: &[PlannedTable]) -> Vec<TableName> {
    tables.iter().map(|t| t.name().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForeignKeyRef, Ownership, TableSource};
    use pretty_assertions::assert_eq;

    fn table(name: &str, owner: &str, refs: &[&str], one_to_one: bool) -> TableDescriptor {
        let mut t = TableDescriptor::new(name, TableSource::Templated).with_owner(Ownership::verified(owner));
        t.primary_key = Some(vec!["id".to_string()]);
        for r in refs {
            t.foreign_keys.push(ForeignKeyRef {
                columns: vec![if one_to_one { "id" } else { "account_id" }.to_string()],
                referenced_table: r.to_string(),
                referenced_columns: vec!["id".to_string()],
            });
        }
        t
    }

    fn fixture() -> Vec<TableDescriptor> {
        vec![
            table("account_remember_keys", "remember", &["accounts"], true),
            table("account_password_hashes", "base", &["accounts"], true),
            table("accounts", "base", &["account_statuses"], false),
            table("account_jwt_refresh_keys", "jwt_refresh", &["accounts"], false),
            table("account_statuses", "base", &[], false),
        ]
    }

    #[test]
    fn test_tiers() {
        let tables = fixture();
        let primary = tables.iter().find(|t| t.table_name == "accounts");
        let tiers: Vec<TableTier> = tables.iter().map(|t| classify(t, primary, "base")).collect();
        assert_eq!(
            tiers,
            vec![
                TableTier::Feature,
                TableTier::Auxiliary,
                TableTier::Primary,
                TableTier::Feature,
                TableTier::Lookup,
            ]
        );
    }

    #[test]
    fn test_create_order_respects_tiers_and_keys() {
        let plan = MigrationPlan::build(fixture(), fixture(), Some("accounts"), "base");
        assert_eq!(
            plan.create_names(),
            vec![
                "account_statuses",
                "accounts",
                "account_password_hashes",
                "account_remember_keys",
                "account_jwt_refresh_keys",
            ]
        );
        assert_eq!(
            plan.drop_names(),
            vec![
                "account_jwt_refresh_keys",
                "account_remember_keys",
                "account_password_hashes",
                "accounts",
                "account_statuses",
            ]
        );
    }

    #[test]
    fn test_drop_set_is_planned_independently() {
        let create = vec![table("account_remember_keys", "remember", &["accounts"], true)];
        let plan = MigrationPlan::build(create, fixture(), Some("accounts"), "base");
        assert_eq!(plan.create_names(), vec!["account_remember_keys"]);
        assert_eq!(plan.drop.len(), 5);
        assert_eq!(plan.drop_names().last(), Some(&"account_statuses"));
    }

    #[test]
    fn test_feature_dependency_between_feature_tables() {
        let tables = vec![
            table("account_otp_unlocks", "otp_unlock", &["account_otp_keys"], false),
            table("account_otp_keys", "otp", &["accounts"], true),
            table("accounts", "base", &[], false),
        ];
        let order = names(&create_order(tables, Some("accounts"), "base"));
        assert_eq!(order, vec!["accounts", "account_otp_keys", "account_otp_unlocks"]);
    }

    #[test]
    fn test_duplicates_and_cycles_are_tolerated() {
        let tables = vec![
            table("a", "x", &["b"], false),
            table("b", "x", &["a"], false),
            table("a", "x", &[], false),
        ];
        let order = names(&create_order(tables, None, "base"));
        assert_eq!(order, vec!["a", "b"]);
    }
}
