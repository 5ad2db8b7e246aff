//! Column inference from naming conventions
//!
//! Used only for tables no template describes. The mapping is closed and
//! lossy:
//!
//! | column            | definition                              |
//! |-------------------|-----------------------------------------|
//! | `id`              | primary key                             |
//! | `*_id`            | integer, foreign key to the primary table |
//! | `key`             | required string                         |
//! | `*_at`, `at`      | timestamp, defaults to now              |
//! | `*_deadline`, `deadline` | timestamp                        |
//! | `num_*`, `*_count`| integer, default 0                      |
//! | anything else     | nullable string                         |

use crate::db::DialectCapabilities;
use crate::models::{ColumnDef, ForeignKeyRef, TableDescriptor, TableName, TableSource};
use crate::template::DialectTypes;

pub struct ColumnInference {
    types: DialectTypes,
    primary_table: Option<TableName>,
}

impl ColumnInference {
    pub fn new(capabilities: DialectCapabilities, primary_table: Option<TableName>) -> Self {
        Self {
            types: DialectTypes::for_capabilities(&capabilities),
            primary_table,
        }
    }

    /// Build a descriptor for `table` from its column names
    pub fn describe(&self, table: &str, columns: &[String]) -> TableDescriptor {
        let default_columns = ["id".to_string()];
        let columns = if columns.is_empty() { &default_columns[..] } else { columns };

        let is_primary = self.primary_table.as_deref() == Some(table);
        // `id` is the table's own serial key unless it is the 1:1 link to
        // the primary table
        let owns_id = is_primary
            || self.primary_table.is_none()
            || columns.iter().any(|c| c != "id" && c.ends_with("_id"));

        let mut descriptor = TableDescriptor::new(table, TableSource::Inferred);
        for name in columns {
            let column = if name == "id" {
                descriptor.primary_key = Some(vec![name.clone()]);
                if owns_id {
                    self.column(name, self.types.serial, false, None, true)
                } else {
                    self.link_to_primary(&mut descriptor, name);
                    self.column(name, self.types.fk_type, false, None, true)
                }
            } else if name.ends_with("_id") {
                self.link_to_primary(&mut descriptor, name);
                self.column(name, self.types.fk_type, false, None, false)
            } else if name == "key" {
                self.column(name, self.types.string, false, None, false)
            } else if name == "at" || name.ends_with("_at") {
                self.column(name, self.types.timestamp, false, Some(self.types.now), false)
            } else if name == "deadline" || name.ends_with("_deadline") {
                self.column(name, self.types.timestamp, false, None, false)
            } else if name.starts_with("num_") || name.ends_with("_count") {
                self.column(name, "INTEGER", false, Some("0"), false)
            } else {
                self.column(name, self.types.string, true, None, false)
            };
            descriptor.columns.push(column);
        }
        descriptor
    }

    fn column(
        &self,
        name: &str,
        data_type: &str,
        nullable: bool,
        default_value: Option<&str>,
        is_primary_key: bool,
    ) -> ColumnDef {
        ColumnDef {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
            default_value: default_value.map(str::to_string),
            is_primary_key,
        }
    }

    fn link_to_primary(&self, descriptor: &mut TableDescriptor, column: &str) {
        if let Some(primary) = &self.primary_table {
            if primary != &descriptor.table_name {
                descriptor.foreign_keys.push(ForeignKeyRef {
                    columns: vec![column.to_string()],
                    referenced_table: primary.clone(),
                    referenced_columns: vec!["id".to_string()],
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Dialect;
    use pretty_assertions::assert_eq;

    fn inference() -> ColumnInference {
        ColumnInference::new(
            DialectCapabilities::assumed(Dialect::Postgres),
            Some("accounts".to_string()),
        )
    }

    fn names(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_closed_mapping() {
        let table = inference().describe(
            "account_things",
            &names(&["id", "key", "created_at", "deadline", "num_failures", "sign_count", "note"]),
        );

        let kinds: Vec<(&str, &str, bool)> = table
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str(), c.nullable))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("id", "BIGINT", false),
                ("key", "VARCHAR(255)", false),
                ("created_at", "TIMESTAMP", false),
                ("deadline", "TIMESTAMP", false),
                ("num_failures", "INTEGER", false),
                ("sign_count", "INTEGER", false),
                ("note", "VARCHAR(255)", true),
            ]
        );
        assert_eq!(table.column("num_failures").unwrap().default_value.as_deref(), Some("0"));
        assert!(table.is_one_to_one_with("accounts"));
        assert_eq!(table.source, TableSource::Inferred);
    }

    #[test]
    fn test_id_is_serial_when_another_column_links_the_primary_table() {
        let table = inference().describe("account_tokens", &names(&["id", "account_id", "key"]));

        assert_eq!(table.column("id").unwrap().data_type, "BIGSERIAL");
        assert!(table.references("accounts"));
        assert!(!table.is_one_to_one_with("accounts"));
    }

    #[test]
    fn test_primary_table_never_references_itself() {
        let table = inference().describe("accounts", &names(&["id", "email", "status_id"]));

        assert_eq!(table.column("id").unwrap().data_type, "BIGSERIAL");
        assert!(table.foreign_keys.is_empty());
    }

    #[test]
    fn test_no_columns_yields_a_key_only_table() {
        let table = inference().describe("account_misc", &[]);
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.primary_key, Some(vec!["id".to_string()]));
    }
}
