//! Table descriptors
//!
//! Structural description of a table the engine wants to exist. Descriptors
//! are built on demand for each discovery pass and never persisted.

use serde::{Deserialize, Serialize};

pub type FeatureId = String;
pub type AccessorId = String;
pub type TableName = String;

/// Where a descriptor's structure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableSource {
    /// Guessed from column-name conventions. Lossy.
    Inferred,
    /// Parsed from a rendered DDL template. Authoritative.
    Templated,
}

/// Feature a table is attributed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ownership {
    pub feature: FeatureId,
    /// False when the owner was derived from the accessor name only.
    pub verified: bool,
}

impl Ownership {
    pub fn verified(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            verified: true,
        }
    }

    pub fn unverified(feature: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            verified: false,
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub is_primary_key: bool,
}

/// Foreign key from this table to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRef {
    pub columns: Vec<String>,
    pub referenced_table: TableName,
    pub referenced_columns: Vec<String>,
}

/// Index on this table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    /// `WHERE` clause of a partial index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
}

/// Everything known about one required table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDescriptor {
    pub table_name: TableName,
    pub owning_feature: Option<Ownership>,
    pub primary_key: Option<Vec<String>>,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKeyRef>,
    pub indexes: Vec<IndexDef>,
    pub source: TableSource,
}

impl TableDescriptor {
    pub fn new(table_name: impl Into<String>, source: TableSource) -> Self {
        Self {
            table_name: table_name.into(),
            owning_feature: None,
            primary_key: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            source,
        }
    }

    pub fn with_owner(mut self, owner: Ownership) -> Self {
        self.owning_feature = Some(owner);
        self
    }

    pub fn feature_name(&self) -> Option<&str> {
        self.owning_feature.as_ref().map(|o| o.feature.as_str())
    }

    /// Other tables this one holds a foreign key to
    pub fn referenced_tables(&self) -> impl Iterator<Item = &str> {
        self.foreign_keys
            .iter()
            .map(|fk| fk.referenced_table.as_str())
            .filter(move |t| *t != self.table_name)
    }

    pub fn references(&self, table: &str) -> bool {
        self.referenced_tables().any(|t| t == table)
    }

    /// True when the primary key is exactly a foreign key to `table`,
    /// i.e. the row lives and dies with one row of `table`.
    pub fn is_one_to_one_with(&self, table: &str) -> bool {
        let Some(pk) = &self.primary_key else {
            return false;
        };
        self.foreign_keys
            .iter()
            .any(|fk| fk.referenced_table == table && &fk.columns == pk)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}
