//! Template-based table discovery
//!
//! Renders a feature's DDL template against a synthetic dialect context and
//! reads back every table it would create. This works before any database
//! exists and also finds tables no accessor points at.

use super::{ddl, TemplateContext, TemplateStore};
use crate::connection::Dialect;
use crate::db::DialectCapabilities;
use crate::error::TemplateError;
use crate::models::{Ownership, TableDescriptor, TableName};
use crate::registry::FeatureDescriptor;
use tracing::{debug, warn};

pub struct TemplateInspector<'a> {
    store: &'a TemplateStore,
}

impl<'a> TemplateInspector<'a> {
    pub fn new(store: &'a TemplateStore) -> Self {
        Self { store }
    }

    /// Render a template by name
    pub fn render(
        &self,
        template: &str,
        prefix: &str,
        capabilities: DialectCapabilities,
    ) -> Result<String, TemplateError> {
        let ctx = TemplateContext::new(prefix, capabilities);
        self.store.load(template)?.render(&ctx)
    }

    /// Tables a feature's template creates. Never fails: a template that
    /// cannot be loaded or rendered yields no tables.
    pub fn extract_tables(
        &self,
        feature: &FeatureDescriptor,
        prefix: &str,
        dialect: Dialect,
    ) -> Vec<TableName> {
        let Some(template) = &feature.template else {
            return Vec::new();
        };

        match self.render(template, prefix, DialectCapabilities::assumed(dialect)) {
            Ok(sql) => {
                let tables = ddl::created_tables(&sql);
                debug!("Template {} declares tables: {:?}", template, tables);
                tables
            }
            Err(e) => {
                warn!("⚠️  Skipping tables of feature {}: {}", feature.name, e);
                Vec::new()
            }
        }
    }

    /// Union of every feature's tables, first-seen order
    pub fn all_tables_for_features(
        &self,
        features: &[&FeatureDescriptor],
        prefix: &str,
        dialect: Dialect,
    ) -> Vec<TableName> {
        let mut tables: Vec<TableName> = Vec::new();
        for feature in features {
            for table in self.extract_tables(feature, prefix, dialect) {
                if !tables.contains(&table) {
                    tables.push(table);
                }
            }
        }
        tables
    }

    /// Structural descriptors for a feature's tables, owned by that feature.
    /// Unlike [`extract_tables`](Self::extract_tables) this renders against
    /// the real capabilities and reports failures.
    pub fn describe_tables(
        &self,
        feature: &FeatureDescriptor,
        prefix: &str,
        capabilities: DialectCapabilities,
    ) -> Result<Vec<TableDescriptor>, TemplateError> {
        let Some(template) = &feature.template else {
            return Ok(Vec::new());
        };

        let sql = self.render(template, prefix, capabilities)?;
        Ok(ddl::describe_statements(&ddl::split_statements(&sql))
            .into_iter()
            .map(|table| table.with_owner(Ownership::verified(&feature.name)))
            .collect())
    }
}
