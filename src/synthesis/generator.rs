//! Migration SQL generator
//!
//! Renders feature templates into ordered DDL and produces DDL for tables
//! that only have an inferred description.

use crate::connection::Dialect;
use crate::db::DialectCapabilities;
use crate::error::{GenerationError, GenerationResult};
use crate::models::{FeatureId, IndexDef, Ownership, TableDescriptor};
use crate::registry::FeatureDescriptor;
use crate::synthesis::plan::MigrationPlan;
use crate::template::ddl::{self, Statement, StatementKind};
use crate::template::{DialectTypes, TemplateInspector, TemplateStore};

/// Template name reported for DDL built from inferred descriptors
pub const INFERRED_TEMPLATE: &str = "inferred";

/// DDL of one feature, with the tables it describes
#[derive(Debug, Clone)]
pub struct FeatureScript {
    pub feature: FeatureId,
    pub template: String,
    pub statements: Vec<Statement>,
    pub tables: Vec<TableDescriptor>,
}

impl FeatureScript {
    /// Stable-sort statements by the create position of their table.
    /// Statements without a table (extensions, settings) stay in front.
    pub fn order_by(&mut self, plan: &MigrationPlan) {
        self.statements.sort_by_key(|statement| match statement.table() {
            None => 0,
            Some(table) => plan.create_position(table).map_or(usize::MAX, |p| p + 1),
        });
    }

    /// Earliest create position of any of this script's tables
    pub fn first_position(&self, plan: &MigrationPlan) -> usize {
        self.tables
            .iter()
            .filter_map(|t| plan.create_position(&t.table_name))
            .min()
            .unwrap_or(usize::MAX)
    }

    pub fn to_sql(&self) -> String {
        let body = self
            .statements
            .iter()
            .map(Statement::to_sql)
            .collect::<Vec<_>>()
            .join("\n\n");
        format!("-- {} (template: {})\n{}", self.feature, self.template, body)
    }
}

pub struct MigrationGenerator<'a> {
    store: &'a TemplateStore,
    prefix: &'a str,
    capabilities: DialectCapabilities,
    types: DialectTypes,
}

impl<'a> MigrationGenerator<'a> {
    pub fn new(store: &'a TemplateStore, prefix: &'a str, capabilities: DialectCapabilities) -> Self {
        Self {
            store,
            prefix,
            capabilities,
            types: DialectTypes::for_capabilities(&capabilities),
        }
    }

    /// Render a feature's template. Features without one get an empty script.
    pub fn render_feature(&self, feature: &FeatureDescriptor) -> GenerationResult<FeatureScript> {
        let Some(template) = &feature.template else {
            return Ok(FeatureScript {
                feature: feature.name.clone(),
                template: INFERRED_TEMPLATE.to_string(),
                statements: Vec::new(),
                tables: Vec::new(),
            });
        };

        let sql = TemplateInspector::new(self.store)
            .render(template, self.prefix, self.capabilities)
            .map_err(|source| GenerationError::Render {
                feature: feature.name.clone(),
                template: template.clone(),
                source,
            })?;

        let statements = ddl::split_statements(&sql);
        let tables = ddl::describe_statements(&statements)
            .into_iter()
            .map(|table| table.with_owner(Ownership::verified(&feature.name)))
            .collect();

        Ok(FeatureScript {
            feature: feature.name.clone(),
            template: template.clone(),
            statements,
            tables,
        })
    }

    /// Append DDL for a table no template created
    pub fn add_inferred(&self, script: &mut FeatureScript, table: TableDescriptor) {
        script.statements.push(Statement::parse(&self.create_table_sql(&table)));
        if self.inline_indexes() {
            script.tables.push(table);
            return;
        }
        for index in &table.indexes {
            script
                .statements
                .push(Statement::parse(&self.create_index_sql(&table.table_name, index)));
        }
        script.tables.push(table);
    }

    /// MySQL has no `CREATE INDEX IF NOT EXISTS`, so its indexes live in the
    /// guarded `CREATE TABLE` instead
    fn inline_indexes(&self) -> bool {
        self.capabilities.dialect == Dialect::Mysql
    }

    fn quote(&self, ident: &str) -> String {
        self.types.quote(self.capabilities.dialect, ident)
    }

    pub fn create_table_sql(&self, table: &TableDescriptor) -> String {
        let pk = table.primary_key.clone().unwrap_or_default();
        let inline_pk = pk.len() == 1;

        let mut lines: Vec<String> = table
            .columns
            .iter()
            .map(|col| {
                let mut def = format!("    {} {}", self.quote(&col.name), col.data_type);
                if inline_pk && col.name == pk[0] {
                    def.push_str(" PRIMARY KEY");
                } else if !col.nullable {
                    def.push_str(" NOT NULL");
                }
                if let Some(ref default) = col.default_value {
                    def.push_str(&format!(" DEFAULT {}", default));
                }
                def
            })
            .collect();

        if pk.len() > 1 {
            let pk_cols: Vec<String> = pk.iter().map(|c| self.quote(c)).collect();
            lines.push(format!("    PRIMARY KEY ({})", pk_cols.join(", ")));
        }

        if self.inline_indexes() {
            for index in &table.indexes {
                let cols: Vec<String> = index.columns.iter().map(|c| self.quote(c)).collect();
                lines.push(format!(
                    "    {}KEY {} ({})",
                    if index.is_unique { "UNIQUE " } else { "" },
                    self.quote(&index.name),
                    cols.join(", ")
                ));
            }
        }

        for fk in &table.foreign_keys {
            let source_cols: Vec<String> = fk.columns.iter().map(|c| self.quote(c)).collect();
            let target_cols: Vec<String> = fk.referenced_columns.iter().map(|c| self.quote(c)).collect();
            lines.push(format!(
                "    FOREIGN KEY ({}) REFERENCES {}({})",
                source_cols.join(", "),
                self.quote(&fk.referenced_table),
                target_cols.join(", ")
            ));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n);",
            self.quote(&table.table_name),
            lines.join(",\n")
        )
    }

    pub fn create_index_sql(&self, table: &str, index: &IndexDef) -> String {
        let cols: Vec<String> = index.columns.iter().map(|c| self.quote(c)).collect();
        let mut sql = format!(
            "CREATE {}INDEX {}{} ON {} ({})",
            if index.is_unique { "UNIQUE " } else { "" },
            self.types.index_guard,
            self.quote(&index.name),
            self.quote(table),
            cols.join(", ")
        );
        if let Some(predicate) = index.predicate.as_ref().filter(|_| self.capabilities.partial_indexes) {
            sql.push_str(&format!(" WHERE {}", predicate));
        }
        sql.push(';');
        sql
    }

    pub fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {};", self.quote(table))
    }
}

/// Tables of `script` that its statements create
pub fn created_by(script: &FeatureScript) -> Vec<&str> {
    script
        .statements
        .iter()
        .filter_map(|s| match &s.kind {
            StatementKind::CreateTable(t) => Some(t.as_str()),
            _ => None,
        })
        .collect()
}
