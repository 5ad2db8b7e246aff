//! Schema synthesis
//!
//! [`SchemaSynthesizer`] turns a set of missing tables into the minimal set
//! of features that creates them, plans create and drop orders over those
//! features' tables, and then either renders the DDL as text, writes it to
//! a migration file, or runs it against a live database.

pub mod generator;
pub mod inference;
pub mod plan;

pub use generator::{FeatureScript, MigrationGenerator};
pub use inference::ColumnInference;
pub use plan::{MigrationPlan, PlannedTable, TableTier};

use crate::db::{Database, DialectCapabilities};
use crate::error::{GenerationError, GenerationResult};
use crate::introspection::TableInspector;
use crate::models::{AccessorId, FeatureId, TableDescriptor, TableName};
use crate::registry::{CapabilityRegistry, FeatureDescriptor, PRIMARY_FEATURE};
use crate::template::TemplateInspector;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rendered migration: creation DDL and the matching drop DDL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationText {
    pub features: Vec<FeatureId>,
    pub up: String,
    pub down: String,
}

impl MigrationText {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// SHA-256 over both directions
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.up.as_bytes());
        hasher.update(b"\0");
        hasher.update(self.down.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for MigrationText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- migrate:up")?;
        writeln!(f, "{}", self.up)?;
        writeln!(f)?;
        writeln!(f, "-- migrate:down")?;
        writeln!(f, "{}", self.down)
    }
}

/// Planned scripts for a feature set, scripts in execution order
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub plan: MigrationPlan,
    pub scripts: Vec<FeatureScript>,
}

pub struct SchemaSynthesizer<'a, R: CapabilityRegistry + ?Sized> {
    registry: &'a R,
    capabilities: DialectCapabilities,
}

impl<'a, R: CapabilityRegistry + ?Sized> SchemaSynthesizer<'a, R> {
    pub fn new(registry: &'a R, capabilities: DialectCapabilities) -> Self {
        Self { registry, capabilities }
    }

    fn generator(&self) -> MigrationGenerator<'a> {
        let registry: &'a R = self.registry;
        MigrationGenerator::new(registry.templates(), registry.table_prefix(), self.capabilities)
    }

    /// Every table a feature may create: its template's tables plus the
    /// tables its accessors resolve to
    pub fn feature_tables(&self, feature: &FeatureDescriptor) -> Vec<TableName> {
        let mut tables = TemplateInspector::new(self.registry.templates()).extract_tables(
            feature,
            self.registry.table_prefix(),
            self.capabilities.dialect,
        );
        for table in TableInspector::owned_tables(self.registry, &feature.name) {
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        tables
    }

    /// Smallest set of enabled features whose tables include every missing
    /// table, in registry order
    pub fn covering_features(&self, missing: &[TableName]) -> Vec<&'a FeatureDescriptor> {
        let registry: &'a R = self.registry;
        let missing: HashSet<&str> = missing.iter().map(String::as_str).collect();
        let mut covered: HashSet<TableName> = HashSet::new();
        let mut chosen: Vec<&'a FeatureDescriptor> = Vec::new();

        for feature in registry.enabled_features() {
            let tables = self.feature_tables(feature);
            if tables.iter().any(|t| missing.contains(t.as_str())) {
                covered.extend(tables);
                chosen.push(feature);
            }
        }

        // every other feature's tables hang off the primary table
        let primary_missing = registry
            .primary_table()
            .is_some_and(|t| missing.contains(t.as_str()));
        if primary_missing && !chosen.iter().any(|f| f.name == PRIMARY_FEATURE) {
            if let Some(primary) = registry.primary_feature() {
                chosen.insert(0, primary);
            }
        }

        for table in missing.iter().filter(|t| !covered.contains(**t)) {
            warn!("⚠️  No enabled feature creates table {}", table);
        }
        chosen
    }

    /// Rendered script of one feature, with inferred DDL for accessor
    /// tables its template does not create
    fn feature_script(
        &self,
        generator: &MigrationGenerator<'_>,
        accessor_tables: &BTreeMap<AccessorId, TableDescriptor>,
        feature: &FeatureDescriptor,
    ) -> GenerationResult<FeatureScript> {
        let mut script = generator.render_feature(feature)?;

        for (accessor, descriptor) in accessor_tables {
            let owned = feature.defines_accessor(accessor);
            let templated = script.tables.iter().any(|t| t.table_name == descriptor.table_name);
            if owned && !templated {
                debug!(
                    "Inferring structure of {} for feature {}",
                    descriptor.table_name, feature.name
                );
                generator.add_inferred(&mut script, descriptor.clone());
            }
        }
        Ok(script)
    }

    /// Render and plan `features`
    pub fn synthesize(&self, features: &[&FeatureDescriptor]) -> GenerationResult<Synthesis> {
        let generator = self.generator();
        let accessor_tables = TableInspector::table_information(self.registry, self.capabilities);

        let mut scripts = Vec::with_capacity(features.len());
        for feature in features {
            scripts.push(self.feature_script(&generator, &accessor_tables, feature)?);
        }

        let tables: Vec<_> = scripts.iter().flat_map(|s| s.tables.iter().cloned()).collect();
        let primary_table = self.registry.primary_table();
        let plan = MigrationPlan::build(
            tables.clone(),
            tables,
            primary_table.as_deref(),
            PRIMARY_FEATURE,
        );

        for script in scripts.iter_mut() {
            script.order_by(&plan);
        }
        scripts.sort_by_key(|script| script.first_position(&plan));

        Ok(Synthesis { plan, scripts })
    }

    /// `features` plus every enabled feature owning a table that references
    /// one of theirs, directly or through other such tables. Dropping
    /// `features` alone would leave those tables pointing at nothing.
    pub fn with_dependents(&self, features: &[&'a FeatureDescriptor]) -> Vec<&'a FeatureDescriptor> {
        let registry: &'a R = self.registry;
        let generator = self.generator();
        let accessor_tables = TableInspector::table_information(registry, self.capabilities);

        let mut owned: Vec<(&'a FeatureDescriptor, Vec<TableDescriptor>)> = Vec::new();
        for feature in registry.enabled_features() {
            match self.feature_script(&generator, &accessor_tables, feature) {
                Ok(script) => owned.push((feature, script.tables)),
                Err(e) => warn!("⚠️  Cannot tell whether {} depends on dropped tables: {}", feature.name, e),
            }
        }

        let mut chosen: HashSet<&'a str> = features.iter().map(|f| f.name.as_str()).collect();
        let mut doomed: HashSet<&str> = owned
            .iter()
            .filter(|(feature, _)| chosen.contains(feature.name.as_str()))
            .flat_map(|(_, tables)| tables.iter().map(|t| t.table_name.as_str()))
            .collect();

        loop {
            let mut grew = false;
            for (feature, tables) in &owned {
                if chosen.contains(feature.name.as_str()) {
                    continue;
                }
                let dependent = tables
                    .iter()
                    .any(|t| t.referenced_tables().any(|r| doomed.contains(r)));
                if dependent {
                    debug!("Feature {} references dropped tables, dropping it too", feature.name);
                    chosen.insert(feature.name.as_str());
                    doomed.extend(tables.iter().map(|t| t.table_name.as_str()));
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let mut expanded: Vec<&'a FeatureDescriptor> = registry
            .enabled_features()
            .into_iter()
            .filter(|f| chosen.contains(f.name.as_str()))
            .collect();
        for feature in features {
            if !expanded.iter().any(|f| f.name == feature.name) {
                expanded.push(*feature);
            }
        }
        expanded
    }

    fn render_text(&self, synthesis: &Synthesis) -> MigrationText {
        let generator = self.generator();
        MigrationText {
            features: synthesis.scripts.iter().map(|s| s.feature.clone()).collect(),
            up: synthesis
                .scripts
                .iter()
                .map(FeatureScript::to_sql)
                .collect::<Vec<_>>()
                .join("\n\n"),
            down: synthesis
                .plan
                .drop
                .iter()
                .map(|t| generator.drop_table_sql(t.name()))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// DDL creating the features that cover `missing`, and dropping every
    /// table those features own
    pub fn generate_migration(&self, missing: &[TableName]) -> GenerationResult<MigrationText> {
        let features = self.covering_features(missing);
        let synthesis = self.synthesize(&features)?;
        Ok(self.render_text(&synthesis))
    }

    /// DDL for every enabled feature
    pub fn generate_full(&self) -> GenerationResult<MigrationText> {
        let features = self.registry.enabled_features();
        let synthesis = self.synthesize(&features)?;
        Ok(self.render_text(&synthesis))
    }

    /// Write the migration for `missing` to
    /// `<dir>/<YYYYmmddHHMMSS>_create_<prefix>_auth_tables.sql`. An existing
    /// file of that name is left alone and reported as an I/O error.
    pub fn write_migration(
        &self,
        dir: &Path,
        missing: &[TableName],
        now: DateTime<Utc>,
    ) -> GenerationResult<PathBuf> {
        let text = self.generate_migration(missing)?;

        std::fs::create_dir_all(dir).map_err(|source| GenerationError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(format!(
            "{}_create_{}_auth_tables.sql",
            now.format("%Y%m%d%H%M%S"),
            self.registry.table_prefix()
        ));
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .and_then(|mut file| file.write_all(text.to_string().as_bytes()))
            .map_err(|source| GenerationError::Io {
                path: path.clone(),
                source,
            })?;

        info!("📝 Wrote migration {}", path.display());
        Ok(path)
    }

    /// Create the tables of the features covering `missing`. Returns the
    /// tables in creation order.
    pub async fn execute_creates<D: Database>(
        &self,
        db: &D,
        missing: &[TableName],
    ) -> GenerationResult<Vec<TableName>> {
        let features = self.covering_features(missing);
        self.create_features(db, &features).await
    }

    /// Drop every table of the features covering `missing`, and of the
    /// features whose tables reference them, dependents first
    pub async fn execute_drops<D: Database>(
        &self,
        db: &D,
        missing: &[TableName],
    ) -> GenerationResult<Vec<TableName>> {
        let features = self.with_dependents(&self.covering_features(missing));
        self.drop_features(db, &features).await
    }

    /// Drop and recreate the features covering `missing`, together with
    /// the features depending on them
    pub async fn sync<D: Database>(&self, db: &D, missing: &[TableName]) -> GenerationResult<Vec<TableName>> {
        let features = self.with_dependents(&self.covering_features(missing));
        self.drop_features(db, &features).await?;
        self.create_features(db, &features).await
    }

    async fn create_features<D: Database>(
        &self,
        db: &D,
        features: &[&FeatureDescriptor],
    ) -> GenerationResult<Vec<TableName>> {
        let synthesis = self.synthesize(features)?;

        for script in &synthesis.scripts {
            for statement in &script.statements {
                db.execute(&statement.to_sql())
                    .await
                    .map_err(|source| GenerationError::Execute {
                        feature: script.feature.clone(),
                        template: script.template.clone(),
                        statement: statement.sql.clone(),
                        source,
                    })?;
            }
        }

        let created = plan::names(&synthesis.plan.create);
        info!("✅ Created {} tables: {}", created.len(), created.join(", "));
        Ok(created)
    }

    async fn drop_features<D: Database>(
        &self,
        db: &D,
        features: &[&FeatureDescriptor],
    ) -> GenerationResult<Vec<TableName>> {
        let synthesis = self.synthesize(features)?;
        let generator = self.generator();

        for table in &synthesis.plan.drop {
            let statement = generator.drop_table_sql(table.name());
            let feature = table.table.feature_name().unwrap_or_default().to_string();
            let template = synthesis
                .scripts
                .iter()
                .find(|s| s.feature == feature)
                .map(|s| s.template.clone())
                .unwrap_or_default();

            db.execute(&statement)
                .await
                .map_err(|source| GenerationError::Execute {
                    feature,
                    template,
                    statement: statement.clone(),
                    source,
                })?;
        }

        let dropped = plan::names(&synthesis.plan.drop);
        warn!("🗑️  Dropped {} tables: {}", dropped.len(), dropped.join(", "));
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Dialect;
    use crate::db::MemoryDatabase;
    use crate::registry::{AccessorSpec, AuthRegistry, DefaultTable};
    use crate::template::TemplateStore;
    use pretty_assertions::assert_eq;

    fn registry(features: &[&str]) -> AuthRegistry {
        AuthRegistry::builder().enable_all(features.iter().copied()).build().unwrap()
    }

    fn caps(dialect: Dialect) -> DialectCapabilities {
        DialectCapabilities::assumed(dialect)
    }

    fn position(text: &str, needle: &str) -> usize {
        text.find(needle).unwrap_or_else(|| panic!("{} not in output", needle))
    }

    #[test]
    fn test_covering_set_is_minimal() {
        let registry = registry(&["remember", "otp", "lockout"]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));

        let names = |missing: &[&str]| -> Vec<String> {
            let missing: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
            synthesizer
                .covering_features(&missing)
                .iter()
                .map(|f| f.name.clone())
                .collect()
        };

        assert_eq!(names(&["account_otp_keys"]), vec!["otp"]);
        assert_eq!(names(&["account_lockouts", "accounts"]), vec!["base", "lockout"]);
        // statuses has no accessor, still attributed through the template
        assert_eq!(names(&["account_statuses"]), vec!["base"]);
        assert!(names(&["unrelated"]).is_empty());
    }

    #[test]
    fn test_generate_migration_is_idempotent() {
        let registry = registry(&["remember", "webauthn", "audit_logging"]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Mysql));
        let missing = vec!["accounts".to_string(), "account_webauthn_keys".to_string()];

        let first = synthesizer.generate_migration(&missing).unwrap();
        let second = synthesizer.generate_migration(&missing).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.checksum(), second.checksum());
        assert_eq!(first.features, vec!["base", "webauthn"]);
    }

    #[test]
    fn test_foreign_keys_ordered_in_both_directions() {
        let registry = registry(&["otp_unlock", "jwt_refresh", "recovery_codes"]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Sqlite));
        let features = registry.enabled_features();
        let synthesis = synthesizer.synthesize(&features).unwrap();

        for planned in &synthesis.plan.create {
            for referenced in planned.table.referenced_tables() {
                let create = synthesis.plan.create_names();
                let drop = synthesis.plan.drop_names();
                let pos = |names: &[&str], t: &str| names.iter().position(|n| *n == t).unwrap();
                assert!(pos(&create, referenced) < pos(&create, planned.name()));
                assert!(pos(&drop, referenced) > pos(&drop, planned.name()));
            }
        }
    }

    #[test]
    fn test_drops_cover_tables_without_accessors() {
        let registry = registry(&[]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));
        let text = synthesizer.generate_migration(&["accounts".to_string()]).unwrap();

        assert_eq!(
            text.down,
            "DROP TABLE IF EXISTS \"account_password_hashes\";\nDROP TABLE IF EXISTS \"accounts\";\nDROP TABLE IF EXISTS \"account_statuses\";"
        );
    }

    #[test]
    fn test_blocks_grouped_per_feature_primary_first() {
        let registry = registry(&["remember", "single_session"]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));
        let text = synthesizer.generate_full().unwrap();

        assert_eq!(text.features, vec!["base", "remember", "single_session"]);
        assert!(position(&text.up, "-- base") < position(&text.up, "-- remember"));
        assert!(position(&text.up, "CREATE EXTENSION") < position(&text.up, "account_statuses ("));
        assert!(position(&text.up, "INSERT INTO account_statuses") < position(&text.up, "CREATE TABLE IF NOT EXISTS accounts"));
        assert!(text.up.contains("WHERE status_id IN (1, 2)"));
        assert!(text.up.contains("email citext NOT NULL"));
    }

    #[test]
    fn test_plain_unique_index_without_partial_support() {
        let registry = registry(&[]);
        let mut capabilities = caps(Dialect::Postgres);
        capabilities.partial_indexes = false;
        capabilities.citext = false;
        let text = SchemaSynthesizer::new(&registry, capabilities).generate_full().unwrap();

        assert!(!text.up.contains("WHERE status_id"));
        assert!(text.up.contains("email VARCHAR(255) NOT NULL"));
        assert!(!text.up.contains("citext"));
    }

    #[test]
    fn test_feature_without_template_uses_inference() {
        let registry = AuthRegistry::builder()
            .feature(
                FeatureDescriptor::new("api_keys")
                    .accessor(AccessorSpec::new(
                        "api_keys_table",
                        DefaultTable::suffixed("_api_keys"),
                        &["id", "account_id", "key", "created_at"],
                    ))
                    .depends_on("base"),
            )
            .build()
            .unwrap();
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));
        let text = synthesizer.generate_migration(&["account_api_keys".to_string()]).unwrap();

        assert_eq!(text.features, vec!["api_keys"]);
        assert!(text.up.contains("-- api_keys (template: inferred)"));
        assert!(text.up.contains("\"account_id\" BIGINT NOT NULL"));
        assert!(text.up.contains("REFERENCES \"accounts\"(\"id\")"));
    }

    #[test]
    fn test_write_migration_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("db").join("migrate");
        let registry = registry(&["remember"]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));
        let now = DateTime::parse_from_rfc3339("2024-03-01T12:30:45Z").unwrap().with_timezone(&Utc);

        let path = synthesizer
            .write_migration(&target, &["account_remember_keys".to_string()], now)
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "20240301123045_create_account_auth_tables.sql"
        );
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("-- migrate:up\n-- remember (template: remember)"));
        assert!(contents.contains("-- migrate:down\nDROP TABLE IF EXISTS \"account_remember_keys\";"));
    }

    #[test]
    fn test_write_migration_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = DateTime::parse_from_rfc3339("2024-03-01T12:30:45Z").unwrap().with_timezone(&Utc);

        let remember = registry(&["remember"]);
        let first = SchemaSynthesizer::new(&remember, caps(Dialect::Postgres))
            .write_migration(dir.path(), &["account_remember_keys".to_string()], now)
            .unwrap();
        let written = std::fs::read_to_string(&first).unwrap();

        let otp = registry(&["otp"]);
        let err = SchemaSynthesizer::new(&otp, caps(Dialect::Postgres))
            .write_migration(dir.path(), &["account_otp_keys".to_string()], now)
            .unwrap_err();

        match err {
            GenerationError::Io { path, source } => {
                assert_eq!(path, first);
                assert_eq!(source.kind(), std::io::ErrorKind::AlreadyExists);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read_to_string(&first).unwrap(), written);
    }

    #[tokio::test]
    async fn test_drops_take_dependent_features_along() {
        let registry = registry(&["remember"]);
        let db = MemoryDatabase::new(Dialect::Postgres).with_tables([
            "accounts",
            "account_password_hashes",
            "account_remember_keys",
        ]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));
        let missing = vec!["account_statuses".to_string()];

        let dropped = synthesizer.execute_drops(&db, &missing).await.unwrap();

        assert_eq!(dropped[0], "account_remember_keys");
        let pos = |t: &str| dropped.iter().position(|n| n == t).unwrap();
        assert!(pos("account_remember_keys") < pos("accounts"));
        assert!(pos("account_password_hashes") < pos("accounts"));
        assert!(pos("accounts") < pos("account_statuses"));
        assert!(db.tables().await.is_empty());
    }

    #[tokio::test]
    async fn test_sync_recreates_dependent_features() {
        let registry = registry(&["remember"]);
        let db = MemoryDatabase::new(Dialect::Postgres).with_tables([
            "accounts",
            "account_password_hashes",
            "account_remember_keys",
        ]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));

        synthesizer
            .sync(&db, &["account_statuses".to_string()])
            .await
            .unwrap();

        let mut tables = db.tables().await;
        tables.sort();
        assert_eq!(
            tables,
            vec![
                "account_password_hashes",
                "account_remember_keys",
                "account_statuses",
                "accounts"
            ]
        );
    }

    #[test]
    fn test_with_dependents_follows_references() {
        let registry = registry(&["remember", "otp", "webauthn"]);
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Sqlite));

        let base_only = synthesizer.covering_features(&["account_statuses".to_string()]);
        let names: Vec<&str> = synthesizer
            .with_dependents(&base_only)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["base", "remember", "otp", "webauthn"]);

        let otp_only = synthesizer.covering_features(&["account_otp_keys".to_string()]);
        let names: Vec<&str> = synthesizer
            .with_dependents(&otp_only)
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["otp"]);
    }

    #[tokio::test]
    async fn test_execute_creates_then_drops() {
        let registry = registry(&["lockout"]);
        let db = MemoryDatabase::new(Dialect::Sqlite);
        let synthesizer = SchemaSynthesizer::new(&registry, db.capabilities().await);
        let missing = vec!["accounts".to_string(), "account_lockouts".to_string()];

        let created = synthesizer.execute_creates(&db, &missing).await.unwrap();
        assert_eq!(created[0], "account_statuses");
        assert_eq!(db.tables().await.len(), 5);

        synthesizer.execute_drops(&db, &missing).await.unwrap();
        assert!(db.tables().await.is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure_is_wrapped() {
        let registry = registry(&["otp"]);
        let db = MemoryDatabase::new(Dialect::Postgres).fail_on("account_otp_keys");
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));

        let err = synthesizer
            .execute_creates(&db, &["account_otp_keys".to_string()])
            .await
            .unwrap_err();
        match err {
            GenerationError::Execute { feature, template, statement, .. } => {
                assert_eq!(feature, "otp");
                assert_eq!(template, "otp");
                assert!(statement.starts_with("CREATE TABLE IF NOT EXISTS account_otp_keys"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_template_override_changes_output() {
        let store = TemplateStore::builtin().with_template("remember", "CREATE TABLE {{prefix}}_remember_keys (id {{fk_type}} PRIMARY KEY);");
        let registry = AuthRegistry::builder().enable("remember").templates(store).build().unwrap();
        let synthesizer = SchemaSynthesizer::new(&registry, caps(Dialect::Postgres));
        let text = synthesizer
            .generate_migration(&["account_remember_keys".to_string()])
            .unwrap();
        assert!(text.up.contains("CREATE TABLE account_remember_keys (id BIGINT PRIMARY KEY);"));
    }
}
