//! authschema - table discovery, migration synthesis and boot-time guard
//!
//! Connects to the configured database when it is Postgres. Every other
//! command still works offline: existence is then unknown and generated DDL
//! targets the configured dialect.

use authschema::cli::{Cli, Commands, DescribeArgs, DropArgs, GenerateArgs, GuardArgs, WriteArgs};
use authschema::config::Settings;
use authschema::connection::Dialect;
use authschema::db::{Database, DialectCapabilities, MemoryDatabase, PgDatabase};
use authschema::guard::{Outcome, TableGuard, TableGuardConfig, TableStatus, TableStatusRecord};
use authschema::introspection::TableInspector;
use authschema::models::{TableDescriptor, TableName};
use authschema::registry::{AuthRegistry, CapabilityRegistry};
use authschema::synthesis::SchemaSynthesizer;
use authschema::template::TemplateInspector;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url.as_deref() {
        settings = settings.with_database_url(url)?;
    }
    let registry = settings.build_registry()?;
    info!(
        "📋 Prefix '{}', features: {}",
        registry.table_prefix(),
        registry.feature_names().join(", ")
    );

    let postgres = match &settings.database {
        Some(params) if params.dialect == Dialect::Postgres => match PgDatabase::connect(params).await {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("⚠️  Could not connect to {}: {}", params.to_display_string(), e);
                None
            }
        },
        Some(params) => {
            info!("📴 No live driver for {}, working offline", params.dialect);
            None
        }
        None => None,
    };

    let code = match postgres.as_ref() {
        Some(db) => run(&cli, &settings, &registry, Some(db)).await?,
        None => run::<MemoryDatabase>(&cli, &settings, &registry, None).await?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,authschema=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .compact(),
        )
        .init();
}

async fn run<D: Database>(
    cli: &Cli,
    settings: &Settings,
    registry: &AuthRegistry,
    db: Option<&D>,
) -> anyhow::Result<i32> {
    let capabilities = match db {
        Some(db) => db.capabilities().await,
        None => DialectCapabilities::assumed(settings.dialect()),
    };
    let guard_config = settings.to_guard_config()?;
    let synthesizer = SchemaSynthesizer::new(registry, capabilities);

    match &cli.command {
        Commands::Status => {
            let records = TableGuard::new(guard_config).report(registry, db).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_records(&records);
            }
        }
        Commands::Describe(args) => {
            let tables = describe(registry, capabilities, args)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                print_descriptors(&tables);
            }
        }
        Commands::Generate(GenerateArgs { full }) => {
            let text = if *full {
                synthesizer.generate_full()?
            } else {
                let targets = absent_tables(&guard_config, registry, db).await;
                synthesizer.generate_migration(&targets)?
            };
            if cli.json {
                let value = serde_json::json!({
                    "features": &text.features,
                    "up": &text.up,
                    "down": &text.down,
                    "checksum": text.checksum(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else if text.is_empty() {
                info!("✅ Nothing to generate, every required table exists");
            } else {
                print!("{}", text);
            }
        }
        Commands::Write(WriteArgs { dir }) => {
            let dir = dir.clone().unwrap_or_else(|| guard_config.migration_dir.clone());
            let targets = absent_tables(&guard_config, registry, db).await;
            if targets.is_empty() {
                info!("✅ Nothing to write, every required table exists");
            } else {
                let path = synthesizer.write_migration(&dir, &targets, chrono::Utc::now())?;
                println!("{}", path.display());
            }
        }
        Commands::Create => {
            let db = db.ok_or_else(|| anyhow::anyhow!("create needs a live postgres DATABASE_URL"))?;
            let targets = absent_tables(&guard_config, registry, Some(db)).await;
            if targets.is_empty() {
                info!("✅ Every required table exists");
            } else {
                let created = synthesizer.execute_creates(db, &targets).await?;
                print_names(cli.json, &created)?;
            }
        }
        Commands::Drop(args) => {
            let db = db.ok_or_else(|| anyhow::anyhow!("drop needs a live postgres DATABASE_URL"))?;
            let targets = drop_targets(&guard_config, registry, db, args).await?;
            let dropped = synthesizer.execute_drops(db, &targets).await?;
            print_names(cli.json, &dropped)?;
        }
        Commands::Guard(args) => {
            let config = apply_overrides(guard_config, args)?;
            let mut guard = TableGuard::new(config);
            let decision = guard.check(registry, db).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&decision)?);
            }
            if decision.outcome == Outcome::Halt {
                return Ok(1);
            }
        }
    }

    Ok(0)
}

/// Required tables not known to exist. Offline that is all of them.
async fn absent_tables<D: Database>(
    config: &TableGuardConfig,
    registry: &AuthRegistry,
    db: Option<&D>,
) -> Vec<TableName> {
    TableGuard::new(config.clone())
        .report(registry, db)
        .await
        .into_iter()
        .filter(|record| record.status != TableStatus::Present)
        .map(|record| record.name)
        .collect()
}

async fn drop_targets<D: Database>(
    config: &TableGuardConfig,
    registry: &AuthRegistry,
    db: &D,
    args: &DropArgs,
) -> anyhow::Result<Vec<TableName>> {
    if !args.yes {
        anyhow::bail!("refusing to drop tables without --yes");
    }
    if config.environment.is_production() {
        anyhow::bail!("refusing to drop tables in the {} environment", config.environment);
    }

    let records = TableGuard::new(config.clone()).report(registry, Some(db)).await;
    Ok(records
        .into_iter()
        .filter(|record| args.all || record.status == TableStatus::Missing)
        .map(|record| record.name)
        .collect())
}

fn apply_overrides(mut config: TableGuardConfig, args: &GuardArgs) -> anyhow::Result<TableGuardConfig> {
    if let Some(mode) = &args.mode {
        config.mode = mode.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    }
    if let Some(sequel_mode) = args.sequel_mode {
        config = config.sequel_mode(sequel_mode);
    }
    Ok(config)
}

/// Template descriptors per feature, then inferred ones for accessor
/// tables no template creates
fn describe(
    registry: &AuthRegistry,
    capabilities: DialectCapabilities,
    args: &DescribeArgs,
) -> anyhow::Result<Vec<TableDescriptor>> {
    let inspector = TemplateInspector::new(registry.templates());
    let features: Vec<_> = registry
        .enabled_features()
        .into_iter()
        .filter(|f| args.feature.as_deref().map_or(true, |name| f.name == name))
        .collect();
    if features.is_empty() {
        anyhow::bail!("feature {} is not enabled", args.feature.as_deref().unwrap_or_default());
    }

    let mut tables = Vec::new();
    for feature in &features {
        tables.extend(inspector.describe_tables(feature, registry.table_prefix(), capabilities)?);
    }

    for (_, inferred) in TableInspector::table_information(registry, capabilities) {
        let in_scope = inferred
            .feature_name()
            .is_some_and(|owner| features.iter().any(|f| f.name == owner));
        if in_scope && !tables.iter().any(|t| t.table_name == inferred.table_name) {
            tables.push(inferred);
        }
    }
    Ok(tables)
}

fn print_records(records: &[TableStatusRecord]) {
    for record in records {
        let status = match record.status {
            TableStatus::Present => "present",
            TableStatus::Missing => "MISSING",
            TableStatus::Unknown => "unknown",
        };
        let owner = record.owning_feature.as_deref().unwrap_or("-");
        let note = if record.verified { "" } else { " (unverified)" };
        println!("{:<8} {:<40} {}{}", status, record.name, owner, note);
    }
}

fn print_descriptors(tables: &[TableDescriptor]) {
    for table in tables {
        println!(
            "{} [{:?}, {}]",
            table.table_name,
            table.source,
            table.feature_name().unwrap_or("-")
        );
        for column in &table.columns {
            let pk = if column.is_primary_key { " PK" } else { "" };
            let null = if column.nullable { "" } else { " NOT NULL" };
            println!("    {:<24} {}{}{}", column.name, column.data_type, null, pk);
        }
        for fk in &table.foreign_keys {
            println!(
                "    FK ({}) -> {}({})",
                fk.columns.join(", "),
                fk.referenced_table,
                fk.referenced_columns.join(", ")
            );
        }
    }
}

fn print_names(json: bool, names: &[TableName]) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(names)?);
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}
