//! CLI argument definitions for the authschema binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::guard::SequelMode;

/// Schema discovery and migration synthesis for authentication features
#[derive(Parser, Debug)]
#[command(name = "authschema")]
#[command(about = "Discover, generate and guard the tables of enabled auth features")]
#[command(version)]
pub struct Cli {
    /// Settings file (defaults to ./authschema.toml when present)
    #[arg(short, long, global = true, env = "AUTHSCHEMA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Target database. Only postgres:// URLs are connected to; other
    /// schemes select the DDL dialect.
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every required table and whether it exists
    Status,
    /// Show the structure of each feature's tables
    Describe(DescribeArgs),
    /// Print the migration for the missing tables
    Generate(GenerateArgs),
    /// Write the migration for the missing tables to a file
    Write(WriteArgs),
    /// Create the missing tables
    Create,
    /// Drop the tables of the features owning the missing tables
    Drop(DropArgs),
    /// Run the boot-time table guard once
    Guard(GuardArgs),
}

#[derive(clap::Args, Debug)]
pub struct DescribeArgs {
    /// Only this feature
    #[arg(short, long)]
    pub feature: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// Every enabled feature, not only those with missing tables
    #[arg(long)]
    pub full: bool,
}

#[derive(clap::Args, Debug)]
pub struct WriteArgs {
    /// Migration directory (defaults to the configured migration path)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct DropArgs {
    /// Required, dropping is irreversible
    #[arg(long)]
    pub yes: bool,

    /// Drop every enabled feature's tables
    #[arg(long)]
    pub all: bool,
}

#[derive(clap::Args, Debug)]
pub struct GuardArgs {
    /// Override the configured mode (silent, warn, error, raise, halt)
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Side action run when tables are missing
    #[arg(short, long, value_parser = parse_sequel_mode)]
    pub sequel_mode: Option<SequelMode>,
}

fn parse_sequel_mode(value: &str) -> Result<SequelMode, String> {
    value.parse()
}
