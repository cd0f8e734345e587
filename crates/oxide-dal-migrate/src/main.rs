//! oxide-dal-migrate CLI
//!
//! Command-line tool for applying SQL-file migrations to a SQLite database.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_dal_adapter::{Adapter, SqliteClient};
use oxide_dal_core::Dialect;
use oxide_dal_migrate::loader::create_migration_file;
use oxide_dal_migrate::prelude::*;
use oxide_dal_migrate::RunReport;

/// Versioned SQL migrations.
#[derive(Parser)]
#[command(name = "oxide-dal-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Migrations directory.
    #[arg(short, long, default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Journal table name.
    #[arg(short, long, default_value = oxide_dal_migrate::DEFAULT_TABLE)]
    table: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations.
    Up {
        /// Stop after this migration id (inclusive).
        #[arg(long)]
        to: Option<String>,

        /// Number of migrations to apply (all if not specified).
        #[arg(long)]
        step: Option<usize>,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert applied migrations (the latest batch by default).
    Down {
        /// Revert every migration with an id at or after this one.
        #[arg(long)]
        to: Option<String>,

        /// Number of migrations to revert.
        #[arg(long)]
        step: Option<usize>,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Show migration status.
    Status {
        /// Print status as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create an empty migration file.
    New {
        /// Migration name, e.g. `create_users`.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Up { to, step, dry_run } => {
            let migrator = connect(&cli.database, &cli.migrations_dir, &cli.table).await?;
            let report = migrator.up(UpOptions { to, step, dry_run }).await?;
            print_report(&report);
        }

        Commands::Down { to, step, dry_run } => {
            let migrator = connect(&cli.database, &cli.migrations_dir, &cli.table).await?;
            let report = migrator.down(DownOptions { to, step, dry_run }).await?;
            print_report(&report);
        }

        Commands::Status { json } => {
            let migrator = connect(&cli.database, &cli.migrations_dir, &cli.table).await?;
            let statuses = migrator.status().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
                return Ok(());
            }
            if statuses.is_empty() {
                info!("No migrations found in {}.", cli.migrations_dir.display());
                return Ok(());
            }

            println!("\nMigrations:");
            println!("{:-<60}", "");
            for status in &statuses {
                let mark = match status.state {
                    MigrationState::Applied => "[X]",
                    MigrationState::Pending => "[ ]",
                    MigrationState::Drifted => "[!]",
                    MigrationState::Missing => "[?]",
                };
                match status.applied_at {
                    Some(applied_at) => println!(
                        " {mark} {}_{} ({}, {})",
                        status.id,
                        status.name,
                        status.state,
                        applied_at.format("%Y-%m-%d %H:%M:%S")
                    ),
                    None => println!(" {mark} {}_{} ({})", status.id, status.name, status.state),
                }
            }
            println!();
        }

        Commands::New { name } => {
            let path = create_migration_file(&cli.migrations_dir, &name, chrono::Utc::now())?;
            info!("Created migration: {}", path.display());
        }
    }

    Ok(())
}

/// Opens the database and loads the migrations directory.
async fn connect(database: &str, dir: &Path, table: &str) -> anyhow::Result<Migrator> {
    let options = SqliteConnectOptions::from_str(database)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    let adapter = Adapter::new(SqliteClient::new(pool), Dialect::sqlite());

    let migrations = load_dir(dir)?;
    info!(count = migrations.len(), dir = %dir.display(), "Loaded migrations");
    Ok(Migrator::new(Arc::new(adapter), migrations)?
        .with_config(MigratorConfig::default().table(table)))
}

fn print_report(report: &RunReport) {
    if report.is_empty() {
        info!("Nothing to do.");
        return;
    }
    for migration in &report.migrations {
        if report.dry_run {
            println!("-- {} {}_{}", report.direction, migration.id, migration.name);
            for statement in &migration.statements {
                if statement.values.is_empty() {
                    println!("{};", statement.text);
                } else {
                    println!("{}; -- {:?}", statement.text, statement.values);
                }
            }
        } else {
            info!(
                "{} {}_{} ({} statements)",
                report.direction,
                migration.id,
                migration.name,
                migration.statements.len()
            );
        }
    }
}
