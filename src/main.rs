use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod clock;
mod dashboard;
mod db;
mod growth;
mod models;
mod period;
mod report;

use clock::{Clock, FixedClock, SystemClock};
use models::{RawTimestamp, Snapshot};

#[derive(Parser)]
#[command(name = "biznest-dashboard")]
#[command(about = "Admin dashboard analytics for the BizNest marketplace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read users and listings from a JSON snapshot instead of Postgres
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Compute the dashboard as of this instant (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_as_of)]
    as_of: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed users and listings
    Seed,
    /// Import users and/or listings from CSV files
    Import {
        #[arg(long)]
        users: Option<PathBuf>,
        #[arg(long)]
        listings: Option<PathBuf>,
    },
    /// Print the dashboard view-model as JSON
    Dashboard {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        pretty: bool,
    },
    /// Generate a markdown dashboard report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn parse_as_of(value: &str) -> Result<DateTime<Utc>, String> {
    period::parse_timestamp(&RawTimestamp::Text(value.to_string()))
        .ok_or_else(|| format!("`{value}` is not an RFC 3339 timestamp or YYYY-MM-DD date"))
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

fn read_snapshot(path: &Path) -> anyhow::Result<Snapshot> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("invalid snapshot {}", path.display()))
}

async fn load_snapshot(source: &SourceArgs) -> anyhow::Result<Snapshot> {
    let snapshot = match &source.snapshot {
        Some(path) => read_snapshot(path),
        None => {
            let pool = connect().await?;
            db::fetch_snapshot(&pool).await
        }
    };
    snapshot.context("failed to load dashboard data")
}

fn clock_for(source: &SourceArgs) -> Box<dyn Clock> {
    match source.as_of {
        Some(instant) => Box::new(FixedClock(instant)),
        None => Box::new(SystemClock),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { users, listings } => {
            if users.is_none() && listings.is_none() {
                anyhow::bail!("pass --users and/or --listings");
            }
            let pool = connect().await?;
            if let Some(path) = users {
                let inserted = db::import_users_csv(&pool, &path).await?;
                println!("Imported {inserted} users from {}.", path.display());
            }
            if let Some(path) = listings {
                let inserted = db::import_listings_csv(&pool, &path).await?;
                println!("Imported {inserted} listings from {}.", path.display());
            }
        }
        Commands::Dashboard { source, pretty } => {
            let snapshot = load_snapshot(&source).await?;
            let view = dashboard::build_dashboard(&snapshot, clock_for(&source).as_ref());
            let json = if pretty {
                serde_json::to_string_pretty(&view)?
            } else {
                serde_json::to_string(&view)?
            };
            println!("{json}");
        }
        Commands::Report { source, out } => {
            let snapshot = load_snapshot(&source).await?;
            let view = dashboard::build_dashboard(&snapshot, clock_for(&source).as_ref());
            let report = report::build_report(&view);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(skipped = view.diagnostics.skipped.len(), "report built");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn as_of_accepts_dates_and_rejects_garbage() {
        assert!(parse_as_of("2026-10-19").is_ok());
        assert!(parse_as_of("2026-10-19T15:00:00Z").is_ok());
        assert!(parse_as_of("tomorrow").is_err());
    }

    #[test]
    fn dashboard_args_parse_snapshot_and_clock() {
        let cli = Cli::try_parse_from([
            "biznest-dashboard",
            "dashboard",
            "--snapshot",
            "snapshot.json",
            "--as-of",
            "2026-10-19",
            "--pretty",
        ])
        .unwrap();

        match cli.command {
            Commands::Dashboard { source, pretty } => {
                assert!(pretty);
                assert_eq!(source.snapshot, Some(PathBuf::from("snapshot.json")));
                assert_eq!(
                    clock_for(&source).now(),
                    parse_as_of("2026-10-19").unwrap()
                );
            }
            _ => panic!("expected dashboard command"),
        }
    }

    #[test]
    fn demo_snapshot_builds_a_dashboard() {
        let snapshot: Snapshot =
            serde_json::from_str(include_str!("../demos/snapshot.json")).unwrap();
        let clock = FixedClock(parse_as_of("2026-10-19T15:00:00Z").unwrap());
        let view = dashboard::build_dashboard(&snapshot, &clock);

        assert_eq!(view.total_users, 4);
        assert_eq!(view.listing_stats.active_count, 2);
        assert_eq!(view.recent_activity.len(), 5);
        assert_eq!(view.diagnostics.skipped.len(), 1);
    }

    #[test]
    fn missing_snapshot_file_is_a_load_error() {
        let err = read_snapshot(Path::new("/nonexistent/snapshot.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read snapshot"));
    }
}
