use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use bloomstock_core::FlowerId;
use bloomstock_infra::{ActionResult, AnalyticsConfig, InventoryAnalyticsService, PostgresLedgerStore};

/// Replenishment analytics reports over the flower inventory ledger.
#[derive(Debug, Parser)]
#[command(name = "bloomstock-report", version)]
struct Cli {
    /// Configuration file (without extension).
    #[arg(long, default_value = bloomstock_infra::config::DEFAULT_FILE)]
    config: String,

    /// Database URL; overrides the configured one.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Create missing tables before reporting.
    #[arg(long)]
    migrate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Per-flower stock, safety stock, demand, status and recommendation.
    Snapshot,
    /// Value-based ABC classification.
    Abc,
    /// Demand and variability per flower.
    Demand,
    /// Active batches expired or expiring soon.
    Expiry {
        #[arg(long)]
        horizon_days: Option<i64>,
    },
    /// Fresh recommendation for one flower.
    Recommend { flower_id: FlowerId },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    bloomstock_observability::init();

    let mut config = AnalyticsConfig::load_from(&cli.config).context("failed to load configuration")?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    let store = PostgresLedgerStore::connect(
        &config.database.url,
        config.database.max_connections,
        Duration::from_millis(config.database.acquire_timeout_ms),
    )
    .await
    .context("failed to connect to the ledger database")?;
    if cli.migrate {
        store.migrate().await.context("failed to apply schema")?;
    }

    let service = InventoryAnalyticsService::new(store, &config);

    match cli.command {
        Command::Snapshot => {
            let snapshot = service.get_inventory_snapshot().await?;
            print_json(&serde_json::json!({
                "generated_at": snapshot.generated_at,
                "items": snapshot.rows(),
                "excluded": snapshot.excluded,
            }))?;
        }
        Command::Abc => print_json(&service.get_abc_report().await?)?,
        Command::Demand => print_json(&service.get_demand_analysis().await?)?,
        Command::Expiry { horizon_days } => {
            print_json(&service.get_expiry_report(horizon_days).await?)?
        }
        Command::Recommend { flower_id } => {
            let result: ActionResult<_> = service.get_recommendation(flower_id).await.into();
            print_json(&result)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
