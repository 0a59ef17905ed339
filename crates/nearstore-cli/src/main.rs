mod listing;
mod nearest;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nearstore-cli")]
#[command(about = "Find the store closest to an address by road distance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Pick the configured store with the shortest driving route
    #[command(group(
        ArgGroup::new("query")
            .required(true)
            .args(["address", "postal_code"])
    ))]
    Nearest {
        /// Free-text address to search from
        #[arg(long)]
        address: Option<String>,
        /// Brazilian postal code (CEP) to look up instead of an address
        #[arg(long)]
        postal_code: Option<String>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
        /// Write the route and both endpoints as a GeoJSON file
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// List the configured candidate stores
    Stores,
    /// Show recent query-log entries
    Log {
        /// Maximum number of entries to show
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = nearstore_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Nearest {
            address,
            postal_code,
            json,
            geojson,
        }) => {
            let input = match (address, postal_code) {
                (Some(address), _) => nearest::QueryInput::Address(address),
                (None, Some(code)) => nearest::QueryInput::PostalCode(code),
                (None, None) => anyhow::bail!("either --address or --postal-code is required"),
            };
            nearest::run_nearest(&config, input, json, geojson.as_deref()).await?;
        }
        Some(Commands::Stores) => listing::run_stores(&config)?,
        Some(Commands::Log { limit }) => {
            let pool = connect(&config).await?;
            listing::run_log(&pool, limit).await?;
        }
        Some(Commands::Db { command }) => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Migrate => {
                    let applied = nearstore_db::run_migrations(&pool).await?;
                    println!("migrations applied: {applied}");
                }
                DbCommands::Ping => {
                    nearstore_db::health_check(&pool).await?;
                    println!("database reachable");
                }
            }
        }
        None => println!("nearstore-cli ready; run with --help for commands"),
    }

    Ok(())
}

async fn connect(config: &nearstore_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    nearstore_db::connect_pool_from_config(config)
        .await
        .map_err(|e| anyhow::anyhow!("database unavailable: {e}"))
}
