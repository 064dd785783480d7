use anyhow::Context;
use clap::{Parser, Subcommand};
use migrations::{Migrator, MigratorTrait};
use tracing::info;

use storefront_api as api;

#[derive(Parser, Debug)]
#[command(name = "migration", about = "Manage the storefront database schema", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Apply every pending migration (default)
    Up,
    /// Roll back the most recent migration
    Down,
    /// List migrations that have not been applied yet
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Up);

    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match command {
        Command::Up => api::db::run_migrations(&db).await?,
        Command::Down => {
            info!("Rolling back the last migration");
            Migrator::down(&db, Some(1)).await?;
        }
        Command::Status => {
            let pending = Migrator::get_pending_migrations(&db).await?;
            info!(pending = pending.len(), "pending migrations");
            for migration in pending {
                info!("pending: {}", migration.name());
            }
        }
    }

    info!(?command, "migration command completed");
    Ok(())
}
