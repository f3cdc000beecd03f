use anyhow::{bail, Context, Result};
use sea_orm_migration::MigratorTrait;
use stockledger::{
    config::{init_tracing, load_config},
    db::{check_connection, establish_connection_from_app_config},
    migrator::Migrator,
};
use tracing::info;

/// Applies or rolls back the ledger schema.
///
/// Usage: `migration [up|down [steps]|status]`, default `up`.
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(config.log_level(), config.log_json);

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "up".to_string());

    let db = establish_connection_from_app_config(&config)
        .await
        .context("failed to connect to database")?;
    check_connection(&db).await?;

    match command.as_str() {
        "up" => {
            Migrator::up(&db, None).await?;
            info!("Migrations applied");
        }
        "down" => {
            let steps = match args.next() {
                Some(n) => n.parse::<u32>().context("steps must be a positive integer")?,
                None => 1,
            };
            Migrator::down(&db, Some(steps)).await?;
            info!(steps, "Migrations rolled back");
        }
        "status" => {
            Migrator::status(&db).await?;
        }
        other => bail!("unknown command '{}', expected up, down or status", other),
    }

    Ok(())
}
