use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sea_orm::{EntityTrait, QueryOrder};
use tracing::{error, info, warn};

use stockledger::{
    config::{init_tracing, load_config},
    db,
    entities::product::{self, Entity as Product},
    events::{process_events, EventSender},
    LedgerServices,
};

/// Ledger maintenance entry point.
///
/// Usage: `stockledger [reconcile]`, default `reconcile`.
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = load_config().context("failed to load configuration")?;
    init_tracing(cfg.log_level(), cfg.log_json);

    let command = std::env::args().nth(1).unwrap_or_else(|| "reconcile".to_string());

    let db_pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let db_arc = Arc::new(db_pool);
    let (event_sender, event_rx) = EventSender::channel(cfg.event_channel_capacity);
    let events = tokio::spawn(process_events(event_rx));
    let services = LedgerServices::new(db_arc.clone(), Arc::new(event_sender), &cfg);

    match command.as_str() {
        "reconcile" => reconcile(&db_arc, &services).await?,
        other => bail!("unknown command '{}', expected reconcile", other),
    }

    // Closing the last sender lets the event loop drain and exit.
    drop(services);
    if let Err(e) = events.await {
        warn!(error = %e, "Event processor task failed");
    }
    Ok(())
}

/// Resets every product's total to the sum of its batches.
async fn reconcile(db: &db::DbPool, services: &LedgerServices) -> Result<()> {
    let products = Product::find()
        .order_by_asc(product::Column::CompanyId)
        .all(db)
        .await?;

    let mut drifted = 0usize;
    for p in &products {
        let (previous, reconciled) = services
            .stock
            .reconcile_product_total(p.company_id, p.id)
            .await
            .with_context(|| format!("failed to reconcile product {}", p.id))?;
        if previous != reconciled {
            drifted += 1;
        }
    }

    info!(products = products.len(), drifted, "Product totals reconciled");
    Ok(())
}
