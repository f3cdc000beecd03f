#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use stockledger::{
    config::AppConfig,
    db,
    entities::{
        batch_log::{self, Entity as BatchLog},
        product::{self, Entity as Product},
        stock::{self, Entity as Stock},
        warehouse,
    },
    events::{Event, EventSender},
    services::{
        batch_number::{BatchSequencer, DbBatchSequencer},
        LedgerServices,
    },
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Ledger services over a fresh in-memory SQLite database.
pub struct TestLedger {
    pub db: Arc<DatabaseConnection>,
    pub services: LedgerServices,
    pub company_id: Uuid,
    pub user_id: Uuid,
    events: mpsc::Receiver<Event>,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
    // One connection keeps the in-memory database alive and shared.
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg
}

/// Fixed base time so FIFO order in tests never depends on the clock.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
}

impl TestLedger {
    pub async fn new() -> Self {
        Self::with_sequencer(Arc::new(DbBatchSequencer)).await
    }

    pub async fn with_sequencer(sequencer: Arc<dyn BatchSequencer>) -> Self {
        let cfg = test_config();
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (sender, events) = EventSender::channel(256);
        let services =
            LedgerServices::with_sequencer(db.clone(), Arc::new(sender), &cfg, sequencer);

        Self {
            db,
            services,
            company_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            events,
        }
    }

    pub async fn warehouse(&self, name: &str) -> warehouse::Model {
        warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(self.company_id),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert warehouse")
    }

    pub async fn product(&self, name: &str, pieces_per_pack: Decimal, total_stock: Decimal) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(self.company_id),
            name: Set(name.to_string()),
            total_stock: Set(total_stock),
            pieces_per_pack: Set(pieces_per_pack),
            cost_price: Set(Decimal::new(2, 0)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert product")
    }

    /// Inserts a batch created `age_minutes` after the base time.
    pub async fn batch(
        &self,
        product: &product::Model,
        warehouse: &warehouse::Model,
        batch_number: &str,
        available: Decimal,
        cost_price: Decimal,
        age_minutes: i64,
    ) -> stock::Model {
        let created_at = base_time() + Duration::minutes(age_minutes);
        stock::ActiveModel {
            company_id: Set(self.company_id),
            product_id: Set(product.id),
            warehouse_id: Set(warehouse.id),
            batch_number: Set(batch_number.to_string()),
            available_quantity: Set(available),
            committed_quantity: Set(Decimal::ZERO),
            cost_price: Set(cost_price),
            initial_quantity: Set(Some(available)),
            created_at: Set(created_at),
            updated_at: Set(created_at),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .expect("insert batch")
    }

    pub async fn reload_batch(&self, id: i64) -> stock::Model {
        Stock::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("query batch")
            .expect("batch exists")
    }

    pub async fn reload_product(&self, id: Uuid) -> product::Model {
        Product::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("query product")
            .expect("product exists")
    }

    pub async fn company_batches(&self) -> Vec<stock::Model> {
        Stock::find()
            .filter(stock::Column::CompanyId.eq(self.company_id))
            .order_by_asc(stock::Column::Id)
            .all(self.db.as_ref())
            .await
            .expect("query batches")
    }

    pub async fn batch_logs(&self, reference_id: Uuid) -> Vec<batch_log::Model> {
        BatchLog::find()
            .filter(batch_log::Column::ReferenceId.eq(reference_id))
            .order_by_asc(batch_log::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .expect("query batch logs")
    }

    /// Events emitted so far.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
