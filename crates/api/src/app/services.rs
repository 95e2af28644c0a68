//! Infrastructure wiring: stores, services, scanner and notifier.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use partforge_infra::alerts::{LogNotifier, LowStockScanner, Notifier};
use partforge_infra::config::AppConfig;
use partforge_infra::services::{BomManager, BuildEngine, PartService};
use partforge_infra::store::{
    AlertStateStore, BomStore, InMemoryAlertStateStore, InMemoryBomStore, InMemoryInventoryStore,
    InventoryStore, PostgresAlertStateStore, PostgresBomStore, PostgresInventoryStore, migrate,
};

pub type SharedInventoryStore = Arc<dyn InventoryStore>;
pub type SharedBomStore = Arc<dyn BomStore>;
pub type SharedAlertStateStore = Arc<dyn AlertStateStore>;
pub type SharedNotifier = Arc<dyn Notifier>;

pub type AppScanner = LowStockScanner<SharedInventoryStore, SharedAlertStateStore, SharedNotifier>;

/// Everything the HTTP handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub parts: PartService<SharedInventoryStore>,
    pub boms: BomManager<SharedBomStore>,
    pub builds: BuildEngine<SharedInventoryStore, SharedBomStore>,
    pub scanner: Arc<AppScanner>,
    /// Backend name reported by `/health`.
    pub store_kind: &'static str,
}

impl AppServices {
    pub fn from_stores(
        inventory: SharedInventoryStore,
        boms: SharedBomStore,
        alert_state: SharedAlertStateStore,
        notifier: SharedNotifier,
        store_kind: &'static str,
    ) -> Self {
        Self {
            parts: PartService::new(inventory.clone()),
            boms: BomManager::new(boms.clone()),
            builds: BuildEngine::new(inventory.clone(), boms),
            scanner: Arc::new(LowStockScanner::new(inventory, alert_state, notifier)),
            store_kind,
        }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(config: &AppConfig, notifier: SharedNotifier) -> Self {
        Self::from_stores(
            Arc::new(InMemoryInventoryStore::with_max_transaction_items(
                config.max_transaction_items,
            )),
            Arc::new(InMemoryBomStore::new()),
            Arc::new(InMemoryAlertStateStore::new()),
            notifier,
            "memory",
        )
    }
}

/// Wire services from config: Postgres when `DATABASE_URL` is set, else in-memory.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let notifier = build_notifier(config)?;

    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory stores");
        return Ok(AppServices::in_memory(config, notifier));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    migrate(&pool).await.context("failed to create schema")?;

    Ok(AppServices::from_stores(
        Arc::new(PostgresInventoryStore::with_max_transaction_items(
            pool.clone(),
            config.max_transaction_items,
        )),
        Arc::new(PostgresBomStore::new(pool.clone())),
        Arc::new(PostgresAlertStateStore::new(pool)),
        notifier,
        "postgres",
    ))
}

fn build_notifier(config: &AppConfig) -> anyhow::Result<SharedNotifier> {
    if let Some(url) = config.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        {
            let notifier = partforge_infra::alerts::RedisNotifier::new(url, config.alerts_channel.clone())
                .context("invalid REDIS_URL")?;
            return Ok(Arc::new(notifier));
        }
        #[cfg(not(feature = "redis"))]
        {
            let _ = url;
            tracing::warn!("REDIS_URL set but redis feature not enabled, falling back to log notifier");
        }
    }
    Ok(Arc::new(LogNotifier))
}
