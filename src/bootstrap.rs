use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::{
    config::Config,
    error::AppResult,
    ledger::repository::LedgerRepository,
    recurring::repository::RecurringRepository,
    scheduler::{
        driver::{ScheduleConfig, SchedulerDriver},
        materializer::Materializer,
        store::PgSchedulerStore,
    },
    server::AppState,
};

pub async fn initialize_app_state(config: &Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let pool = initialize_database(&config.database_url).await?;

    let ledger = Arc::new(LedgerRepository::new(pool.clone()));
    let recurring = Arc::new(RecurringRepository::new(pool.clone()));

    let offset = config.reference_offset();
    let store = Arc::new(PgSchedulerStore::new(ledger.clone(), recurring.clone()));
    let materializer = Arc::new(Materializer::new(store, offset));

    let driver = SchedulerDriver::new(
        ScheduleConfig {
            hour: config.scheduler_hour,
            minute: config.scheduler_minute,
            offset,
        },
        materializer,
    );
    driver.start();
    info!(
        "✅ Recurring-transaction scheduler started (daily at {:02}:{:02} {})",
        config.scheduler_hour, config.scheduler_minute, offset
    );

    Ok(AppState { ledger, recurring })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("📊 Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(50)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    info!("🔄 Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    info!("✓ Database initialized");
    Ok(pool)
}
