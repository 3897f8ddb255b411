// Materializer - turns due recurring definitions into ledger transactions,
// at most once per definition per billing cycle (one calendar month).
//
// One pass handles income and expense definitions uniformly; the flow tag
// on each definition decides the transaction type and balance sign.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::ledger::models::{Account, Transaction, TransactionType};
use crate::recurring::models::RecurringDefinition;

/// Storage operations the materializer drives
#[async_trait]
pub trait SchedulerStore: Send + Sync {
    /// All recurring definitions whose billing day equals `day`
    async fn due_definitions(&self, day: u32) -> AppResult<Vec<RecurringDefinition>>;

    /// Idempotence guard: does a transaction with this exact description
    /// already exist on the account inside the window?
    async fn transaction_exists_in_window(
        &self,
        account_id: Uuid,
        description: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn find_account(&self, account_id: Uuid) -> AppResult<Option<Account>>;

    /// Append the transaction and apply its balance delta as one unit
    async fn materialize(
        &self,
        account_id: Uuid,
        kind: TransactionType,
        value: Decimal,
        description: &str,
        date: DateTime<Utc>,
        category_id: Option<Uuid>,
    ) -> AppResult<Transaction>;
}

/// Billing cycle containing `today`: half-open [month start, next month start)
pub fn cycle_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.with_day(1).unwrap();
    let end = if start.month() == 12 {
        NaiveDate::from_ymd_opt(start.year() + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1).unwrap()
    };
    (start, end)
}

/// UTC bounds of the billing cycle, anchored at local midnight in the
/// reference timezone
pub fn cycle_bounds(today: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let (start, end) = cycle_window(today);
    let to_utc = |date: NaiveDate| {
        offset
            .from_local_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
            .unwrap()
            .with_timezone(&Utc)
    };
    (to_utc(start), to_utc(end))
}

/// Outcome counters for one scheduler run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub due: usize,
    pub created: usize,
    pub skipped_existing: usize,
    pub skipped_expired: usize,
    pub skipped_missing_account: usize,
    pub failed: usize,
}

enum Outcome {
    Created,
    AlreadyProcessed,
    Expired,
    MissingAccount,
}

pub struct Materializer<S> {
    store: Arc<S>,
    offset: FixedOffset,
}

impl<S: SchedulerStore> Materializer<S> {
    pub fn new(store: Arc<S>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    /// Process every definition due at `now`. Definitions are handled
    /// sequentially; a per-definition failure is logged and counted but
    /// never aborts the batch, and the failed definition is NOT marked as
    /// processed - the idempotence guard alone decides on the next run.
    pub async fn run(&self, now: DateTime<Utc>) -> RunSummary {
        // Truncate to the calendar date in the reference timezone so the
        // time of day of the trigger never shifts which day is processed.
        let today = now.with_timezone(&self.offset).date_naive();

        info!("checking recurring definitions due on {}", today);

        let definitions = match self.store.due_definitions(today.day()).await {
            Ok(definitions) => definitions,
            Err(e) => {
                error!("failed to load due recurring definitions: {}", e);
                return RunSummary {
                    failed: 1,
                    ..RunSummary::default()
                };
            }
        };

        let mut summary = RunSummary {
            due: definitions.len(),
            ..RunSummary::default()
        };

        if definitions.is_empty() {
            info!("no recurring definitions due today");
            return summary;
        }

        let (window_start, window_end) = cycle_bounds(today, self.offset);

        for definition in &definitions {
            match self
                .process(definition, today, now, window_start, window_end)
                .await
            {
                Ok(Outcome::Created) => {
                    info!("transaction for \"{}\" created", definition.name);
                    summary.created += 1;
                }
                Ok(Outcome::AlreadyProcessed) => {
                    info!(
                        "\"{}\" already processed this month, skipping",
                        definition.name
                    );
                    summary.skipped_existing += 1;
                }
                Ok(Outcome::Expired) => {
                    info!("skipping expired temporary definition \"{}\"", definition.name);
                    summary.skipped_expired += 1;
                }
                Ok(Outcome::MissingAccount) => {
                    warn!(
                        "account {} not found for definition \"{}\", skipping",
                        definition.account_id, definition.name
                    );
                    summary.skipped_missing_account += 1;
                }
                Err(e) => {
                    error!("failed to process definition \"{}\": {}", definition.name, e);
                    summary.failed += 1;
                }
            }
        }

        info!(
            "run finished: {} due, {} created, {} already processed, {} expired, {} missing account, {} failed",
            summary.due,
            summary.created,
            summary.skipped_existing,
            summary.skipped_expired,
            summary.skipped_missing_account,
            summary.failed
        );
        summary
    }

    async fn process(
        &self,
        definition: &RecurringDefinition,
        today: NaiveDate,
        now: DateTime<Utc>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> AppResult<Outcome> {
        if definition.is_expired(today) {
            return Ok(Outcome::Expired);
        }

        let marker = definition.marker_description();
        if self
            .store
            .transaction_exists_in_window(definition.account_id, &marker, window_start, window_end)
            .await?
        {
            return Ok(Outcome::AlreadyProcessed);
        }

        if self
            .store
            .find_account(definition.account_id)
            .await?
            .is_none()
        {
            return Ok(Outcome::MissingAccount);
        }

        self.store
            .materialize(
                definition.account_id,
                definition.transaction_type(),
                definition.value,
                &marker,
                now,
                definition.category_id,
            )
            .await?;

        Ok(Outcome::Created)
    }
}
