use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::ledger::models::{Account, Transaction, TransactionType};
use crate::ledger::repository::LedgerRepository;
use crate::recurring::models::RecurringDefinition;
use crate::recurring::repository::RecurringRepository;
use crate::scheduler::materializer::SchedulerStore;

/// Postgres-backed store for the materializer, adapting the ledger and
/// recurring-definition repositories.
pub struct PgSchedulerStore {
    ledger: Arc<LedgerRepository>,
    recurring: Arc<RecurringRepository>,
}

impl PgSchedulerStore {
    pub fn new(ledger: Arc<LedgerRepository>, recurring: Arc<RecurringRepository>) -> Self {
        Self { ledger, recurring }
    }
}

#[async_trait]
impl SchedulerStore for PgSchedulerStore {
    async fn due_definitions(&self, day: u32) -> AppResult<Vec<RecurringDefinition>> {
        self.recurring.find_due_on_day(day).await
    }

    async fn transaction_exists_in_window(
        &self,
        account_id: Uuid,
        description: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.ledger
            .transaction_exists_in_window(account_id, description, from, to)
            .await
    }

    async fn find_account(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        self.ledger.get_account(account_id).await
    }

    async fn materialize(
        &self,
        account_id: Uuid,
        kind: TransactionType,
        value: Decimal,
        description: &str,
        date: DateTime<Utc>,
        category_id: Option<Uuid>,
    ) -> AppResult<Transaction> {
        self.ledger
            .record_transaction(account_id, kind, value, description, date, category_id)
            .await
    }
}
