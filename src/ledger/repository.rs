use super::models::*;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres};
use tracing::info;
use uuid::Uuid;

/// Maximum number of accounts per user
const ACCOUNT_LIMIT: i32 = 10;

/// Ledger repository - accounts and the append-only transaction log
pub struct LedgerRepository {
    pub pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ========== USER OPERATIONS ==========

    pub async fn create_user(&self, email: &str) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email)
            VALUES ($1)
            RETURNING id, email, created_at
            "#,
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    // ========== ACCOUNT OPERATIONS ==========

    /// Create an account for a user. The account index is allocated as
    /// max(existing) + 1 in the same statement, and the insert is refused
    /// once the user holds `ACCOUNT_LIMIT` accounts.
    pub async fn create_account(&self, user_id: Uuid, name: Option<&str>) -> AppResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (user_id, name, account_index)
            SELECT $1, COALESCE($2, 'Account #' || next.idx::text), next.idx
            FROM (
                SELECT COALESCE(MAX(account_index), 0) + 1 AS idx
                FROM accounts
                WHERE user_id = $1
            ) AS next
            WHERE next.idx <= $3
            RETURNING id, user_id, name, balance, account_index, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(ACCOUNT_LIMIT)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::InvalidInput(format!("account limit of {} reached", ACCOUNT_LIMIT))
        })?;

        info!(
            "account {} created for user {} (index {})",
            account.id, user_id, account.account_index
        );
        Ok(account)
    }

    pub async fn get_account(&self, account_id: Uuid) -> AppResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, name, balance, account_index, created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn list_accounts_for_user(&self, user_id: Uuid) -> AppResult<Vec<Account>> {
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, user_id, name, balance, account_index, created_at, updated_at
            FROM accounts
            WHERE user_id = $1
            ORDER BY account_index
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    // ========== BALANCE OPERATIONS ==========

    /// Apply a signed delta to an account's persisted balance.
    ///
    /// This is a single relative UPDATE, never a read-modify-write round
    /// trip, so interleaved writers (the scheduler and a user-initiated
    /// transaction on the same account) cannot lose an update.
    pub async fn increment_balance(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        account_id: Uuid,
        delta: Decimal,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance = balance + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(delta)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("account {}", account_id)));
        }

        Ok(())
    }

    // ========== TRANSACTION OPERATIONS ==========

    /// Append a transaction and apply its balance delta as one unit.
    ///
    /// Both writes commit or neither does, so a crash cannot leave the
    /// transaction log and the cached balance disagreeing. Serves the
    /// scheduler's materialization and user-initiated entries alike.
    pub async fn record_transaction(
        &self,
        account_id: Uuid,
        kind: TransactionType,
        value: Decimal,
        description: &str,
        date: DateTime<Utc>,
        category_id: Option<Uuid>,
    ) -> AppResult<Transaction> {
        if value <= Decimal::ZERO {
            return Err(AppError::InvalidInput(
                "transaction value must be positive".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (account_id, kind, value, description, date, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, kind, value, description, date, category_id, created_at
            "#,
        )
        .bind(account_id)
        .bind(kind)
        .bind(value)
        .bind(description)
        .bind(date)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        self.increment_balance(&mut tx, account_id, kind.signed_delta(value))
            .await?;

        tx.commit().await?;

        Ok(transaction)
    }

    /// Idempotence guard for the scheduler: does a transaction with this
    /// exact description already exist on the account inside the window?
    pub async fn transaction_exists_in_window(
        &self,
        account_id: Uuid,
        description: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM transactions
                WHERE account_id = $1 AND description = $2 AND date >= $3 AND date < $4
            )
            "#,
        )
        .bind(account_id)
        .bind(description)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Balance recomputed from the transaction log. Used for
    /// reconciliation against the cached `accounts.balance` column.
    pub async fn derived_balance(&self, account_id: Uuid) -> AppResult<Decimal> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(
                SUM(CASE WHEN kind = 'credit' THEN value ELSE -value END),
                0::numeric
            )
            FROM transactions
            WHERE account_id = $1
            "#,
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(balance)
    }

    /// Credit/debit totals for an account over a window
    pub async fn monthly_summary(
        &self,
        account_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<MonthlySummary> {
        let summary = sqlx::query_as::<_, MonthlySummary>(
            r#"
            SELECT
                COALESCE(SUM(value) FILTER (WHERE kind = 'credit'), 0::numeric) AS credits,
                COALESCE(SUM(value) FILTER (WHERE kind = 'debit'), 0::numeric) AS debits
            FROM transactions
            WHERE account_id = $1 AND date >= $2 AND date < $3
            "#,
        )
        .bind(account_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    // ========== CATEGORY OPERATIONS ==========

    pub async fn create_category(&self, user_id: Uuid, name: &str) -> AppResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name
            "#,
        )
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    pub async fn list_categories_for_user(&self, user_id: Uuid) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, user_id, name
            FROM categories
            WHERE user_id = $1
            ORDER BY name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
