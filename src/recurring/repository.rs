use super::models::*;
use crate::error::{AppError, AppResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Recurring definition repository. Definitions are user-authored and
/// read-only to the scheduler; the conditional-field invariants are
/// enforced here, at write time.
pub struct RecurringRepository {
    pub pool: PgPool,
}

impl RecurringRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, input: NewDefinition) -> AppResult<RecurringDefinition> {
        input.validate()?;
        input.check_invariants()?;

        let definition = sqlx::query_as::<_, RecurringDefinition>(
            r#"
            INSERT INTO recurring_definitions
                (user_id, account_id, name, value, billing_day, flow, kind,
                 frequency, end_date, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, user_id, account_id, name, value, billing_day, flow, kind,
                      frequency, end_date, category_id, created_at, updated_at
            "#,
        )
        .bind(input.user_id)
        .bind(input.account_id)
        .bind(&input.name)
        .bind(input.value)
        .bind(input.billing_day)
        .bind(input.flow)
        .bind(input.kind)
        .bind(input.frequency)
        .bind(input.end_date)
        .bind(input.category_id)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "recurring definition \"{}\" created (billing day {})",
            definition.name, definition.billing_day
        );
        Ok(definition)
    }

    pub async fn update(&self, id: Uuid, input: NewDefinition) -> AppResult<RecurringDefinition> {
        input.validate()?;
        input.check_invariants()?;

        let definition = sqlx::query_as::<_, RecurringDefinition>(
            r#"
            UPDATE recurring_definitions
            SET account_id = $2, name = $3, value = $4, billing_day = $5,
                flow = $6, kind = $7, frequency = $8, end_date = $9,
                category_id = $10, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, account_id, name, value, billing_day, flow, kind,
                      frequency, end_date, category_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(input.account_id)
        .bind(&input.name)
        .bind(input.value)
        .bind(input.billing_day)
        .bind(input.flow)
        .bind(input.kind)
        .bind(input.frequency)
        .bind(input.end_date)
        .bind(input.category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("recurring definition {}", id)))?;

        Ok(definition)
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM recurring_definitions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("recurring definition {}", id)));
        }

        Ok(())
    }

    pub async fn list_for_account(&self, account_id: Uuid) -> AppResult<Vec<RecurringDefinition>> {
        let definitions = sqlx::query_as::<_, RecurringDefinition>(
            r#"
            SELECT id, user_id, account_id, name, value, billing_day, flow, kind,
                   frequency, end_date, category_id, created_at, updated_at
            FROM recurring_definitions
            WHERE account_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(definitions)
    }

    /// All definitions (income and expense) whose billing day equals `day`
    pub async fn find_due_on_day(&self, day: u32) -> AppResult<Vec<RecurringDefinition>> {
        let definitions = sqlx::query_as::<_, RecurringDefinition>(
            r#"
            SELECT id, user_id, account_id, name, value, billing_day, flow, kind,
                   frequency, end_date, category_id, created_at, updated_at
            FROM recurring_definitions
            WHERE billing_day = $1
            ORDER BY created_at
            "#,
        )
        .bind(day as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DefinitionError;
    use crate::recurring::models::{DefinitionFlow, DefinitionKind, Frequency, NewDefinition};
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;

    /// Validation happens before any query, so a lazy pool never connects
    fn repository() -> RecurringRepository {
        let pool = PgPoolOptions::new().connect_lazy("postgresql://localhost/finance");
        RecurringRepository::new(pool.unwrap())
    }

    fn input() -> NewDefinition {
        NewDefinition {
            name: "Rent".to_string(),
            value: dec!(1200),
            billing_day: 5,
            flow: DefinitionFlow::Expense,
            kind: DefinitionKind::Fixed,
            frequency: Some(Frequency::Monthly),
            end_date: None,
            user_id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            category_id: Some(Uuid::new_v4()),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_billing_day() {
        let mut bad = input();
        bad.billing_day = 32;

        match repository().create(bad).await {
            Err(AppError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {:?}", other.map(|d| d.id)),
        }
    }

    #[tokio::test]
    async fn test_create_rejects_temporary_without_end_date() {
        let mut bad = input();
        bad.kind = DefinitionKind::FixedTemporary;

        match repository().create(bad).await {
            Err(AppError::Definition(DefinitionError::MissingEndDate)) => {}
            other => panic!("expected MissingEndDate, got {:?}", other.map(|d| d.id)),
        }
    }

    #[tokio::test]
    async fn test_update_validates_like_create() {
        let mut bad = input();
        bad.value = dec!(-10);

        match repository().update(Uuid::new_v4(), bad).await {
            Err(AppError::Definition(DefinitionError::NonPositiveValue)) => {}
            other => panic!("expected NonPositiveValue, got {:?}", other.map(|d| d.id)),
        }
    }
}
