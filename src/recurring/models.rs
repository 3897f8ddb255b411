use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use uuid::Uuid;
use validator::Validate;

use crate::error::DefinitionError;
use crate::ledger::models::TransactionType;

/// Whether a definition feeds money into or out of its account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "recurring_flow", rename_all = "lowercase")]
pub enum DefinitionFlow {
    Income,
    Expense,
}

impl DefinitionFlow {
    /// Transaction type emitted when a definition of this flow materializes
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            DefinitionFlow::Income => TransactionType::Credit,
            DefinitionFlow::Expense => TransactionType::Debit,
        }
    }
}

/// Billing behavior of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "definition_kind", rename_all = "snake_case")]
pub enum DefinitionKind {
    /// Repeats indefinitely at a fixed amount
    Fixed,
    /// Repeats at a fixed amount until its end date passes
    FixedTemporary,
    /// Amount varies month to month; expense-only
    RecurringVariable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "frequency_type", rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Recurring definition - a user-authored template for an income or expense
/// that the scheduler turns into ledger transactions. Read-only to the
/// scheduler; a temporary definition becomes inert once its end date passes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurringDefinition {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub name: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,

    /// Day of month (1-31) on which the definition becomes due. Days 29-31
    /// never match in months lacking them: no rollover, no last-day
    /// substitution.
    pub billing_day: i32,
    pub flow: DefinitionFlow,
    pub kind: DefinitionKind,
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringDefinition {
    /// Marker description identifying transactions materialized from this
    /// definition. Doubles as the idempotence key within a billing cycle.
    pub fn marker_description(&self) -> String {
        match self.flow {
            DefinitionFlow::Expense => format!("Automatic payment: {}", self.name),
            DefinitionFlow::Income => format!("Automatic income: {}", self.name),
        }
    }

    pub fn transaction_type(&self) -> TransactionType {
        self.flow.transaction_type()
    }

    /// A temporary definition strictly past its end date emits nothing
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.kind == DefinitionKind::FixedTemporary
            && self.end_date.map(|end| end < today).unwrap_or(false)
    }
}

/// Payload for creating or replacing a recurring definition
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewDefinition {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub value: Decimal,

    #[validate(range(min = 1, max = 31, message = "billing day must be 1-31"))]
    pub billing_day: i32,
    pub flow: DefinitionFlow,
    pub kind: DefinitionKind,
    pub frequency: Option<Frequency>,
    pub end_date: Option<NaiveDate>,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub category_id: Option<Uuid>,
}

impl NewDefinition {
    /// Conditional-field rules the `validator` derive cannot express.
    ///
    /// - end date present iff the kind is temporary
    /// - frequency required unless the amount is variable
    /// - variable-amount kinds are expense-only
    /// - category present iff the flow is expense
    pub fn check_invariants(&self) -> Result<(), DefinitionError> {
        if self.value <= Decimal::ZERO {
            return Err(DefinitionError::NonPositiveValue);
        }
        if !(1..=31).contains(&self.billing_day) {
            return Err(DefinitionError::BillingDayOutOfRange(self.billing_day));
        }

        match self.kind {
            DefinitionKind::FixedTemporary => {
                if self.end_date.is_none() {
                    return Err(DefinitionError::MissingEndDate);
                }
            }
            _ => {
                if self.end_date.is_some() {
                    return Err(DefinitionError::UnexpectedEndDate);
                }
            }
        }

        if self.kind != DefinitionKind::RecurringVariable && self.frequency.is_none() {
            return Err(DefinitionError::MissingFrequency);
        }
        if self.kind == DefinitionKind::RecurringVariable && self.flow == DefinitionFlow::Income {
            return Err(DefinitionError::VariableAmountIncome);
        }

        match self.flow {
            DefinitionFlow::Expense if self.category_id.is_none() => {
                Err(DefinitionError::MissingCategory)
            }
            DefinitionFlow::Income if self.category_id.is_some() => {
                Err(DefinitionError::UnexpectedCategory)
            }
            _ => Ok(()),
        }
    }
}
