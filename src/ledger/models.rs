use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Direction of a ledger transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "transaction_type", rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }

    /// Delta a transaction of this type applies to its account balance
    pub fn signed_delta(&self, value: Decimal) -> Decimal {
        match self {
            TransactionType::Credit => value,
            TransactionType::Debit => -value,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User entity - owner of accounts and recurring definitions
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Account entity
///
/// `balance` is a running total mutated only by applying transaction deltas
/// through the storage-level atomic increment. It must equal the sum of
/// credits minus debits over the account's transactions after any committed
/// write.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,

    /// Position of this account among its owner's accounts, unique per user
    pub account_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Spending category, referenced by expense definitions and transactions
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
}

/// Ledger transaction - immutable once created. The transactions table is
/// append-only; the system never edits past entries, only creates new ones.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: TransactionType,

    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,

    pub description: String,
    pub date: DateTime<Utc>,
    pub category_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Delta this transaction applied to its account balance
    pub fn signed_delta(&self) -> Decimal {
        self.kind.signed_delta(self.value)
    }
}

/// Credit/debit totals for one account over one window
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlySummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub credits: Decimal,

    #[serde(with = "rust_decimal::serde::float")]
    pub debits: Decimal,
}

impl MonthlySummary {
    pub fn net(&self) -> Decimal {
        self.credits - self.debits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_delta() {
        assert_eq!(
            TransactionType::Credit.signed_delta(dec!(150.50)),
            dec!(150.50)
        );
        assert_eq!(
            TransactionType::Debit.signed_delta(dec!(150.50)),
            dec!(-150.50)
        );
    }

    #[test]
    fn test_summary_net() {
        let summary = MonthlySummary {
            credits: dec!(5000),
            debits: dec!(1200),
        };
        assert_eq!(summary.net(), dec!(3800));
    }
}
