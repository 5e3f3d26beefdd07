//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::Category;
use super::result::{Error, Result};

/// Currency of a single transaction. Never converted or compared across codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
    Jpy,
    Chf,
    Cad,
    Aud,
    Cny,
    Inr,
    Brl,
}

impl Currency {
    pub const ALL: [Currency; 10] = [
        Currency::Usd,
        Currency::Eur,
        Currency::Gbp,
        Currency::Jpy,
        Currency::Chf,
        Currency::Cad,
        Currency::Aud,
        Currency::Cny,
        Currency::Inr,
        Currency::Brl,
    ];

    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Jpy => "JPY",
            Currency::Chf => "CHF",
            Currency::Cad => "CAD",
            Currency::Aud => "AUD",
            Currency::Cny => "CNY",
            Currency::Inr => "INR",
            Currency::Brl => "BRL",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let code = s.trim().to_ascii_uppercase();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.code() == code)
            .ok_or_else(|| Error::validation(format!("Unsupported currency: {}", code)))
    }
}

/// A single monetary event owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    /// When the event happened (not when it was recorded)
    pub date: DateTime<Utc>,
    pub user_id: i64,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A transaction joined with the category it references
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionWithCategory {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category: Category,
}

/// Fields required to create a transaction
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub currency: Currency,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl NewTransaction {
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        validate_description(&self.description)
    }
}

/// Partial transaction update
///
/// `user_id` is carried so the ledger can reject ownership reassignment; it is
/// never written.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub currency: Option<Currency>,
    pub date: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    pub user_id: Option<i64>,
}

impl TransactionUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, tx: &mut Transaction) {
        if let Some(amount) = self.amount {
            tx.amount = amount;
        }
        if let Some(description) = &self.description {
            tx.description = description.clone();
        }
        if let Some(currency) = self.currency {
            tx.currency = currency;
        }
        if let Some(date) = self.date {
            tx.date = date;
        }
        if let Some(category_id) = self.category_id {
            tx.category_id = category_id;
        }
    }
}

/// Decimal places the ledger stores; matches the `DECIMAL(18,4)` column
pub const AMOUNT_SCALE: u32 = 4;

/// Amounts must stay strictly below this (14 integer digits)
const AMOUNT_LIMIT: i64 = 100_000_000_000_000;

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation("Amount must be a positive number"));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(Error::validation(format!(
            "Amount must have at most {} decimal places",
            AMOUNT_SCALE
        )));
    }
    if amount >= Decimal::from(AMOUNT_LIMIT) {
        return Err(Error::validation("Amount is too large"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::validation("Description must not be empty"));
    }
    Ok(())
}
