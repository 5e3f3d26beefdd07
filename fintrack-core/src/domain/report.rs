//! Read-side summaries over a user's transactions
//!
//! Pure functions: callers load the rows, these only fold them.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::category::{Category, CategoryType};
use super::result::{Error, Result};
use super::transaction::{Currency, TransactionWithCategory};

/// Sum of amounts for one `(category type, currency)` group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyTypeTotal {
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub currency: Currency,
    pub total_amount: Decimal,
}

/// Group by `(currency, category type)` and sum.
///
/// Groups come out in the order they are first encountered in `entries`.
pub fn totals_by_currency_and_type(entries: &[TransactionWithCategory]) -> Vec<CurrencyTypeTotal> {
    let mut totals: Vec<CurrencyTypeTotal> = Vec::new();

    for entry in entries {
        let currency = entry.transaction.currency;
        let category_type = entry.category.category_type;

        match totals
            .iter_mut()
            .find(|t| t.currency == currency && t.category_type == category_type)
        {
            Some(total) => total.total_amount += entry.transaction.amount,
            None => totals.push(CurrencyTypeTotal {
                category_type,
                currency,
                total_amount: entry.transaction.amount,
            }),
        }
    }

    totals
}

/// The `limit` categories of `category_type` with the most transactions.
///
/// Ties keep the order in which the categories were first seen. Categories
/// without transactions never appear.
pub fn most_common_categories(
    entries: &[TransactionWithCategory],
    category_type: CategoryType,
    limit: usize,
) -> Vec<Category> {
    let mut order: Vec<&Category> = Vec::new();
    let mut counts: HashMap<i64, usize> = HashMap::new();

    for entry in entries.iter().filter(|e| e.category.category_type == category_type) {
        let count = counts.entry(entry.category.id).or_insert(0);
        if *count == 0 {
            order.push(&entry.category);
        }
        *count += 1;
    }

    // sort_by is stable, so equal counts stay in first-seen order
    order.sort_by(|a, b| counts[&b.id].cmp(&counts[&a.id]));
    order.into_iter().take(limit).cloned().collect()
}

/// Income ranking followed by expense ranking, each capped at `limit`
pub fn most_common_income_then_expense(
    entries: &[TransactionWithCategory],
    limit: usize,
) -> Vec<Category> {
    let mut result = most_common_categories(entries, CategoryType::Income, limit);
    result.extend(most_common_categories(entries, CategoryType::Expense, limit));
    result
}

/// Inclusive date range for window queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(Error::validation("Window start must not be after its end"));
        }
        if from.year() < 1 {
            return Err(Error::validation("Window must start in year 1 or later"));
        }
        Ok(Self { from, to })
    }

    /// `[now - months calendar months, now]`; day-of-month clamps to the
    /// shorter month (May 31 minus 3 months is Feb 28/29).
    pub fn trailing_months(now: DateTime<Utc>, months: u32) -> Result<Self> {
        let from = now
            .checked_sub_months(Months::new(months))
            .ok_or_else(|| Error::validation(format!("Cannot go back {} months", months)))?;
        Self::new(from, now)
    }

    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        self.from <= date && date <= self.to
    }
}
