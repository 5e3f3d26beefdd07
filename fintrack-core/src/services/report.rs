//! Report service - read-only aggregations over a user's transactions

use std::sync::Arc;

use crate::domain::report::{
    most_common_categories, most_common_income_then_expense, totals_by_currency_and_type,
};
use crate::domain::result::Result;
use crate::domain::{Category, CategoryType, Currency, CurrencyTypeTotal};
use crate::ports::TransactionRepository;

pub struct ReportService {
    transactions: Arc<dyn TransactionRepository>,
}

impl ReportService {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    /// Sum per `(category type, currency)`, groups in first-seen order.
    /// Currencies are never converted or merged.
    pub async fn totals_by_currency_and_type(&self, user_id: i64) -> Result<Vec<CurrencyTypeTotal>> {
        let entries = self.transactions.find_transactions_by_user(user_id).await?;
        Ok(totals_by_currency_and_type(&entries))
    }

    /// Top `limit` income categories followed by top `limit` expense categories
    pub async fn most_common_categories(&self, user_id: i64, limit: usize) -> Result<Vec<Category>> {
        let entries = self.transactions.find_transactions_by_user(user_id).await?;
        Ok(most_common_income_then_expense(&entries, limit))
    }

    pub async fn most_common_categories_by_type(
        &self,
        user_id: i64,
        category_type: CategoryType,
        limit: usize,
    ) -> Result<Vec<Category>> {
        let entries = self.transactions.find_transactions_by_user(user_id).await?;
        Ok(most_common_categories(&entries, category_type, limit))
    }

    /// Supported currencies in catalog order
    pub fn list_currencies(&self) -> &'static [Currency] {
        &Currency::ALL
    }
}
