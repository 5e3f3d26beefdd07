//! Transaction service - transaction ledger
//!
//! Every write resolves the owner through `UserLookup` and the category
//! through `CategoryLookup`, scoped to that owner, so a transaction can never
//! point at another user's category.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::result::{Error, Result};
use crate::domain::{
    DateWindow, NewTransaction, Transaction, TransactionUpdate, TransactionWithCategory,
};
use crate::ports::{CategoryLookup, TransactionRepository, UserLookup};

pub struct TransactionService {
    transactions: Arc<dyn TransactionRepository>,
    users: Arc<dyn UserLookup>,
    categories: Arc<dyn CategoryLookup>,
}

impl TransactionService {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        users: Arc<dyn UserLookup>,
        categories: Arc<dyn CategoryLookup>,
    ) -> Self {
        Self {
            transactions,
            users,
            categories,
        }
    }

    /// `NotFound` if the owner is unknown or the category is not the owner's
    pub async fn create_transaction(&self, new_tx: NewTransaction) -> Result<Transaction> {
        new_tx.validate()?;
        self.users.lookup_user(new_tx.user_id).await?;
        self.categories
            .lookup_category_for_user(new_tx.category_id, new_tx.user_id)
            .await?;

        let tx = self.transactions.insert_transaction(&new_tx).await?;
        tracing::info!(user_id = tx.user_id, transaction_id = tx.id, "created transaction");
        Ok(tx)
    }

    /// Overwrite the provided fields.
    ///
    /// An update naming a different owner is a `Conflict` and changes
    /// nothing. A new category must belong to the current owner.
    pub async fn update_transaction(&self, id: i64, update: TransactionUpdate) -> Result<Transaction> {
        update.validate()?;
        let mut tx = self.find_by_id(id).await?;

        if let Some(user_id) = update.user_id {
            if user_id != tx.user_id {
                tracing::warn!(transaction_id = id, "transaction update rejected: owner change");
                return Err(Error::conflict("Transaction ownership cannot be changed"));
            }
        }

        if let Some(category_id) = update.category_id {
            self.categories
                .lookup_category_for_user(category_id, tx.user_id)
                .await?;
        }

        update.apply_to(&mut tx);
        let updated = self.transactions.update_transaction(&tx).await?;
        tracing::info!(transaction_id = id, "updated transaction");
        Ok(updated)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Transaction> {
        self.transactions
            .find_transaction_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Transaction with ID {} not found", id)))
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Vec<TransactionWithCategory>> {
        self.transactions.find_transactions_by_user(user_id).await
    }

    /// At most `limit` transactions, latest `date` first
    pub async fn find_recent(&self, user_id: i64, limit: usize) -> Result<Vec<TransactionWithCategory>> {
        tracing::debug!(user_id, limit, "recent transactions");
        self.transactions.find_recent_transactions(user_id, limit).await
    }

    pub async fn find_in_window(
        &self,
        user_id: i64,
        window: &DateWindow,
    ) -> Result<Vec<TransactionWithCategory>> {
        tracing::debug!(user_id, from = %window.from, to = %window.to, "window query");
        self.transactions.find_transactions_in_window(user_id, window).await
    }

    /// Window query over `[now - months, now]`
    pub async fn find_last_months(
        &self,
        user_id: i64,
        months: u32,
    ) -> Result<Vec<TransactionWithCategory>> {
        let window = DateWindow::trailing_months(Utc::now(), months)?;
        self.find_in_window(user_id, &window).await
    }

    pub async fn delete_transaction(&self, id: i64) -> Result<()> {
        if self.transactions.delete_transaction(id).await? == 0 {
            return Err(Error::not_found(format!("Transaction with ID {} not found", id)));
        }
        tracing::info!(transaction_id = id, "deleted transaction");
        Ok(())
    }

    pub async fn belongs_to_user(&self, user_id: i64, transaction_id: i64) -> Result<bool> {
        Ok(self
            .transactions
            .find_transaction_by_id(transaction_id)
            .await?
            .is_some_and(|tx| tx.user_id == user_id))
    }

    /// Delete on behalf of `user_id`: `NotFound` if absent, `Conflict` if
    /// the transaction belongs to someone else
    pub async fn remove_for_user(&self, user_id: i64, transaction_id: i64) -> Result<()> {
        let tx = self.find_by_id(transaction_id).await?;
        if tx.user_id != user_id {
            return Err(Error::conflict("Invalid User"));
        }
        self.delete_transaction(transaction_id).await
    }
}
