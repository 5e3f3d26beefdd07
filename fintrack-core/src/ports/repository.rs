//! Repository ports - store abstraction
//!
//! One trait per table. A single adapter may implement all three; services
//! only see the trait they need.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{
    Category, DateWindow, NewCategory, NewTransaction, NewUser, Transaction,
    TransactionWithCategory, User,
};

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Fails with `Conflict` if the email is already taken.
    async fn insert_user(&self, user: &NewUser) -> Result<User>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Exact, case-sensitive match
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users in id order
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Persist `user` as-is. Fails with `Conflict` if its email belongs to a
    /// different user.
    async fn update_user(&self, user: &User) -> Result<User>;

    /// Delete a user together with its transactions and categories.
    /// Returns the number of user rows removed.
    async fn delete_user(&self, id: i64) -> Result<usize>;
}

/// Category persistence
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert a category. Fails with `Conflict` if `(user, name, type)` exists.
    async fn insert_category(&self, category: &NewCategory) -> Result<Category>;

    /// Insert all categories or none
    async fn insert_categories_atomic(&self, categories: &[NewCategory]) -> Result<Vec<Category>>;

    async fn find_category_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// All categories of a user in insertion order
    async fn find_categories_by_user(&self, user_id: i64) -> Result<Vec<Category>>;

    async fn find_category_by_id_and_user(
        &self,
        category_id: i64,
        user_id: i64,
    ) -> Result<Option<Category>>;

    /// Persist `category` as-is. Fails with `Conflict` if another category of
    /// the same user already holds the resulting `(name, type)`.
    async fn update_category(&self, category: &Category) -> Result<Category>;

    /// Fails with `Conflict` while transactions reference the category.
    /// Returns the number of rows removed.
    async fn delete_category(&self, id: i64) -> Result<usize>;
}

/// Transaction persistence
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction>;

    async fn find_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>>;

    /// All transactions of a user, storage order, category joined
    async fn find_transactions_by_user(&self, user_id: i64) -> Result<Vec<TransactionWithCategory>>;

    /// Latest `date` first; equal dates keep storage order
    async fn find_recent_transactions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<TransactionWithCategory>>;

    /// Transactions whose `date` falls inside the inclusive window
    async fn find_transactions_in_window(
        &self,
        user_id: i64,
        window: &DateWindow,
    ) -> Result<Vec<TransactionWithCategory>>;

    async fn update_transaction(&self, tx: &Transaction) -> Result<Transaction>;

    /// Returns the number of rows removed
    async fn delete_transaction(&self, id: i64) -> Result<usize>;
}
