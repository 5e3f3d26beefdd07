//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

pub mod category;
pub mod report;
pub mod result;
mod transaction;
mod user;

pub use category::{default_categories, Category, CategoryType, CategoryUpdate, NewCategory};
pub use report::{CurrencyTypeTotal, DateWindow};
pub use transaction::{
    Currency, NewTransaction, Transaction, TransactionUpdate, TransactionWithCategory,
};
pub use user::{NewUser, User, UserUpdate};
