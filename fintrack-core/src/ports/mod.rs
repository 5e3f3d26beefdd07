//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod lookup;
mod repository;

pub use lookup::{CategoryLookup, CategorySeeder, UserLookup};
pub use repository::{CategoryRepository, TransactionRepository, UserRepository};
