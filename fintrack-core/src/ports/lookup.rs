//! Capabilities one ledger component consumes from another
//!
//! Users, categories and transactions read each other. Instead of holding
//! each other directly, each component depends on the narrow trait it needs.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{Category, User};

/// Resolve a user id, `NotFound` on miss
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn lookup_user(&self, id: i64) -> Result<User>;
}

/// Resolve a category scoped to its owner, `NotFound` on miss
#[async_trait]
pub trait CategoryLookup: Send + Sync {
    async fn lookup_category_for_user(&self, category_id: i64, user_id: i64) -> Result<Category>;
}

/// Create the default category catalog for a freshly created user
#[async_trait]
pub trait CategorySeeder: Send + Sync {
    async fn seed_for_new_user(&self, user: &User) -> Result<Vec<Category>>;
}
