//! User service - identity store

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::result::{Error, Result};
use crate::domain::{NewUser, User, UserUpdate};
use crate::ports::{CategorySeeder, UserLookup, UserRepository};

/// Owns user records, the root of ownership for categories and transactions
pub struct UserService {
    users: Arc<dyn UserRepository>,
    seeder: Arc<dyn CategorySeeder>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, seeder: Arc<dyn CategorySeeder>) -> Self {
        Self { users, seeder }
    }

    /// Create a user and seed its default categories.
    ///
    /// Fails with `Conflict` if the email is taken. If seeding fails the user
    /// row is removed again, so a user never exists without its catalog.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        new_user.validate()?;

        let user = self.users.insert_user(&new_user).await.map_err(|e| {
            if e.is_conflict() {
                tracing::warn!("user creation rejected: email already exists");
            }
            e
        })?;

        if let Err(e) = self.seeder.seed_for_new_user(&user).await {
            tracing::warn!(user_id = user.id, error = %e, "seeding failed, removing user");
            if let Err(cleanup) = self.users.delete_user(user.id).await {
                tracing::error!(
                    user_id = user.id,
                    error = %cleanup,
                    "could not remove user after seeding failure; user has no categories"
                );
            }
            return Err(e);
        }

        tracing::info!(user_id = user.id, "created user");
        Ok(user)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<User> {
        self.users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("User with ID {} not found", id)))
    }

    /// `None` on miss; not an error
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users.find_user_by_email(email).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users.list_users().await
    }

    /// Apply the provided fields; absent fields stay unchanged
    pub async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        update.validate()?;
        let mut user = self.find_by_id(id).await?;

        if let Some(email) = &update.email {
            if let Some(existing) = self.users.find_user_by_email(email).await? {
                if existing.id != id {
                    tracing::warn!(user_id = id, "user update rejected: email already exists");
                    return Err(Error::conflict("Email already exists"));
                }
            }
        }

        update.apply_to(&mut user);
        let updated = self.users.update_user(&user).await?;
        tracing::info!(user_id = id, "updated user");
        Ok(updated)
    }

    /// Delete a user along with its categories and transactions
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        if self.users.delete_user(id).await? == 0 {
            return Err(Error::not_found(format!("User with ID {} not found", id)));
        }
        tracing::info!(user_id = id, "deleted user");
        Ok(())
    }
}

#[async_trait]
impl UserLookup for UserService {
    async fn lookup_user(&self, id: i64) -> Result<User> {
        self.find_by_id(id).await
    }
}
