//! Category service - per-user category ledger

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::result::{Error, Result};
use crate::domain::{default_categories, Category, CategoryType, CategoryUpdate, NewCategory, User};
use crate::ports::{CategoryLookup, CategoryRepository, CategorySeeder, UserRepository};

/// Owns user-scoped categories and the `(user, name, type)` uniqueness rule
pub struct CategoryService {
    categories: Arc<dyn CategoryRepository>,
    users: Arc<dyn UserRepository>,
}

impl CategoryService {
    pub fn new(categories: Arc<dyn CategoryRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { categories, users }
    }

    /// Fails with `NotFound` for an unknown user and `Conflict` for a taken slot
    pub async fn create_category(
        &self,
        user_id: i64,
        name: &str,
        category_type: CategoryType,
    ) -> Result<Category> {
        let new_category = NewCategory::new(user_id, name, category_type);
        new_category.validate()?;

        if self.users.find_user_by_id(user_id).await?.is_none() {
            return Err(Error::not_found(format!("User with ID {} not found", user_id)));
        }

        let category = self
            .categories
            .insert_category(&new_category)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    tracing::warn!(user_id, "category creation rejected: slot taken");
                }
                e
            })?;
        tracing::info!(user_id, category_id = category.id, "created category");
        Ok(category)
    }

    /// Insert the default catalog one category at a time.
    ///
    /// A failure leaves the categories created so far in place.
    pub async fn seed_default_categories(&self, user: &User) -> Result<Vec<Category>> {
        let catalog = default_categories(user.id);
        let mut created = Vec::with_capacity(catalog.len());
        for category in &catalog {
            match self.categories.insert_category(category).await {
                Ok(c) => created.push(c),
                Err(e) => {
                    tracing::warn!(
                        user_id = user.id,
                        created = created.len(),
                        total = catalog.len(),
                        error = %e,
                        "default category seeding stopped partway"
                    );
                    return Err(e);
                }
            }
        }
        Ok(created)
    }

    /// Insert the default catalog in one store transaction: all or nothing
    pub async fn seed_default_categories_atomic(&self, user: &User) -> Result<Vec<Category>> {
        let created = self
            .categories
            .insert_categories_atomic(&default_categories(user.id))
            .await?;
        tracing::debug!(user_id = user.id, count = created.len(), "seeded default categories");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Category> {
        self.categories
            .find_category_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Category with ID {} not found", id)))
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Vec<Category>> {
        self.categories.find_categories_by_user(user_id).await
    }

    pub async fn find_by_id_and_user(&self, category_id: i64, user_id: i64) -> Result<Category> {
        self.categories
            .find_category_by_id_and_user(category_id, user_id)
            .await?
            .ok_or_else(|| {
                Error::not_found(format!(
                    "Category with ID {} not found for user {}",
                    category_id, user_id
                ))
            })
    }

    /// Overwrite the provided fields. The resulting `(name, type)` must still
    /// be unique among the owner's categories.
    pub async fn update_category(&self, id: i64, update: CategoryUpdate) -> Result<Category> {
        update.validate()?;
        let mut category = self.find_by_id(id).await?;
        update.apply_to(&mut category);
        let updated = self.categories.update_category(&category).await?;
        tracing::info!(category_id = id, "updated category");
        Ok(updated)
    }

    /// Fails with `Conflict` while transactions still reference the category
    pub async fn delete_category(&self, id: i64) -> Result<()> {
        if self.categories.delete_category(id).await? == 0 {
            return Err(Error::not_found(format!("Category with ID {} not found", id)));
        }
        tracing::info!(category_id = id, "deleted category");
        Ok(())
    }

    pub async fn belongs_to_user(&self, user_id: i64, category_id: i64) -> Result<bool> {
        Ok(self
            .categories
            .find_category_by_id_and_user(category_id, user_id)
            .await?
            .is_some())
    }

    /// Delete on behalf of `user_id`: `NotFound` if absent, `Conflict` if
    /// the category belongs to someone else
    pub async fn remove_for_user(&self, user_id: i64, category_id: i64) -> Result<()> {
        self.find_by_id(category_id).await?;
        if !self.belongs_to_user(user_id, category_id).await? {
            return Err(Error::conflict("Invalid User"));
        }
        self.delete_category(category_id).await
    }
}

#[async_trait]
impl CategoryLookup for CategoryService {
    async fn lookup_category_for_user(&self, category_id: i64, user_id: i64) -> Result<Category> {
        self.find_by_id_and_user(category_id, user_id).await
    }
}

#[async_trait]
impl CategorySeeder for CategoryService {
    async fn seed_for_new_user(&self, user: &User) -> Result<Vec<Category>> {
        self.seed_default_categories_atomic(user).await
    }
}
