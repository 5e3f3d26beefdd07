//! Category domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Classifies a category and, transitively, every transaction referencing it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub const ALL: [CategoryType; 2] = [CategoryType::Income, CategoryType::Expense];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Income => "INCOME",
            CategoryType::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(CategoryType::Income),
            "EXPENSE" => Ok(CategoryType::Expense),
            other => Err(Error::validation(format!(
                "Invalid transaction category type: {}",
                other
            ))),
        }
    }
}

/// A named bucket scoped to exactly one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// True if this category occupies the `(user, name, type)` slot
    pub fn same_slot(&self, user_id: i64, name: &str, category_type: CategoryType) -> bool {
        self.user_id == user_id && self.name == name && self.category_type == category_type
    }
}

/// Fields required to create a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub user_id: i64,
    pub name: String,
    pub category_type: CategoryType,
}

impl NewCategory {
    pub fn new(user_id: i64, name: impl Into<String>, category_type: CategoryType) -> Self {
        Self {
            user_id,
            name: name.into(),
            category_type,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Category name must not be empty"));
        }
        Ok(())
    }
}

/// Partial category update
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub category_type: Option<CategoryType>,
}

impl CategoryUpdate {
    pub fn validate(&self) -> Result<()> {
        match &self.name {
            Some(name) if name.trim().is_empty() => {
                Err(Error::validation("Category name must not be empty"))
            }
            _ => Ok(()),
        }
    }

    pub fn apply_to(&self, category: &mut Category) {
        if let Some(name) = &self.name {
            category.name = name.clone();
        }
        if let Some(category_type) = self.category_type {
            category.category_type = category_type;
        }
    }
}

/// Income categories seeded for every new user, in insertion order
pub const DEFAULT_INCOME_CATEGORIES: [&str; 5] = [
    "Salary",
    "Freelance Income",
    "Investments",
    "Rental Income",
    "Gift Income",
];

/// Expense categories seeded for every new user, in insertion order
pub const DEFAULT_EXPENSE_CATEGORIES: [&str; 10] = [
    "Rent/Mortgage",
    "Utilities",
    "Groceries",
    "Transportation",
    "Dining Out",
    "Entertainment",
    "Travel",
    "Health Care",
    "Education",
    "Insurance",
];

/// The full default catalog for `user_id`: income first, then expense
pub fn default_categories(user_id: i64) -> Vec<NewCategory> {
    DEFAULT_INCOME_CATEGORIES
        .iter()
        .map(|name| NewCategory::new(user_id, *name, CategoryType::Income))
        .chain(
            DEFAULT_EXPENSE_CATEGORIES
                .iter()
                .map(|name| NewCategory::new(user_id, *name, CategoryType::Expense)),
        )
        .collect()
}
