//! Fintrack Core - personal finance ledger
//!
//! Users own categories and transactions; reports summarize them. The crate
//! follows a hexagonal layout:
//!
//! - **domain**: entities, partial updates, pure aggregation functions
//! - **ports**: repository and lookup traits
//! - **services**: identity store, category and transaction ledgers, reports, auth
//! - **adapters**: DuckDB store implementing every repository port

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::{CategoryLookup, CategoryRepository, CategorySeeder, TransactionRepository, UserLookup, UserRepository};
use services::*;

pub use domain::result::{Error, Result};
pub use domain::{
    Category, CategoryType, CategoryUpdate, Currency, CurrencyTypeTotal, DateWindow, NewTransaction,
    NewUser, Transaction, TransactionUpdate, TransactionWithCategory, User, UserUpdate,
};

/// Ledger database file name inside the data directory
pub const DB_FILE: &str = "fintrack.duckdb";

/// Main context for ledger operations
///
/// Owns the single store handle and passes it down to every service.
pub struct FintrackContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub user_service: Arc<UserService>,
    pub category_service: Arc<CategoryService>,
    pub transaction_service: TransactionService,
    pub report_service: ReportService,
    pub auth_service: AuthService,
}

impl FintrackContext {
    /// Open (or create) the ledger in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;
        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILE))?);
        repository.ensure_schema()?;
        Ok(Self::with_repository(config, repository))
    }

    fn with_repository(config: Config, repository: Arc<DuckDbRepository>) -> Self {
        let users: Arc<dyn UserRepository> = repository.clone();
        let categories: Arc<dyn CategoryRepository> = repository.clone();
        let transactions: Arc<dyn TransactionRepository> = repository.clone();

        let category_service = Arc::new(CategoryService::new(categories, Arc::clone(&users)));
        let seeder: Arc<dyn CategorySeeder> = category_service.clone();
        let user_service = Arc::new(UserService::new(Arc::clone(&users), seeder));

        let user_lookup: Arc<dyn UserLookup> = user_service.clone();
        let category_lookup: Arc<dyn CategoryLookup> = category_service.clone();
        let transaction_service =
            TransactionService::new(Arc::clone(&transactions), user_lookup, category_lookup);

        let report_service = ReportService::new(transactions);
        let auth_service = AuthService::new(users, &config.jwt_secret, config.token_ttl());

        Self {
            config,
            repository,
            user_service,
            category_service,
            transaction_service,
            report_service,
            auth_service,
        }
    }
}
