//! Service layer - business logic orchestration
//!
//! One service per ledger component. Services hold `Arc<dyn Port>` handles
//! and never touch the store directly.

mod auth;
mod category;
pub mod logging;
pub mod migration;
mod report;
mod transaction;
mod user;

pub use auth::{AccessToken, AuthService, MIN_PASSWORD_LENGTH};
pub use category::CategoryService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use report::ReportService;
pub use transaction::TransactionService;
pub use user::UserService;
