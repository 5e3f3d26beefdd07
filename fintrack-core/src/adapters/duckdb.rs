//! DuckDB repository implementation

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use duckdb::{params, Connection, Row};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Category, CategoryType, Currency, DateWindow, NewCategory, NewTransaction, NewUser,
    Transaction, TransactionWithCategory, User,
};
use crate::ports::{CategoryRepository, TransactionRepository, UserRepository};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, created_at::VARCHAR, updated_at::VARCHAR";

const CATEGORY_COLUMNS: &str =
    "id, name, category_type, user_id, created_at::VARCHAR, updated_at::VARCHAR";

const TRANSACTION_COLUMNS: &str = "id, CAST(amount AS VARCHAR), currency, description, \
     occurred_at::VARCHAR, user_id, category_id, created_at::VARCHAR, updated_at::VARCHAR";

// Transaction columns (0-8) followed by category columns (9-14)
const TRANSACTION_WITH_CATEGORY_COLUMNS: &str = "t.id, CAST(t.amount AS VARCHAR), t.currency, \
     t.description, t.occurred_at::VARCHAR, t.user_id, t.category_id, t.created_at::VARCHAR, \
     t.updated_at::VARCHAR, c.id, c.name, c.category_type, c.user_id, c.created_at::VARCHAR, \
     c.updated_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// DuckDB repository implementation
///
/// All access goes through one connection behind a mutex, so every
/// check-then-write sequence below runs without interleaving.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
}

impl DuckDbRepository {
    /// Open (or create) a file-backed ledger database
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when two CLI invocations race on the same file.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            delay_ms = delay.as_millis() as u64,
                            "database busy, retrying: {}",
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; nothing here needs ICU or httpfs
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let result = self.run_migrations()?;
        if !result.applied.is_empty() {
            tracing::info!(applied = ?result.applied, "applied ledger migrations");
        }
        Ok(())
    }
}

// === Users ===

#[async_trait]
impl UserRepository for DuckDbRepository {
    async fn insert_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn()?;
        if email_taken(&conn, &user.email, None)? {
            return Err(Error::conflict("Email already exists"));
        }

        let now = now_micros();
        let id: i64 = conn.query_row(
            "INSERT INTO users (name, email, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
             RETURNING id",
            params![
                user.name,
                user.email,
                user.password_hash,
                format_timestamp(&now),
                format_timestamp(&now),
            ],
            |row| row.get(0),
        )?;

        Ok(User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))?;
        let mut rows = stmt.query_map(params![id], row_to_user)?;
        Ok(rows.next().transpose()?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))?;
        let mut rows = stmt.query_map(params![email], row_to_user)?;
        Ok(rows.next().transpose()?)
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let conn = self.conn()?;
        if email_taken(&conn, &user.email, Some(user.id))? {
            return Err(Error::conflict("Email already exists"));
        }

        let now = now_micros();
        let changed = conn.execute(
            "UPDATE users
             SET name = ?, email = ?, password_hash = ?, updated_at = CAST(? AS TIMESTAMP)
             WHERE id = ?",
            params![
                user.name,
                user.email,
                user.password_hash,
                format_timestamp(&now),
                user.id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!("User with ID {} not found", user.id)));
        }

        Ok(User {
            updated_at: now,
            ..user.clone()
        })
    }

    /// Cascades in dependency order: transactions, categories, then the user,
    /// all in one store transaction.
    async fn delete_user(&self, id: i64) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM transactions WHERE user_id = ?", params![id])?;
        tx.execute("DELETE FROM categories WHERE user_id = ?", params![id])?;
        let removed = tx.execute("DELETE FROM users WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(removed)
    }
}

// === Categories ===

#[async_trait]
impl CategoryRepository for DuckDbRepository {
    async fn insert_category(&self, category: &NewCategory) -> Result<Category> {
        let conn = self.conn()?;
        insert_category_with(&conn, category, now_micros())
    }

    async fn insert_categories_atomic(&self, categories: &[NewCategory]) -> Result<Vec<Category>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = now_micros();
        let mut created = Vec::with_capacity(categories.len());
        for category in categories {
            // An early return drops `tx`, which rolls back everything so far
            created.push(insert_category_with(&tx, category, now)?);
        }
        tx.commit()?;
        Ok(created)
    }

    async fn find_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories WHERE id = ?",
            CATEGORY_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id], |row| row_to_category(row, 0))?;
        Ok(rows.next().transpose()?)
    }

    async fn find_categories_by_user(&self, user_id: i64) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories WHERE user_id = ? ORDER BY id",
            CATEGORY_COLUMNS
        ))?;
        let categories = stmt
            .query_map(params![user_id], |row| row_to_category(row, 0))?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(categories)
    }

    async fn find_category_by_id_and_user(
        &self,
        category_id: i64,
        user_id: i64,
    ) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories WHERE id = ? AND user_id = ?",
            CATEGORY_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![category_id, user_id], |row| row_to_category(row, 0))?;
        Ok(rows.next().transpose()?)
    }

    async fn update_category(&self, category: &Category) -> Result<Category> {
        let conn = self.conn()?;
        if category_slot_taken(
            &conn,
            category.user_id,
            &category.name,
            category.category_type,
            Some(category.id),
        )? {
            return Err(Error::conflict("Category already exists"));
        }

        let now = now_micros();
        let changed = conn.execute(
            "UPDATE categories
             SET name = ?, category_type = ?, updated_at = CAST(? AS TIMESTAMP)
             WHERE id = ?",
            params![
                category.name,
                category.category_type.as_str(),
                format_timestamp(&now),
                category.id,
            ],
        )?;
        if changed == 0 {
            return Err(Error::not_found(format!(
                "Category with ID {} not found",
                category.id
            )));
        }

        Ok(Category {
            updated_at: now,
            ..category.clone()
        })
    }

    async fn delete_category(&self, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let referenced: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if referenced > 0 {
            return Err(Error::conflict(format!(
                "Category with ID {} is referenced by {} transaction(s)",
                id, referenced
            )));
        }
        Ok(conn.execute("DELETE FROM categories WHERE id = ?", params![id])?)
    }
}

// === Transactions ===

#[async_trait]
impl TransactionRepository for DuckDbRepository {
    async fn insert_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        let conn = self.conn()?;
        let now = now_micros();
        let date = tx.date.trunc_subsecs(6);
        let (id, amount): (i64, Decimal) = conn.query_row(
            "INSERT INTO transactions (amount, currency, description, occurred_at, user_id,
                                       category_id, created_at, updated_at)
             VALUES (CAST(? AS DECIMAL(18,4)), ?, ?, CAST(? AS TIMESTAMP), ?, ?,
                     CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
             RETURNING id, CAST(amount AS VARCHAR)",
            params![
                tx.amount.to_string(),
                tx.currency.code(),
                tx.description,
                format_timestamp(&date),
                tx.user_id,
                tx.category_id,
                format_timestamp(&now),
                format_timestamp(&now),
            ],
            |row| Ok((row.get(0)?, read_amount(row, 1)?)),
        )?;

        Ok(Transaction {
            id,
            amount,
            currency: tx.currency,
            description: tx.description.clone(),
            date,
            user_id: tx.user_id,
            category_id: tx.category_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![id], |row| row_to_transaction(row, 0))?;
        Ok(rows.next().transpose()?)
    }

    async fn find_transactions_by_user(&self, user_id: i64) -> Result<Vec<TransactionWithCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions t
             JOIN categories c ON c.id = t.category_id
             WHERE t.user_id = ?
             ORDER BY t.id",
            TRANSACTION_WITH_CATEGORY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![user_id], row_to_transaction_with_category)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn find_recent_transactions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<TransactionWithCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions t
             JOIN categories c ON c.id = t.category_id
             WHERE t.user_id = ?
             ORDER BY t.occurred_at DESC, t.id ASC
             LIMIT ?",
            TRANSACTION_WITH_CATEGORY_COLUMNS
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![user_id, limit], row_to_transaction_with_category)?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn find_transactions_in_window(
        &self,
        user_id: i64,
        window: &DateWindow,
    ) -> Result<Vec<TransactionWithCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions t
             JOIN categories c ON c.id = t.category_id
             WHERE t.user_id = ?
               AND t.occurred_at BETWEEN CAST(? AS TIMESTAMP) AND CAST(? AS TIMESTAMP)
             ORDER BY t.id",
            TRANSACTION_WITH_CATEGORY_COLUMNS
        ))?;
        let rows = stmt
            .query_map(
                params![
                    user_id,
                    format_timestamp(&window.from),
                    format_timestamp(&window.to),
                ],
                row_to_transaction_with_category,
            )?
            .collect::<duckdb::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn update_transaction(&self, tx: &Transaction) -> Result<Transaction> {
        let conn = self.conn()?;
        let now = now_micros();
        let date = tx.date.trunc_subsecs(6);
        let stored = conn.query_row(
            "UPDATE transactions
             SET amount = CAST(? AS DECIMAL(18,4)), currency = ?, description = ?,
                 occurred_at = CAST(? AS TIMESTAMP), category_id = ?,
                 updated_at = CAST(? AS TIMESTAMP)
             WHERE id = ?
             RETURNING CAST(amount AS VARCHAR)",
            params![
                tx.amount.to_string(),
                tx.currency.code(),
                tx.description,
                format_timestamp(&date),
                tx.category_id,
                format_timestamp(&now),
                tx.id,
            ],
            |row| read_amount(row, 0),
        );
        let amount = match stored {
            Ok(amount) => amount,
            Err(duckdb::Error::QueryReturnedNoRows) => {
                return Err(Error::not_found(format!("Transaction with ID {} not found", tx.id)))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Transaction {
            amount,
            date,
            updated_at: now,
            ..tx.clone()
        })
    }

    async fn delete_transaction(&self, id: i64) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM transactions WHERE id = ?", params![id])?)
    }
}

// Helpers shared by the locked sections above

fn email_taken(conn: &Connection, email: &str, except_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE email = ? AND id != ?",
        params![email, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn category_slot_taken(
    conn: &Connection,
    user_id: i64,
    name: &str,
    category_type: CategoryType,
    except_id: Option<i64>,
) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM categories
         WHERE user_id = ? AND name = ? AND category_type = ? AND id != ?",
        params![user_id, name, category_type.as_str(), except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn insert_category_with(
    conn: &Connection,
    category: &NewCategory,
    now: DateTime<Utc>,
) -> Result<Category> {
    if category_slot_taken(conn, category.user_id, &category.name, category.category_type, None)? {
        return Err(Error::conflict("Category already exists"));
    }

    let id: i64 = conn.query_row(
        "INSERT INTO categories (name, category_type, user_id, created_at, updated_at)
         VALUES (?, ?, ?, CAST(? AS TIMESTAMP), CAST(? AS TIMESTAMP))
         RETURNING id",
        params![
            category.name,
            category.category_type.as_str(),
            category.user_id,
            format_timestamp(&now),
            format_timestamp(&now),
        ],
        |row| row.get(0),
    )?;

    Ok(Category {
        id,
        name: category.name.clone(),
        category_type: category.category_type,
        user_id: category.user_id,
        created_at: now,
        updated_at: now,
    })
}

fn row_to_user(row: &Row<'_>) -> duckdb::Result<User> {
    let created: String = row.get(4)?;
    let updated: String = row.get(5)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: parse_timestamp(&created).map_err(|e| conversion_error(4, e))?,
        updated_at: parse_timestamp(&updated).map_err(|e| conversion_error(5, e))?,
    })
}

/// Read the six category columns starting at `offset`
fn row_to_category(row: &Row<'_>, offset: usize) -> duckdb::Result<Category> {
    let category_type: String = row.get(offset + 2)?;
    let created: String = row.get(offset + 4)?;
    let updated: String = row.get(offset + 5)?;
    Ok(Category {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        category_type: CategoryType::from_str(&category_type)
            .map_err(|e| conversion_error(offset + 2, e))?,
        user_id: row.get(offset + 3)?,
        created_at: parse_timestamp(&created).map_err(|e| conversion_error(offset + 4, e))?,
        updated_at: parse_timestamp(&updated).map_err(|e| conversion_error(offset + 5, e))?,
    })
}

/// Read the nine transaction columns starting at `offset`
fn row_to_transaction(row: &Row<'_>, offset: usize) -> duckdb::Result<Transaction> {
    let currency: String = row.get(offset + 2)?;
    let date: String = row.get(offset + 4)?;
    let created: String = row.get(offset + 7)?;
    let updated: String = row.get(offset + 8)?;
    Ok(Transaction {
        id: row.get(offset)?,
        amount: read_amount(row, offset + 1)?,
        currency: Currency::from_str(&currency).map_err(|e| conversion_error(offset + 2, e))?,
        description: row.get(offset + 3)?,
        date: parse_timestamp(&date).map_err(|e| conversion_error(offset + 4, e))?,
        user_id: row.get(offset + 5)?,
        category_id: row.get(offset + 6)?,
        created_at: parse_timestamp(&created).map_err(|e| conversion_error(offset + 7, e))?,
        updated_at: parse_timestamp(&updated).map_err(|e| conversion_error(offset + 8, e))?,
    })
}

/// Amounts are selected as `VARCHAR`; the column's fixed scale is dropped
fn read_amount(row: &Row<'_>, idx: usize) -> duckdb::Result<Decimal> {
    let amount: String = row.get(idx)?;
    Decimal::from_str(&amount)
        .map(|d| d.normalize())
        .map_err(|e| conversion_error(idx, Error::database(e.to_string())))
}

fn row_to_transaction_with_category(row: &Row<'_>) -> duckdb::Result<TransactionWithCategory> {
    Ok(TransactionWithCategory {
        transaction: row_to_transaction(row, 0)?,
        category: row_to_category(row, 9)?,
    })
}

fn conversion_error(idx: usize, err: Error) -> duckdb::Error {
    duckdb::Error::FromSqlConversionFailure(idx, duckdb::types::Type::Text, Box::new(err))
}

/// Timestamps are stored at microsecond precision; truncate up front so the
/// values handed back equal what a later read returns.
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    // DuckDB renders TIMESTAMP as "2024-01-15 10:30:00" or "2024-01-15 10:30:00.123456"
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::database(format!("Invalid timestamp '{}': {}", s, e)))
}
