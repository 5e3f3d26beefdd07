//! CLI command implementations

pub mod auth;
pub mod category;
pub mod logs;
pub mod report;
pub mod tx;
pub mod user;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use fintrack_core::services::{EntryPoint, LogEvent, LoggingService};
use fintrack_core::FintrackContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize; logging never blocks a command.
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from FINTRACK_DIR or ~/.fintrack
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FINTRACK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".fintrack"))
        .context("Could not find home directory; set FINTRACK_DIR")
}

pub fn get_context() -> Result<FintrackContext> {
    let data_dir = get_data_dir()?;
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    FintrackContext::new(&data_dir).context("Failed to initialize fintrack context")
}

/// Resolve the session token to a user id
pub async fn session_user(ctx: &FintrackContext, token: Option<&str>) -> Result<i64> {
    let Some(token) = token else {
        bail!("Not logged in. Run `ft login` and export FINTRACK_TOKEN");
    };
    Ok(ctx.auth_service.authenticate(token).await?)
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or RFC 3339
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| format!("invalid date '{}'", s));
    }
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD or RFC 3339", s))
}

/// Window end given as a bare date covers that whole day
pub fn parse_end_date(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| format!("invalid date '{}'", s));
    }
    parse_date(s)
}

pub fn parse_amount(s: &str) -> Result<Decimal, String> {
    Decimal::from_str(s.trim()).map_err(|_| format!("invalid amount '{}'", s))
}
