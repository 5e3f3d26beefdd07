//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "auth": { "tokenTtlHours": 10, "jwtSecret": "<base64>" },
//!   "ledger": { "recentLimit": 5, "mostCommonLimit": 5, "windowMonths": 3 }
//! }
//! ```
//! Fields this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};

pub const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_TOKEN_TTL_HOURS: u32 = 10;
const DEFAULT_RECENT_LIMIT: usize = 5;
const DEFAULT_MOST_COMMON_LIMIT: usize = 5;
const DEFAULT_WINDOW_MONTHS: u32 = 3;
const JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    ledger: LedgerSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_ttl_hours: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jwt_secret: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recent_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    most_common_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    window_months: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Resolved configuration (settings file plus environment overrides)
#[derive(Debug, Clone)]
pub struct Config {
    pub token_ttl_hours: u32,
    pub jwt_secret: Vec<u8>,
    pub recent_limit: usize,
    pub most_common_limit: usize,
    pub window_months: u32,
}

impl Config {
    /// Load config from the data directory.
    ///
    /// `FINTRACK_JWT_SECRET` and `FINTRACK_TOKEN_TTL_HOURS` override the file.
    /// Without either a configured or overridden secret, a new one is
    /// generated and written back so tokens survive restarts.
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with_env(data_dir, |key| std::env::var(key).ok())
    }

    pub(crate) fn load_with_env(
        data_dir: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut raw = read_settings(data_dir)?;

        let jwt_secret = match env("FINTRACK_JWT_SECRET") {
            Some(secret) => decode_secret(&secret)?,
            None => match &raw.auth.jwt_secret {
                Some(secret) => decode_secret(secret)?,
                None => {
                    let mut secret = vec![0u8; JWT_SECRET_BYTES];
                    rand::thread_rng().fill_bytes(&mut secret);
                    raw.auth.jwt_secret = Some(BASE64.encode(&secret));
                    write_settings(data_dir, &raw)?;
                    tracing::info!("generated new token signing secret");
                    secret
                }
            },
        };

        let token_ttl_hours = match env("FINTRACK_TOKEN_TTL_HOURS") {
            Some(hours) => hours.trim().parse().map_err(|_| {
                Error::Config(format!("FINTRACK_TOKEN_TTL_HOURS is not a number: {}", hours))
            })?,
            None => raw.auth.token_ttl_hours.unwrap_or(DEFAULT_TOKEN_TTL_HOURS),
        };
        if token_ttl_hours == 0 {
            return Err(Error::Config("Token TTL must be at least one hour".to_string()));
        }

        Ok(Self {
            token_ttl_hours,
            jwt_secret,
            recent_limit: raw.ledger.recent_limit.unwrap_or(DEFAULT_RECENT_LIMIT),
            most_common_limit: raw.ledger.most_common_limit.unwrap_or(DEFAULT_MOST_COMMON_LIMIT),
            window_months: raw.ledger.window_months.unwrap_or(DEFAULT_WINDOW_MONTHS),
        })
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.token_ttl_hours))
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid {}: {}", SETTINGS_FILE, e)))
}

fn write_settings(data_dir: &Path, settings: &SettingsFile) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(data_dir.join(SETTINGS_FILE), content)?;
    Ok(())
}

fn decode_secret(raw: &str) -> Result<Vec<u8>> {
    let decoded = BASE64
        .decode(raw.trim())
        .map_err(|e| Error::Config(format!("JWT secret is not valid base64: {}", e)))?;
    if decoded.len() < JWT_SECRET_BYTES {
        return Err(Error::Config(format!(
            "JWT secret must decode to at least {} bytes",
            JWT_SECRET_BYTES
        )));
    }
    Ok(decoded)
}
