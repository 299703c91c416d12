//! Configuration management
//!
//! Settings live in `<atm_dir>/settings.json`:
//! ```json
//! {
//!   "databaseFile": "atm.duckdb",
//!   "currencySymbol": "₹",
//!   "minPasswordLength": 4,
//!   "passwordHashing": { "memoryCost": 65536, "timeCost": 3, "parallelism": 4 }
//! }
//! ```
//! Keys this crate doesn't know about are kept when the file is saved.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Argon2Params;

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_DATABASE_FILE: &str = "atm.duckdb";
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 4;

/// Environment variable overriding `databaseFile`
pub const DATABASE_FILE_ENV: &str = "ATM_DATABASE_FILE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    currency_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_password_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hashing: Option<Argon2Params>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// ATM configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file, relative to the ATM directory unless absolute
    pub database_file: String,
    pub currency_symbol: String,
    pub min_password_length: usize,
    pub password_hashing: Argon2Params,
    // Keep the raw settings for preservation when saving
    raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(SettingsFile::default())
    }
}

impl Config {
    fn from_settings(raw: SettingsFile) -> Self {
        Self {
            database_file: raw
                .database_file
                .clone()
                .unwrap_or_else(|| DEFAULT_DATABASE_FILE.to_string()),
            currency_symbol: raw
                .currency_symbol
                .clone()
                .unwrap_or_else(|| DEFAULT_CURRENCY_SYMBOL.to_string()),
            min_password_length: raw
                .min_password_length
                .unwrap_or(DEFAULT_MIN_PASSWORD_LENGTH),
            password_hashing: raw.password_hashing.clone().unwrap_or_default(),
            raw_settings: raw,
        }
    }

    /// Load config from the ATM directory, falling back to defaults
    ///
    /// `ATM_DATABASE_FILE` overrides the database file for this run only.
    pub fn load(atm_dir: &Path) -> Result<Self> {
        let settings_path = atm_dir.join(SETTINGS_FILE);

        let raw = Self::read_settings(&settings_path)?;
        let mut config = Self::from_settings(raw);

        if let Some(file) = std::env::var(DATABASE_FILE_ENV).ok().filter(|v| !v.is_empty()) {
            config.database_file = file;
        }

        Ok(config)
    }

    fn read_settings(settings_path: &Path) -> Result<SettingsFile> {
        if !settings_path.exists() {
            return Ok(SettingsFile::default());
        }
        let content = std::fs::read_to_string(settings_path)
            .with_context(|| format!("reading {}", settings_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", settings_path.display()))
    }

    /// Save config to the ATM directory, preserving settings we don't manage
    pub fn save(&self, atm_dir: &Path) -> Result<()> {
        let settings_path = atm_dir.join(SETTINGS_FILE);

        let mut settings = Self::read_settings(&settings_path)
            .unwrap_or_else(|_| self.raw_settings.clone());

        settings.database_file = Some(self.database_file.clone());
        settings.currency_symbol = Some(self.currency_symbol.clone());
        settings.min_password_length = Some(self.min_password_length);
        settings.password_hashing = Some(self.password_hashing.clone());

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Absolute path of the database file
    pub fn database_path(&self, atm_dir: &Path) -> PathBuf {
        let file = Path::new(&self.database_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            atm_dir.join(file)
        }
    }
}
