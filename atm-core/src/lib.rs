//! ATM Core - Business logic for the ATM simulator
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Account, Amount, Session, etc.)
//! - **ports**: Trait definitions for external dependencies (Repository)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::Repository;
use services::AccountStore;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{
    Account, AccountId, Amount, Argon2Params, PasswordMismatch, Session, TransactionKind,
    TransactionRecord,
};

/// Main context for ATM operations
///
/// Holds the configuration and the open database. The connection is
/// released when the context drops.
pub struct AtmContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub account_store: AccountStore,
    db_path: PathBuf,
}

impl AtmContext {
    /// Load config from `atm_dir`, open the database and create the schema
    pub fn new(atm_dir: &Path) -> Result<Self> {
        let config = Config::load(atm_dir).map_err(|e| Error::Config(format!("{:#}", e)))?;
        Self::with_config(atm_dir, config)
    }

    pub fn with_config(atm_dir: &Path, config: Config) -> Result<Self> {
        let db_path = config.database_path(atm_dir);
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);

        repository.ensure_schema()?;

        let account_store = AccountStore::new(
            Arc::clone(&repository) as Arc<dyn Repository>,
            config.password_hashing.clone(),
            config.min_password_length,
        );

        Ok(Self {
            config,
            repository,
            account_store,
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
