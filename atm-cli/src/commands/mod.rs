//! CLI command implementations

pub mod init;
pub mod logs;
pub mod new;
pub mod prompt;
pub mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use atm_core::services::{LogEvent, LoggingService};
use atm_core::AtmContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let atm_dir = get_atm_dir().ok()?;
    std::fs::create_dir_all(&atm_dir).ok()?;
    LoggingService::new(&atm_dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the ATM directory from `ATM_DIR` or default to `~/.atm`
pub fn get_atm_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("ATM_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory; set ATM_DIR")?;
    Ok(home.join(".atm"))
}

/// Create the ATM directory if needed and open the context
pub fn get_context() -> Result<AtmContext> {
    let atm_dir = get_atm_dir()?;

    std::fs::create_dir_all(&atm_dir)
        .with_context(|| format!("Failed to create ATM directory: {:?}", atm_dir))?;

    AtmContext::new(&atm_dir).context("Failed to initialize ATM")
}
