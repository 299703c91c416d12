//! Init command - create the ATM directory, settings and schema

use anyhow::{Context, Result};
use atm_core::config::{Config, SETTINGS_FILE};
use atm_core::services::LogEvent;
use atm_core::AtmContext;

use super::{get_atm_dir, get_logger, log_event};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let atm_dir = get_atm_dir()?;
    std::fs::create_dir_all(&atm_dir)
        .with_context(|| format!("Failed to create ATM directory: {:?}", atm_dir))?;

    let settings_path = atm_dir.join(SETTINGS_FILE);
    let wrote_settings = !settings_path.exists();
    if wrote_settings {
        Config::default().save(&atm_dir)?;
    }

    let ctx = AtmContext::new(&atm_dir).context("Failed to initialize ATM")?;
    let migrations = ctx.repository.run_migrations()?;

    let logger = get_logger();
    log_event(&logger, LogEvent::new("initialized").with_action("init"));

    if json {
        println!(
            "{}",
            serde_json::json!({
                "atm_dir": atm_dir.to_string_lossy(),
                "database_path": ctx.db_path().to_string_lossy(),
                "settings_created": wrote_settings,
                "migrations": migrations.already_applied,
            })
        );
    } else {
        output::success("ATM initialized");
        println!("  Directory: {}", atm_dir.display());
        println!("  Database: {}", ctx.db_path().display());
        if wrote_settings {
            println!("  Settings: {} (created)", settings_path.display());
        } else {
            println!("  Settings: {}", settings_path.display());
        }
    }

    Ok(())
}
