//! New command - create new records

use std::env;

use anyhow::Result;
use atm_core::domain::amount::parse_opening_balance;
use atm_core::services::LogEvent;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Input, Password};

use super::{get_context, get_logger, log_event};
use crate::output::format_amount;

/// Environment variable supplying the password for non-interactive use
const NEW_PASSWORD_ENV: &str = "ATM_NEW_PASSWORD";

#[derive(Subcommand)]
pub enum NewCommands {
    /// Open a new account
    Account {
        /// Username (prompted if omitted)
        #[arg(long)]
        username: Option<String>,
        /// Opening balance (prompted if omitted)
        #[arg(long)]
        balance: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: NewCommands) -> Result<()> {
    match command {
        NewCommands::Account { username, balance, json } => run_account(username, balance, json),
    }
}

/// Password and confirmation from ATM_NEW_PASSWORD or a prompt
fn get_password_with_confirm() -> Result<(String, String)> {
    if let Ok(p) = env::var(NEW_PASSWORD_ENV) {
        return Ok((p.clone(), p));
    }

    let p1 = Password::new().with_prompt("Password").interact()?;
    let p2 = Password::new().with_prompt("Confirm password").interact()?;
    Ok((p1, p2))
}

fn run_account(username: Option<String>, balance: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();

    let username = match username {
        Some(u) => u,
        None => Input::new().with_prompt("Username").interact_text()?,
    };

    let balance_str = match balance {
        Some(b) => b,
        None => Input::new()
            .with_prompt("Opening balance")
            .default("0".to_string())
            .interact_text()?,
    };
    let opening_balance = parse_opening_balance(&balance_str)?;

    let (password, confirm) = get_password_with_confirm()?;

    let account = match ctx
        .account_store
        .open_account(&username, &password, &confirm, opening_balance)
    {
        Ok(account) => account,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("account_open_failed").with_action("new_account").with_error("rejected"),
            );
            return Err(e.into());
        }
    };

    log_event(&logger, LogEvent::new("account_opened").with_action("new_account"));

    if json {
        println!("{}", serde_json::to_string_pretty(&account)?);
    } else {
        println!("{}", "Account created".green());
        println!("  Account ID: {}", account.id);
        println!("  Username: {}", account.username);
        println!(
            "  Balance: {}",
            format_amount(&ctx.config.currency_symbol, account.balance)
        );
        println!("  Created: {}", account.created_at.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atm_core::Error;

    #[test]
    fn test_bad_opening_balance_keeps_its_error_kind() {
        for input in ["lots", "-5", "1.001", "10000000000000000"] {
            let err: anyhow::Error = parse_opening_balance(input).unwrap_err().into();
            assert!(
                matches!(err.downcast_ref::<Error>(), Some(Error::InvalidAmount(_))),
                "{} should be an invalid amount",
                input
            );
        }
    }
}
