//! Session command - the interactive login and menu loop

use anyhow::Result;
use atm_core::services::{AccountStore, LogEvent, LoggingService};
use atm_core::{Amount, Error, Session};
use colored::Colorize;

use super::prompt::Prompter;
use super::{get_context, get_logger, log_event};
use crate::output::{self, format_amount};

/// Rows shown by the mini statement
const STATEMENT_LIMIT: usize = 5;

/// An entry of the ATM menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    CheckBalance,
    Deposit,
    Withdraw,
    ChangePassword,
    MiniStatement,
    Logout,
}

impl MenuChoice {
    fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::CheckBalance),
            "2" => Some(MenuChoice::Deposit),
            "3" => Some(MenuChoice::Withdraw),
            "4" => Some(MenuChoice::ChangePassword),
            "5" => Some(MenuChoice::MiniStatement),
            "0" => Some(MenuChoice::Logout),
            _ => None,
        }
    }

    /// Name recorded in the event log
    fn action(&self) -> &'static str {
        match self {
            MenuChoice::CheckBalance => "check_balance",
            MenuChoice::Deposit => "deposit",
            MenuChoice::Withdraw => "withdraw",
            MenuChoice::ChangePassword => "change_password",
            MenuChoice::MiniStatement => "mini_statement",
            MenuChoice::Logout => "logout",
        }
    }
}

enum LoginOutcome {
    LoggedIn(Session),
    Failed,
    EndOfInput,
}

/// Whether the loop should keep reading input
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    EndOfInput,
}

/// Event-log safe name for a recoverable error. The error text itself can
/// carry amounts, so it is never logged.
fn error_kind(err: &Error) -> &'static str {
    match err {
        Error::AuthFailure => "auth_failure",
        Error::InvalidAmount(_) => "invalid_amount",
        Error::InsufficientFunds { .. } => "insufficient_funds",
        Error::PasswordMismatch(_) => "password_mismatch",
        Error::Validation(_) => "validation",
        Error::LoggingFailure(_) => "transaction_log_failure",
        _ => "internal",
    }
}

pub fn run() -> Result<()> {
    let ctx = get_context()?;
    let logger = get_logger();
    let prompter = Prompter::detect();

    if !prompter.is_interactive() {
        output::warning("Input is not a terminal; passwords will be read as plain lines.");
    }

    Atm {
        store: &ctx.account_store,
        currency_symbol: &ctx.config.currency_symbol,
        prompter: &prompter,
        logger: &logger,
    }
    .run()
}

/// One ATM terminal: the account store it serves and where input comes from
struct Atm<'a> {
    store: &'a AccountStore,
    currency_symbol: &'a str,
    prompter: &'a Prompter,
    logger: &'a Option<LoggingService>,
}

impl Atm<'_> {
    /// Log in, serve the menu, and offer another login until the user
    /// exits or input runs out
    fn run(&self) -> Result<()> {
        log_event(self.logger, LogEvent::new("session_started"));

        loop {
            match self.login()? {
                LoginOutcome::LoggedIn(session) => {
                    if self.menu_loop(&session)? == Flow::EndOfInput {
                        break;
                    }
                }
                LoginOutcome::Failed => {}
                LoginOutcome::EndOfInput => break,
            }

            println!();
            match self.prompter.text("Press '1' to log in again, or '0' to exit")? {
                Some(choice) if choice.trim() != "0" => continue,
                _ => break,
            }
        }

        log_event(self.logger, LogEvent::new("session_ended"));
        println!("Program terminated.");
        Ok(())
    }

    fn login(&self) -> Result<LoginOutcome> {
        println!("\n{}", "--- Login ---".bold());

        let Some(username) = self.prompter.text("Enter username")? else {
            return Ok(LoginOutcome::EndOfInput);
        };
        let Some(password) = self.prompter.secret("Enter password")? else {
            return Ok(LoginOutcome::EndOfInput);
        };

        match self.store.authenticate(&username, &password) {
            Ok(session) => {
                output::success(&format!(
                    "\nLogin successful! Welcome, {}!",
                    session.username()
                ));
                log_event(self.logger, LogEvent::new("login_succeeded"));
                Ok(LoginOutcome::LoggedIn(session))
            }
            Err(e) if e.is_recoverable() => {
                output::error(&e.to_string());
                log_event(
                    self.logger,
                    LogEvent::new("login_failed").with_error(error_kind(&e)),
                );
                Ok(LoginOutcome::Failed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn menu_loop(&self, session: &Session) -> Result<Flow> {
        loop {
            display_menu();

            let Some(input) = self.prompter.text("Enter your choice")? else {
                return Ok(Flow::EndOfInput);
            };
            let Some(choice) = MenuChoice::parse(&input) else {
                output::error("Invalid choice. Please select a number from the menu.");
                continue;
            };

            if choice == MenuChoice::Logout {
                println!("\nGoodbye, {}!", session.username());
                log_event(self.logger, LogEvent::new("logout"));
                return Ok(Flow::Continue);
            }

            log_event(
                self.logger,
                LogEvent::new("action_executed").with_action(choice.action()),
            );

            match self.perform(session, choice) {
                Ok(Flow::Continue) => {}
                Ok(Flow::EndOfInput) => return Ok(Flow::EndOfInput),
                Err(e) => match e.downcast_ref::<Error>() {
                    Some(err) if err.is_recoverable() => {
                        output::error(&err.to_string());
                        log_event(
                            self.logger,
                            LogEvent::new("action_failed")
                                .with_action(choice.action())
                                .with_error(error_kind(err)),
                        );
                    }
                    _ => return Err(e),
                },
            }
        }
    }

    fn perform(&self, session: &Session, choice: MenuChoice) -> Result<Flow> {
        let store = self.store;
        let symbol = self.currency_symbol;
        let prompter = self.prompter;

        match choice {
            MenuChoice::CheckBalance => {
                let balance = store.get_balance(session)?;
                println!("\nYour current balance is: {}", format_amount(symbol, balance));
            }
            MenuChoice::Deposit => {
                let Some(input) = prompter.text("Enter amount to deposit")? else {
                    return Ok(Flow::EndOfInput);
                };
                let amount = Amount::parse(&input)?;
                let balance = store.deposit(session, amount.value())?;
                output::success(&format!(
                    "{} has been deposited to your account.",
                    format_amount(symbol, amount.value())
                ));
                println!("\nYour current balance is: {}", format_amount(symbol, balance));
            }
            MenuChoice::Withdraw => {
                let Some(input) = prompter.text("Enter amount to withdraw")? else {
                    return Ok(Flow::EndOfInput);
                };
                let amount = Amount::parse(&input)?;
                let balance = store.withdraw(session, amount.value())?;
                output::success(&format!(
                    "{} has been withdrawn.",
                    format_amount(symbol, amount.value())
                ));
                println!("\nYour current balance is: {}", format_amount(symbol, balance));
            }
            MenuChoice::ChangePassword => {
                let Some(current) = prompter.secret("Enter your current password")? else {
                    return Ok(Flow::EndOfInput);
                };
                let Some(new_password) = prompter.secret("Enter a new password")? else {
                    return Ok(Flow::EndOfInput);
                };
                let Some(confirm) = prompter.secret("Confirm the new password")? else {
                    return Ok(Flow::EndOfInput);
                };
                store.change_password(session, &current, &new_password, &confirm)?;
                output::success("Password changed successfully.");
            }
            MenuChoice::MiniStatement => {
                let records = store.statement(session, STATEMENT_LIMIT)?;
                if records.is_empty() {
                    output::info("No transactions yet.");
                    return Ok(Flow::Continue);
                }

                let mut table = output::create_table();
                table.set_header(vec!["Time (UTC)", "Type", "Amount"]);
                for record in records {
                    table.add_row(vec![
                        record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                        record.kind.to_string(),
                        record
                            .amount
                            .map(|a| format_amount(symbol, a))
                            .unwrap_or_default(),
                    ]);
                }
                println!("{}", table);
            }
            MenuChoice::Logout => {}
        }

        Ok(Flow::Continue)
    }
}

fn display_menu() {
    println!("\n{}", "--- ATM Menu ---".bold());
    println!("1. Check Balance");
    println!("2. Deposit Money");
    println!("3. Withdraw Money");
    println!("4. Change Password");
    println!("5. Mini Statement");
    println!("0. Logout");
}
