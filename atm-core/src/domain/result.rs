//! Result and error types for the core library

use rust_decimal::Decimal;
use thiserror::Error;

use super::password::PasswordMismatch;

/// Core library error type
///
/// Variants up to `LoggingFailure` are the ones a session can recover from
/// or must report; the rest are internal failures.
#[derive(Error, Debug)]
pub enum Error {
    /// The database could not be opened. Fatal at startup.
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Unknown username or wrong password. Deliberately does not say which.
    #[error("Invalid username or password")]
    AuthFailure,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: requested {requested}, available {balance}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("{0}")]
    PasswordMismatch(PasswordMismatch),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Writing the transaction log row failed. The mutation it belonged to
    /// was rolled back.
    #[error("Failed to record transaction: {0}")]
    LoggingFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an invalid amount error
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    /// True for errors the interactive session reports and then carries on from
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::AuthFailure
                | Error::InvalidAmount(_)
                | Error::InsufficientFunds { .. }
                | Error::PasswordMismatch(_)
                | Error::Validation(_)
                | Error::LoggingFailure(_)
        )
    }
}

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failure_message_does_not_name_a_field() {
        let msg = Error::AuthFailure.to_string();
        assert_eq!(msg, "Invalid username or password");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(Error::AuthFailure.is_recoverable());
        assert!(Error::invalid_amount("zero").is_recoverable());
        assert!(Error::InsufficientFunds {
            balance: Decimal::new(100, 2),
            requested: Decimal::new(200, 2),
        }
        .is_recoverable());
        assert!(Error::PasswordMismatch(PasswordMismatch::ConfirmationDiffers).is_recoverable());

        assert!(!Error::Connection("locked".into()).is_recoverable());
        assert!(!Error::database("boom").is_recoverable());
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = Error::InsufficientFunds {
            balance: Decimal::new(125050, 2),
            requested: Decimal::new(2000, 0),
        };
        let msg = err.to_string();
        assert!(msg.contains("1250.50"));
        assert!(msg.contains("2000"));
    }
}
