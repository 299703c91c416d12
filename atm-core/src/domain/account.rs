//! Account domain model

use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::password::PasswordHash;
use super::result::{Error, Result};

/// Database identifier of an account (`users.user_id`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user's stored identity and balance
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
    pub balance: Decimal,
    /// UTC
    pub created_at: NaiveDateTime,
}

impl Account {
    /// Normalize a username for storage and lookup
    pub fn normalize_username(username: &str) -> String {
        username.trim().to_string()
    }

    /// Validate a (normalized) username
    pub fn validate_username(username: &str) -> Result<()> {
        if username.is_empty() {
            return Err(Error::validation("username cannot be empty"));
        }
        if username.chars().any(char::is_whitespace) {
            return Err(Error::validation("username cannot contain whitespace"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_username_normalization() {
        assert_eq!(Account::normalize_username("  alice "), "alice");
    }

    #[test]
    fn test_username_validation() {
        assert!(Account::validate_username("alice").is_ok());
        assert!(matches!(Account::validate_username(""), Err(Error::Validation(_))));
        assert!(matches!(Account::validate_username("al ice"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_serialization_skips_password() {
        let account = Account {
            id: AccountId::new(7),
            username: "alice".to_string(),
            password_hash: PasswordHash::from_stored("$argon2id$secret"),
            balance: Decimal::new(100000, 2),
            created_at: Utc::now().naive_utc(),
        };

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["username"], "alice");
        assert!(json.get("password_hash").is_none());
    }
}
