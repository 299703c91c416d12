//! Repository port - database abstraction

use rust_decimal::Decimal;

use crate::domain::result::Result;
use crate::domain::{Account, AccountId, Amount, PasswordHash, TransactionRecord};

/// Account and transaction-log storage
///
/// Every mutating method writes its transaction-log row in the same
/// database transaction as the change it records: either both are
/// persisted or neither is.
pub trait Repository: Send + Sync {
    // === Schema ===

    /// Run any pending migrations
    fn ensure_schema(&self) -> Result<()>;

    // === Accounts ===

    /// Insert a new account. Fails with a validation error if the
    /// username is taken.
    fn insert_account(
        &self,
        username: &str,
        password_hash: &PasswordHash,
        balance: Decimal,
    ) -> Result<Account>;

    /// Look an account up by exact username
    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>>;

    /// Get account by ID
    fn get_account(&self, id: AccountId) -> Result<Option<Account>>;

    /// Current balance of an account
    fn get_balance(&self, id: AccountId) -> Result<Decimal>;

    // === Mutations (each logged atomically) ===

    /// Add `amount` to the balance and log a deposit. Returns the new balance.
    fn credit(&self, id: AccountId, amount: Amount) -> Result<Decimal>;

    /// Subtract `amount` if the balance covers it and log a withdrawal.
    /// Returns the new balance, or `InsufficientFunds` with nothing written.
    fn debit(&self, id: AccountId, amount: Amount) -> Result<Decimal>;

    /// Replace the stored password hash and log a password change
    fn update_password_hash(&self, id: AccountId, password_hash: &PasswordHash) -> Result<()>;

    // === Transaction log ===

    /// Most recent log rows for an account, newest first
    fn get_transactions(&self, id: AccountId, limit: usize) -> Result<Vec<TransactionRecord>>;
}
