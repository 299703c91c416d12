//! Account store - authentication and balance operations
//!
//! Every operation except `authenticate` and `open_account` takes the
//! [`Session`] returned by a successful login.

use std::sync::{Arc, OnceLock};

use rust_decimal::Decimal;

use crate::domain::amount::check_opening_balance;
use crate::domain::password::check_new_password;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Account, Amount, Argon2Params, PasswordHash, PasswordMismatch, Session, TransactionRecord,
};
use crate::ports::Repository;

/// Password the dummy hash is built from. Never stored.
const DUMMY_PASSWORD: &str = "atm-dummy-password";

/// Service for the ATM's account operations
pub struct AccountStore {
    repository: Arc<dyn Repository>,
    hashing: Argon2Params,
    min_password_length: usize,
    /// Verified against when the username is unknown, so both failure
    /// paths do the same Argon2 work
    dummy_hash: OnceLock<PasswordHash>,
}

impl AccountStore {
    pub fn new(
        repository: Arc<dyn Repository>,
        hashing: Argon2Params,
        min_password_length: usize,
    ) -> Self {
        Self {
            repository,
            hashing,
            min_password_length,
            dummy_hash: OnceLock::new(),
        }
    }

    /// Log in with an exact username and password. Unknown usernames and
    /// wrong passwords fail identically.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Session> {
        match self.repository.find_account_by_username(username)? {
            Some(account) if account.password_hash.verify(password) => {
                Ok(Session::for_account(&account))
            }
            Some(_) => Err(Error::AuthFailure),
            None => {
                self.dummy_hash()?.verify(password);
                Err(Error::AuthFailure)
            }
        }
    }

    pub fn get_balance(&self, session: &Session) -> Result<Decimal> {
        self.repository.get_balance(session.account_id())
    }

    /// Deposit `amount`, returning the new balance
    pub fn deposit(&self, session: &Session, amount: Decimal) -> Result<Decimal> {
        let amount = Amount::new(amount)?;
        self.repository.credit(session.account_id(), amount)
    }

    /// Withdraw `amount`, returning the new balance. Fails with
    /// `InsufficientFunds` and changes nothing when the balance is short.
    pub fn withdraw(&self, session: &Session, amount: Decimal) -> Result<Decimal> {
        let amount = Amount::new(amount)?;
        self.repository.debit(session.account_id(), amount)
    }

    /// Replace the password after checking the current one.
    ///
    /// The current password is checked against the stored hash, not the
    /// state at login.
    pub fn change_password(
        &self,
        session: &Session,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        let account = self
            .repository
            .get_account(session.account_id())?
            .ok_or_else(|| Error::not_found(format!("account {}", session.account_id())))?;

        if !account.password_hash.verify(old_password) {
            return Err(Error::PasswordMismatch(PasswordMismatch::CurrentIncorrect));
        }
        check_new_password(new_password, confirm_password, self.min_password_length)?;

        let hash = PasswordHash::from_raw_password(new_password, &self.hashing)?;
        self.repository.update_password_hash(account.id, &hash)
    }

    /// Create a new account
    pub fn open_account(
        &self,
        username: &str,
        password: &str,
        confirm_password: &str,
        initial_balance: Decimal,
    ) -> Result<Account> {
        let username = Account::normalize_username(username);
        Account::validate_username(&username)?;
        check_new_password(password, confirm_password, self.min_password_length)?;
        let balance = check_opening_balance(initial_balance)?;

        let hash = PasswordHash::from_raw_password(password, &self.hashing)?;
        self.repository.insert_account(&username, &hash, balance)
    }

    /// The last `limit` transaction-log rows for the session's account,
    /// newest first
    pub fn statement(&self, session: &Session, limit: usize) -> Result<Vec<TransactionRecord>> {
        self.repository.get_transactions(session.account_id(), limit)
    }

    fn dummy_hash(&self) -> Result<&PasswordHash> {
        if let Some(hash) = self.dummy_hash.get() {
            return Ok(hash);
        }
        let hash = PasswordHash::from_raw_password(DUMMY_PASSWORD, &self.hashing)?;
        Ok(self.dummy_hash.get_or_init(|| hash))
    }
}
