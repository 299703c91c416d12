//! Authenticated session

use super::account::{Account, AccountId};

/// The account bound to the current interactive run.
///
/// Only [`crate::services::AccountStore::authenticate`] hands these out, and
/// every account operation takes one. Dropping it is logging out.
#[derive(Debug, Clone)]
pub struct Session {
    account_id: AccountId,
    username: String,
}

impl Session {
    pub(crate) fn for_account(account: &Account) -> Self {
        Self {
            account_id: account.id,
            username: account.username.clone(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}
