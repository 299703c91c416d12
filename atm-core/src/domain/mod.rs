//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O.

mod account;
pub mod amount;
pub mod password;
pub mod result;
mod session;
mod transaction;

pub use account::{Account, AccountId};
pub use amount::Amount;
pub use password::{Argon2Params, PasswordHash, PasswordMismatch};
pub use session::Session;
pub use transaction::{TransactionKind, TransactionRecord};
