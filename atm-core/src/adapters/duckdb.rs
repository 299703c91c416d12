//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDateTime, Utc};
use duckdb::{params, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::amount::MAX_AMOUNT;
use crate::domain::{
    Account, AccountId, Amount, PasswordHash, TransactionKind, TransactionRecord,
};
use crate::ports::Repository;
use crate::services::{MigrationResult, MigrationService};

/// Format used to bind timestamps. DuckDB casts it to TIMESTAMP and
/// casts TIMESTAMP back to VARCHAR in the same shape.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const ACCOUNT_COLUMNS: &str = "CAST(user_id AS BIGINT), username, password, \
                               balance::VARCHAR, created_at::VARCHAR";

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) the database file at `db_path`
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = Self::open_connection(db_path).map_err(|e| {
            Error::Connection(format!("could not open {}: {}", db_path.display(), e))
        })?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path.to_path_buf()),
        })
    }

    /// Throwaway in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Connection(format!("could not open in-memory database: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off; nothing here needs ICU or httpfs
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Path of the database file, `None` when in memory
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn)
            .run_pending()
            .map_err(|e| Error::database(format!("migration failed: {:#}", e)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("connection lock poisoned: {}", e)))
    }

    fn query_account(conn: &Connection, filter: &str, key: &dyn duckdb::ToSql) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM users WHERE {} = ?", ACCOUNT_COLUMNS, filter);
        let row = conn.query_row(&sql, [key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        });

        match row {
            Ok((id, username, password, balance, created_at)) => Ok(Some(Account {
                id: AccountId::new(id),
                username,
                password_hash: PasswordHash::from_stored(password),
                balance: parse_decimal(&balance)?,
                created_at: parse_timestamp(&created_at)?,
            })),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_balance(conn: &Connection, id: AccountId) -> Result<Decimal> {
        let balance = conn.query_row(
            "SELECT balance::VARCHAR FROM users WHERE user_id = ?",
            [id.as_i64()],
            |row| row.get::<_, String>(0),
        );

        match balance {
            Ok(balance) => parse_decimal(&balance),
            Err(duckdb::Error::QueryReturnedNoRows) => {
                Err(Error::not_found(format!("account {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a transaction-log row on the caller's (transaction) connection
    fn append_log(
        conn: &Connection,
        id: AccountId,
        kind: TransactionKind,
        amount: Option<Amount>,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO transactions (user_id, transaction_type, amount, created_at)
             VALUES (?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS TIMESTAMP))",
            params![
                id.as_i64(),
                kind.as_str(),
                amount.map(|a| a.value().to_string()),
                now_timestamp(),
            ],
        )
        .map_err(|e| Error::LoggingFailure(e.to_string()))?;
        Ok(())
    }
}

impl Repository for DuckDbRepository {
    fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    fn insert_account(
        &self,
        username: &str,
        password_hash: &PasswordHash,
        balance: Decimal,
    ) -> Result<Account> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let taken: i64 = tx.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?",
            [username],
            |row| row.get(0),
        )?;
        if taken > 0 {
            return Err(Error::validation(format!("username '{}' is already taken", username)));
        }

        let id: i64 = tx.query_row("SELECT CAST(nextval('seq_user_id') AS BIGINT)", [], |row| {
            row.get(0)
        })?;

        tx.execute(
            "INSERT INTO users (user_id, username, password, balance, created_at)
             VALUES (?, ?, ?, CAST(? AS DECIMAL(18, 2)), CAST(? AS TIMESTAMP))",
            params![
                id,
                username,
                password_hash.as_str(),
                balance.to_string(),
                now_timestamp(),
            ],
        )
        .map_err(|e| {
            let msg = e.to_string();
            if msg.to_lowercase().contains("duplicate key") {
                Error::validation(format!("username '{}' is already taken", username))
            } else {
                Error::database(msg)
            }
        })?;

        let account = Self::query_account(&tx, "user_id", &id)?
            .ok_or_else(|| Error::database("inserted account could not be read back"))?;
        tx.commit()?;

        Ok(account)
    }

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::query_account(&conn, "username", &username)
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let conn = self.lock()?;
        Self::query_account(&conn, "user_id", &id.as_i64())
    }

    fn get_balance(&self, id: AccountId) -> Result<Decimal> {
        let conn = self.lock()?;
        Self::read_balance(&conn, id)
    }

    fn credit(&self, id: AccountId, amount: Amount) -> Result<Decimal> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let amount_str = amount.value().to_string();
        let max_str = MAX_AMOUNT.to_string();

        // The guard keeps the sum inside DECIMAL(18, 2)
        let updated = tx.execute(
            "UPDATE users SET balance = balance + CAST(? AS DECIMAL(18, 2))
             WHERE user_id = ? AND balance <= CAST(? AS DECIMAL(18, 2)) - CAST(? AS DECIMAL(18, 2))",
            params![amount_str, id.as_i64(), max_str, amount_str],
        )?;
        if updated == 0 {
            // Either the account is missing (NotFound) or the sum is too large
            let balance = Self::read_balance(&tx, id)?;
            return Err(Error::invalid_amount(format!(
                "depositing {} would take the balance {} above the maximum of {}",
                amount, balance, MAX_AMOUNT
            )));
        }

        let balance = Self::read_balance(&tx, id)?;
        Self::append_log(&tx, id, TransactionKind::Deposit, Some(amount))?;
        tx.commit()?;

        Ok(balance)
    }

    fn debit(&self, id: AccountId, amount: Amount) -> Result<Decimal> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let amount_str = amount.value().to_string();

        // The guard makes check-and-decrement a single statement
        let updated = tx.execute(
            "UPDATE users SET balance = balance - CAST(? AS DECIMAL(18, 2))
             WHERE user_id = ? AND balance >= CAST(? AS DECIMAL(18, 2))",
            params![amount_str, id.as_i64(), amount_str],
        )?;
        if updated == 0 {
            // Either the account is missing (NotFound) or the balance is short
            let balance = Self::read_balance(&tx, id)?;
            return Err(Error::InsufficientFunds {
                balance,
                requested: amount.value(),
            });
        }

        let balance = Self::read_balance(&tx, id)?;
        Self::append_log(&tx, id, TransactionKind::Withdraw, Some(amount))?;
        tx.commit()?;

        Ok(balance)
    }

    fn update_password_hash(&self, id: AccountId, password_hash: &PasswordHash) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE users SET password = ? WHERE user_id = ?",
            params![password_hash.as_str(), id.as_i64()],
        )?;
        if updated != 1 {
            return Err(Error::not_found(format!("account {}", id)));
        }

        Self::append_log(&tx, id, TransactionKind::PasswordChange, None)?;
        tx.commit()?;

        Ok(())
    }

    fn get_transactions(&self, id: AccountId, limit: usize) -> Result<Vec<TransactionRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT transaction_id, CAST(user_id AS BIGINT), transaction_type,
                    amount::VARCHAR, created_at::VARCHAR
             FROM transactions
             WHERE user_id = ?
             ORDER BY created_at DESC, transaction_id DESC
             LIMIT ?",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![id.as_i64(), limit], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (tx_id, user_id, kind, amount, created_at) = row?;
            records.push(TransactionRecord {
                id: tx_id,
                account_id: AccountId::new(user_id),
                kind: kind.parse::<TransactionKind>().map_err(Error::Database)?,
                amount: amount.as_deref().map(parse_decimal).transpose()?,
                created_at: parse_timestamp(&created_at)?,
            });
        }

        Ok(records)
    }
}

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s.trim())
        .map_err(|e| Error::database(format!("invalid decimal '{}': {}", s, e)))
}

/// Parse a TIMESTAMP cast to VARCHAR ("2024-01-15 10:30:00" or with fraction)
fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| Error::database(format!("invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> DuckDbRepository {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        repo
    }

    fn hash() -> PasswordHash {
        PasswordHash::from_stored("$argon2id$v=19$m=8,t=1,p=1$c2FsdHNhbHQ$aGFzaA")
    }

    fn amount(cents: i64) -> Amount {
        Amount::new(Decimal::new(cents, 2)).unwrap()
    }

    #[test]
    fn test_parse_timestamp() {
        assert!(parse_timestamp("2024-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("2024-01-15 10:30:00.123456").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("1250.50").unwrap(), Decimal::new(125050, 2));
        assert!(parse_decimal("abc").is_err());
    }

    #[test]
    fn test_timestamp_survives_round_trip() {
        let formatted = now_timestamp();
        assert!(parse_timestamp(&formatted).is_ok());
    }

    #[test]
    fn test_insert_and_find_account() {
        let repo = repo();
        let account = repo
            .insert_account("alice", &hash(), Decimal::new(100000, 2))
            .unwrap();

        assert_eq!(account.username, "alice");
        assert_eq!(account.balance, Decimal::new(100000, 2));

        let found = repo.find_account_by_username("alice").unwrap().unwrap();
        assert_eq!(found.id, account.id);
        assert_eq!(found.password_hash, hash());

        assert!(repo.find_account_by_username("bob").unwrap().is_none());
        assert!(repo.get_account(AccountId::new(999)).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let repo = repo();
        repo.insert_account("alice", &hash(), Decimal::ZERO).unwrap();

        let result = repo.insert_account("alice", &hash(), Decimal::ZERO);
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_credit_logs_in_same_transaction() {
        let repo = repo();
        let account = repo
            .insert_account("alice", &hash(), Decimal::new(100000, 2))
            .unwrap();

        let balance = repo.credit(account.id, amount(25050)).unwrap();
        assert_eq!(balance, Decimal::new(125050, 2));

        let log = repo.get_transactions(account.id, 10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, TransactionKind::Deposit);
        assert_eq!(log[0].amount, Some(Decimal::new(25050, 2)));
    }

    #[test]
    fn test_debit_guarded_by_balance() {
        let repo = repo();
        let account = repo
            .insert_account("alice", &hash(), Decimal::new(10000, 2))
            .unwrap();

        let result = repo.debit(account.id, amount(10001));
        match result {
            Err(Error::InsufficientFunds { balance, requested }) => {
                assert_eq!(balance, Decimal::new(10000, 2));
                assert_eq!(requested, Decimal::new(10001, 2));
            }
            other => panic!("expected InsufficientFunds, got {:?}", other),
        }
        assert!(repo.get_transactions(account.id, 10).unwrap().is_empty());

        // Withdrawing the exact balance is allowed
        let balance = repo.debit(account.id, amount(10000)).unwrap();
        assert_eq!(balance, Decimal::ZERO);
    }

    #[test]
    fn test_credit_past_column_maximum_is_rejected() {
        let repo = repo();
        let account = repo
            .insert_account("alice", &hash(), Decimal::new(10000, 2))
            .unwrap();

        let result = repo.credit(account.id, Amount::new(MAX_AMOUNT).unwrap());
        assert!(matches!(result, Err(Error::InvalidAmount(_))));
        assert!(result.unwrap_err().is_recoverable());
        assert_eq!(repo.get_balance(account.id).unwrap(), Decimal::new(10000, 2));
        assert!(repo.get_transactions(account.id, 10).unwrap().is_empty());

        // Topping up to exactly the maximum is fine
        let top_up = Amount::new(MAX_AMOUNT - Decimal::new(10000, 2)).unwrap();
        assert_eq!(repo.credit(account.id, top_up).unwrap(), MAX_AMOUNT);
        assert!(matches!(repo.credit(account.id, amount(1)), Err(Error::InvalidAmount(_))));
    }

    #[test]
    fn test_debit_of_maximum_amount_is_insufficient_funds() {
        let repo = repo();
        let account = repo
            .insert_account("alice", &hash(), Decimal::new(10000, 2))
            .unwrap();

        let result = repo.debit(account.id, Amount::new(MAX_AMOUNT).unwrap());
        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(repo.get_balance(account.id).unwrap(), Decimal::new(10000, 2));
    }

    #[test]
    fn test_transactions_with_unbounded_limit() {
        let repo = repo();
        let account = repo.insert_account("alice", &hash(), Decimal::ZERO).unwrap();
        repo.credit(account.id, amount(100)).unwrap();

        let log = repo.get_transactions(account.id, usize::MAX).unwrap();
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_mutations_on_missing_account() {
        let repo = repo();
        let missing = AccountId::new(42);

        assert!(matches!(repo.credit(missing, amount(100)), Err(Error::NotFound(_))));
        assert!(matches!(repo.debit(missing, amount(100)), Err(Error::NotFound(_))));
        assert!(matches!(
            repo.update_password_hash(missing, &hash()),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(repo.get_balance(missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_failed_log_insert_rolls_back_mutation() {
        let repo = repo();
        let account = repo
            .insert_account("alice", &hash(), Decimal::new(10000, 2))
            .unwrap();

        // Make every log insert fail
        repo.lock()
            .unwrap()
            .execute_batch("DROP INDEX idx_transactions_user_id; DROP TABLE transactions;")
            .unwrap();

        let result = repo.credit(account.id, amount(500));
        assert!(matches!(result, Err(Error::LoggingFailure(_))));
        assert_eq!(repo.get_balance(account.id).unwrap(), Decimal::new(10000, 2));
    }

    #[test]
    fn test_password_change_logged_without_amount() {
        let repo = repo();
        let account = repo.insert_account("alice", &hash(), Decimal::ZERO).unwrap();
        let new_hash = PasswordHash::from_stored("$argon2id$other");

        repo.update_password_hash(account.id, &new_hash).unwrap();

        let stored = repo.get_account(account.id).unwrap().unwrap();
        assert_eq!(stored.password_hash, new_hash);

        let log = repo.get_transactions(account.id, 10).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind, TransactionKind::PasswordChange);
        assert_eq!(log[0].amount, None);
    }

    #[test]
    fn test_transactions_newest_first_and_limited() {
        let repo = repo();
        let account = repo.insert_account("alice", &hash(), Decimal::ZERO).unwrap();

        for cents in [100, 200, 300] {
            repo.credit(account.id, amount(cents)).unwrap();
        }

        let log = repo.get_transactions(account.id, 2).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].amount, Some(Decimal::new(300, 2)));
        assert_eq!(log[1].amount, Some(Decimal::new(200, 2)));
    }
}
