use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime};

use crate::{
    Error, bank_account::parse_stored_decimal, banking::PlaidTransaction, database_id::DatabaseId,
};

/// A transaction on a linked bank account.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    /// The ID of the transaction in the database.
    pub id: DatabaseId,
    /// Plaid's ID for the transaction.
    pub plaid_transaction_id: String,
    /// The account the transaction belongs to.
    pub bank_account_id: DatabaseId,
    /// The signed amount, positive values are money moving out of the account.
    pub amount: Decimal,
    /// The currency code of the amount.
    pub currency: String,
    /// The merchant name or transaction description.
    pub name: Option<String>,
    /// Whether the transaction is still pending.
    pub pending: bool,
    /// The date the transaction was authorized.
    pub authorized_date: Option<Date>,
    /// The date and time the transaction was authorized.
    pub authorized_datetime: Option<OffsetDateTime>,
    /// The date the transaction posted.
    pub posted_date: Date,
    /// The date and time the transaction posted.
    pub posted_datetime: Option<OffsetDateTime>,
    /// The sync cursor the transaction was last written with.
    pub next_cursor: String,
}

/// The data needed to save a [TransactionRecord].
///
/// The account is referenced by Plaid's ID and resolved when saving.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransactionRecord {
    /// Plaid's ID for the transaction.
    pub plaid_transaction_id: String,
    /// Plaid's ID for the account the transaction belongs to.
    pub plaid_account_id: String,
    /// The signed amount, positive values are money moving out of the account.
    pub amount: Decimal,
    /// The currency code of the amount.
    pub currency: String,
    /// The merchant name or transaction description.
    pub name: Option<String>,
    /// Whether the transaction is still pending.
    pub pending: bool,
    /// The date the transaction was authorized.
    pub authorized_date: Option<Date>,
    /// The date and time the transaction was authorized.
    pub authorized_datetime: Option<OffsetDateTime>,
    /// The date the transaction posted.
    pub posted_date: Date,
    /// The date and time the transaction posted.
    pub posted_datetime: Option<OffsetDateTime>,
    /// The sync cursor the transaction was fetched with.
    pub next_cursor: String,
}

impl NewTransactionRecord {
    /// Map a transaction from Plaid to a record tagged with `next_cursor`.
    pub fn from_plaid_transaction(transaction: &PlaidTransaction, next_cursor: &str) -> Self {
        Self {
            plaid_transaction_id: transaction.transaction_id.clone(),
            plaid_account_id: transaction.account_id.clone(),
            amount: transaction.amount,
            currency: transaction.currency(),
            name: transaction.name.clone(),
            pending: transaction.pending,
            authorized_date: transaction.authorized_date,
            authorized_datetime: transaction.authorized_datetime,
            posted_date: transaction.date,
            posted_datetime: transaction.datetime,
            next_cursor: next_cursor.to_owned(),
        }
    }
}

pub fn create_bank_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bank_transaction (
            id INTEGER PRIMARY KEY,
            plaid_transaction_id TEXT NOT NULL UNIQUE,
            bank_account_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            currency TEXT NOT NULL,
            name TEXT,
            pending INTEGER NOT NULL DEFAULT 0,
            date_authorized TEXT,
            datetime_authorized TEXT,
            date_posted TEXT NOT NULL,
            datetime_posted TEXT,
            next_cursor TEXT NOT NULL,
            FOREIGN KEY(bank_account_id) REFERENCES bank_account(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    // Improve performance of listing an account's transactions.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_bank_transaction_account ON bank_transaction(bank_account_id)",
        (),
    )?;

    Ok(())
}

/// Insert or update transactions, matching existing rows on Plaid's transaction ID.
///
/// Transactions for accounts that have not been saved are skipped.
/// Does not open a transaction, the caller decides the unit of work.
///
/// Returns the number of transactions written.
pub fn save_all_transactions(
    records: &[NewTransactionRecord],
    connection: &Connection,
) -> Result<usize, Error> {
    let mut statement = connection.prepare(
        "INSERT INTO bank_transaction (
            plaid_transaction_id, bank_account_id, amount, currency, name, pending,
            date_authorized, datetime_authorized, date_posted, datetime_posted, next_cursor
        )
        SELECT ?1, id, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11
        FROM bank_account WHERE plaid_account_id = ?2
        ON CONFLICT(plaid_transaction_id) DO UPDATE SET
            bank_account_id = excluded.bank_account_id,
            amount = excluded.amount,
            currency = excluded.currency,
            name = excluded.name,
            pending = excluded.pending,
            date_authorized = excluded.date_authorized,
            datetime_authorized = excluded.datetime_authorized,
            date_posted = excluded.date_posted,
            datetime_posted = excluded.datetime_posted,
            next_cursor = excluded.next_cursor",
    )?;

    let mut written = 0;

    for record in records {
        let rows_affected = statement.execute(params![
            record.plaid_transaction_id,
            record.plaid_account_id,
            record.amount.to_string(),
            record.currency,
            record.name,
            record.pending,
            record.authorized_date,
            record.authorized_datetime,
            record.posted_date,
            record.posted_datetime,
            record.next_cursor,
        ])?;

        if rows_affected == 0 {
            tracing::warn!(
                "Skipped transaction {} for unknown account {}",
                record.plaid_transaction_id,
                record.plaid_account_id
            );
        }

        written += rows_affected;
    }

    Ok(written)
}

/// Delete transactions by Plaid's transaction IDs.
///
/// Returns the number of transactions deleted. Unknown IDs are ignored.
pub fn delete_transactions_by_plaid_ids(
    plaid_transaction_ids: &[String],
    connection: &Connection,
) -> Result<usize, Error> {
    let mut statement =
        connection.prepare("DELETE FROM bank_transaction WHERE plaid_transaction_id = ?1")?;

    let mut deleted = 0;
    for id in plaid_transaction_ids {
        deleted += statement.execute([id])?;
    }

    Ok(deleted)
}

/// The cursor to resume syncing a connection's transactions from.
///
/// Returns `None` if the connection has never been synced, in which case the
/// full history should be requested.
///
/// # Errors
/// Returns [Error::NotFound] if there is no connection with `bank_connection_id`.
pub fn latest_cursor_for_connection(
    bank_connection_id: DatabaseId,
    connection: &Connection,
) -> Result<Option<String>, Error> {
    connection
        .query_row(
            "SELECT transactions_cursor FROM bank_connection WHERE id = ?1",
            [bank_connection_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Store `next_cursor` as the connection's sync cursor and tag every stored
/// transaction of the connection with it.
///
/// The cursor is kept on the connection so that a sync that stores no
/// transactions still moves the connection forward.
///
/// Returns the number of transactions tagged.
///
/// # Errors
/// Returns [Error::NotFound] if there is no connection with `bank_connection_id`.
pub fn update_cursor_for_connection(
    bank_connection_id: DatabaseId,
    next_cursor: &str,
    connection: &Connection,
) -> Result<usize, Error> {
    let updated_connections = connection.execute(
        "UPDATE bank_connection SET transactions_cursor = ?1 WHERE id = ?2",
        params![next_cursor, bank_connection_id],
    )?;

    if updated_connections == 0 {
        return Err(Error::NotFound);
    }

    connection
        .execute(
            "UPDATE bank_transaction SET next_cursor = ?1
            WHERE bank_account_id IN (SELECT id FROM bank_account WHERE bank_connection_id = ?2)",
            params![next_cursor, bank_connection_id],
        )
        .map_err(Error::from)
}

/// A transaction row before the amount is parsed.
struct TransactionRow {
    id: DatabaseId,
    plaid_transaction_id: String,
    bank_account_id: DatabaseId,
    amount: String,
    currency: String,
    name: Option<String>,
    pending: bool,
    authorized_date: Option<Date>,
    authorized_datetime: Option<OffsetDateTime>,
    posted_date: Date,
    posted_datetime: Option<OffsetDateTime>,
    next_cursor: String,
}

fn map_row_to_transaction_row(row: &rusqlite::Row) -> Result<TransactionRow, rusqlite::Error> {
    Ok(TransactionRow {
        id: row.get(0)?,
        plaid_transaction_id: row.get(1)?,
        bank_account_id: row.get(2)?,
        amount: row.get(3)?,
        currency: row.get(4)?,
        name: row.get(5)?,
        pending: row.get(6)?,
        authorized_date: row.get(7)?,
        authorized_datetime: row.get(8)?,
        posted_date: row.get(9)?,
        posted_datetime: row.get(10)?,
        next_cursor: row.get(11)?,
    })
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = Error;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let amount = parse_stored_decimal(Some(row.amount))?.unwrap_or_default();

        Ok(TransactionRecord {
            id: row.id,
            plaid_transaction_id: row.plaid_transaction_id,
            bank_account_id: row.bank_account_id,
            amount,
            currency: row.currency,
            name: row.name,
            pending: row.pending,
            authorized_date: row.authorized_date,
            authorized_datetime: row.authorized_datetime,
            posted_date: row.posted_date,
            posted_datetime: row.posted_datetime,
            next_cursor: row.next_cursor,
        })
    }
}

const SELECT_TRANSACTION: &str = "SELECT id, plaid_transaction_id, bank_account_id, amount, \
    currency, name, pending, date_authorized, datetime_authorized, date_posted, datetime_posted, \
    next_cursor FROM bank_transaction";

/// Get all transactions, oldest first.
///
/// # Errors
/// Returns [Error::InvalidDecimal] if a stored amount cannot be parsed.
pub fn list_all_transactions(connection: &Connection) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(&format!("{SELECT_TRANSACTION} ORDER BY date_posted ASC, id ASC"))?
        .query_map([], map_row_to_transaction_row)?
        .map(|maybe_row| {
            maybe_row
                .map_err(Error::from)
                .and_then(TransactionRecord::try_from)
        })
        .collect()
}

/// Get the transactions of one account, oldest first.
///
/// # Errors
/// See [list_all_transactions].
pub fn list_transactions_for_account(
    bank_account_id: DatabaseId,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_TRANSACTION} WHERE bank_account_id = ?1 ORDER BY date_posted ASC, id ASC"
        ))?
        .query_map([bank_account_id], map_row_to_transaction_row)?
        .map(|maybe_row| {
            maybe_row
                .map_err(Error::from)
                .and_then(TransactionRecord::try_from)
        })
        .collect()
}

#[cfg(test)]
mod transaction_store_tests {
    use std::str::FromStr;

    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use time::macros::{date, datetime};

    use crate::{
        Error,
        bank_account::{AccountType, BankAccount, NewBankAccount, save_bank_account},
        bank_connection::{NewBankConnection, save_bank_connection},
        db::initialize,
        test_utils::plaid_transaction,
    };

    use super::{
        NewTransactionRecord, delete_transactions_by_plaid_ids, latest_cursor_for_connection,
        list_all_transactions, list_transactions_for_account, save_all_transactions,
        update_cursor_for_connection,
    };

    fn get_test_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        connection
    }

    fn insert_account(item_id: &str, account_id: &str, connection: &Connection) -> BankAccount {
        let bank_connection = save_bank_connection(
            &NewBankConnection {
                plaid_item_id: item_id.to_owned(),
                access_token: "access-1".to_owned(),
                consent_expiration_time: None,
                login_required: false,
            },
            connection,
        )
        .unwrap();

        save_bank_account(
            &NewBankAccount {
                plaid_account_id: account_id.to_owned(),
                bank_connection_id: bank_connection.id,
                name: "Checking".to_owned(),
                mask: None,
                account_type: AccountType::Depository,
                current_balance: None,
                available_balance: None,
                currency: "USD".to_owned(),
            },
            connection,
        )
        .unwrap()
    }

    fn record(transaction_id: &str, account_id: &str, cursor: &str) -> NewTransactionRecord {
        NewTransactionRecord::from_plaid_transaction(
            &plaid_transaction(transaction_id, account_id, date!(2024 - 02 - 01)),
            cursor,
        )
    }

    #[test]
    fn save_then_list_keeps_all_fields() {
        let connection = get_test_connection();
        let account = insert_account("item-1", "acc-1", &connection);
        let mut new_record = record("tx-1", "acc-1", "cursor-1");
        new_record.amount = Decimal::from_str("-1234.5678").unwrap();
        new_record.authorized_date = Some(date!(2024 - 01 - 30));
        new_record.authorized_datetime = Some(datetime!(2024-01-30 09:15:00 UTC));
        new_record.posted_datetime = Some(datetime!(2024-02-01 11:00:00 UTC));
        new_record.pending = true;

        let written = save_all_transactions(&[new_record.clone()], &connection).unwrap();

        assert_eq!(written, 1);
        let records = list_all_transactions(&connection).unwrap();
        assert_eq!(records.len(), 1);
        let got = &records[0];
        assert_eq!(got.plaid_transaction_id, "tx-1");
        assert_eq!(got.bank_account_id, account.id);
        assert_eq!(got.amount.to_string(), "-1234.5678");
        assert_eq!(got.currency, "USD");
        assert_eq!(got.name, new_record.name);
        assert!(got.pending);
        assert_eq!(got.authorized_date, new_record.authorized_date);
        assert_eq!(got.authorized_datetime, new_record.authorized_datetime);
        assert_eq!(got.posted_date, date!(2024 - 02 - 01));
        assert_eq!(got.posted_datetime, new_record.posted_datetime);
        assert_eq!(got.next_cursor, "cursor-1");
    }

    #[test]
    fn saving_again_updates_existing_transaction() {
        let connection = get_test_connection();
        insert_account("item-1", "acc-1", &connection);
        save_all_transactions(&[record("tx-1", "acc-1", "cursor-1")], &connection).unwrap();
        let mut modified = record("tx-1", "acc-1", "cursor-2");
        modified.amount = Decimal::from_str("99.99").unwrap();

        save_all_transactions(&[modified], &connection).unwrap();

        let records = list_all_transactions(&connection).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, Decimal::from_str("99.99").unwrap());
        assert_eq!(records[0].next_cursor, "cursor-2");
    }

    #[test]
    fn skips_transactions_for_unknown_accounts() {
        let connection = get_test_connection();
        insert_account("item-1", "acc-1", &connection);

        let written = save_all_transactions(
            &[
                record("tx-1", "acc-1", "cursor-1"),
                record("tx-2", "acc-unknown", "cursor-1"),
            ],
            &connection,
        )
        .unwrap();

        assert_eq!(written, 1);
        assert_eq!(list_all_transactions(&connection).unwrap().len(), 1);
    }

    #[test]
    fn lists_transactions_for_one_account() {
        let connection = get_test_connection();
        insert_account("item-1", "acc-1", &connection);
        let second = insert_account("item-2", "acc-2", &connection);
        save_all_transactions(
            &[
                record("tx-1", "acc-1", "cursor-1"),
                record("tx-2", "acc-2", "cursor-1"),
            ],
            &connection,
        )
        .unwrap();

        let records = list_transactions_for_account(second.id, &connection).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plaid_transaction_id, "tx-2");
    }

    #[test]
    fn deletes_by_plaid_ids() {
        let connection = get_test_connection();
        insert_account("item-1", "acc-1", &connection);
        save_all_transactions(
            &[
                record("tx-1", "acc-1", "cursor-1"),
                record("tx-2", "acc-1", "cursor-1"),
            ],
            &connection,
        )
        .unwrap();

        let deleted = delete_transactions_by_plaid_ids(
            &["tx-1".to_owned(), "tx-unknown".to_owned()],
            &connection,
        )
        .unwrap();

        assert_eq!(deleted, 1);
        let records = list_all_transactions(&connection).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].plaid_transaction_id, "tx-2");
    }

    #[test]
    fn cursor_is_none_before_first_sync() {
        let connection = get_test_connection();
        let account = insert_account("item-1", "acc-1", &connection);

        assert_eq!(
            latest_cursor_for_connection(account.bank_connection_id, &connection),
            Ok(None)
        );
    }

    #[test]
    fn cursor_is_kept_without_stored_transactions() {
        let connection = get_test_connection();
        let account = insert_account("item-1", "acc-1", &connection);

        let updated =
            update_cursor_for_connection(account.bank_connection_id, "cursor-1", &connection)
                .unwrap();

        assert_eq!(updated, 0);
        assert_eq!(
            latest_cursor_for_connection(account.bank_connection_id, &connection),
            Ok(Some("cursor-1".to_owned()))
        );
    }

    #[test]
    fn cursor_of_unknown_connection_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(
            latest_cursor_for_connection(42, &connection),
            Err(Error::NotFound)
        );
        assert_eq!(
            update_cursor_for_connection(42, "cursor-1", &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn cursor_is_updated_for_whole_connection() {
        let connection = get_test_connection();
        let account = insert_account("item-1", "acc-1", &connection);
        save_all_transactions(
            &[
                record("tx-1", "acc-1", "cursor-1"),
                record("tx-2", "acc-1", "cursor-1"),
            ],
            &connection,
        )
        .unwrap();

        let updated =
            update_cursor_for_connection(account.bank_connection_id, "cursor-2", &connection)
                .unwrap();

        assert_eq!(updated, 2);
        assert_eq!(
            latest_cursor_for_connection(account.bank_connection_id, &connection),
            Ok(Some("cursor-2".to_owned()))
        );
    }

    #[test]
    fn list_fails_on_invalid_stored_amount() {
        let connection = get_test_connection();
        let account = insert_account("item-1", "acc-1", &connection);
        connection
            .execute(
                "INSERT INTO bank_transaction (plaid_transaction_id, bank_account_id, amount, currency, date_posted, next_cursor)
                VALUES ('tx-1', ?1, 'NaN dollars', 'USD', '2024-02-01', 'cursor-1')",
                [account.id],
            )
            .unwrap();

        assert_eq!(
            list_all_transactions(&connection),
            Err(Error::InvalidDecimal("NaN dollars".to_owned()))
        );
    }
}
