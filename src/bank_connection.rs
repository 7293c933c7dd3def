//! Storage for linked Plaid items, one row per linked institution.

use std::fmt;

use rusqlite::{Connection, params};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId};

/// A linked institution.
#[derive(Clone, PartialEq)]
pub struct BankConnection {
    /// The ID of the connection in the database.
    pub id: DatabaseId,
    /// Plaid's ID for the item.
    pub plaid_item_id: String,
    /// The secret for requesting data about the item from Plaid.
    pub access_token: String,
    /// When the user's consent expires, if the institution requires renewal.
    pub consent_expiration_time: Option<OffsetDateTime>,
    /// Whether the user must log in to the institution again via Plaid Link.
    pub login_required: bool,
}

/// The data needed to save a new [BankConnection].
#[derive(Clone, PartialEq)]
pub struct NewBankConnection {
    /// Plaid's ID for the item.
    pub plaid_item_id: String,
    /// The secret for requesting data about the item from Plaid.
    pub access_token: String,
    /// When the user's consent expires, if the institution requires renewal.
    pub consent_expiration_time: Option<OffsetDateTime>,
    /// Whether the user must log in to the institution again via Plaid Link.
    pub login_required: bool,
}

impl fmt::Debug for BankConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BankConnection")
            .field("id", &self.id)
            .field("plaid_item_id", &self.plaid_item_id)
            .field("access_token", &"********")
            .field("consent_expiration_time", &self.consent_expiration_time)
            .field("login_required", &self.login_required)
            .finish()
    }
}

impl fmt::Debug for NewBankConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewBankConnection")
            .field("plaid_item_id", &self.plaid_item_id)
            .field("access_token", &"********")
            .field("consent_expiration_time", &self.consent_expiration_time)
            .field("login_required", &self.login_required)
            .finish()
    }
}

pub fn create_bank_connection_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bank_connection (
            id INTEGER PRIMARY KEY,
            plaid_item_id TEXT NOT NULL UNIQUE,
            access_token TEXT NOT NULL,
            consent_expiration_time TEXT,
            login_required INTEGER NOT NULL DEFAULT 0,
            transactions_cursor TEXT
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_bank_connection(row: &rusqlite::Row) -> Result<BankConnection, rusqlite::Error> {
    Ok(BankConnection {
        id: row.get(0)?,
        plaid_item_id: row.get(1)?,
        access_token: row.get(2)?,
        consent_expiration_time: row.get(3)?,
        login_required: row.get(4)?,
    })
}

/// Insert a bank connection.
///
/// Does not open a transaction, the caller decides whether the insert is part
/// of a larger unit of work.
///
/// # Errors
/// Returns [Error::SqlError] if the insert fails, e.g. because the item has
/// already been saved.
pub fn save_bank_connection(
    new_connection: &NewBankConnection,
    connection: &Connection,
) -> Result<BankConnection, Error> {
    connection.execute(
        "INSERT INTO bank_connection (plaid_item_id, access_token, consent_expiration_time, login_required)
        VALUES (?1, ?2, ?3, ?4)",
        params![
            new_connection.plaid_item_id,
            new_connection.access_token,
            new_connection.consent_expiration_time,
            new_connection.login_required,
        ],
    )?;

    let id = connection.last_insert_rowid();

    Ok(BankConnection {
        id,
        plaid_item_id: new_connection.plaid_item_id.clone(),
        access_token: new_connection.access_token.clone(),
        consent_expiration_time: new_connection.consent_expiration_time,
        login_required: new_connection.login_required,
    })
}

/// Get a bank connection by its ID.
///
/// # Errors
/// Returns [Error::NotFound] if there is no connection with `id`.
pub fn get_bank_connection(
    id: DatabaseId,
    connection: &Connection,
) -> Result<BankConnection, Error> {
    connection
        .query_row(
            "SELECT id, plaid_item_id, access_token, consent_expiration_time, login_required
            FROM bank_connection WHERE id = :id",
            &[(":id", &id)],
            map_row_to_bank_connection,
        )
        .map_err(Error::from)
}

/// Get all bank connections ordered by ID.
pub fn list_all_bank_connections(connection: &Connection) -> Result<Vec<BankConnection>, Error> {
    connection
        .prepare(
            "SELECT id, plaid_item_id, access_token, consent_expiration_time, login_required
            FROM bank_connection ORDER BY id ASC",
        )?
        .query_map([], map_row_to_bank_connection)?
        .map(|maybe_connection| maybe_connection.map_err(Error::from))
        .collect()
}
