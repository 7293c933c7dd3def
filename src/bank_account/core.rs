use std::{fmt, str::FromStr};

use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use crate::{Error, banking::PlaidAccount, database_id::DatabaseId};

/// The kind of account as reported by Plaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    /// An investment or retirement account.
    Investment,
    /// A credit card.
    Credit,
    /// A checking or savings account.
    Depository,
    /// A loan, e.g. a mortgage.
    Loan,
    /// A brokerage account.
    Brokerage,
    /// Anything else.
    Other,
}

impl AccountType {
    /// Every account type.
    pub const ALL: [AccountType; 6] = [
        AccountType::Investment,
        AccountType::Credit,
        AccountType::Depository,
        AccountType::Loan,
        AccountType::Brokerage,
        AccountType::Other,
    ];

    /// The name Plaid and the database use for the account type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Investment => "investment",
            AccountType::Credit => "credit",
            AccountType::Depository => "depository",
            AccountType::Loan => "loan",
            AccountType::Brokerage => "brokerage",
            AccountType::Other => "other",
        }
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountType::ALL
            .into_iter()
            .find(|account_type| account_type.as_str() == s)
            .ok_or_else(|| Error::InvalidAccountType(s.to_owned()))
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account under a [BankConnection](crate::BankConnection).
#[derive(Debug, Clone, PartialEq)]
pub struct BankAccount {
    /// The ID of the account in the database.
    pub id: DatabaseId,
    /// Plaid's ID for the account.
    pub plaid_account_id: String,
    /// The connection the account belongs to.
    pub bank_connection_id: DatabaseId,
    /// The name of the account.
    pub name: String,
    /// The last 2-4 digits of the account number.
    pub mask: Option<String>,
    /// The kind of account.
    pub account_type: AccountType,
    /// The total amount of funds in or owed by the account.
    pub current_balance: Option<Decimal>,
    /// The amount of funds available to be withdrawn.
    pub available_balance: Option<Decimal>,
    /// The currency code of the balances.
    pub currency: String,
}

/// The data needed to save a new [BankAccount].
#[derive(Debug, Clone, PartialEq)]
pub struct NewBankAccount {
    /// Plaid's ID for the account.
    pub plaid_account_id: String,
    /// The connection the account belongs to.
    pub bank_connection_id: DatabaseId,
    /// The name of the account.
    pub name: String,
    /// The last 2-4 digits of the account number.
    pub mask: Option<String>,
    /// The kind of account.
    pub account_type: AccountType,
    /// The total amount of funds in or owed by the account.
    pub current_balance: Option<Decimal>,
    /// The amount of funds available to be withdrawn.
    pub available_balance: Option<Decimal>,
    /// The currency code of the balances.
    pub currency: String,
}

impl NewBankAccount {
    /// Map an account fetched from Plaid to a new account under `bank_connection_id`.
    ///
    /// # Errors
    /// Returns [Error::InvalidAccountType] if Plaid sent an unknown account type.
    pub fn from_plaid_account(
        account: &PlaidAccount,
        bank_connection_id: DatabaseId,
    ) -> Result<Self, Error> {
        Ok(Self {
            plaid_account_id: account.account_id.clone(),
            bank_connection_id,
            name: account.name.clone(),
            mask: account.mask.clone(),
            account_type: account.account_type.parse()?,
            current_balance: account.balances.current,
            available_balance: account.balances.available,
            currency: account.balances.currency(),
        })
    }
}

pub fn create_bank_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS bank_account (
            id INTEGER PRIMARY KEY,
            plaid_account_id TEXT NOT NULL UNIQUE,
            bank_connection_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            mask TEXT,
            account_type TEXT NOT NULL,
            current_balance TEXT,
            available_balance TEXT,
            currency TEXT NOT NULL,
            FOREIGN KEY(bank_connection_id) REFERENCES bank_connection(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Insert a bank account.
///
/// Does not open a transaction, the caller decides whether the insert is part
/// of a larger unit of work.
///
/// # Errors
/// Returns [Error::SqlError] if the insert fails, e.g. because the connection
/// does not exist or the account has already been saved.
pub fn save_bank_account(
    new_account: &NewBankAccount,
    connection: &Connection,
) -> Result<BankAccount, Error> {
    connection.execute(
        "INSERT INTO bank_account (
            plaid_account_id, bank_connection_id, name, mask, account_type,
            current_balance, available_balance, currency
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            new_account.plaid_account_id,
            new_account.bank_connection_id,
            new_account.name,
            new_account.mask,
            new_account.account_type.as_str(),
            new_account.current_balance.map(|balance| balance.to_string()),
            new_account.available_balance.map(|balance| balance.to_string()),
            new_account.currency,
        ],
    )?;

    let id = connection.last_insert_rowid();

    Ok(BankAccount {
        id,
        plaid_account_id: new_account.plaid_account_id.clone(),
        bank_connection_id: new_account.bank_connection_id,
        name: new_account.name.clone(),
        mask: new_account.mask.clone(),
        account_type: new_account.account_type,
        current_balance: new_account.current_balance,
        available_balance: new_account.available_balance,
        currency: new_account.currency.clone(),
    })
}

/// A bank account row before the account type and balances are parsed.
struct BankAccountRow {
    id: DatabaseId,
    plaid_account_id: String,
    bank_connection_id: DatabaseId,
    name: String,
    mask: Option<String>,
    account_type: String,
    current_balance: Option<String>,
    available_balance: Option<String>,
    currency: String,
}

fn map_row_to_bank_account_row(row: &rusqlite::Row) -> Result<BankAccountRow, rusqlite::Error> {
    Ok(BankAccountRow {
        id: row.get(0)?,
        plaid_account_id: row.get(1)?,
        bank_connection_id: row.get(2)?,
        name: row.get(3)?,
        mask: row.get(4)?,
        account_type: row.get(5)?,
        current_balance: row.get(6)?,
        available_balance: row.get(7)?,
        currency: row.get(8)?,
    })
}

impl TryFrom<BankAccountRow> for BankAccount {
    type Error = Error;

    fn try_from(row: BankAccountRow) -> Result<Self, Self::Error> {
        Ok(BankAccount {
            id: row.id,
            plaid_account_id: row.plaid_account_id,
            bank_connection_id: row.bank_connection_id,
            name: row.name,
            mask: row.mask,
            account_type: row.account_type.parse()?,
            current_balance: parse_stored_decimal(row.current_balance)?,
            available_balance: parse_stored_decimal(row.available_balance)?,
            currency: row.currency,
        })
    }
}

pub(crate) fn parse_stored_decimal(text: Option<String>) -> Result<Option<Decimal>, Error> {
    text.map(|text| Decimal::from_str(&text).map_err(|_| Error::InvalidDecimal(text)))
        .transpose()
}

const SELECT_BANK_ACCOUNT: &str = "SELECT id, plaid_account_id, bank_connection_id, name, mask, \
    account_type, current_balance, available_balance, currency FROM bank_account";

/// Get all bank accounts ordered by ID.
///
/// # Errors
/// Returns [Error::InvalidAccountType] or [Error::InvalidDecimal] if any
/// stored account cannot be parsed. No accounts are returned in that case.
pub fn list_all_bank_accounts(connection: &Connection) -> Result<Vec<BankAccount>, Error> {
    connection
        .prepare(&format!("{SELECT_BANK_ACCOUNT} ORDER BY id ASC"))?
        .query_map([], map_row_to_bank_account_row)?
        .map(|maybe_row| {
            maybe_row
                .map_err(Error::from)
                .and_then(BankAccount::try_from)
        })
        .collect()
}

/// Get the bank accounts of one connection ordered by ID.
///
/// # Errors
/// See [list_all_bank_accounts].
pub fn list_bank_accounts_for_connection(
    bank_connection_id: DatabaseId,
    connection: &Connection,
) -> Result<Vec<BankAccount>, Error> {
    connection
        .prepare(&format!(
            "{SELECT_BANK_ACCOUNT} WHERE bank_connection_id = ?1 ORDER BY id ASC"
        ))?
        .query_map([bank_connection_id], map_row_to_bank_account_row)?
        .map(|maybe_row| {
            maybe_row
                .map_err(Error::from)
                .and_then(BankAccount::try_from)
        })
        .collect()
}

#[cfg(test)]
mod account_type_tests {
    use crate::{Error, bank_account::AccountType};

    #[test]
    fn parses_every_known_type() {
        for account_type in AccountType::ALL {
            assert_eq!(account_type.as_str().parse(), Ok(account_type));
            assert_eq!(account_type.to_string().parse(), Ok(account_type));
        }
    }

    #[test]
    fn rejects_unknown_types() {
        for text in [
            "",
            "savings",
            "Depository",
            "CREDIT",
            " loan",
            "other ",
            "mortgage",
        ] {
            assert_eq!(
                text.parse::<AccountType>(),
                Err(Error::InvalidAccountType(text.to_owned())),
                "want {text:?} to be rejected"
            );
        }
    }
}
