//! Linking a bank: exchanging a public token from Plaid Link and saving the
//! new connection together with all of its accounts.

use std::{
    fmt,
    sync::Mutex,
    time::{Duration, Instant},
};

use rusqlite::{Connection, Transaction};

use crate::{
    Error,
    bank_account::{BankAccount, NewBankAccount, save_bank_account},
    bank_connection::{BankConnection, NewBankConnection, save_bank_connection},
    banking::PlaidApi,
};

/// The stages a bank link goes through.
///
/// A link either ends in [LinkStage::Committed] or, if anything fails after
/// the accounts have been fetched, in [LinkStage::RolledBack].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStage {
    /// Nothing has happened yet.
    Start,
    /// The public token was exchanged for an access token.
    TokenExchanged,
    /// The item's accounts were fetched from Plaid.
    AccountsFetched,
    /// The connection row was written, but not committed.
    ConnectionPersisted,
    /// Every account row was written, but not committed.
    AccountsPersisted,
    /// The connection and its accounts are saved.
    Committed,
    /// The database transaction was rolled back and nothing was saved.
    RolledBack,
}

impl fmt::Display for LinkStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkStage::Start => "start",
            LinkStage::TokenExchanged => "token exchanged",
            LinkStage::AccountsFetched => "accounts fetched",
            LinkStage::ConnectionPersisted => "connection persisted",
            LinkStage::AccountsPersisted => "accounts persisted",
            LinkStage::Committed => "committed",
            LinkStage::RolledBack => "rolled back",
        };

        f.write_str(name)
    }
}

/// A connection and the accounts saved with it.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedBank {
    /// The saved connection.
    pub connection: BankConnection,
    /// The saved accounts, in the order Plaid listed them.
    pub accounts: Vec<BankAccount>,
}

fn advance(stage: &mut LinkStage, next: LinkStage) {
    tracing::debug!("Link: {stage} -> {next}");
    *stage = next;
}

/// Exchange `public_token` and save the resulting connection and accounts.
///
/// The requests to Plaid happen before the database is touched, so a failure
/// there has no side effects. The connection and accounts are then written in
/// a single database transaction that must finish within `timeout`.
///
/// # Errors
/// - [Error::Upstream] or [Error::UpstreamRequest] if a request to Plaid fails.
/// - [Error::InvalidAccountType] if Plaid sends an unknown account type.
/// - [Error::LinkFailed] if a write or the commit fails. Nothing is saved.
/// - [Error::Timeout] if the writes take longer than `timeout`. Nothing is saved.
pub async fn link_bank(
    plaid: &dyn PlaidApi,
    db_connection: &Mutex<Connection>,
    public_token: &str,
    timeout: Duration,
) -> Result<LinkedBank, Error> {
    let mut stage = LinkStage::Start;

    let token = plaid
        .exchange_public_token(public_token)
        .await
        .inspect_err(|error| tracing::debug!("Link failed at {stage}: {error}"))?;
    advance(&mut stage, LinkStage::TokenExchanged);

    let auth = plaid
        .get_auth(&token.access_token)
        .await
        .inspect_err(|error| tracing::debug!("Link failed at {stage}: {error}"))?;
    advance(&mut stage, LinkStage::AccountsFetched);

    let new_connection = NewBankConnection {
        plaid_item_id: token.item_id,
        access_token: token.access_token,
        consent_expiration_time: auth.item.consent_expiration_time,
        login_required: false,
    };
    // The connection ID is filled in once the connection row exists.
    let new_accounts = auth
        .accounts
        .iter()
        .map(|account| NewBankAccount::from_plaid_account(account, 0))
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|error| tracing::debug!("Link failed at {stage}: {error}"))?;

    let mut connection = db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let deadline = Instant::now() + timeout;
    let transaction = connection
        .transaction()
        .map_err(|error| link_failed(stage, error.into()))?;

    let linked = match write_rows(
        &transaction,
        &new_connection,
        new_accounts,
        deadline,
        &mut stage,
    ) {
        Ok(linked) => linked,
        Err(error) => return Err(roll_back(transaction, &mut stage, error)),
    };

    if let Err(error) = check_deadline(deadline, stage) {
        return Err(roll_back(transaction, &mut stage, error));
    }

    // A failed commit drops the transaction, which rolls it back.
    transaction.commit().map_err(|error| {
        let error = link_failed(stage, error.into());
        advance(&mut stage, LinkStage::RolledBack);
        error
    })?;
    advance(&mut stage, LinkStage::Committed);

    tracing::info!(
        "Linked item {} with {} account(s)",
        linked.connection.plaid_item_id,
        linked.accounts.len()
    );

    Ok(linked)
}

fn write_rows(
    transaction: &Transaction,
    new_connection: &NewBankConnection,
    new_accounts: Vec<NewBankAccount>,
    deadline: Instant,
    stage: &mut LinkStage,
) -> Result<LinkedBank, Error> {
    check_deadline(deadline, *stage)?;
    let bank_connection = save_bank_connection(new_connection, transaction)
        .map_err(|error| link_failed(*stage, error))?;
    advance(stage, LinkStage::ConnectionPersisted);

    let mut accounts = Vec::with_capacity(new_accounts.len());
    for mut new_account in new_accounts {
        check_deadline(deadline, *stage)?;
        new_account.bank_connection_id = bank_connection.id;
        let account = save_bank_account(&new_account, transaction)
            .map_err(|error| link_failed(*stage, error))?;
        accounts.push(account);
    }
    advance(stage, LinkStage::AccountsPersisted);

    Ok(LinkedBank {
        connection: bank_connection,
        accounts,
    })
}

fn check_deadline(deadline: Instant, stage: LinkStage) -> Result<(), Error> {
    if Instant::now() >= deadline {
        return Err(Error::Timeout(format!("linking a bank after {stage}")));
    }

    Ok(())
}

fn link_failed(stage: LinkStage, error: Error) -> Error {
    Error::LinkFailed {
        stage,
        reason: error.to_string(),
    }
}

fn roll_back(transaction: Transaction, stage: &mut LinkStage, error: Error) -> Error {
    if let Err(rollback_error) = transaction.rollback() {
        tracing::error!("Could not roll back the link transaction: {rollback_error}");
    }

    tracing::debug!("Link failed at {stage}: {error}");
    advance(stage, LinkStage::RolledBack);

    error
}
