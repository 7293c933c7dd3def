//! Pulls new transactions for a bank connection from Plaid and stores them.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    bank_connection::get_bank_connection,
    banking::{PlaidApi, PlaidTransaction, PollConfig, sync_transactions},
    database_id::DatabaseId,
    transaction::{
        NewTransactionRecord, delete_transactions_by_plaid_ids, latest_cursor_for_connection,
        save_all_transactions, update_cursor_for_connection,
    },
};

/// The state needed for [sync_transactions_endpoint].
#[derive(Clone)]
pub struct SyncTransactionsState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub plaid: Arc<dyn PlaidApi>,
    pub poll_config: PollConfig,
    /// The longest a whole sync may take, including waiting for Plaid to
    /// prepare the transactions.
    pub sync_timeout: Duration,
}

impl FromRef<AppState> for SyncTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            plaid: state.plaid.clone(),
            poll_config: state.poll_config,
            sync_timeout: state.sync_timeout,
        }
    }
}

/// How many transactions a sync changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl SyncSummary {
    fn into_alert(self) -> Alert {
        Alert::Success {
            message: "Transactions synced".to_owned(),
            details: format!(
                "{} added, {} modified, {} removed.",
                self.added, self.modified, self.removed
            ),
        }
    }
}

/// A route handler that syncs the transactions of the bank connection
/// `connection_id` and responds with a summary alert.
pub async fn sync_transactions_endpoint(
    State(state): State<SyncTransactionsState>,
    Path(connection_id): Path<DatabaseId>,
) -> Response {
    match sync_connection(&state, connection_id).await {
        Ok(summary) => summary.into_alert().into_response(),
        Err(error) => {
            tracing::error!("Could not sync transactions for connection {connection_id}: {error}");
            error.into_alert_response()
        }
    }
}

async fn sync_connection(
    state: &SyncTransactionsState,
    connection_id: DatabaseId,
) -> Result<SyncSummary, Error> {
    // The lock must be released before waiting on Plaid.
    let (bank_connection, cursor) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let bank_connection = get_bank_connection(connection_id, &connection)?;
        let cursor = latest_cursor_for_connection(connection_id, &connection)?;

        (bank_connection, cursor)
    };

    tracing::debug!(
        "Syncing transactions for connection {connection_id} from cursor {cursor:?}"
    );

    let updates = tokio::time::timeout(
        state.sync_timeout,
        sync_transactions(
            state.plaid.as_ref(),
            &bank_connection.access_token,
            cursor,
            &state.poll_config,
        ),
    )
    .await
    .map_err(|_| {
        Error::Timeout(format!(
            "syncing transactions for connection {connection_id} after {:?}",
            state.sync_timeout
        ))
    })??;

    let added_records = to_records(&updates.added, &updates.next_cursor);
    let modified_records = to_records(&updates.modified, &updates.next_cursor);
    let removed_ids: Vec<String> = updates
        .removed
        .iter()
        .map(|removed| removed.transaction_id.clone())
        .collect();

    let mut connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;
    let transaction = connection.transaction()?;

    let added = save_all_transactions(&added_records, &transaction)?;
    let modified = save_all_transactions(&modified_records, &transaction)?;
    let removed = delete_transactions_by_plaid_ids(&removed_ids, &transaction)?;
    update_cursor_for_connection(connection_id, &updates.next_cursor, &transaction)?;

    transaction.commit()?;

    let summary = SyncSummary {
        added,
        modified,
        removed,
    };
    tracing::info!("Synced transactions for connection {connection_id}: {summary:?}");

    Ok(summary)
}

fn to_records(transactions: &[PlaidTransaction], next_cursor: &str) -> Vec<NewTransactionRecord> {
    transactions
        .iter()
        .map(|transaction| NewTransactionRecord::from_plaid_transaction(transaction, next_cursor))
        .collect()
}
