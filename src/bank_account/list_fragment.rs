//! The fragment listing linked bank accounts.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    bank_account::{BankAccount, list_all_bank_accounts},
    endpoints::{self, format_endpoint},
    html::{
        LINK_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, format_balance,
        format_mask,
    },
};

/// The state needed for [get_bank_accounts_fragment].
#[derive(Debug, Clone)]
pub struct BankAccountsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BankAccountsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A table of bank accounts with a sync button for each account's connection.
pub(crate) fn bank_accounts_table(accounts: &[BankAccount]) -> Markup {
    let table_row = |account: &BankAccount| {
        let sync_url = format_endpoint(endpoints::SYNC_TRANSACTIONS, account.bank_connection_id);

        html!(
            tr class=(TABLE_ROW_STYLE) data-bank-account-id=(account.id)
            {
                th
                    scope="row"
                    class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                {
                    (account.name)
                }
                td class=(TABLE_CELL_STYLE) { (format_mask(account.mask.as_deref())) }
                td class=(TABLE_CELL_STYLE) { (account.account_type) }
                td class="px-6 py-4 text-right tabular-nums"
                {
                    (format_balance(account.current_balance, &account.currency))
                }
                td class="px-6 py-4 text-right tabular-nums"
                {
                    (format_balance(account.available_balance, &account.currency))
                }
                td class=(TABLE_CELL_STYLE)
                {
                    button
                        type="button"
                        class=(LINK_STYLE)
                        hx-post=(sync_url)
                        hx-target="#sync-result"
                        hx-target-error="#alert-container"
                    {
                        "Sync transactions"
                    }
                }
            }
        )
    };

    html!(
        table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Number" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                    th scope="col" class="px-6 py-3 text-right" { "Current" }
                    th scope="col" class="px-6 py-3 text-right" { "Available" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                }
            }

            tbody
            {
                @for account in accounts {
                    (table_row(account))
                }

                @if accounts.is_empty() {
                    tr
                    {
                        td
                            colspan="6"
                            class="px-6 py-4 text-center text-gray-500 dark:text-gray-400"
                        {
                            "No bank accounts linked yet. Link a bank to get started."
                        }
                    }
                }
            }
        }
    )
}

/// Renders the table of all linked bank accounts.
pub async fn get_bank_accounts_fragment(
    State(state): State<BankAccountsState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let accounts = list_all_bank_accounts(&connection)
        .inspect_err(|error| tracing::error!("could not get all bank accounts: {error}"))?;

    Ok(bank_accounts_table(&accounts).into_response())
}
