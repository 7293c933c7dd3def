//! Transactions synced from linked bank accounts.
//!
//! This module contains:
//! - The `TransactionRecord` model and the database functions for storing it
//! - The endpoint that pulls new transactions for a bank connection from Plaid

mod core;
mod sync_endpoint;

pub use core::{
    NewTransactionRecord, TransactionRecord, create_bank_transaction_table,
    delete_transactions_by_plaid_ids, latest_cursor_for_connection, list_all_transactions,
    list_transactions_for_account, save_all_transactions, update_cursor_for_connection,
};
pub use sync_endpoint::sync_transactions_endpoint;
