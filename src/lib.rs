//! Plaid Ledger is a web app for linking bank accounts through Plaid and
//! keeping track of their balances and transactions.
//!
//! This library provides a REST API that directly serves HTML pages and
//! HTMX fragments.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod bank_account;
mod bank_connection;
mod banking;
mod config;
mod database_id;
mod db;
mod endpoints;
mod home;
mod html;
mod internal_server_error;
mod link;
mod logging;
mod not_found;
mod routing;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use bank_account::{
    AccountType, BankAccount, NewBankAccount, list_all_bank_accounts,
    list_bank_accounts_for_connection, save_bank_account,
};
pub use bank_connection::{
    BankConnection, NewBankConnection, get_bank_connection, list_all_bank_connections,
    save_bank_connection,
};
pub use banking::{
    ASSET_REPORT_DAYS_REQUESTED, AssetReportGetResponse, ItemDetails, PlaidApi, PlaidClient,
    PlaidError, PlaidTransaction, PollConfig, TransactionUpdates, create_asset_report,
    create_link_token, get_item_details, poll_asset_report, sync_transactions,
};
pub use config::{PlaidConfig, PlaidEnvironment};
pub use db::initialize as initialize_db;
pub use link::{LinkStage, LinkedBank, link_bank};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use transaction::{
    NewTransactionRecord, TransactionRecord, delete_transactions_by_plaid_ids,
    latest_cursor_for_connection, list_all_transactions, list_transactions_for_account,
    save_all_transactions,
};
pub use routing::build_router;

use crate::{alert::Alert, internal_server_error::InternalServerError, not_found::NotFound};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The Plaid credentials or settings are missing or invalid.
    ///
    /// This error is fatal at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Plaid rejected the request, e.g., because a public token was invalid,
    /// expired or had already been exchanged.
    #[error("Plaid rejected the request: {0}")]
    Upstream(PlaidError),

    /// The request to Plaid could not be completed or its response could not
    /// be understood.
    #[error("could not complete the request to Plaid: {0}")]
    UpstreamRequest(String),

    /// A bounded retry loop or deadline was exhausted.
    #[error("timed out {0}")]
    Timeout(String),

    /// A stored or fetched account type is not one of the known account types.
    #[error("invalid account type \"{0}\"")]
    InvalidAccountType(String),

    /// A stored monetary amount could not be parsed as a decimal number.
    #[error("invalid decimal amount \"{0}\"")]
    InvalidDecimal(String),

    /// Persisting a newly linked bank failed and the database transaction was
    /// rolled back, so none of the connection's rows are visible.
    #[error("linking a bank failed after {stage}: {reason}")]
    LinkFailed {
        /// The last stage the link workflow completed before failing.
        stage: LinkStage,
        /// The underlying error message. Only intended for the server logs.
        reason: String,
    },

    /// A required form field was missing or empty.
    #[error("the form field \"{0}\" is missing")]
    MissingFormField(&'static str),

    /// The form body could not be read, e.g., because a field was sent twice.
    #[error("invalid form data: {0}")]
    InvalidForm(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::UpstreamRequest(value.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFound.into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::MissingFormField(field) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Missing form data".to_owned(),
                    details: format!("The request did not include \"{field}\"."),
                },
            ),
            Error::InvalidForm(reason) => {
                tracing::debug!("Rejected form: {reason}");
                (
                    StatusCode::BAD_REQUEST,
                    Alert::Error {
                        message: "Invalid form data".to_owned(),
                        details: "The request could not be read. Try linking your bank again."
                            .to_owned(),
                    },
                )
            }
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Not found".to_owned(),
                    details: "The bank connection could not be found. Try refreshing the page."
                        .to_owned(),
                },
            ),
            Error::Upstream(_) | Error::UpstreamRequest(_) | Error::Timeout(_) => {
                tracing::error!("A request to Plaid failed: {self}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Could not reach your bank".to_owned(),
                        details: "Plaid could not complete the request. Try again later."
                            .to_owned(),
                    },
                )
            }
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::Error {
                        message: "Something went wrong".to_owned(),
                        details:
                            "An unexpected error occurred, check the server logs for more details."
                                .to_owned(),
                    },
                )
            }
        };

        (status_code, alert.into_html()).into_response()
    }
}
