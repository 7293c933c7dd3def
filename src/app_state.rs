//! Implements a struct that holds the state of the REST server.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rusqlite::Connection;

use crate::{
    Error,
    banking::{PlaidApi, PollConfig},
    config::PlaidConfig,
    db::initialize,
};

/// The longest the database writes of a bank link may take.
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(10);

/// The longest a transaction sync may take, including waiting for Plaid to
/// prepare the transactions.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(60);

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,

    /// The client for the Plaid API.
    pub plaid: Arc<dyn PlaidApi>,

    /// The Plaid products, countries and redirect URI used for Plaid Link.
    pub plaid_config: Arc<PlaidConfig>,

    /// The delays and limits for waiting on Plaid.
    pub poll_config: PollConfig,

    /// The longest the database writes of a bank link may take.
    pub link_timeout: Duration,

    /// The longest a transaction sync may take.
    pub sync_timeout: Duration,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        plaid: Arc<dyn PlaidApi>,
        plaid_config: PlaidConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
            plaid,
            plaid_config: Arc::new(plaid_config),
            poll_config: PollConfig::default(),
            link_timeout: DEFAULT_LINK_TIMEOUT,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        })
    }
}
