//! Everything to do with talking to Plaid, the bank aggregation API.
//!
//! [PlaidApi] is the seam between the app and Plaid: request handlers and
//! workflows only ever see a `&dyn PlaidApi`, so tests can swap in a fake.

use std::time::Duration;

mod asset_report;
mod client;
mod item;
mod link_token;
pub(crate) mod models;
mod transactions_sync;

pub use asset_report::{ASSET_REPORT_DAYS_REQUESTED, create_asset_report, poll_asset_report};
pub use client::{PlaidApi, PlaidClient};
pub use item::get_item_details;
pub use link_token::create_link_token;
pub use models::{AssetReportGetResponse, ItemDetails, PlaidAccount, PlaidError, PlaidTransaction};
pub use transactions_sync::{TransactionUpdates, sync_transactions};

/// Delays and limits for the loops that wait on Plaid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// How long to wait before asking for transactions again while Plaid is
    /// still preparing them.
    pub transactions_retry_delay: Duration,
    /// How long to wait between requests for an asset report.
    pub asset_report_retry_delay: Duration,
    /// How many times an asset report is requested before giving up.
    pub asset_report_max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            transactions_retry_delay: Duration::from_secs(2),
            asset_report_retry_delay: Duration::from_secs(1),
            asset_report_max_attempts: 20,
        }
    }
}

impl PollConfig {
    /// The default limits without any delays, for tests.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            transactions_retry_delay: Duration::ZERO,
            asset_report_retry_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}
