//! Creating and fetching asset reports.

use crate::{
    Error,
    banking::{PlaidApi, PollConfig, models::AssetReportGetResponse},
};

/// How many days of history are requested for new asset reports.
pub const ASSET_REPORT_DAYS_REQUESTED: u32 = 10;

/// Fetch an asset report, waiting while Plaid is still generating it.
///
/// The report is requested up to [PollConfig::asset_report_max_attempts]
/// times, waiting [PollConfig::asset_report_retry_delay] after every
/// "product not ready" response.
///
/// # Errors
/// Returns [Error::Timeout] if the report is still not ready after the last
/// attempt. Any other error from Plaid is returned immediately.
pub async fn poll_asset_report(
    plaid: &dyn PlaidApi,
    asset_report_token: &str,
    poll_config: &PollConfig,
) -> Result<AssetReportGetResponse, Error> {
    for attempt in 1..=poll_config.asset_report_max_attempts {
        match plaid.get_asset_report(asset_report_token).await {
            Ok(response) => return Ok(response),
            Err(Error::Upstream(error)) if error.is_product_not_ready() => {
                tracing::debug!(
                    "Asset report is not ready (attempt {attempt}/{}), retrying in {:?}",
                    poll_config.asset_report_max_attempts,
                    poll_config.asset_report_retry_delay
                );
                tokio::time::sleep(poll_config.asset_report_retry_delay).await;
            }
            Err(error) => return Err(error),
        }
    }

    Err(Error::Timeout(format!(
        "polling for an asset report after {} attempts",
        poll_config.asset_report_max_attempts
    )))
}

/// Create an asset report for the item behind `access_token` and wait for it.
///
/// # Errors
/// See [poll_asset_report].
pub async fn create_asset_report(
    plaid: &dyn PlaidApi,
    access_token: &str,
    poll_config: &PollConfig,
) -> Result<AssetReportGetResponse, Error> {
    let created = plaid
        .create_asset_report(&[access_token.to_owned()], ASSET_REPORT_DAYS_REQUESTED)
        .await?;

    tracing::debug!("Created asset report {}", created.asset_report_id);

    poll_asset_report(plaid, &created.asset_report_token, poll_config).await
}
