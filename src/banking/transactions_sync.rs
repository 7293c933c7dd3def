//! Paging through transaction updates with `/transactions/sync`.

use crate::{
    Error,
    banking::{
        PlaidApi, PollConfig,
        models::{PlaidTransaction, RemovedTransaction},
    },
};

/// All transaction updates for an item since a cursor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionUpdates {
    /// New transactions, oldest first.
    pub added: Vec<PlaidTransaction>,
    /// Transactions that changed, in the order Plaid sent them.
    pub modified: Vec<PlaidTransaction>,
    /// Transactions that no longer exist.
    pub removed: Vec<RemovedTransaction>,
    /// The cursor to resume from next time.
    pub next_cursor: String,
}

/// Fetch every page of transaction updates for `access_token` since `cursor`.
///
/// Passing `None` as the cursor fetches the item's full history.
///
/// While Plaid is still preparing the item's transactions it returns an empty
/// `next_cursor`. In that case the same page is requested again after
/// [PollConfig::transactions_retry_delay] instead of advancing. Plaid would
/// normally notify us with a webhook, which the app does not support yet.
///
/// The added transactions are sorted by date, oldest first. Transactions on
/// the same date keep the order in which Plaid sent them.
///
/// The loop only ends when Plaid reports there are no more pages, so callers
/// should bound it with a timeout. Dropping the returned future cancels it.
///
/// # Errors
/// Returns the first error from Plaid. Pages fetched before the error are
/// discarded.
pub async fn sync_transactions(
    plaid: &dyn PlaidApi,
    access_token: &str,
    cursor: Option<String>,
    poll_config: &PollConfig,
) -> Result<TransactionUpdates, Error> {
    let mut cursor = cursor;
    let mut updates = TransactionUpdates::default();
    let mut has_more = true;
    let mut page_count = 0;

    while has_more {
        let page = plaid
            .sync_transactions_page(access_token, cursor.as_deref())
            .await?;

        if page.next_cursor.is_empty() {
            tracing::debug!(
                "Transactions are not ready yet, retrying in {:?}",
                poll_config.transactions_retry_delay
            );
            tokio::time::sleep(poll_config.transactions_retry_delay).await;
            continue;
        }

        page_count += 1;
        updates.added.extend(page.added);
        updates.modified.extend(page.modified);
        updates.removed.extend(page.removed);
        has_more = page.has_more;
        cursor = Some(page.next_cursor);
    }

    // `sort_by_key` is stable, so same-day transactions keep Plaid's order.
    updates.added.sort_by_key(|transaction| transaction.date);
    updates.next_cursor = cursor.unwrap_or_default();

    tracing::debug!(
        "Synced {page_count} page(s) of transactions: {} added, {} modified, {} removed",
        updates.added.len(),
        updates.modified.len(),
        updates.removed.len()
    );

    Ok(updates)
}
