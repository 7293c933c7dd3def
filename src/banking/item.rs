use crate::{
    Error,
    banking::{PlaidApi, models::ItemDetails},
};

/// Get an item together with the institution it is linked to.
///
/// # Errors
/// Returns [Error::UpstreamRequest] if Plaid does not report an institution
/// for the item, otherwise any error from Plaid.
pub async fn get_item_details(
    plaid: &dyn PlaidApi,
    access_token: &str,
    country_codes: &[String],
) -> Result<ItemDetails, Error> {
    let item = plaid.get_item(access_token).await?.item;

    let institution_id = item.institution_id.as_deref().ok_or_else(|| {
        Error::UpstreamRequest(format!("item {} has no institution", item.item_id))
    })?;

    let institution = plaid
        .get_institution_by_id(institution_id, country_codes)
        .await?
        .institution;

    Ok(ItemDetails { item, institution })
}
