//! Creating link tokens for starting Plaid Link.

use time::{
    Date, Duration, OffsetDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{
    Error,
    banking::{
        PlaidApi,
        models::{LinkTokenCreateRequest, LinkTokenUser, StatementsRange},
    },
    config::PlaidConfig,
};

/// The app name shown to users in Plaid Link.
pub const CLIENT_NAME: &str = "Plaid Ledger";
/// The product that requires a statements date range.
pub const STATEMENTS_PRODUCT: &str = "statements";
/// How many days of statements are requested.
pub const STATEMENTS_RANGE_DAYS: i64 = 30;

const PLAID_DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month repr:numerical padding:zero]-[day padding:zero]");

/// Build the `/link/token/create` request for `user` from the configured
/// products, country codes and redirect URI.
///
/// If the statements product is configured, the request asks for the
/// statements of the [STATEMENTS_RANGE_DAYS] days up to and including `today`.
pub fn build_link_token_request(
    config: &PlaidConfig,
    user: LinkTokenUser,
    today: Date,
) -> Result<LinkTokenCreateRequest, Error> {
    let statements = if config.has_product(STATEMENTS_PRODUCT) {
        let start = today - Duration::days(STATEMENTS_RANGE_DAYS);

        Some(StatementsRange {
            start_date: format_plaid_date(start)?,
            end_date: format_plaid_date(today)?,
        })
    } else {
        None
    };

    Ok(LinkTokenCreateRequest {
        client_name: CLIENT_NAME.to_owned(),
        language: "en".to_owned(),
        country_codes: config.country_codes.clone(),
        user,
        products: config.products.clone(),
        statements,
        redirect_uri: config.redirect_uri.clone(),
    })
}

/// Create a link token for a new Plaid Link session.
///
/// The user ID is derived from `now` so that no personally identifiable
/// information is sent to Plaid.
///
/// # Errors
/// Returns [Error::Upstream] or [Error::UpstreamRequest] if Plaid does not
/// create the token.
pub async fn create_link_token(
    plaid: &dyn PlaidApi,
    config: &PlaidConfig,
    now: OffsetDateTime,
) -> Result<String, Error> {
    let user = LinkTokenUser {
        client_user_id: now.unix_timestamp_nanos().to_string(),
    };
    let request = build_link_token_request(config, user, now.date())?;

    let response = plaid.create_link_token(&request).await?;

    Ok(response.link_token)
}

fn format_plaid_date(date: Date) -> Result<String, Error> {
    date.format(PLAID_DATE_FORMAT)
        .map_err(|error| Error::Config(format!("could not format date {date}: {error}")))
}
