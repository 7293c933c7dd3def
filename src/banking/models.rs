//! Typed request and response bodies for the Plaid endpoints used by the app.
//!
//! Only the fields the app reads are declared, serde ignores the rest.
//! See <https://plaid.com/docs/api/> for the full schemas.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use time::{Date, OffsetDateTime};

time::serde::format_description!(plaid_date, Date, "[year]-[month]-[day]");

/// The error body Plaid sends with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, thiserror::Error)]
#[error("{error_type} {error_code}: {error_message}")]
pub struct PlaidError {
    /// A broad categorisation of the error, e.g. "INVALID_INPUT".
    pub error_type: String,
    /// The specific error code, e.g. "INVALID_PUBLIC_TOKEN".
    pub error_code: String,
    /// A developer-facing description of the error.
    pub error_message: String,
    /// A user-facing description of the error, if Plaid provides one.
    #[serde(default)]
    pub display_message: Option<String>,
}

/// The error code Plaid uses while a product, e.g. an asset report, is still being prepared.
pub const PRODUCT_NOT_READY: &str = "PRODUCT_NOT_READY";

impl PlaidError {
    /// Whether Plaid is still preparing the requested data.
    pub fn is_product_not_ready(&self) -> bool {
        self.error_code == PRODUCT_NOT_READY
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AccessTokenRequest<'a> {
    pub access_token: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct PublicTokenExchangeRequest<'a> {
    pub public_token: &'a str,
}

/// The durable credential for an item, returned when exchanging a public token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ItemAccessToken {
    /// The secret used for all further requests about the item.
    pub access_token: String,
    /// Plaid's ID for the item.
    pub item_id: String,
}

impl std::fmt::Debug for ItemAccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemAccessToken")
            .field("access_token", &"********")
            .field("item_id", &self.item_id)
            .finish()
    }
}

/// The balances of an account as reported by the institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountBalances {
    /// The total amount of funds in or owed by the account.
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub current: Option<Decimal>,
    /// The amount of funds available to be withdrawn.
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub available: Option<Decimal>,
    /// The ISO-4217 currency code of the balances.
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    /// The currency code for currencies without an ISO-4217 code, e.g. crypto.
    #[serde(default)]
    pub unofficial_currency_code: Option<String>,
}

/// The currency name used when Plaid reports neither currency code.
pub const UNKNOWN_CURRENCY: &str = "Unknown";

impl AccountBalances {
    /// The account's currency code.
    ///
    /// Plaid always sets one of the two codes, [UNKNOWN_CURRENCY] is returned
    /// if neither is set.
    pub fn currency(&self) -> String {
        self.iso_currency_code
            .clone()
            .or_else(|| self.unofficial_currency_code.clone())
            .unwrap_or_else(|| UNKNOWN_CURRENCY.to_owned())
    }
}

/// An account at a linked institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaidAccount {
    /// Plaid's ID for the account.
    pub account_id: String,
    /// The name of the account, either assigned by the user or the institution.
    pub name: String,
    /// The last 2-4 characters of the account number.
    #[serde(default)]
    pub mask: Option<String>,
    /// The account type, e.g. "depository".
    #[serde(rename = "type")]
    pub account_type: String,
    /// The account subtype, e.g. "checking".
    #[serde(default)]
    pub subtype: Option<String>,
    /// The account balances.
    pub balances: AccountBalances,
}

/// Metadata about a linked item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    /// Plaid's ID for the item.
    pub item_id: String,
    /// The institution the item is linked to.
    #[serde(default)]
    pub institution_id: Option<String>,
    /// When the user's consent for the item expires, if the institution
    /// requires consent renewal.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub consent_expiration_time: Option<OffsetDateTime>,
}

/// ACH routing details for a US account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AchNumber {
    /// The account the numbers belong to.
    pub account_id: String,
    /// The account number.
    pub account: String,
    /// The routing number.
    pub routing: String,
    /// The wire transfer routing number, if different.
    #[serde(default)]
    pub wire_routing: Option<String>,
}

/// EFT routing details for a Canadian account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EftNumber {
    /// The account the numbers belong to.
    pub account_id: String,
    /// The account number.
    pub account: String,
    /// The institution number.
    pub institution: String,
    /// The branch number.
    pub branch: String,
}

/// International (IBAN/BIC) details for an account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InternationalNumber {
    /// The account the numbers belong to.
    pub account_id: String,
    /// The International Bank Account Number.
    pub iban: String,
    /// The Bank Identifier Code.
    pub bic: String,
}

/// BACS details for a UK account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BacsNumber {
    /// The account the numbers belong to.
    pub account_id: String,
    /// The account number.
    pub account: String,
    /// The sort code.
    pub sort_code: String,
}

/// The account and routing numbers returned by `/auth/get`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthNumbers {
    /// US account numbers.
    #[serde(default)]
    pub ach: Vec<AchNumber>,
    /// Canadian account numbers.
    #[serde(default)]
    pub eft: Vec<EftNumber>,
    /// IBAN/BIC account numbers.
    #[serde(default)]
    pub international: Vec<InternationalNumber>,
    /// UK account numbers.
    #[serde(default)]
    pub bacs: Vec<BacsNumber>,
}

/// Response for `/auth/get`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthGetResponse {
    /// The item's accounts with their balances.
    pub accounts: Vec<PlaidAccount>,
    /// The account and routing numbers.
    #[serde(default)]
    pub numbers: AuthNumbers,
    /// The item the accounts belong to.
    pub item: Item,
}

/// Response for `/accounts/get` and `/accounts/balance/get`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountsGetResponse {
    /// The item's accounts with their balances.
    pub accounts: Vec<PlaidAccount>,
    /// The item the accounts belong to.
    pub item: Item,
}

/// A piece of contact data, e.g. an email address.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContactData {
    /// The email address or phone number.
    pub data: String,
    /// Whether this is the owner's primary contact.
    #[serde(default)]
    pub primary: bool,
}

/// An account holder as reported by the institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountOwner {
    /// The owner's names.
    #[serde(default)]
    pub names: Vec<String>,
    /// The owner's email addresses.
    #[serde(default)]
    pub emails: Vec<ContactData>,
    /// The owner's phone numbers.
    #[serde(default)]
    pub phone_numbers: Vec<ContactData>,
}

/// An account with its owners.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdentityAccount {
    /// Plaid's ID for the account.
    pub account_id: String,
    /// The name of the account.
    pub name: String,
    /// The holders of the account.
    #[serde(default)]
    pub owners: Vec<AccountOwner>,
}

/// Response for `/identity/get`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IdentityGetResponse {
    /// The item's accounts with their owners.
    pub accounts: Vec<IdentityAccount>,
}

/// Response for `/item/get`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemGetResponse {
    /// The item.
    pub item: Item,
}

#[derive(Debug, Serialize)]
pub(crate) struct InstitutionGetByIdRequest<'a> {
    pub institution_id: &'a str,
    pub country_codes: &'a [String],
}

/// A financial institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Institution {
    /// Plaid's ID for the institution.
    pub institution_id: String,
    /// The institution's name.
    pub name: String,
    /// The institution's website.
    #[serde(default)]
    pub url: Option<String>,
}

/// Response for `/institutions/get_by_id`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstitutionGetByIdResponse {
    /// The institution.
    pub institution: Institution,
}

/// An item together with the institution it is linked to.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetails {
    /// The item.
    pub item: Item,
    /// The institution the item is linked to.
    pub institution: Institution,
}

#[derive(Debug, Serialize)]
pub(crate) struct TransactionsSyncRequest<'a> {
    pub access_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<&'a str>,
}

/// A transaction on an account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlaidTransaction {
    /// Plaid's ID for the transaction.
    pub transaction_id: String,
    /// The account the transaction belongs to.
    pub account_id: String,
    /// The settled value of the transaction. Positive values are money
    /// moving out of the account.
    #[serde(deserialize_with = "deserialize_decimal")]
    pub amount: Decimal,
    /// The ISO-4217 currency code of the amount.
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    /// The currency code for currencies without an ISO-4217 code.
    #[serde(default)]
    pub unofficial_currency_code: Option<String>,
    /// The date the transaction posted, or the date it was initiated for
    /// pending transactions.
    #[serde(with = "plaid_date")]
    pub date: Date,
    /// The date and time the transaction posted, if the institution reports it.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub datetime: Option<OffsetDateTime>,
    /// The date the transaction was authorized.
    #[serde(default, with = "plaid_date::option")]
    pub authorized_date: Option<Date>,
    /// The date and time the transaction was authorized.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub authorized_datetime: Option<OffsetDateTime>,
    /// The merchant name or transaction description.
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the transaction is still pending.
    #[serde(default)]
    pub pending: bool,
}

impl PlaidTransaction {
    /// The transaction's currency code, [UNKNOWN_CURRENCY] if Plaid sets neither code.
    pub fn currency(&self) -> String {
        self.iso_currency_code
            .clone()
            .or_else(|| self.unofficial_currency_code.clone())
            .unwrap_or_else(|| UNKNOWN_CURRENCY.to_owned())
    }
}

/// A transaction that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemovedTransaction {
    /// Plaid's ID for the removed transaction.
    pub transaction_id: String,
    /// The account the transaction belonged to.
    #[serde(default)]
    pub account_id: Option<String>,
}

/// One page of `/transactions/sync`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionsSyncResponse {
    /// Transactions added since the cursor.
    #[serde(default)]
    pub added: Vec<PlaidTransaction>,
    /// Transactions modified since the cursor.
    #[serde(default)]
    pub modified: Vec<PlaidTransaction>,
    /// Transactions removed since the cursor.
    #[serde(default)]
    pub removed: Vec<RemovedTransaction>,
    /// The cursor for the next page. Empty while Plaid is still preparing the
    /// item's transactions.
    #[serde(default)]
    pub next_cursor: String,
    /// Whether there are more pages.
    #[serde(default)]
    pub has_more: bool,
}

/// The end user that a link token is created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTokenUser {
    /// A unique, non-identifying ID for the user.
    pub client_user_id: String,
}

/// The date range of statements to request in Plaid Link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementsRange {
    /// The first day of the range, formatted as YYYY-MM-DD.
    pub start_date: String,
    /// The last day of the range, formatted as YYYY-MM-DD.
    pub end_date: String,
}

/// Request body for `/link/token/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkTokenCreateRequest {
    /// The app name shown in Plaid Link.
    pub client_name: String,
    /// The language Plaid Link is shown in.
    pub language: String,
    /// Institutions from these countries are shown.
    pub country_codes: Vec<String>,
    /// The end user.
    pub user: LinkTokenUser,
    /// The products to initialise Plaid Link with.
    pub products: Vec<String>,
    /// Set when the statements product is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statements: Option<StatementsRange>,
    /// Set when an OAuth redirect URI is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

/// Response for `/link/token/create`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LinkTokenCreateResponse {
    /// The token used to initialise Plaid Link.
    pub link_token: String,
    /// When the link token expires.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expiration: Option<OffsetDateTime>,
}

/// Response for `/item/public_token/create`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicTokenCreateResponse {
    /// A one-time use public token for starting Plaid Link in update mode.
    pub public_token: String,
}

/// A statement for an account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Statement {
    /// Plaid's ID for the statement.
    pub statement_id: String,
    /// The month of the statement.
    pub month: u8,
    /// The year of the statement.
    pub year: i32,
}

/// An account with its statements.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatementsAccount {
    /// Plaid's ID for the account.
    pub account_id: String,
    /// The name of the account.
    #[serde(default)]
    pub account_name: Option<String>,
    /// The statements for the account.
    #[serde(default)]
    pub statements: Vec<Statement>,
}

/// Response for `/statements/list`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatementsListResponse {
    /// The item's accounts with their statements.
    pub accounts: Vec<StatementsAccount>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssetReportCreateRequest<'a> {
    pub access_tokens: &'a [String],
    pub days_requested: u32,
}

/// Response for `/asset_report/create`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetReportCreateResponse {
    /// The token used to fetch the report.
    pub asset_report_token: String,
    /// Plaid's ID for the report.
    pub asset_report_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssetReportGetRequest<'a> {
    pub asset_report_token: &'a str,
}

/// An account in an asset report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetReportAccount {
    /// Plaid's ID for the account.
    pub account_id: String,
    /// The name of the account.
    pub name: String,
    /// The balances of the account when the report was generated.
    pub balances: AccountBalances,
}

/// An item in an asset report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetReportItem {
    /// Plaid's ID for the item.
    pub item_id: String,
    /// The institution's name.
    #[serde(default)]
    pub institution_name: Option<String>,
    /// The item's accounts.
    #[serde(default)]
    pub accounts: Vec<AssetReportAccount>,
}

/// An asset report.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetReport {
    /// Plaid's ID for the report.
    pub asset_report_id: String,
    /// When the report was generated.
    #[serde(with = "time::serde::rfc3339")]
    pub date_generated: OffsetDateTime,
    /// How many days of transaction history the report covers.
    pub days_requested: u32,
    /// The items in the report.
    #[serde(default)]
    pub items: Vec<AssetReportItem>,
}

/// Response for `/asset_report/get`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssetReportGetResponse {
    /// The report.
    pub report: AssetReport,
}

/// Deserialize a monetary amount sent as a JSON number or string.
///
/// JSON numbers are converted through their shortest textual form so that,
/// e.g., `1234.56` becomes exactly `Decimal` 1234.56.
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    decimal_from_json(&value)
        .ok_or_else(|| D::Error::custom(format!("expected a decimal amount, got {value}")))
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => decimal_from_json(&value)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("expected a decimal amount, got {value}"))),
    }
}

fn decimal_from_json(value: &JsonValue) -> Option<Decimal> {
    let text = match value {
        JsonValue::Number(number) => number.to_string(),
        JsonValue::String(text) => text.clone(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
