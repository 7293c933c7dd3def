use std::{collections::VecDeque, str::FromStr, sync::Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::{Date, macros::datetime};

use crate::{
    Error,
    banking::{
        PlaidApi,
        models::{
            AccountBalances, AccountsGetResponse, AssetReport, AssetReportCreateResponse,
            AssetReportGetResponse, AuthGetResponse, AuthNumbers, IdentityGetResponse,
            InstitutionGetByIdResponse, Item, ItemAccessToken, ItemGetResponse,
            LinkTokenCreateRequest, LinkTokenCreateResponse, PlaidAccount, PlaidError,
            PlaidTransaction, PublicTokenCreateResponse, StatementsListResponse,
            TransactionsSyncResponse,
        },
    },
};

type Queue<T> = Mutex<VecDeque<Result<T, Error>>>;

/// A [PlaidApi] that replays scripted responses.
///
/// Each endpoint has its own queue. Calling an endpoint with an empty queue
/// fails with [Error::UpstreamRequest].
#[derive(Default)]
pub(crate) struct FakePlaidApi {
    exchanges: Queue<ItemAccessToken>,
    auths: Queue<AuthGetResponse>,
    accounts: Queue<AccountsGetResponse>,
    identities: Queue<IdentityGetResponse>,
    items: Queue<ItemGetResponse>,
    institutions: Queue<InstitutionGetByIdResponse>,
    sync_pages: Queue<TransactionsSyncResponse>,
    link_tokens: Queue<LinkTokenCreateResponse>,
    public_tokens: Queue<PublicTokenCreateResponse>,
    statements: Queue<StatementsListResponse>,
    asset_reports_created: Queue<AssetReportCreateResponse>,
    asset_reports: Queue<AssetReportGetResponse>,
    exchanged_tokens: Mutex<Vec<String>>,
    sync_cursors: Mutex<Vec<Option<String>>>,
    link_token_requests: Mutex<Vec<LinkTokenCreateRequest>>,
    asset_report_calls: Mutex<usize>,
}

fn push<T>(queue: &Queue<T>, response: Result<T, Error>) {
    queue.lock().unwrap().push_back(response);
}

fn pop<T>(queue: &Queue<T>, endpoint: &str) -> Result<T, Error> {
    queue.lock().unwrap().pop_front().unwrap_or_else(|| {
        Err(Error::UpstreamRequest(format!(
            "no response scripted for {endpoint}"
        )))
    })
}

impl FakePlaidApi {
    pub(crate) fn push_exchange(&self, response: Result<ItemAccessToken, Error>) {
        push(&self.exchanges, response);
    }

    pub(crate) fn push_auth(&self, response: Result<AuthGetResponse, Error>) {
        push(&self.auths, response);
    }

    pub(crate) fn push_accounts(&self, response: Result<AccountsGetResponse, Error>) {
        push(&self.accounts, response);
    }

    pub(crate) fn push_item(&self, response: Result<ItemGetResponse, Error>) {
        push(&self.items, response);
    }

    pub(crate) fn push_institution(&self, response: Result<InstitutionGetByIdResponse, Error>) {
        push(&self.institutions, response);
    }

    pub(crate) fn push_sync_page(&self, response: Result<TransactionsSyncResponse, Error>) {
        push(&self.sync_pages, response);
    }

    pub(crate) fn push_link_token(&self, response: Result<LinkTokenCreateResponse, Error>) {
        push(&self.link_tokens, response);
    }

    pub(crate) fn push_asset_report_created(
        &self,
        response: Result<AssetReportCreateResponse, Error>,
    ) {
        push(&self.asset_reports_created, response);
    }

    pub(crate) fn push_asset_report(&self, response: Result<AssetReportGetResponse, Error>) {
        push(&self.asset_reports, response);
    }

    /// The public tokens passed to `exchange_public_token`, in call order.
    pub(crate) fn exchanged_tokens(&self) -> Vec<String> {
        self.exchanged_tokens.lock().unwrap().clone()
    }

    /// The cursors passed to `sync_transactions_page`, in call order.
    pub(crate) fn sync_cursors(&self) -> Vec<Option<String>> {
        self.sync_cursors.lock().unwrap().clone()
    }

    pub(crate) fn link_token_requests(&self) -> Vec<LinkTokenCreateRequest> {
        self.link_token_requests.lock().unwrap().clone()
    }

    pub(crate) fn asset_report_calls(&self) -> usize {
        *self.asset_report_calls.lock().unwrap()
    }
}

#[async_trait]
impl PlaidApi for FakePlaidApi {
    async fn exchange_public_token(&self, public_token: &str) -> Result<ItemAccessToken, Error> {
        self.exchanged_tokens
            .lock()
            .unwrap()
            .push(public_token.to_owned());
        pop(&self.exchanges, "/item/public_token/exchange")
    }

    async fn get_auth(&self, _access_token: &str) -> Result<AuthGetResponse, Error> {
        pop(&self.auths, "/auth/get")
    }

    async fn get_accounts(&self, _access_token: &str) -> Result<AccountsGetResponse, Error> {
        pop(&self.accounts, "/accounts/get")
    }

    async fn get_balances(&self, _access_token: &str) -> Result<AccountsGetResponse, Error> {
        pop(&self.accounts, "/accounts/balance/get")
    }

    async fn get_identity(&self, _access_token: &str) -> Result<IdentityGetResponse, Error> {
        pop(&self.identities, "/identity/get")
    }

    async fn get_item(&self, _access_token: &str) -> Result<ItemGetResponse, Error> {
        pop(&self.items, "/item/get")
    }

    async fn get_institution_by_id(
        &self,
        _institution_id: &str,
        _country_codes: &[String],
    ) -> Result<InstitutionGetByIdResponse, Error> {
        pop(&self.institutions, "/institutions/get_by_id")
    }

    async fn sync_transactions_page(
        &self,
        _access_token: &str,
        cursor: Option<&str>,
    ) -> Result<TransactionsSyncResponse, Error> {
        self.sync_cursors
            .lock()
            .unwrap()
            .push(cursor.map(str::to_owned));
        pop(&self.sync_pages, "/transactions/sync")
    }

    async fn create_link_token(
        &self,
        request: &LinkTokenCreateRequest,
    ) -> Result<LinkTokenCreateResponse, Error> {
        self.link_token_requests
            .lock()
            .unwrap()
            .push(request.clone());
        pop(&self.link_tokens, "/link/token/create")
    }

    async fn create_public_token(
        &self,
        _access_token: &str,
    ) -> Result<PublicTokenCreateResponse, Error> {
        pop(&self.public_tokens, "/item/public_token/create")
    }

    async fn list_statements(&self, _access_token: &str) -> Result<StatementsListResponse, Error> {
        pop(&self.statements, "/statements/list")
    }

    async fn create_asset_report(
        &self,
        _access_tokens: &[String],
        _days_requested: u32,
    ) -> Result<AssetReportCreateResponse, Error> {
        pop(&self.asset_reports_created, "/asset_report/create")
    }

    async fn get_asset_report(
        &self,
        _asset_report_token: &str,
    ) -> Result<AssetReportGetResponse, Error> {
        *self.asset_report_calls.lock().unwrap() += 1;
        pop(&self.asset_reports, "/asset_report/get")
    }
}

pub(crate) fn plaid_error(error_type: &str, error_code: &str) -> PlaidError {
    PlaidError {
        error_type: error_type.to_owned(),
        error_code: error_code.to_owned(),
        error_message: format!("{error_code} (scripted)"),
        display_message: None,
    }
}

pub(crate) fn item_access_token(access_token: &str, item_id: &str) -> ItemAccessToken {
    ItemAccessToken {
        access_token: access_token.to_owned(),
        item_id: item_id.to_owned(),
    }
}

/// An account with a current balance in USD.
pub(crate) fn plaid_account(
    account_id: &str,
    name: &str,
    account_type: &str,
    current_balance: &str,
) -> PlaidAccount {
    PlaidAccount {
        account_id: account_id.to_owned(),
        name: name.to_owned(),
        mask: Some("0000".to_owned()),
        account_type: account_type.to_owned(),
        subtype: None,
        balances: AccountBalances {
            current: Some(Decimal::from_str(current_balance).unwrap()),
            available: None,
            iso_currency_code: Some("USD".to_owned()),
            unofficial_currency_code: None,
        },
    }
}

pub(crate) fn auth_response(item_id: &str, accounts: Vec<PlaidAccount>) -> AuthGetResponse {
    AuthGetResponse {
        accounts,
        numbers: AuthNumbers::default(),
        item: Item {
            item_id: item_id.to_owned(),
            institution_id: Some("ins_109508".to_owned()),
            consent_expiration_time: None,
        },
    }
}

/// A posted USD transaction of 10.00 on `date`.
pub(crate) fn plaid_transaction(
    transaction_id: &str,
    account_id: &str,
    date: Date,
) -> PlaidTransaction {
    PlaidTransaction {
        transaction_id: transaction_id.to_owned(),
        account_id: account_id.to_owned(),
        amount: Decimal::from_str("10.00").unwrap(),
        iso_currency_code: Some("USD".to_owned()),
        unofficial_currency_code: None,
        date,
        datetime: None,
        authorized_date: None,
        authorized_datetime: None,
        name: Some(format!("Transaction {transaction_id}")),
        pending: false,
    }
}

pub(crate) fn sync_page(
    added: Vec<PlaidTransaction>,
    next_cursor: &str,
    has_more: bool,
) -> TransactionsSyncResponse {
    TransactionsSyncResponse {
        added,
        modified: Vec::new(),
        removed: Vec::new(),
        next_cursor: next_cursor.to_owned(),
        has_more,
    }
}

pub(crate) fn asset_report_created(
    asset_report_token: &str,
    asset_report_id: &str,
) -> AssetReportCreateResponse {
    AssetReportCreateResponse {
        asset_report_token: asset_report_token.to_owned(),
        asset_report_id: asset_report_id.to_owned(),
    }
}

pub(crate) fn asset_report(asset_report_id: &str) -> AssetReportGetResponse {
    AssetReportGetResponse {
        report: AssetReport {
            asset_report_id: asset_report_id.to_owned(),
            date_generated: datetime!(2024-03-01 12:00:00 UTC),
            days_requested: 10,
            items: Vec::new(),
        },
    }
}

pub(crate) fn link_token_response(link_token: &str) -> LinkTokenCreateResponse {
    LinkTokenCreateResponse {
        link_token: link_token.to_owned(),
        expiration: None,
    }
}
