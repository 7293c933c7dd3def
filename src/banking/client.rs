//! The HTTP client for the Plaid API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    Error,
    banking::models::{
        AccessTokenRequest, AccountsGetResponse, AssetReportCreateRequest,
        AssetReportCreateResponse, AssetReportGetRequest, AssetReportGetResponse, AuthGetResponse,
        IdentityGetResponse, InstitutionGetByIdRequest, InstitutionGetByIdResponse,
        ItemAccessToken, ItemGetResponse, LinkTokenCreateRequest, LinkTokenCreateResponse,
        PlaidError, PublicTokenCreateResponse, PublicTokenExchangeRequest, StatementsListResponse,
        TransactionsSyncRequest, TransactionsSyncResponse,
    },
    config::PlaidConfig,
};

/// The Plaid endpoints used by the app.
///
/// Each method maps to exactly one request. Multi-request flows such as
/// paging through transactions live in the functions that take a `&dyn PlaidApi`.
#[async_trait]
pub trait PlaidApi: Send + Sync {
    /// Exchange a public token from Plaid Link for an access token.
    ///
    /// <https://plaid.com/docs/api/items/#itempublic_tokenexchange>
    async fn exchange_public_token(&self, public_token: &str) -> Result<ItemAccessToken, Error>;

    /// Get the item's accounts with balances and account numbers.
    ///
    /// <https://plaid.com/docs/api/products/auth/#authget>
    async fn get_auth(&self, access_token: &str) -> Result<AuthGetResponse, Error>;

    /// Get the item's accounts with cached balances.
    ///
    /// <https://plaid.com/docs/api/accounts/#accountsget>
    async fn get_accounts(&self, access_token: &str) -> Result<AccountsGetResponse, Error>;

    /// Get the item's accounts with real-time balances.
    ///
    /// <https://plaid.com/docs/api/products/balance/#accountsbalanceget>
    async fn get_balances(&self, access_token: &str) -> Result<AccountsGetResponse, Error>;

    /// Get the owners of the item's accounts.
    ///
    /// <https://plaid.com/docs/api/products/identity/#identityget>
    async fn get_identity(&self, access_token: &str) -> Result<IdentityGetResponse, Error>;

    /// Get the item's metadata.
    ///
    /// <https://plaid.com/docs/api/items/#itemget>
    async fn get_item(&self, access_token: &str) -> Result<ItemGetResponse, Error>;

    /// Get an institution by its ID.
    ///
    /// <https://plaid.com/docs/api/institutions/#institutionsget_by_id>
    async fn get_institution_by_id(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<InstitutionGetByIdResponse, Error>;

    /// Get one page of transaction updates since `cursor`.
    ///
    /// <https://plaid.com/docs/api/products/transactions/#transactionssync>
    async fn sync_transactions_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<TransactionsSyncResponse, Error>;

    /// Create a link token for starting Plaid Link.
    ///
    /// <https://plaid.com/docs/api/link/#linktokencreate>
    async fn create_link_token(
        &self,
        request: &LinkTokenCreateRequest,
    ) -> Result<LinkTokenCreateResponse, Error>;

    /// Create a public token for starting Plaid Link in update mode.
    ///
    /// <https://plaid.com/docs/api/items/#itempublic_tokencreate>
    async fn create_public_token(
        &self,
        access_token: &str,
    ) -> Result<PublicTokenCreateResponse, Error>;

    /// List the statements available for the item.
    ///
    /// <https://plaid.com/docs/api/products/statements/#statementslist>
    async fn list_statements(&self, access_token: &str) -> Result<StatementsListResponse, Error>;

    /// Start generating an asset report.
    ///
    /// <https://plaid.com/docs/api/products/assets/#asset_reportcreate>
    async fn create_asset_report(
        &self,
        access_tokens: &[String],
        days_requested: u32,
    ) -> Result<AssetReportCreateResponse, Error>;

    /// Get a generated asset report.
    ///
    /// Fails with a [PlaidError] with the code `PRODUCT_NOT_READY` while the
    /// report is still being generated.
    ///
    /// <https://plaid.com/docs/api/products/assets/#asset_reportget>
    async fn get_asset_report(
        &self,
        asset_report_token: &str,
    ) -> Result<AssetReportGetResponse, Error>;
}

const CLIENT_ID_HEADER: &str = "PLAID-CLIENT-ID";
const SECRET_HEADER: &str = "PLAID-SECRET";

/// How long a single request to Plaid may take.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A [PlaidApi] that sends requests to the Plaid API over HTTPS.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    http: Client,
    config: PlaidConfig,
}

impl PlaidClient {
    /// Create a client for the environment in `config`.
    ///
    /// # Errors
    /// Returns [Error::Config] if the HTTP client cannot be built.
    pub fn new(config: PlaidConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| Error::Config(format!("could not create HTTP client: {error}")))?;

        Ok(Self { http, config })
    }

    /// The configuration the client was created with.
    pub fn config(&self) -> &PlaidConfig {
        &self.config
    }

    async fn post<Body, Response>(&self, path: &str, body: &Body) -> Result<Response, Error>
    where
        Body: Serialize + ?Sized,
        Response: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("Sending request to Plaid: POST {url}");

        let response = self
            .http
            .post(&url)
            .header(CLIENT_ID_HEADER, &self.config.client_id)
            .header(SECRET_HEADER, &self.config.secret)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(|error| {
                Error::UpstreamRequest(format!("could not parse response from {path}: {error}"))
            });
        }

        match serde_json::from_slice::<PlaidError>(&bytes) {
            Ok(plaid_error) => {
                tracing::debug!("Plaid returned {status} for {path}: {plaid_error}");
                Err(Error::Upstream(plaid_error))
            }
            Err(_) => Err(Error::UpstreamRequest(format!(
                "unexpected status {status} from {path}"
            ))),
        }
    }
}

#[async_trait]
impl PlaidApi for PlaidClient {
    async fn exchange_public_token(&self, public_token: &str) -> Result<ItemAccessToken, Error> {
        self.post(
            "/item/public_token/exchange",
            &PublicTokenExchangeRequest { public_token },
        )
        .await
    }

    async fn get_auth(&self, access_token: &str) -> Result<AuthGetResponse, Error> {
        self.post("/auth/get", &AccessTokenRequest { access_token })
            .await
    }

    async fn get_accounts(&self, access_token: &str) -> Result<AccountsGetResponse, Error> {
        self.post("/accounts/get", &AccessTokenRequest { access_token })
            .await
    }

    async fn get_balances(&self, access_token: &str) -> Result<AccountsGetResponse, Error> {
        self.post("/accounts/balance/get", &AccessTokenRequest { access_token })
            .await
    }

    async fn get_identity(&self, access_token: &str) -> Result<IdentityGetResponse, Error> {
        self.post("/identity/get", &AccessTokenRequest { access_token })
            .await
    }

    async fn get_item(&self, access_token: &str) -> Result<ItemGetResponse, Error> {
        self.post("/item/get", &AccessTokenRequest { access_token })
            .await
    }

    async fn get_institution_by_id(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<InstitutionGetByIdResponse, Error> {
        self.post(
            "/institutions/get_by_id",
            &InstitutionGetByIdRequest {
                institution_id,
                country_codes,
            },
        )
        .await
    }

    async fn sync_transactions_page(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<TransactionsSyncResponse, Error> {
        self.post(
            "/transactions/sync",
            &TransactionsSyncRequest {
                access_token,
                cursor,
            },
        )
        .await
    }

    async fn create_link_token(
        &self,
        request: &LinkTokenCreateRequest,
    ) -> Result<LinkTokenCreateResponse, Error> {
        self.post("/link/token/create", request).await
    }

    async fn create_public_token(
        &self,
        access_token: &str,
    ) -> Result<PublicTokenCreateResponse, Error> {
        self.post(
            "/item/public_token/create",
            &AccessTokenRequest { access_token },
        )
        .await
    }

    async fn list_statements(&self, access_token: &str) -> Result<StatementsListResponse, Error> {
        self.post("/statements/list", &AccessTokenRequest { access_token })
            .await
    }

    async fn create_asset_report(
        &self,
        access_tokens: &[String],
        days_requested: u32,
    ) -> Result<AssetReportCreateResponse, Error> {
        self.post(
            "/asset_report/create",
            &AssetReportCreateRequest {
                access_tokens,
                days_requested,
            },
        )
        .await
    }

    async fn get_asset_report(
        &self,
        asset_report_token: &str,
    ) -> Result<AssetReportGetResponse, Error> {
        self.post(
            "/asset_report/get",
            &AssetReportGetRequest { asset_report_token },
        )
        .await
    }
}
