//! Settings for talking to the Plaid API.

use std::{fmt, str::FromStr};

use crate::Error;

/// The Plaid environment that API requests are sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaidEnvironment {
    /// Test credentials and fake institutions.
    Sandbox,
    /// Real institutions with a limited number of items.
    Development,
    /// Real institutions.
    Production,
}

impl PlaidEnvironment {
    /// The base URL of the Plaid API for this environment.
    pub fn base_url(&self) -> &'static str {
        match self {
            PlaidEnvironment::Sandbox => "https://sandbox.plaid.com",
            PlaidEnvironment::Development => "https://development.plaid.com",
            PlaidEnvironment::Production => "https://production.plaid.com",
        }
    }
}

impl FromStr for PlaidEnvironment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sandbox" => Ok(PlaidEnvironment::Sandbox),
            "development" => Ok(PlaidEnvironment::Development),
            "production" => Ok(PlaidEnvironment::Production),
            other => Err(Error::Config(format!(
                "incorrect value for the Plaid environment: \"{other}\""
            ))),
        }
    }
}

/// The product requested when no products are configured.
pub const DEFAULT_PRODUCT: &str = "transactions";
/// The country code used when no country codes are configured.
pub const DEFAULT_COUNTRY_CODE: &str = "US";

/// The validated configuration for the Plaid client.
#[derive(Clone, PartialEq)]
pub struct PlaidConfig {
    /// The Plaid client ID.
    pub client_id: String,
    /// The Plaid secret for [PlaidConfig::environment].
    pub secret: String,
    /// The Plaid environment.
    pub environment: PlaidEnvironment,
    /// Where requests are sent, usually [PlaidEnvironment::base_url].
    pub base_url: String,
    /// The products to request when creating link tokens, e.g. "transactions".
    pub products: Vec<String>,
    /// Institutions from all of these countries are shown in Plaid Link.
    pub country_codes: Vec<String>,
    /// The OAuth redirect URI registered with Plaid, if any.
    pub redirect_uri: Option<String>,
}

impl PlaidConfig {
    /// Create a config from raw settings, e.g. environment variables.
    ///
    /// `products` and `country_codes` are comma separated lists. Empty lists
    /// fall back to [DEFAULT_PRODUCT] and [DEFAULT_COUNTRY_CODE].
    ///
    /// # Errors
    /// Returns [Error::Config] if the client ID or secret is empty, or if
    /// `environment` is not one of "sandbox", "development" or "production".
    pub fn new(
        client_id: &str,
        secret: &str,
        environment: &str,
        products: &str,
        country_codes: &str,
        redirect_uri: Option<&str>,
    ) -> Result<Self, Error> {
        if client_id.trim().is_empty() {
            return Err(Error::Config(
                "PLAID_CLIENT_ID is not set. Make sure to fill out the .env file".to_owned(),
            ));
        }

        if secret.trim().is_empty() {
            return Err(Error::Config(
                "PLAID_SECRET is not set. Make sure to fill out the .env file".to_owned(),
            ));
        }

        let environment: PlaidEnvironment = environment.trim().parse()?;

        Ok(Self {
            client_id: client_id.trim().to_owned(),
            secret: secret.trim().to_owned(),
            environment,
            base_url: environment.base_url().to_owned(),
            products: parse_list(products, DEFAULT_PRODUCT),
            country_codes: parse_list(country_codes, DEFAULT_COUNTRY_CODE),
            redirect_uri: redirect_uri
                .map(str::trim)
                .filter(|uri| !uri.is_empty())
                .map(str::to_owned),
        })
    }

    /// Send requests to `base_url` instead of the environment's URL.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    /// Whether `product` is one of the configured products.
    pub fn has_product(&self, product: &str) -> bool {
        self.products.iter().any(|configured| configured == product)
    }
}

impl fmt::Debug for PlaidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaidConfig")
            .field("client_id", &self.client_id)
            .field("secret", &"********")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("products", &self.products)
            .field("country_codes", &self.country_codes)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

fn parse_list(text: &str, default: &str) -> Vec<String> {
    let items: Vec<String> = text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect();

    if items.is_empty() {
        vec![default.to_owned()]
    } else {
        items
    }
}
