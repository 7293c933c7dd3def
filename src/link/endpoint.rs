use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form,
    extract::{FromRef, State, rejection::FormRejection},
    response::{IntoResponse, Response},
};
use axum_htmx::HX_TRIGGER;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, bank_account::bank_accounts_table, banking::PlaidApi, link::link_bank,
};

/// The event that tells the page to reload its list of bank accounts.
pub const BANK_ACCOUNTS_CHANGED_EVENT: &str = "bank-accounts-changed";

/// The state needed for [link_bank_endpoint].
#[derive(Clone)]
pub struct LinkBankState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub plaid: Arc<dyn PlaidApi>,
    /// The longest the database writes of a link may take.
    pub link_timeout: Duration,
}

impl FromRef<AppState> for LinkBankState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            plaid: state.plaid.clone(),
            link_timeout: state.link_timeout,
        }
    }
}

/// The form Plaid Link's success callback posts.
#[derive(Debug, Default, Deserialize)]
pub struct LinkBankForm {
    #[serde(default, alias = "publicToken")]
    pub public_token: Option<String>,
}

/// A route handler for linking a bank with a public token from Plaid Link.
///
/// Responds with a table of the newly linked accounts and triggers
/// [BANK_ACCOUNTS_CHANGED_EVENT], or an error alert.
pub async fn link_bank_endpoint(
    State(state): State<LinkBankState>,
    form: Result<Form<LinkBankForm>, FormRejection>,
) -> Response {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => return Error::InvalidForm(rejection.body_text()).into_alert_response(),
    };

    let public_token = match form.public_token {
        Some(token) if !token.trim().is_empty() => token,
        _ => return Error::MissingFormField("public_token").into_alert_response(),
    };

    match link_bank(
        state.plaid.as_ref(),
        &state.db_connection,
        public_token.trim(),
        state.link_timeout,
    )
    .await
    {
        Ok(linked) => (
            [(HX_TRIGGER, BANK_ACCOUNTS_CHANGED_EVENT)],
            bank_accounts_table(&linked.accounts),
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Could not link bank: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod link_bank_endpoint_tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{
        Form,
        extract::{State, rejection::FormRejection},
        http::StatusCode,
    };
    use rusqlite::Connection;

    use crate::{
        Error,
        bank_account::list_all_bank_accounts,
        db::initialize,
        test_utils::{
            FakePlaidApi, assert_hx_trigger, assert_valid_html, auth_response, item_access_token,
            parse_html_fragment, plaid_account, plaid_error, select_texts,
        },
    };

    use super::{BANK_ACCOUNTS_CHANGED_EVENT, LinkBankForm, LinkBankState, link_bank_endpoint};

    fn get_test_state(plaid: Arc<FakePlaidApi>) -> LinkBankState {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        LinkBankState {
            db_connection: Arc::new(Mutex::new(connection)),
            plaid,
            link_timeout: Duration::from_secs(10),
        }
    }

    fn form(public_token: &str) -> Result<Form<LinkBankForm>, FormRejection> {
        Ok(Form(LinkBankForm {
            public_token: Some(public_token.to_owned()),
        }))
    }

    #[tokio::test]
    async fn links_bank_and_lists_new_accounts() {
        let plaid = Arc::new(FakePlaidApi::default());
        plaid.push_exchange(Ok(item_access_token("access-1", "item-1")));
        plaid.push_auth(Ok(auth_response(
            "item-1",
            vec![plaid_account("acc-1", "Checking", "depository", "1234.56")],
        )));
        let state = get_test_state(plaid.clone());

        let response = link_bank_endpoint(State(state.clone()), form("public-xyz")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_hx_trigger(&response, BANK_ACCOUNTS_CHANGED_EVENT);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        assert_eq!(select_texts(&html, "tbody th"), vec!["Checking"]);
        assert_eq!(plaid.exchanged_tokens(), vec!["public-xyz"]);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(list_all_bank_accounts(&connection).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_public_token_is_bad_request() {
        let plaid = Arc::new(FakePlaidApi::default());
        let state = get_test_state(plaid.clone());

        let response = link_bank_endpoint(State(state), Ok(Form(LinkBankForm::default()))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        assert_eq!(
            select_texts(&html, "[role=alert] p.font-medium"),
            vec!["Missing form data"]
        );
        assert!(plaid.exchanged_tokens().is_empty());
    }

    #[tokio::test]
    async fn blank_public_token_is_bad_request() {
        let plaid = Arc::new(FakePlaidApi::default());
        let state = get_test_state(plaid.clone());

        let response = link_bank_endpoint(State(state), form("   ")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(plaid.exchanged_tokens().is_empty());
    }

    #[tokio::test]
    async fn rejected_token_returns_generic_error() {
        let plaid = Arc::new(FakePlaidApi::default());
        plaid.push_exchange(Err(Error::Upstream(plaid_error(
            "INVALID_INPUT",
            "INVALID_PUBLIC_TOKEN",
        ))));
        let state = get_test_state(plaid);

        let response = link_bank_endpoint(State(state.clone()), form("public-expired")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = parse_html_fragment(response).await;
        let texts = select_texts(&html, "[role=alert] p");
        assert_eq!(texts[0], "Could not reach your bank");
        assert!(texts.iter().all(|text| !text.contains("INVALID_PUBLIC_TOKEN")));
        let connection = state.db_connection.lock().unwrap();
        assert!(list_all_bank_accounts(&connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_returns_generic_error() {
        let plaid = Arc::new(FakePlaidApi::default());
        plaid.push_exchange(Ok(item_access_token("access-1", "item-1")));
        plaid.push_auth(Ok(auth_response(
            "item-1",
            vec![
                plaid_account("acc-1", "Checking", "depository", "1.00"),
                plaid_account("acc-1", "Checking", "depository", "1.00"),
            ],
        )));
        let state = get_test_state(plaid);

        let response = link_bank_endpoint(State(state), form("public-xyz")).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let html = parse_html_fragment(response).await;
        assert_eq!(
            select_texts(&html, "[role=alert] p.font-medium"),
            vec!["Something went wrong"]
        );
    }
}
