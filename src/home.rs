//! The home page, which starts Plaid Link and lists the linked accounts.

use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::OffsetDateTime;

use crate::{
    AppState, Error,
    banking::{PlaidApi, create_link_token},
    config::PlaidConfig,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base, loading_spinner},
    link::BANK_ACCOUNTS_CHANGED_EVENT,
};

/// The script that provides `Plaid.create`.
const PLAID_LINK_SCRIPT: &str = "https://cdn.plaid.com/link/v2/stable/link-initialize.js";

/// The state needed for [get_home_page].
#[derive(Clone)]
pub struct HomePageState {
    pub plaid: Arc<dyn PlaidApi>,
    pub plaid_config: Arc<PlaidConfig>,
}

impl FromRef<AppState> for HomePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            plaid: state.plaid.clone(),
            plaid_config: state.plaid_config.clone(),
        }
    }
}

/// Display the home page with a fresh link token.
pub async fn get_home_page(State(state): State<HomePageState>) -> Result<Response, Error> {
    let link_token = create_link_token(
        state.plaid.as_ref(),
        &state.plaid_config,
        OffsetDateTime::now_utc(),
    )
    .await
    .inspect_err(|error| tracing::error!("could not create link token: {error}"))?;

    Ok(home_view(&link_token).into_response())
}

fn home_view(link_token: &str) -> Markup {
    let static_script = format!("{}/plaid_link.js", endpoints::STATIC);
    let accounts_trigger = format!("load, {BANK_ACCOUNTS_CHANGED_EVENT} from:body");

    let content = html!(
        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-4xl space-y-6"
            {
                div class="flex items-center justify-between"
                {
                    h1 class="text-2xl font-bold" { "Bank accounts" }

                    button
                        id="link-button"
                        type="button"
                        class=(BUTTON_PRIMARY_STYLE)
                        data-link-token=(link_token)
                    {
                        "Link a bank"
                    }
                }

                form
                    id="link-form"
                    hx-post=(endpoints::BANKS)
                    hx-target="#link-result"
                    hx-target-error="#alert-container"
                {
                    input type="hidden" name="public_token" value="";
                }

                div id="link-result" {}

                div
                    id="bank-accounts"
                    class="relative overflow-x-auto shadow-md sm:rounded-lg"
                    hx-get=(endpoints::BANK_ACCOUNTS)
                    hx-trigger=(accounts_trigger)
                    hx-target-error="#alert-container"
                {
                    (loading_spinner())
                }

                div id="sync-result" {}
            }
        }
    );

    base(
        "Home",
        &[
            HeadElement::ScriptLink(PLAID_LINK_SCRIPT.to_owned()),
            HeadElement::ScriptLink(static_script),
        ],
        &content,
    )
}
