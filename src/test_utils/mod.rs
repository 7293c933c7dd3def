#![allow(missing_docs)]

pub(crate) mod fake_plaid;
pub(crate) mod html;
pub(crate) mod http;

pub(crate) use fake_plaid::{
    FakePlaidApi, asset_report, asset_report_created, auth_response, item_access_token,
    link_token_response, plaid_account, plaid_error, plaid_transaction, sync_page,
};
pub(crate) use html::{assert_valid_html, parse_html_document, parse_html_fragment, select_texts};
pub(crate) use http::{assert_content_type, assert_hx_trigger};
