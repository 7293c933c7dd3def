//! Application router configuration.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    bank_account::get_bank_accounts_fragment,
    endpoints,
    home::get_home_page,
    internal_server_error::get_internal_server_error_page,
    link::link_bank_endpoint,
    not_found::get_404_not_found,
    transaction::sync_transactions_endpoint,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::ROOT, get(get_home_page))
        .route(endpoints::BANKS, post(link_bank_endpoint))
        .route(endpoints::BANK_ACCOUNTS, get(get_bank_accounts_fragment))
        .route(
            endpoints::SYNC_TRANSACTIONS,
            post(sync_transactions_endpoint),
        )
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        )
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}
