//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/bank-connections/{connection_id}/transactions/sync',
//! use [format_endpoint].

/// The home page with the Plaid Link launcher.
pub const ROOT: &str = "/";
/// The route for linking a bank with a public token from Plaid Link.
pub const BANKS: &str = "/banks";
/// The fragment listing all linked bank accounts.
pub const BANK_ACCOUNTS: &str = "/bank-accounts";
/// The route for pulling new transactions for a bank connection.
pub const SYNC_TRANSACTIONS: &str = "/bank-connections/{connection_id}/transactions/sync";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace and ends with a right
/// brace, e.g. '{connection_id}'. Only the first parameter is replaced.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|offset| param_start + offset + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
