use std::{
    fs::OpenOptions,
    net::SocketAddr,
    sync::Arc,
};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use plaid_ledger::{
    AppState, PlaidClient, PlaidConfig, build_router, graceful_shutdown, logging_middleware,
};

/// The web server for linking bank accounts with Plaid.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: String,

    /// The port to serve the app from.
    #[arg(short, long, env = "APP_PORT", default_value_t = 42069)]
    port: u16,

    /// The Plaid client ID.
    #[arg(long, env = "PLAID_CLIENT_ID")]
    plaid_client_id: String,

    /// The Plaid secret for the chosen environment.
    #[arg(long, env = "PLAID_SECRET", hide_env_values = true)]
    plaid_secret: String,

    /// The Plaid environment: sandbox, development or production.
    #[arg(long, env = "PLAID_ENV", default_value = "sandbox")]
    plaid_env: String,

    /// Comma separated Plaid products to request, e.g. "auth,transactions".
    #[arg(long, env = "PLAID_PRODUCTS", default_value = "transactions")]
    plaid_products: String,

    /// Comma separated country codes of the institutions to show in Plaid Link.
    #[arg(long, env = "PLAID_COUNTRY_CODES", default_value = "US")]
    plaid_country_codes: String,

    /// The OAuth redirect URI registered with Plaid.
    #[arg(long, env = "PLAID_REDIRECT_URI")]
    plaid_redirect_uri: Option<String>,
}

#[tokio::main]
async fn main() {
    let dotenv_result = dotenvy::dotenv();

    setup_logging();

    if let Err(error) = dotenv_result {
        tracing::info!("Not loading a .env file: {error}");
    }

    let args = Args::parse();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let plaid_config = PlaidConfig::new(
        &args.plaid_client_id,
        &args.plaid_secret,
        &args.plaid_env,
        &args.plaid_products,
        &args.plaid_country_codes,
        args.plaid_redirect_uri.as_deref(),
    )
    .expect("Invalid Plaid configuration");
    tracing::info!("Using Plaid config: {plaid_config:?}");

    let plaid = PlaidClient::new(plaid_config.clone()).expect("Could not create the Plaid client");

    let conn = Connection::open(&args.db_path).expect("Could not open the database");
    let state =
        AppState::new(conn, Arc::new(plaid), plaid_config).expect("Could not create app state");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router =
        add_tracing_layer(build_router(state).layer(middleware::from_fn(logging_middleware)));

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("Server stopped with an error");
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    let layers = stdout_log
        .with_filter(filter::LevelFilter::INFO)
        .and_then(debug_log)
        .with_filter(filter::LevelFilter::DEBUG);

    // `RUST_LOG` narrows what is logged, e.g. `RUST_LOG=plaid_ledger=debug`.
    let env_filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok());

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
