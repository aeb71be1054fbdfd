use std::{fs::OpenOptions, net::SocketAddr, process::exit, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use expensa::{
    AppState, Currency, ExchangeRateConfig, LedgerConfig, PaginationConfig, build_router,
    graceful_shutdown,
};

/// The web server for expensa, a multi-currency income and expense tracker.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: String,

    /// The port to serve the app from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// The local timezone as a canonical timezone name, e.g. "America/Bogota".
    #[arg(long, env = "TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// File path to append debug logs to.
    #[arg(long, env = "LOG_PATH", default_value = "debug.log")]
    log_path: String,

    /// The currency totals and reports are converted to.
    #[arg(long, env = "BASE_CURRENCY", default_value = "USD")]
    base_currency: Currency,

    /// The currency preselected when recording income.
    #[arg(long, env = "DEFAULT_INCOME_CURRENCY", default_value = "COP")]
    default_income_currency: Currency,

    /// The currency preselected when recording an expense.
    #[arg(long, env = "DEFAULT_EXPENSE_CURRENCY", default_value = "USD")]
    default_expense_currency: Currency,

    /// The number of transactions to show per page.
    #[arg(long, env = "ITEMS_PER_PAGE", default_value_t = 20)]
    page_size: u64,

    /// How many seconds a stored exchange rate is used before asking the sources again.
    #[arg(long, env = "EXCHANGE_RATE_CACHE_TIMEOUT", default_value_t = 3600)]
    rate_cache_seconds: u64,

    /// The access key for the Fixer API. Fixer is skipped without one.
    #[arg(long, env = "FIXER_API_KEY", hide_env_values = true)]
    fixer_api_key: Option<String>,

    /// Do not scrape the XE currency converter when the APIs fail.
    #[arg(long, env = "DISABLE_XE_FALLBACK")]
    no_xe_fallback: bool,

    /// The URL of a WebDriver server, e.g. "http://localhost:9515", for
    /// scraping XE with a headless browser.
    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,

    /// Use these rates instead of the online sources, e.g. "USD_COP=4100,USD_EUR=0.92".
    #[arg(long, env = "FIXED_EXCHANGE_RATES")]
    fixed_rates: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logging(&args.log_path);

    let exchange_rate_config = match exchange_rate_config(&args) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("Invalid exchange rate settings: {error}");
            exit(1);
        }
    };

    let ledger_config = LedgerConfig {
        base_currency: args.base_currency,
        default_income_currency: args.default_income_currency,
        default_expense_currency: args.default_expense_currency,
    };

    let pagination_config = PaginationConfig {
        default_page_size: args.page_size,
        ..Default::default()
    };

    let connection = match Connection::open(&args.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not open the database at {}: {error}", args.db_path);
            exit(1);
        }
    };

    let app_state = match AppState::new(
        connection,
        &args.timezone,
        pagination_config,
        ledger_config,
        &exchange_rate_config,
    ) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Could not set up the app: {error}");
            exit(1);
        }
    };

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(app_state));

    #[cfg(debug_assertions)]
    let router = router
        .layer(axum::middleware::from_fn(expensa::logging_middleware))
        .layer(LiveReloadLayer::new());

    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("The server stopped unexpectedly: {error}");
        exit(1);
    }
}

fn exchange_rate_config(args: &Args) -> Result<ExchangeRateConfig, expensa::Error> {
    let fixed_rates = match &args.fixed_rates {
        Some(text) => ExchangeRateConfig::parse_fixed_rates(text)?,
        None => Vec::new(),
    };

    if !fixed_rates.is_empty() {
        tracing::info!("Using {} fixed exchange rates", fixed_rates.len());
    }

    Ok(ExchangeRateConfig {
        cache_max_age: Duration::from_secs(args.rate_cache_seconds),
        fixer_api_key: args.fixer_api_key.clone(),
        xe_fallback: !args.no_xe_fallback,
        webdriver_url: args.webdriver_url.clone(),
        fixed_rates,
        ..Default::default()
    })
}

fn setup_logging(log_path: &str) {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .expect("Could not create log file");

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(stdout_log.with_filter(stdout_filter))
        .with(debug_log.with_filter(filter::LevelFilter::DEBUG))
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
