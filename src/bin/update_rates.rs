use std::{
    error::Error,
    sync::{Arc, Mutex},
};

use clap::Parser;
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use expensa::{ExchangeRateConfig, ExchangeRateService, initialize_db};

/// Fetch the latest rate for every supported currency pair and store it.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: String,

    /// The access key for the Fixer API. Fixer is skipped without one.
    #[arg(long, env = "FIXER_API_KEY", hide_env_values = true)]
    fixer_api_key: Option<String>,

    /// Do not scrape the XE currency converter when the APIs fail.
    #[arg(long, env = "DISABLE_XE_FALLBACK")]
    no_xe_fallback: bool,

    /// The URL of a WebDriver server for scraping XE with a headless browser.
    #[arg(long, env = "WEBDRIVER_URL")]
    webdriver_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    let config = ExchangeRateConfig {
        fixer_api_key: args.fixer_api_key,
        xe_fallback: !args.no_xe_fallback,
        webdriver_url: args.webdriver_url,
        ..Default::default()
    };
    let service = ExchangeRateService::from_config(Arc::new(Mutex::new(connection)), &config)?;

    println!("Updating exchange rates...");
    let results = service.update_all_rates().await;

    for (pair, updated) in &results {
        let mark = if *updated { "✓" } else { "✗" };
        println!("  {mark} {pair}");
    }

    let updated = results.values().filter(|updated| **updated).count();
    println!("Updated {updated} of {} rates.", results.len());

    if updated == 0 {
        return Err("no exchange rates could be updated".into());
    }

    Ok(())
}
