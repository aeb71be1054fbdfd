use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use expensa::{
    AppState, Currency, CurrencyPair, ExchangeRateConfig, LedgerConfig, PaginationConfig,
    create_sample_data,
};

/// A utility for creating a test database for expensa, with the default
/// accounts and a month of sample income and expenses.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The USD to COP rate used to convert the sample transactions.
    #[arg(long, default_value_t = 4100.0)]
    usd_cop: f64,

    /// The USD to EUR rate used to convert the sample transactions.
    #[arg(long, default_value_t = 0.92)]
    usd_eur: f64,
}

/// Create and populate a database for manual testing.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    let exchange_rate_config = ExchangeRateConfig::fixed(vec![
        (CurrencyPair::new(Currency::Usd, Currency::Cop), args.usd_cop),
        (CurrencyPair::new(Currency::Usd, Currency::Eur), args.usd_eur),
    ]);
    let state = AppState::new(
        conn,
        "Etc/UTC",
        PaginationConfig::default(),
        LedgerConfig::default(),
        &exchange_rate_config,
    )?;

    println!("Creating sample transactions...");
    let count = create_sample_data(&state).await?;

    println!("Created {count} transactions. Success!");

    Ok(())
}
