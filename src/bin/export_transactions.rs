use std::{error::Error, fs::File, path::Path, process::exit};

use clap::Parser;
use rusqlite::Connection;

use expensa::{TransactionFilter, get_transactions, initialize_db, write_transactions_csv};

/// Write every active transaction in an expensa database to a CSV file.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: String,

    /// File path to write the CSV file to.
    #[arg(long, short, default_value = "transactions_export.csv")]
    output_path: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let db_path = Path::new(&args.db_path);
    if !db_path.is_file() {
        eprintln!("No database found at {db_path:#?}.");
        exit(1);
    }

    let connection = Connection::open(db_path)?;
    initialize_db(&connection)?;

    let transactions = get_transactions(&TransactionFilter::default(), &connection)?;

    let output_path = Path::new(&args.output_path);
    let file = File::create(output_path)?;
    write_transactions_csv(&transactions, file)?;

    println!(
        "Exported {} transactions to {output_path:#?}",
        transactions.len()
    );

    Ok(())
}
