//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    Error,
    account::seed_default_accounts,
    config::{ExchangeRateConfig, LedgerConfig},
    db::initialize,
    exchange::ExchangeRateService,
    pagination::PaginationConfig,
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The local timezone as a canonical timezone name, e.g. "America/Bogota".
    pub local_timezone: String,

    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,

    /// The base and default currencies.
    pub ledger_config: LedgerConfig,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Gets and caches exchange rates.
    pub exchange_rates: Arc<ExchangeRateService>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the
    /// domain models and the default accounts. `local_timezone` should be a
    /// valid, canonical timezone name, e.g. "America/Bogota".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized or the HTTP
    /// client for the exchange rate sources cannot be created.
    pub fn new(
        db_connection: Connection,
        local_timezone: &str,
        pagination_config: PaginationConfig,
        ledger_config: LedgerConfig,
        exchange_rate_config: &ExchangeRateConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;
        seed_default_accounts(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));
        let exchange_rates =
            ExchangeRateService::from_config(connection.clone(), exchange_rate_config)?;

        Ok(Self {
            local_timezone: local_timezone.to_owned(),
            pagination_config,
            ledger_config,
            db_connection: connection,
            exchange_rates: Arc::new(exchange_rates),
        })
    }
}
