//! Stored exchange rates. Every rate fetched from a source is kept for auditing.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    currency::{Currency, CurrencyPair},
    database_id::ExchangeRateId,
};

/// An exchange rate observed from a source at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeRate {
    pub id: ExchangeRateId,
    pub from_currency: Currency,
    pub to_currency: Currency,
    /// How many units of `to_currency` one unit of `from_currency` buys.
    pub rate: f64,
    /// The name of the source the rate came from, e.g. "ecb".
    pub source: String,
    /// The date the rate applies to.
    pub date: Date,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ExchangeRate {
    pub fn pair(&self) -> CurrencyPair {
        CurrencyPair::new(self.from_currency, self.to_currency)
    }
}

const EXCHANGE_RATE_COLUMNS: &str =
    "id, from_currency, to_currency, rate, source, date, is_active, created_at";

pub fn create_exchange_rate_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS exchange_rate (
            id INTEGER PRIMARY KEY,
            from_currency TEXT NOT NULL,
            to_currency TEXT NOT NULL,
            rate REAL NOT NULL CHECK (rate > 0),
            source TEXT NOT NULL,
            date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            CHECK (from_currency != to_currency)
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_exchange_rate_pair_date
            ON exchange_rate(from_currency, to_currency, date)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_exchange_rate_active_date
            ON exchange_rate(is_active, date)",
        (),
    )?;

    Ok(())
}

fn map_exchange_rate_row(row: &Row) -> Result<ExchangeRate, rusqlite::Error> {
    Ok(ExchangeRate {
        id: row.get(0)?,
        from_currency: row.get(1)?,
        to_currency: row.get(2)?,
        rate: row.get(3)?,
        source: row.get(4)?,
        date: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Store a rate for `pair` observed from `source`.
///
/// # Errors
/// Returns [Error::SqlError] if the rate is not positive or the pair is
/// not two different currencies, since the table rejects those rows.
pub fn save_exchange_rate(
    pair: CurrencyPair,
    rate: f64,
    source: &str,
    date: Date,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<ExchangeRate, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO exchange_rate (from_currency, to_currency, rate, source, date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {EXCHANGE_RATE_COLUMNS}"
        ))?
        .query_row(
            (pair.from, pair.to, rate, source, date, created_at),
            map_exchange_rate_row,
        )
        .map_err(Error::from)
}

/// Get a stored rate by its ID.
pub fn get_exchange_rate(id: ExchangeRateId, connection: &Connection) -> Result<ExchangeRate, Error> {
    connection
        .prepare(&format!(
            "SELECT {EXCHANGE_RATE_COLUMNS} FROM exchange_rate WHERE id = ?1"
        ))?
        .query_row((id,), map_exchange_rate_row)
        .map_err(Error::from)
}

/// Get the most recently stored active rate for `pair`.
///
/// If `created_after` is given, rates stored before then are ignored.
pub fn get_latest_exchange_rate(
    pair: CurrencyPair,
    created_after: Option<OffsetDateTime>,
    connection: &Connection,
) -> Result<Option<ExchangeRate>, Error> {
    let query = format!(
        "SELECT {EXCHANGE_RATE_COLUMNS} FROM exchange_rate
         WHERE from_currency = ?1 AND to_currency = ?2 AND is_active = 1
            AND (?3 IS NULL OR created_at >= ?3)
         ORDER BY created_at DESC, id DESC
         LIMIT 1"
    );

    connection
        .prepare(&query)?
        .query_row((pair.from, pair.to, created_after), map_exchange_rate_row)
        .optional()
        .map_err(Error::from)
}

/// Get the active rates for `pair` dated on or after `since`, newest first.
pub fn get_exchange_rate_history(
    pair: CurrencyPair,
    since: Date,
    connection: &Connection,
) -> Result<Vec<ExchangeRate>, Error> {
    connection
        .prepare(&format!(
            "SELECT {EXCHANGE_RATE_COLUMNS} FROM exchange_rate
             WHERE from_currency = ?1 AND to_currency = ?2 AND is_active = 1 AND date >= ?3
             ORDER BY date DESC, created_at DESC"
        ))?
        .query_map((pair.from, pair.to, since), map_exchange_rate_row)?
        .map(|maybe_rate| maybe_rate.map_err(Error::from))
        .collect()
}

/// Get the `limit` most recently stored rates across all pairs.
pub fn get_recent_exchange_rates(
    limit: u32,
    connection: &Connection,
) -> Result<Vec<ExchangeRate>, Error> {
    connection
        .prepare(&format!(
            "SELECT {EXCHANGE_RATE_COLUMNS} FROM exchange_rate
             WHERE is_active = 1
             ORDER BY created_at DESC, id DESC
             LIMIT ?1"
        ))?
        .query_map((limit,), map_exchange_rate_row)?
        .map(|maybe_rate| maybe_rate.map_err(Error::from))
        .collect()
}

/// Count the stored rates.
pub fn count_exchange_rates(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM exchange_rate", [], |row| row.get(0))
        .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::date};

    use crate::{
        currency::{Currency, CurrencyPair},
        db::initialize,
        exchange::rate::{
            count_exchange_rates, get_exchange_rate_history, get_latest_exchange_rate,
            get_recent_exchange_rates, save_exchange_rate,
        },
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    const USD_COP: CurrencyPair = CurrencyPair {
        from: Currency::Usd,
        to: Currency::Cop,
    };

    #[test]
    fn rejects_non_positive_rate() {
        let conn = get_test_connection();
        let now = OffsetDateTime::now_utc();

        let result = save_exchange_rate(USD_COP, 0.0, "test", now.date(), now, &conn);

        assert!(result.is_err());
    }

    #[test]
    fn rejects_same_currency_pair() {
        let conn = get_test_connection();
        let now = OffsetDateTime::now_utc();
        let pair = CurrencyPair::new(Currency::Usd, Currency::Usd);

        let result = save_exchange_rate(pair, 1.0, "test", now.date(), now, &conn);

        assert!(result.is_err());
    }

    #[test]
    fn latest_rate_respects_cutoff() {
        let conn = get_test_connection();
        let now = OffsetDateTime::now_utc();
        let two_hours_ago = now - Duration::hours(2);
        save_exchange_rate(USD_COP, 4000.0, "old", two_hours_ago.date(), two_hours_ago, &conn)
            .unwrap();

        let fresh = get_latest_exchange_rate(USD_COP, Some(now - Duration::hours(1)), &conn);
        let any = get_latest_exchange_rate(USD_COP, None, &conn).unwrap();

        assert_eq!(fresh, Ok(None));
        assert_eq!(any.map(|rate| rate.rate), Some(4000.0));
    }

    #[test]
    fn latest_rate_is_newest() {
        let conn = get_test_connection();
        let now = OffsetDateTime::now_utc();
        save_exchange_rate(USD_COP, 4000.0, "a", now.date(), now - Duration::minutes(5), &conn)
            .unwrap();
        save_exchange_rate(USD_COP, 4100.0, "b", now.date(), now, &conn).unwrap();
        save_exchange_rate(
            CurrencyPair::new(Currency::Cop, Currency::Usd),
            0.00025,
            "c",
            now.date(),
            now,
            &conn,
        )
        .unwrap();

        let latest = get_latest_exchange_rate(USD_COP, None, &conn)
            .unwrap()
            .expect("rate missing");

        assert_eq!(latest.rate, 4100.0);
        assert_eq!(latest.source, "b");
        assert_eq!(count_exchange_rates(&conn), Ok(3));
    }

    #[test]
    fn history_filters_by_date_and_pair() {
        let conn = get_test_connection();
        let now = OffsetDateTime::now_utc();
        save_exchange_rate(USD_COP, 3900.0, "a", date!(2025 - 01 - 01), now, &conn).unwrap();
        save_exchange_rate(USD_COP, 4000.0, "a", date!(2025 - 02 - 01), now, &conn).unwrap();
        save_exchange_rate(USD_COP, 4100.0, "a", date!(2025 - 03 - 01), now, &conn).unwrap();

        let history = get_exchange_rate_history(USD_COP, date!(2025 - 02 - 01), &conn).unwrap();

        let rates: Vec<f64> = history.iter().map(|rate| rate.rate).collect();
        assert_eq!(rates, vec![4100.0, 4000.0]);
    }

    #[test]
    fn recent_rates_are_limited() {
        let conn = get_test_connection();
        let now = OffsetDateTime::now_utc();
        for i in 1..=5 {
            save_exchange_rate(
                USD_COP,
                4000.0 + i as f64,
                "a",
                now.date(),
                now + Duration::seconds(i),
                &conn,
            )
            .unwrap();
        }

        let recent = get_recent_exchange_rates(3, &conn).unwrap();

        let rates: Vec<f64> = recent.iter().map(|rate| rate.rate).collect();
        assert_eq!(rates, vec![4005.0, 4004.0, 4003.0]);
    }
}
