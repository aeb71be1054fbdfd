//! Resolving exchange rates from the cache, the online sources or, as a last
//! resort, the most recent stored rate.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    config::ExchangeRateConfig,
    currency::{Currency, CurrencyPair},
    database_id::ExchangeRateId,
    exchange::{
        rate::{
            ExchangeRate, get_exchange_rate_history, get_latest_exchange_rate,
            get_recent_exchange_rates, save_exchange_rate,
        },
        sources::{RateSource, build_sources},
    },
};

/// How a rate should be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLookup {
    /// Use a stored rate if it is younger than the cache max age.
    pub use_cache: bool,
    /// Ask the sources even if a fresh stored rate exists.
    pub force_update: bool,
}

impl Default for RateLookup {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_update: false,
        }
    }
}

impl RateLookup {
    /// Skip the cache and ask the sources.
    pub fn force() -> Self {
        Self {
            use_cache: true,
            force_update: true,
        }
    }
}

/// Where a resolved rate came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "source")]
pub enum RateOrigin {
    /// Both currencies are the same, so the rate is one.
    Identity,
    /// A stored rate younger than the cache max age.
    Cache,
    /// Freshly fetched from the named source.
    Fetched(String),
    /// Every source failed and an older stored rate was used instead.
    Stale,
}

/// An exchange rate along with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRate {
    /// The currencies the rate converts between.
    pub pair: CurrencyPair,
    /// How many units of `pair.to` one unit of `pair.from` buys.
    pub rate: f64,
    /// Where the rate came from.
    pub origin: RateOrigin,
    /// The stored rate record, if there is one.
    pub record_id: Option<ExchangeRateId>,
    /// When the rate was observed.
    pub observed_at: OffsetDateTime,
}

impl ResolvedRate {
    fn identity(pair: CurrencyPair) -> Self {
        Self {
            pair,
            rate: 1.0,
            origin: RateOrigin::Identity,
            record_id: None,
            observed_at: OffsetDateTime::now_utc(),
        }
    }

    fn from_record(record: ExchangeRate, origin: RateOrigin) -> Self {
        Self {
            pair: record.pair(),
            rate: record.rate,
            origin,
            record_id: Some(record.id),
            observed_at: record.created_at,
        }
    }

    /// The name of the source the rate ultimately came from.
    pub fn source_label(&self) -> &str {
        match &self.origin {
            RateOrigin::Identity => "identity",
            RateOrigin::Cache => "cache",
            RateOrigin::Fetched(source) => source,
            RateOrigin::Stale => "stale",
        }
    }
}

/// Gets exchange rates, caching every fetched rate in the database.
pub struct ExchangeRateService {
    db_connection: Arc<Mutex<Connection>>,
    sources: Vec<Box<dyn RateSource>>,
    cache_max_age: Duration,
}

impl fmt::Debug for ExchangeRateService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeRateService")
            .field("sources", &self.source_names())
            .field("cache_max_age", &self.cache_max_age)
            .finish_non_exhaustive()
    }
}

impl ExchangeRateService {
    /// Create a service that asks `sources` in order.
    pub fn new(
        db_connection: Arc<Mutex<Connection>>,
        sources: Vec<Box<dyn RateSource>>,
        cache_max_age: std::time::Duration,
    ) -> Self {
        Self {
            db_connection,
            sources,
            cache_max_age: Duration::try_from(cache_max_age).unwrap_or(Duration::MAX),
        }
    }

    /// Create a service with the sources described by `config`.
    ///
    /// # Errors
    /// Returns [Error::HttpClientError] if the HTTP client cannot be created.
    pub fn from_config(
        db_connection: Arc<Mutex<Connection>>,
        config: &ExchangeRateConfig,
    ) -> Result<Self, Error> {
        Ok(Self::new(
            db_connection,
            build_sources(config)?,
            config.cache_max_age,
        ))
    }

    /// The names of the sources, in the order they are asked.
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// The currencies that rates are kept for.
    pub fn supported_currencies(&self) -> &'static [Currency] {
        &Currency::ALL
    }

    /// Get the rate for converting `from` into `to`.
    ///
    /// Tries, in order, a fresh stored rate (unless `lookup` says otherwise),
    /// each source, and then the most recent stored rate regardless of age.
    /// Fetched rates are stored before they are returned.
    ///
    /// # Errors
    /// Returns [Error::NoExchangeRateFound] if no source has a rate and none
    /// is stored.
    pub async fn get_exchange_rate(
        &self,
        from: Currency,
        to: Currency,
        lookup: RateLookup,
    ) -> Result<ResolvedRate, Error> {
        let pair = CurrencyPair::new(from, to);

        if pair.is_identity() {
            return Ok(ResolvedRate::identity(pair));
        }

        if lookup.use_cache && !lookup.force_update {
            let cutoff = OffsetDateTime::now_utc().checked_sub(self.cache_max_age);
            let cached = self.with_connection(|connection| {
                get_latest_exchange_rate(pair, cutoff, connection)
            })?;

            if let Some(cached) = cached {
                tracing::debug!("Using cached rate for {pair}: {}", cached.rate);
                return Ok(ResolvedRate::from_record(cached, RateOrigin::Cache));
            }
        }

        if let Some((rate, source)) = self.fetch_from_sources(pair).await {
            let now = OffsetDateTime::now_utc();
            let record_id = match self.with_connection(|connection| {
                save_exchange_rate(pair, rate, source, now.date(), now, connection)
            }) {
                Ok(record) => Some(record.id),
                Err(error) => {
                    tracing::error!("Could not save the {pair} rate from {source}: {error}");
                    None
                }
            };

            return Ok(ResolvedRate {
                pair,
                rate,
                origin: RateOrigin::Fetched(source.to_owned()),
                record_id,
                observed_at: now,
            });
        }

        tracing::warn!("Every exchange rate source failed for {pair}, looking for a stored rate");

        match self.with_connection(|connection| get_latest_exchange_rate(pair, None, connection))? {
            Some(stale) => {
                tracing::warn!(
                    "Using a stale {pair} rate of {} from {}",
                    stale.rate,
                    stale.created_at
                );
                Ok(ResolvedRate::from_record(stale, RateOrigin::Stale))
            }
            None => {
                tracing::error!("No exchange rate available for {pair}");
                Err(Error::NoExchangeRateFound(pair.to_string()))
            }
        }
    }

    /// Get the rate for converting `from` into `to`, using the cache.
    pub async fn get_rate(&self, from: Currency, to: Currency) -> Result<ResolvedRate, Error> {
        self.get_exchange_rate(from, to, RateLookup::default()).await
    }

    /// Convert `amount` of `from` into `to` at the current rate.
    pub async fn convert_amount(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
    ) -> Result<(f64, ResolvedRate), Error> {
        let rate = self.get_rate(from, to).await?;

        Ok((amount * rate.rate, rate))
    }

    /// Ask the sources for a fresh rate for every pair of supported currencies.
    ///
    /// Returns whether a rate could be resolved for each pair, keyed by pair,
    /// e.g. "USD_COP". A pair whose sources all failed still counts when a
    /// stored rate could be used instead.
    pub async fn update_all_rates(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();

        for pair in CurrencyPair::all_pairs(self.supported_currencies()) {
            let updated = match self
                .get_exchange_rate(pair.from, pair.to, RateLookup::force())
                .await
            {
                Ok(rate) => {
                    if rate.origin == RateOrigin::Stale {
                        tracing::warn!("Kept the stored {pair} rate of {}", rate.rate);
                    }
                    true
                }
                Err(error) => {
                    tracing::warn!("Could not update {pair}: {error}");
                    false
                }
            };

            results.insert(pair.to_string(), updated);
        }

        let updated = results.values().filter(|updated| **updated).count();
        tracing::info!("Updated {updated} of {} exchange rates", results.len());

        results
    }

    /// The stored rates for `pair` from the last `days` days, newest first.
    pub fn rate_history(&self, pair: CurrencyPair, days: u32) -> Result<Vec<ExchangeRate>, Error> {
        let since = OffsetDateTime::now_utc().date() - Duration::days(i64::from(days));

        self.with_connection(|connection| get_exchange_rate_history(pair, since, connection))
    }

    /// The `limit` most recently stored rates across all pairs.
    pub fn recent_rates(&self, limit: u32) -> Result<Vec<ExchangeRate>, Error> {
        self.with_connection(|connection| get_recent_exchange_rates(limit, connection))
    }

    async fn fetch_from_sources(&self, pair: CurrencyPair) -> Option<(f64, &'static str)> {
        for source in &self.sources {
            match source.fetch_rate(pair).await {
                Ok(Some(rate)) if rate.is_finite() && rate > 0.0 => {
                    tracing::info!("Got {pair} = {rate} from {}", source.name());
                    return Some((rate, source.name()));
                }
                Ok(Some(rate)) => {
                    tracing::warn!("{} returned an invalid {pair} rate: {rate}", source.name());
                }
                Ok(None) => tracing::debug!("{} has no rate for {pair}", source.name()),
                Err(error) => tracing::warn!("{} failed to get {pair}: {error}", source.name()),
            }
        }

        None
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let connection = self
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        operation(&connection)
    }
}
