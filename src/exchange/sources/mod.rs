//! The online sources that exchange rates are fetched from.

mod ecb;
mod exchangerate_api;
mod fixed;
mod fixer;
mod webdriver;
mod xe;

pub use ecb::EcbSource;
pub use exchangerate_api::ExchangeRateApiSource;
pub use fixed::FixedRateSource;
pub use fixer::FixerSource;
pub use webdriver::WebDriverSource;
pub use xe::XeScrapeSource;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::{Error, config::ExchangeRateConfig, currency::CurrencyPair};

/// The user agent sent with every request to a rate source.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// The ways a request to a rate source can fail.
///
/// Failed requests are retried, whereas a source answering that it has no
/// rate for a pair is not.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("could not parse the response: {0}")]
    Parse(String),

    #[error("webdriver command failed: {0}")]
    WebDriver(String),
}

/// Something that knows the exchange rate between two currencies.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// The name stored alongside the rates from this source.
    fn name(&self) -> &'static str;

    /// Get the rate for `pair`, or `None` if this source does not offer it.
    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError>;
}

/// Create the HTTP client shared by the online sources.
pub fn build_http_client(config: &ExchangeRateConfig) -> Result<Client, Error> {
    Client::builder()
        .timeout(config.request_timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|error| Error::HttpClientError(error.to_string()))
}

/// Create the sources in the order they should be asked.
///
/// Configured fixed rates replace the online sources entirely.
pub fn build_sources(config: &ExchangeRateConfig) -> Result<Vec<Box<dyn RateSource>>, Error> {
    if !config.fixed_rates.is_empty() {
        return Ok(vec![Box::new(FixedRateSource::new(
            config.fixed_rates.iter().copied(),
        ))]);
    }

    let client = build_http_client(config)?;

    Ok(vec![
        Box::new(FixerSource::new(
            client.clone(),
            &config.fixer_base_url,
            config.fixer_api_key.clone(),
        )),
        Box::new(ExchangeRateApiSource::new(
            client.clone(),
            &config.exchangerate_api_base_url,
        )),
        Box::new(EcbSource::new(client.clone(), &config.ecb_url)),
        Box::new(XeScrapeSource::new(
            client.clone(),
            &config.xe_url,
            config.xe_fallback,
        )),
        Box::new(WebDriverSource::new(
            client,
            config.webdriver_url.clone(),
            &config.xe_url,
            config.xe_fallback,
        )),
    ])
}

/// Turn a non-success status into an error so that it is retried.
fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();

    if status.is_success() {
        Ok(response)
    } else {
        Err(SourceError::Status(status))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::ExchangeRateConfig,
        currency::{Currency, CurrencyPair},
        exchange::sources::build_sources,
    };

    #[test]
    fn online_sources_are_in_priority_order() {
        let sources = build_sources(&ExchangeRateConfig::default()).unwrap();

        let names: Vec<&str> = sources.iter().map(|source| source.name()).collect();
        assert_eq!(names, vec!["fixer", "exchangerate-api", "ecb", "xe", "xe-browser"]);
    }

    #[test]
    fn fixed_rates_replace_online_sources() {
        let config =
            ExchangeRateConfig::fixed(vec![(CurrencyPair::new(Currency::Usd, Currency::Cop), 4000.0)]);

        let sources = build_sources(&config).unwrap();

        let names: Vec<&str> = sources.iter().map(|source| source.name()).collect();
        assert_eq!(names, vec!["fixed"]);
    }
}
