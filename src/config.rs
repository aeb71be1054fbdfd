//! Application settings that are chosen when the server starts.

use std::time::Duration;

use crate::{Error, TransactionType, currency::Currency, currency::CurrencyPair};

/// Settings for recording and summarising transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// The currency that every transaction is converted to for totals.
    pub base_currency: Currency,
    /// The currency preselected when recording income.
    pub default_income_currency: Currency,
    /// The currency preselected when recording an expense.
    pub default_expense_currency: Currency,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            base_currency: Currency::Usd,
            default_income_currency: Currency::Cop,
            default_expense_currency: Currency::Usd,
        }
    }
}

impl LedgerConfig {
    /// The default currency for new transactions of `transaction_type`.
    pub fn default_currency(&self, transaction_type: TransactionType) -> Currency {
        match transaction_type {
            TransactionType::Income => self.default_income_currency,
            TransactionType::Expense => self.default_expense_currency,
        }
    }
}

/// Settings for the exchange rate sources and cache.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateConfig {
    /// How long a stored rate is used before the sources are asked again.
    pub cache_max_age: Duration,
    /// The timeout for each HTTP request to a rate source.
    pub request_timeout: Duration,
    /// The access key for the Fixer API. Fixer is skipped without one.
    pub fixer_api_key: Option<String>,
    /// The base URL of the Fixer API.
    pub fixer_base_url: String,
    /// The base URL of exchangerate-api.com.
    pub exchangerate_api_base_url: String,
    /// The URL of the European Central Bank's daily reference rates.
    pub ecb_url: String,
    /// Whether to fall back to scraping the XE currency converter.
    pub xe_fallback: bool,
    /// The URL of the XE currency converter page.
    pub xe_url: String,
    /// The URL of a WebDriver server (e.g. chromedriver) for scraping XE with
    /// a headless browser.
    pub webdriver_url: Option<String>,
    /// Static rates to use instead of the online sources, e.g. for testing.
    pub fixed_rates: Vec<(CurrencyPair, f64)>,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            cache_max_age: Duration::from_secs(3600),
            request_timeout: Duration::from_secs(10),
            fixer_api_key: None,
            fixer_base_url: "http://data.fixer.io/api".to_owned(),
            exchangerate_api_base_url: "https://api.exchangerate-api.com".to_owned(),
            ecb_url: "https://www.ecb.europa.eu/stats/eurofxref/eurofxref-daily.xml".to_owned(),
            xe_fallback: true,
            xe_url: "https://www.xe.com/es/currencyconverter/convert/".to_owned(),
            webdriver_url: None,
            fixed_rates: Vec::new(),
        }
    }
}

impl ExchangeRateConfig {
    /// A config that only uses `rates` and never goes online.
    pub fn fixed(rates: Vec<(CurrencyPair, f64)>) -> Self {
        Self {
            fixed_rates: rates,
            ..Default::default()
        }
    }

    /// Parse a list of fixed rates such as "USD_COP=4100,COP_USD=0.000244".
    ///
    /// # Errors
    /// Returns [Error::InvalidRequest] if an entry is not of the form `PAIR=RATE`
    /// or the rate is not a positive number, or [Error::UnsupportedCurrency] for
    /// unknown currency codes.
    pub fn parse_fixed_rates(text: &str) -> Result<Vec<(CurrencyPair, f64)>, Error> {
        text.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (pair, rate) = entry.split_once('=').ok_or_else(|| {
                    Error::InvalidRequest(format!("expected PAIR=RATE, got \"{entry}\""))
                })?;
                let pair: CurrencyPair = pair.parse()?;
                let rate: f64 = rate.trim().parse().map_err(|_| {
                    Error::InvalidRequest(format!("invalid rate \"{rate}\" for {pair}"))
                })?;

                if rate <= 0.0 || !rate.is_finite() {
                    return Err(Error::InvalidRequest(format!(
                        "the rate for {pair} must be positive"
                    )));
                }

                Ok((pair, rate))
            })
            .collect()
    }
}
