use std::collections::HashMap;

use async_trait::async_trait;
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use reqwest::Client;

use crate::{
    currency::{Currency, CurrencyPair},
    exchange::{
        retry::RetryPolicy,
        sources::{RateSource, SourceError, check_status},
    },
};

/// The European Central Bank's daily reference rates.
///
/// The ECB publishes rates against the euro only, so pairs that do not
/// involve EUR are left to the other sources.
#[derive(Debug, Clone)]
pub struct EcbSource {
    client: Client,
    url: String,
    retry: RetryPolicy,
}

/// Read the `currency -> rate per euro` table from the ECB's XML feed.
///
/// Rates live in `Cube` elements with `currency` and `rate` attributes.
/// Cubes with a missing or unreadable rate are skipped.
pub fn parse_ecb_rates(xml: &str) -> Result<HashMap<String, f64>, SourceError> {
    let mut reader = Reader::from_str(xml);
    let mut rates = HashMap::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                if element.local_name().as_ref() != b"Cube" {
                    continue;
                }

                let currency = attribute(&element, "currency")?;
                let rate = attribute(&element, "rate")?;
                if let (Some(currency), Some(rate)) = (currency, rate) {
                    match rate.trim().parse::<f64>() {
                        Ok(rate) => {
                            rates.insert(currency.trim().to_owned(), rate);
                        }
                        Err(_) => tracing::debug!("Skipping ECB rate {currency}={rate}"),
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(SourceError::Parse(format!(
                    "invalid XML at position {}: {error}",
                    reader.error_position()
                )));
            }
            _ => {}
        }
    }

    Ok(rates)
}

fn attribute(element: &BytesStart, name: &str) -> Result<Option<String>, SourceError> {
    let Some(attribute) = element
        .try_get_attribute(name)
        .map_err(|error| SourceError::Parse(format!("invalid attribute: {error}")))?
    else {
        return Ok(None);
    };

    attribute
        .unescape_value()
        .map(|value| Some(value.into_owned()))
        .map_err(|error| SourceError::Parse(format!("invalid attribute value: {error}")))
}

impl EcbSource {
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_owned(),
            retry: RetryPolicy::FEED,
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let xml = check_status(response)?.text().await?;
        let rates = parse_ecb_rates(&xml)?;

        if rates.is_empty() {
            return Err(SourceError::Parse(
                "no rates found in the ECB feed".to_owned(),
            ));
        }

        let rate = if pair.from == Currency::Eur {
            rates.get(pair.to.code()).copied()
        } else {
            rates
                .get(pair.from.code())
                .filter(|rate| **rate > 0.0)
                .map(|rate| 1.0 / rate)
        };

        Ok(rate)
    }
}

#[async_trait]
impl RateSource for EcbSource {
    fn name(&self) -> &'static str {
        "ecb"
    }

    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        if !pair.involves(Currency::Eur) {
            return Ok(None);
        }

        self.retry.run(self.name(), || self.request(pair)).await
    }
}
