use std::collections::HashMap;

use async_trait::async_trait;

use crate::{
    currency::CurrencyPair,
    exchange::sources::{RateSource, SourceError},
};

/// Rates given up front instead of fetched, e.g. for offline use.
///
/// A pair that is missing is answered with the inverse of the opposite pair
/// if that one is known.
#[derive(Debug, Clone, Default)]
pub struct FixedRateSource {
    rates: HashMap<CurrencyPair, f64>,
}

impl FixedRateSource {
    pub fn new(rates: impl IntoIterator<Item = (CurrencyPair, f64)>) -> Self {
        Self {
            rates: rates.into_iter().collect(),
        }
    }
}

#[async_trait]
impl RateSource for FixedRateSource {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        let inverse = CurrencyPair::new(pair.to, pair.from);

        Ok(self.rates.get(&pair).copied().or_else(|| {
            self.rates
                .get(&inverse)
                .filter(|rate| **rate > 0.0)
                .map(|rate| 1.0 / rate)
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        currency::{Currency, CurrencyPair},
        exchange::sources::{FixedRateSource, RateSource},
    };

    #[tokio::test]
    async fn uses_given_and_inverse_rates() {
        let source =
            FixedRateSource::new([(CurrencyPair::new(Currency::Usd, Currency::Cop), 4000.0)]);

        assert_eq!(
            source
                .fetch_rate(CurrencyPair::new(Currency::Usd, Currency::Cop))
                .await
                .unwrap(),
            Some(4000.0)
        );
        assert_eq!(
            source
                .fetch_rate(CurrencyPair::new(Currency::Cop, Currency::Usd))
                .await
                .unwrap(),
            Some(0.00025)
        );
        assert_eq!(
            source
                .fetch_rate(CurrencyPair::new(Currency::Eur, Currency::Usd))
                .await
                .unwrap(),
            None
        );
    }
}
