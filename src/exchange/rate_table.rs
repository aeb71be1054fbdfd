use std::collections::HashMap;

use crate::{
    currency::{Currency, convert_cents},
    exchange::ExchangeRateService,
};

/// The rates for converting each supported currency into one target currency,
/// resolved up front so that totals can be computed without awaiting.
#[derive(Debug, Clone, PartialEq)]
pub struct RateTable {
    target: Currency,
    rates: HashMap<Currency, f64>,
}

impl RateTable {
    /// A table that only knows the identity rate for `target`.
    pub fn new(target: Currency) -> Self {
        Self {
            target,
            rates: HashMap::new(),
        }
    }

    #[cfg(test)]
    pub fn with_rate(mut self, from: Currency, rate: f64) -> Self {
        self.rates.insert(from, rate);
        self
    }

    /// Look up the rate from every supported currency into `target`.
    ///
    /// Currencies without a rate are left out and logged; their amounts are
    /// used unconverted.
    pub async fn resolve(exchange_rates: &ExchangeRateService, target: Currency) -> Self {
        let mut table = Self::new(target);

        for &currency in exchange_rates.supported_currencies() {
            if currency == target {
                continue;
            }

            match exchange_rates.get_rate(currency, target).await {
                Ok(resolved) => {
                    table.rates.insert(currency, resolved.rate);
                }
                Err(error) => tracing::warn!(
                    "No {currency} to {target} rate, {currency} amounts will not be converted: {error}"
                ),
            }
        }

        table
    }

    pub fn target(&self) -> Currency {
        self.target
    }

    /// The rate from `from` into the target currency, if known.
    pub fn rate(&self, from: Currency) -> Option<f64> {
        if from == self.target {
            Some(1.0)
        } else {
            self.rates.get(&from).copied()
        }
    }

    /// Convert `cents` of `from` into the target currency.
    ///
    /// Without a rate the amount is returned as is.
    pub fn convert_cents(&self, cents: i64, from: Currency) -> i64 {
        match self.rate(from) {
            Some(rate) => convert_cents(cents, rate),
            None => cents,
        }
    }
}
