use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    currency::CurrencyPair,
    exchange::{
        retry::RetryPolicy,
        sources::{RateSource, SourceError, check_status},
    },
};

/// Rates from the free exchangerate-api.com endpoint.
#[derive(Debug, Clone)]
pub struct ExchangeRateApiSource {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct LatestRates {
    rates: HashMap<String, f64>,
}

impl ExchangeRateApiSource {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            retry: RetryPolicy::API,
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        let response = self
            .client
            .get(format!("{}/v4/latest/{}", self.base_url, pair.from.code()))
            .send()
            .await?;
        let body: LatestRates = check_status(response)?.json().await?;

        Ok(body.rates.get(pair.to.code()).copied())
    }
}

#[async_trait]
impl RateSource for ExchangeRateApiSource {
    fn name(&self) -> &'static str {
        "exchangerate-api"
    }

    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        self.retry.run(self.name(), || self.request(pair)).await
    }
}
