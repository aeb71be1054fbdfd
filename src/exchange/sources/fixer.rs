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

/// Rates from the Fixer API (fixer.io). Needs an access key.
#[derive(Debug, Clone)]
pub struct FixerSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct FixerResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, f64>,
}

impl FixerSource {
    pub fn new(client: Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
            retry: RetryPolicy::API,
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, pair: CurrencyPair, api_key: &str) -> Result<Option<f64>, SourceError> {
        let response = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[
                ("access_key", api_key),
                ("base", pair.from.code()),
                ("symbols", pair.to.code()),
            ])
            .send()
            .await?;
        let body: FixerResponse = check_status(response)?.json().await?;

        if !body.success {
            tracing::warn!("Fixer did not return a rate for {pair}");
            return Ok(None);
        }

        Ok(body.rates.get(pair.to.code()).copied())
    }
}

#[async_trait]
impl RateSource for FixerSource {
    fn name(&self) -> &'static str {
        "fixer"
    }

    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!("Skipping Fixer, no access key configured");
            return Ok(None);
        };

        self.retry
            .run(self.name(), || self.request(pair, api_key))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicU32, Ordering},
        },
    };

    use axum::{
        Json, Router,
        extract::{Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
    };
    use reqwest::Client;
    use serde_json::json;

    use crate::{
        currency::{Currency, CurrencyPair},
        exchange::{
            retry::RetryPolicy,
            sources::{FixerSource, RateSource},
        },
        test_utils::serve_router,
    };

    const USD_COP: CurrencyPair = CurrencyPair {
        from: Currency::Usd,
        to: Currency::Cop,
    };

    async fn latest(Query(params): Query<HashMap<String, String>>) -> Response {
        if params.get("access_key").map(String::as_str) != Some("secret") {
            return Json(json!({"success": false, "error": {"code": 101}})).into_response();
        }

        assert_eq!(params.get("base").map(String::as_str), Some("USD"));
        assert_eq!(params.get("symbols").map(String::as_str), Some("COP"));

        Json(json!({"success": true, "base": "USD", "rates": {"COP": 4100.5}})).into_response()
    }

    #[tokio::test]
    async fn fetches_rate() {
        let url = serve_router(Router::new().route("/latest", get(latest))).await;
        let source = FixerSource::new(Client::new(), &url, Some("secret".to_owned()));

        let rate = source.fetch_rate(USD_COP).await.unwrap();

        assert_eq!(rate, Some(4100.5));
    }

    #[tokio::test]
    async fn unsuccessful_response_has_no_rate() {
        let url = serve_router(Router::new().route("/latest", get(latest))).await;
        let source = FixerSource::new(Client::new(), &url, Some("wrong".to_owned()));

        let rate = source.fetch_rate(USD_COP).await.unwrap();

        assert_eq!(rate, None);
    }

    #[tokio::test]
    async fn skipped_without_access_key() {
        let source = FixerSource::new(Client::new(), "http://127.0.0.1:9", None);

        let rate = source.fetch_rate(USD_COP).await.unwrap();

        assert_eq!(rate, None);
    }

    #[tokio::test]
    async fn retries_server_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let router = Router::new()
            .route(
                "/latest",
                get(|State(calls): State<Arc<AtomicU32>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    StatusCode::INTERNAL_SERVER_ERROR
                }),
            )
            .with_state(calls.clone());
        let url = serve_router(router).await;
        let source = FixerSource::new(Client::new(), &url, Some("secret".to_owned()))
            .with_retry(RetryPolicy::immediate(3));

        let result = source.fetch_rate(USD_COP).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
