use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::{
    currency::CurrencyPair,
    exchange::{
        extract::extract_rate_from_html,
        retry::RetryPolicy,
        sources::{RateSource, SourceError, check_status},
    },
};

/// Scrapes the XE currency converter page over plain HTTP.
#[derive(Debug, Clone)]
pub struct XeScrapeSource {
    client: Client,
    url: String,
    enabled: bool,
    retry: RetryPolicy,
}

/// The converter page URL for converting one unit of `pair.from`.
pub(super) fn converter_url(base_url: &str, pair: CurrencyPair) -> Result<Url, SourceError> {
    Url::parse_with_params(
        base_url,
        [
            ("Amount", "1"),
            ("From", pair.from.code()),
            ("To", pair.to.code()),
        ],
    )
    .map_err(|error| SourceError::Parse(format!("invalid XE URL {base_url}: {error}")))
}

impl XeScrapeSource {
    pub fn new(client: Client, url: &str, enabled: bool) -> Self {
        Self {
            client,
            url: url.to_owned(),
            enabled,
            retry: RetryPolicy::SCRAPE,
        }
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn scrape(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        let url = converter_url(&self.url, pair)?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html")
            .send()
            .await?;
        let html = check_status(response)?.text().await?;

        let rate = extract_rate_from_html(&html);
        if rate.is_none() {
            tracing::debug!("No rate found on the XE page for {pair}");
        }

        Ok(rate)
    }
}

#[async_trait]
impl RateSource for XeScrapeSource {
    fn name(&self) -> &'static str {
        "xe"
    }

    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        if !self.enabled {
            return Ok(None);
        }

        self.retry.run(self.name(), || self.scrape(pair)).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{Router, extract::Query, http::StatusCode, response::Html, routing::get};
    use reqwest::Client;

    use crate::{
        currency::{Currency, CurrencyPair},
        exchange::{
            retry::RetryPolicy,
            sources::{RateSource, XeScrapeSource},
        },
        test_utils::serve_router,
    };

    async fn converter(Query(params): Query<HashMap<String, String>>) -> Html<String> {
        let amount = match (params["From"].as_str(), params["To"].as_str()) {
            ("USD", "COP") => "4,180.52",
            _ => "unknown",
        };

        Html(format!(
            r#"<main><span class="converterresult-ToAmount">{amount}</span> Pesos colombianos</main>"#
        ))
    }

    #[tokio::test]
    async fn scrapes_rate() {
        let url = serve_router(Router::new().route("/convert/", get(converter))).await;
        let source = XeScrapeSource::new(Client::new(), &format!("{url}/convert/"), true);

        let rate = source
            .fetch_rate(CurrencyPair::new(Currency::Usd, Currency::Cop))
            .await
            .unwrap();

        assert_eq!(rate, Some(4180.52));
    }

    #[tokio::test]
    async fn page_without_rate() {
        let url = serve_router(Router::new().route("/convert/", get(converter))).await;
        let source = XeScrapeSource::new(Client::new(), &format!("{url}/convert/"), true);

        let rate = source
            .fetch_rate(CurrencyPair::new(Currency::Eur, Currency::Cop))
            .await
            .unwrap();

        assert_eq!(rate, None);
    }

    #[tokio::test]
    async fn blocked_request_fails() {
        let url = serve_router(
            Router::new().route("/convert/", get(|| async { StatusCode::FORBIDDEN })),
        )
        .await;
        let source = XeScrapeSource::new(Client::new(), &format!("{url}/convert/"), true)
            .with_retry(RetryPolicy::immediate(2));

        let result = source
            .fetch_rate(CurrencyPair::new(Currency::Usd, Currency::Cop))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn disabled_source_is_skipped() {
        let source = XeScrapeSource::new(Client::new(), "http://127.0.0.1:9/", false);

        let rate = source
            .fetch_rate(CurrencyPair::new(Currency::Usd, Currency::Cop))
            .await
            .unwrap();

        assert_eq!(rate, None);
    }
}
