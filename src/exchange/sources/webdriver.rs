//! Reads the XE converter page through a headless browser.
//!
//! The browser is driven with the W3C WebDriver protocol, so any WebDriver
//! server works, e.g. chromedriver started with `chromedriver --port=9515`.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};

use crate::{
    currency::CurrencyPair,
    exchange::{
        extract::{XE_RATE_SELECTORS, extract_rate_from_text},
        sources::{RateSource, SourceError, xe::converter_url},
    },
};

/// The key that holds an element reference in WebDriver responses.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const BROWSER_ARGS: [&str; 6] = [
    "--headless=new",
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--window-size=1920,1080",
    "--disable-blink-features=AutomationControlled",
];

#[derive(Debug, Clone)]
pub struct WebDriverSource {
    client: Client,
    webdriver_url: Option<String>,
    page_url: String,
    enabled: bool,
}

impl WebDriverSource {
    pub fn new(client: Client, webdriver_url: Option<String>, page_url: &str, enabled: bool) -> Self {
        Self {
            client,
            webdriver_url: webdriver_url.map(|url| url.trim_end_matches('/').to_owned()),
            page_url: page_url.to_owned(),
            enabled,
        }
    }

    /// Send a WebDriver command and return the `value` of the response.
    async fn command(
        &self,
        webdriver_url: &str,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SourceError> {
        let mut request = self
            .client
            .request(method, format!("{webdriver_url}{path}"));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let mut body: Value = response.json().await?;
        let value = body.get_mut("value").map(Value::take).unwrap_or_default();

        if status.is_success() {
            Ok(value)
        } else {
            let message = value["message"]
                .as_str()
                .or_else(|| value["error"].as_str())
                .unwrap_or("unknown error");
            Err(SourceError::WebDriver(format!("{path}: {message}")))
        }
    }

    async fn new_session(&self, webdriver_url: &str) -> Result<String, SourceError> {
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": BROWSER_ARGS }
                }
            }
        });

        let value = self
            .command(webdriver_url, Method::POST, "/session", Some(capabilities))
            .await?;

        value["sessionId"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| SourceError::WebDriver("no session ID in response".to_owned()))
    }

    async fn read_rate(
        &self,
        webdriver_url: &str,
        session: &str,
        pair: CurrencyPair,
    ) -> Result<Option<f64>, SourceError> {
        self.command(
            webdriver_url,
            Method::POST,
            &format!("/session/{session}/timeouts"),
            Some(json!({ "pageLoad": 20_000, "implicit": 15_000 })),
        )
        .await?;

        let url = converter_url(&self.page_url, pair)?;
        self.command(
            webdriver_url,
            Method::POST,
            &format!("/session/{session}/url"),
            Some(json!({ "url": url.as_str() })),
        )
        .await?;

        for selector in XE_RATE_SELECTORS {
            let element = match self
                .command(
                    webdriver_url,
                    Method::POST,
                    &format!("/session/{session}/element"),
                    Some(json!({ "using": "css selector", "value": selector })),
                )
                .await
            {
                Ok(element) => element,
                Err(error) => {
                    tracing::debug!("Selector {selector} did not match: {error}");
                    continue;
                }
            };

            let Some(element_id) = element[ELEMENT_KEY].as_str() else {
                continue;
            };

            let text = self
                .command(
                    webdriver_url,
                    Method::GET,
                    &format!("/session/{session}/element/{element_id}/text"),
                    None,
                )
                .await?;

            if let Some(rate) = text.as_str().and_then(extract_rate_from_text) {
                return Ok(Some(rate));
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl RateSource for WebDriverSource {
    fn name(&self) -> &'static str {
        "xe-browser"
    }

    async fn fetch_rate(&self, pair: CurrencyPair) -> Result<Option<f64>, SourceError> {
        let (true, Some(webdriver_url)) = (self.enabled, &self.webdriver_url) else {
            return Ok(None);
        };

        let session = self.new_session(webdriver_url).await?;
        let result = self.read_rate(webdriver_url, &session, pair).await;

        if let Err(error) = self
            .command(
                webdriver_url,
                Method::DELETE,
                &format!("/session/{session}"),
                None,
            )
            .await
        {
            tracing::warn!("Could not close the browser session {session}: {error}");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };

    use axum::{
        Json, Router,
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::{delete, get, post},
    };
    use reqwest::Client;
    use serde_json::{Value, json};

    use crate::{
        currency::{Currency, CurrencyPair},
        exchange::sources::{RateSource, WebDriverSource},
        test_utils::serve_router,
    };

    fn null_value() -> Json<Value> {
        Json(json!({ "value": null }))
    }

    async fn find_element(Json(body): Json<Value>) -> Response {
        if body["value"] == ".result__BigRate" {
            Json(json!({ "value": { "element-6066-11e4-a52e-4f735466cecf": "el-1" } }))
                .into_response()
        } else {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "value": { "error": "no such element", "message": "not found" } })),
            )
                .into_response()
        }
    }

    fn fake_webdriver(closed: Arc<AtomicBool>) -> Router {
        Router::new()
            .route(
                "/session",
                post(|| async { Json(json!({ "value": { "sessionId": "abc", "capabilities": {} } })) }),
            )
            .route("/session/{id}/timeouts", post(|| async { null_value() }))
            .route("/session/{id}/url", post(|| async { null_value() }))
            .route("/session/{id}/element", post(find_element))
            .route(
                "/session/{id}/element/{element}/text",
                get(|Path((_, element)): Path<(String, String)>| async move {
                    assert_eq!(element, "el-1");
                    Json(json!({ "value": "4,100.25 Pesos colombianos" }))
                }),
            )
            .route(
                "/session/{id}",
                delete(|State(closed): State<Arc<AtomicBool>>| async move {
                    closed.store(true, Ordering::SeqCst);
                    null_value()
                }),
            )
            .with_state(closed)
    }

    #[tokio::test]
    async fn reads_rate_and_closes_session() {
        let closed = Arc::new(AtomicBool::new(false));
        let url = serve_router(fake_webdriver(closed.clone())).await;
        let source = WebDriverSource::new(
            Client::new(),
            Some(url),
            "https://www.xe.com/currencyconverter/convert/",
            true,
        );

        let rate = source
            .fetch_rate(CurrencyPair::new(Currency::Usd, Currency::Cop))
            .await
            .unwrap();

        assert_eq!(rate, Some(4100.25));
        assert!(closed.load(Ordering::SeqCst), "session was not deleted");
    }

    #[tokio::test]
    async fn skipped_without_webdriver() {
        let source = WebDriverSource::new(
            Client::new(),
            None,
            "https://www.xe.com/currencyconverter/convert/",
            true,
        );

        let rate = source
            .fetch_rate(CurrencyPair::new(Currency::Usd, Currency::Cop))
            .await
            .unwrap();

        assert_eq!(rate, None);
    }
}
