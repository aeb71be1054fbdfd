//! JSON endpoints for exchange rates and currency conversion.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json,
    extract::{
        FromRef, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    api_error::{ApiData, ApiError},
    currency::{Currency, CurrencyPair},
    exchange::{ExchangeRate, ExchangeRateService},
};

/// The number of days of history returned when none is requested.
const DEFAULT_HISTORY_DAYS: u32 = 30;
/// The longest history that can be requested.
const MAX_HISTORY_DAYS: u32 = 365;

/// The state needed by the exchange rate endpoints.
#[derive(Debug, Clone)]
pub struct ExchangeState {
    pub exchange_rates: Arc<ExchangeRateService>,
}

impl FromRef<AppState> for ExchangeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            exchange_rates: state.exchange_rates.clone(),
        }
    }
}

/// Query parameters naming a currency pair. USD to COP when omitted.
#[derive(Debug, Deserialize)]
pub struct PairQuery {
    from: Option<String>,
    to: Option<String>,
    days: Option<u32>,
}

impl PairQuery {
    fn pair(&self) -> Result<CurrencyPair, Error> {
        parse_pair(self.from.as_deref(), self.to.as_deref())
    }
}

fn parse_pair(from: Option<&str>, to: Option<&str>) -> Result<CurrencyPair, Error> {
    let from: Currency = from.unwrap_or("USD").parse()?;
    let to: Currency = to.unwrap_or("COP").parse()?;

    Ok(CurrencyPair::new(from, to))
}

#[derive(Debug, Serialize)]
pub struct CurrentRate {
    from_currency: Currency,
    to_currency: Currency,
    rate: f64,
    source: String,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

/// Get the current rate, `GET /api/exchange-rates/current?from=USD&to=COP`.
pub async fn current_rate_api(
    State(state): State<ExchangeState>,
    query: Result<Query<PairQuery>, QueryRejection>,
) -> Result<Json<ApiData<CurrentRate>>, ApiError> {
    let Query(query) = query?;
    let pair = query.pair()?;
    let rate = state.exchange_rates.get_rate(pair.from, pair.to).await?;

    Ok(ApiData::json(CurrentRate {
        from_currency: pair.from,
        to_currency: pair.to,
        rate: rate.rate,
        source: rate.source_label().to_owned(),
        timestamp: OffsetDateTime::now_utc(),
    }))
}

/// The body for converting an amount.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    amount: f64,
    from_currency: Option<String>,
    to_currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Conversion {
    original_amount: f64,
    converted_amount: f64,
    from_currency: Currency,
    to_currency: Currency,
    exchange_rate: f64,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
}

async fn convert(
    exchange_rates: &ExchangeRateService,
    amount: f64,
    pair: CurrencyPair,
) -> Result<Conversion, Error> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    let (converted_amount, rate) = exchange_rates
        .convert_amount(amount, pair.from, pair.to)
        .await?;

    Ok(Conversion {
        original_amount: amount,
        converted_amount,
        from_currency: pair.from,
        to_currency: pair.to,
        exchange_rate: rate.rate,
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Convert an amount, `POST /api/exchange-rates/convert`.
pub async fn convert_api(
    State(state): State<ExchangeState>,
    body: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ApiData<Conversion>>, ApiError> {
    let Json(request) = body?;
    let pair = parse_pair(
        request.from_currency.as_deref(),
        request.to_currency.as_deref(),
    )?;

    Ok(ApiData::json(
        convert(&state.exchange_rates, request.amount, pair).await?,
    ))
}

/// Query parameters for the conversion widget.
#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    amount: Option<f64>,
    from: Option<String>,
    to: Option<String>,
}

/// Convert an amount for page widgets, `GET /convert?amount=10&from=USD&to=COP`.
pub async fn convert_widget(
    State(state): State<ExchangeState>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
) -> Result<Json<ApiData<Conversion>>, ApiError> {
    let Query(query) = query?;
    let pair = parse_pair(query.from.as_deref(), query.to.as_deref())?;

    Ok(ApiData::json(
        convert(&state.exchange_rates, query.amount.unwrap_or(0.0), pair).await?,
    ))
}

#[derive(Debug, Serialize)]
pub struct HistoryPeriod {
    start_date: Date,
    end_date: Date,
    days: u32,
}

#[derive(Debug, Serialize)]
pub struct RateHistory {
    from_currency: Currency,
    to_currency: Currency,
    period: HistoryPeriod,
    rates: Vec<ExchangeRate>,
}

/// The stored rates for a pair, `GET /api/exchange-rates/history?from&to&days`.
pub async fn rate_history_api(
    State(state): State<ExchangeState>,
    query: Result<Query<PairQuery>, QueryRejection>,
) -> Result<Json<ApiData<RateHistory>>, ApiError> {
    let Query(query) = query?;
    let pair = query.pair()?;
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);

    if days == 0 || days > MAX_HISTORY_DAYS {
        return Err(ApiError::validation(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}"
        )));
    }

    let rates = state.exchange_rates.rate_history(pair, days)?;
    let end_date = OffsetDateTime::now_utc().date();

    Ok(ApiData::json(RateHistory {
        from_currency: pair.from,
        to_currency: pair.to,
        period: HistoryPeriod {
            start_date: end_date - Duration::days(i64::from(days)),
            end_date,
            days,
        },
        rates,
    }))
}

#[derive(Debug, Serialize)]
pub struct RateUpdate {
    updated_rates: usize,
    total_rates: usize,
    success_rate: f64,
    details: BTreeMap<String, bool>,
}

/// Refresh every rate from the sources, `POST /api/exchange-rates/update`.
pub async fn update_rates_api(
    State(state): State<ExchangeState>,
) -> Json<ApiData<RateUpdate>> {
    let details = state.exchange_rates.update_all_rates().await;
    let updated_rates = details.values().filter(|updated| **updated).count();
    let total_rates = details.len();
    let success_rate = if total_rates > 0 {
        updated_rates as f64 / total_rates as f64 * 100.0
    } else {
        0.0
    };

    ApiData::with_message(
        RateUpdate {
            updated_rates,
            total_rates,
            success_rate,
            details,
        },
        format!("Updated {updated_rates} of {total_rates} rates"),
    )
}

#[derive(Debug, Serialize)]
pub struct WidgetRates {
    success: bool,
    rates: BTreeMap<String, Option<f64>>,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

/// The USD/COP rates shown in the page header, `GET /exchange-rates`.
///
/// A rate that cannot be found is reported as `null`.
pub async fn exchange_rates_widget(State(state): State<ExchangeState>) -> Json<WidgetRates> {
    let mut rates = BTreeMap::new();

    for pair in [
        CurrencyPair::new(Currency::Usd, Currency::Cop),
        CurrencyPair::new(Currency::Cop, Currency::Usd),
    ] {
        let rate = match state.exchange_rates.get_rate(pair.from, pair.to).await {
            Ok(rate) => Some(rate.rate),
            Err(error) => {
                tracing::warn!("Could not get the {pair} rate for the widget: {error}");
                None
            }
        };

        rates.insert(pair.to_string(), rate);
    }

    Json(WidgetRates {
        success: true,
        rates,
        updated_at: OffsetDateTime::now_utc(),
    })
}
