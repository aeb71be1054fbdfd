//! JSON endpoints for the balance, monthly, category, trend and period summaries.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json,
    extract::{FromRef, Query, State, rejection::QueryRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    api_error::{ApiData, ApiError},
    config::LedgerConfig,
    currency::Currency,
    exchange::{ExchangeRateService, RateTable},
    report::summary::{
        BalanceSummary, CategoryAnalysis, DEFAULT_ANALYSIS_DAYS, FinancialSummary, MonthlyTrend,
        MonthlySummary, QuickStats, SummaryPeriod, balance_summary, category_analysis,
        financial_summary, monthly_summary, quick_stats, trends,
    },
    timezone::local_today,
    transaction::parse_date,
};

/// The number of months of trends returned when none is requested.
const DEFAULT_TREND_MONTHS: u32 = 6;
/// The most months of trends that can be requested.
const MAX_TREND_MONTHS: u32 = 24;

/// The state needed to compute reports.
#[derive(Debug, Clone)]
pub struct ReportState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub exchange_rates: Arc<ExchangeRateService>,
    pub ledger_config: LedgerConfig,
    /// The local timezone as a canonical timezone name, e.g. "America/Bogota".
    pub local_timezone: String,
}

impl FromRef<AppState> for ReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            exchange_rates: state.exchange_rates.clone(),
            ledger_config: state.ledger_config.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl ReportState {
    pub fn today(&self) -> Result<Date, Error> {
        local_today(&self.local_timezone)
    }

    pub fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }

    /// Parse `currency`, defaulting to the base currency.
    pub fn currency(&self, currency: Option<&str>) -> Result<Currency, Error> {
        match currency.map(str::trim).filter(|code| !code.is_empty()) {
            Some(code) => Ok(code.parse()?),
            None => Ok(self.ledger_config.base_currency),
        }
    }

    pub async fn rates(&self, currency: Currency) -> RateTable {
        RateTable::resolve(&self.exchange_rates, currency).await
    }
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    currency: Option<String>,
    as_of_date: Option<String>,
}

/// `GET /api/stats/balance?currency=USD&as_of_date=2025-01-31`
pub async fn balance_stats_api(
    State(state): State<ReportState>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> Result<Json<ApiData<BalanceSummary>>, ApiError> {
    let Query(query) = query?;
    let currency = state.currency(query.currency.as_deref())?;
    let as_of = match parse_date(query.as_of_date.as_deref(), "as_of_date")? {
        Some(date) => date,
        None => state.today()?,
    };

    let summary = balance_summary(
        currency,
        state.ledger_config.base_currency,
        as_of,
        &*state.connection()?,
    )?;

    Ok(ApiData::json(summary))
}

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    year: Option<i32>,
    month: Option<u8>,
    currency: Option<String>,
}

/// `GET /api/stats/monthly?year=2025&month=1&currency=USD`, defaults to this month.
pub async fn monthly_stats_api(
    State(state): State<ReportState>,
    query: Result<Query<MonthlyQuery>, QueryRejection>,
) -> Result<Json<ApiData<MonthlySummary>>, ApiError> {
    let Query(query) = query?;
    let currency = state.currency(query.currency.as_deref())?;
    let today = state.today()?;
    let rates = state.rates(currency).await;

    let summary = monthly_summary(
        query.year.unwrap_or(today.year()),
        query.month.unwrap_or(today.month() as u8),
        &rates,
        &*state.connection()?,
    )?;

    Ok(ApiData::json(summary))
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    currency: Option<String>,
}

/// `GET /api/stats/categories?start_date&end_date&currency`, defaults to the
/// last 30 days.
pub async fn category_stats_api(
    State(state): State<ReportState>,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> Result<Json<ApiData<CategoryAnalysis>>, ApiError> {
    let Query(query) = query?;
    let currency = state.currency(query.currency.as_deref())?;
    let end_date = match parse_date(query.end_date.as_deref(), "end_date")? {
        Some(date) => date,
        None => state.today()?,
    };
    let start_date = parse_date(query.start_date.as_deref(), "start_date")?
        .unwrap_or(end_date - time::Duration::days(DEFAULT_ANALYSIS_DAYS));

    if start_date > end_date {
        return Err(ApiError::validation("start_date must not be after end_date"));
    }

    let rates = state.rates(currency).await;
    let analysis = category_analysis(start_date, end_date, &rates, &*state.connection()?)?;

    Ok(ApiData::json(analysis))
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    months: Option<u32>,
    currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Trends {
    currency: Currency,
    months: u32,
    trends: Vec<MonthlyTrend>,
}

/// `GET /api/stats/trends?months=6&currency=USD`
pub async fn trends_stats_api(
    State(state): State<ReportState>,
    query: Result<Query<TrendsQuery>, QueryRejection>,
) -> Result<Json<ApiData<Trends>>, ApiError> {
    let Query(query) = query?;
    let currency = state.currency(query.currency.as_deref())?;
    let months = query.months.unwrap_or(DEFAULT_TREND_MONTHS);

    if !(1..=MAX_TREND_MONTHS).contains(&months) {
        return Err(ApiError::validation(format!(
            "months must be between 1 and {MAX_TREND_MONTHS}"
        )));
    }

    let today = state.today()?;
    let rates = state.rates(currency).await;
    let trends = trends(months, today, &rates, &*state.connection()?)?;

    Ok(ApiData::json(Trends {
        currency,
        months,
        trends,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    period: Option<String>,
    currency: Option<String>,
}

/// `GET /api/reports/summary?period=month|quarter|year&currency=USD`
pub async fn summary_api(
    State(state): State<ReportState>,
    query: Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<ApiData<FinancialSummary>>, ApiError> {
    let Query(query) = query?;
    let period: SummaryPeriod = query.period.as_deref().unwrap_or("month").parse()?;
    let currency = state.currency(query.currency.as_deref())?;
    let today = state.today()?;
    let rates = state.rates(currency).await;

    let summary = financial_summary(
        period,
        today,
        state.ledger_config.base_currency,
        &rates,
        &*state.connection()?,
    )?;

    Ok(ApiData::json(summary))
}

/// The quick stats with a success flag, as the dashboard widgets expect.
#[derive(Debug, Serialize)]
pub struct QuickStatsResponse {
    success: bool,
    #[serde(flatten)]
    stats: QuickStats,
}

/// `GET /quick-stats`, today's totals for the dashboard widgets.
pub async fn quick_stats_widget(
    State(state): State<ReportState>,
) -> Result<Json<QuickStatsResponse>, ApiError> {
    let stats = quick_stats(
        state.today()?,
        state.ledger_config.base_currency,
        &*state.connection()?,
    )?;

    Ok(Json(QuickStatsResponse {
        success: true,
        stats,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::{
        TransactionType,
        currency::Currency,
        report::api::{
            ReportState, balance_stats_api, category_stats_api, monthly_stats_api,
            quick_stats_widget, summary_api, trends_stats_api,
        },
        transaction::{TransactionDraft, TransactionService, get_test_service},
    };

    async fn get_test_server() -> (TestServer, TransactionService) {
        let service = get_test_service();
        for (transaction_type, amount, description, category, currency) in [
            (TransactionType::Income, 1000.0, "Salary", "salary", Currency::Usd),
            (TransactionType::Expense, 200_000.0, "Groceries", "food", Currency::Cop),
            (TransactionType::Expense, 30.0, "Taxi", "transport", Currency::Usd),
        ] {
            service
                .create(
                    TransactionDraft::new(transaction_type, amount, description, category)
                        .currency(currency),
                )
                .await
                .unwrap();
        }

        let state = ReportState {
            db_connection: Arc::clone(&service.db_connection),
            exchange_rates: Arc::clone(&service.exchange_rates),
            ledger_config: service.ledger_config.clone(),
            local_timezone: service.local_timezone.clone(),
        };
        let app = Router::new()
            .route("/balance", get(balance_stats_api))
            .route("/monthly", get(monthly_stats_api))
            .route("/categories", get(category_stats_api))
            .route("/trends", get(trends_stats_api))
            .route("/summary", get(summary_api))
            .route("/quick-stats", get(quick_stats_widget))
            .with_state(state);

        (
            TestServer::new(app).expect("Could not create test server."),
            service,
        )
    }

    #[tokio::test]
    async fn balance_defaults_to_base_currency() {
        let (server, _) = get_test_server().await;

        let response = server.get("/balance").await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["currency"], "USD");
        assert_eq!(body["data"]["total_income"], 1000.0);
        assert_eq!(body["data"]["total_expense"], 80.0);
        assert_eq!(body["data"]["balance"], 920.0);
    }

    #[tokio::test]
    async fn balance_in_cop_only_counts_cop() {
        let (server, _) = get_test_server().await;

        let response = server.get("/balance").add_query_param("currency", "cop").await;

        let body = response.json::<Value>();
        assert_eq!(body["data"]["total_expense"], 200_000.0);
        assert_eq!(body["data"]["total_income"], 0.0);
    }

    #[tokio::test]
    async fn unsupported_currency_is_validation_error() {
        let (server, _) = get_test_server().await;

        let response = server.get("/balance").add_query_param("currency", "GBP").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["type"], "validation_error");
    }

    #[tokio::test]
    async fn monthly_converts_to_requested_currency() {
        let (server, _) = get_test_server().await;

        let response = server.get("/monthly").add_query_param("currency", "COP").await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["data"]["currency"], "COP");
        assert_eq!(body["data"]["expense_by_category"]["food"], 200_000.0);
        assert_eq!(body["data"]["expense_by_category"]["transport"], 120_000.0);
        assert_eq!(body["data"]["transaction_count"], 3);
    }

    #[tokio::test]
    async fn categories_lists_largest_first() {
        let (server, _) = get_test_server().await;

        let response = server.get("/categories").await;

        let body = response.json::<Value>();
        assert_eq!(body["data"]["total_spending"], 80.0);
        assert_eq!(body["data"]["categories"][0]["category"], "food");
        assert_eq!(body["data"]["categories"][0]["percentage"], 62.5);
        assert_eq!(body["data"]["top_category"]["category"], "food");
    }

    #[tokio::test]
    async fn categories_rejects_reversed_dates() {
        let (server, _) = get_test_server().await;

        let response = server
            .get("/categories")
            .add_query_param("start_date", "2025-02-01")
            .add_query_param("end_date", "2025-01-01")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trends_returns_requested_months() {
        let (server, _) = get_test_server().await;

        let response = server.get("/trends").add_query_param("months", 3).await;

        let body = response.json::<Value>();
        assert_eq!(body["data"]["months"], 3);
        let trends = body["data"]["trends"].as_array().unwrap();
        assert_eq!(trends.len(), 3);
        assert_eq!(trends[2]["total_income"], 1000.0);
    }

    #[tokio::test]
    async fn trends_rejects_zero_months() {
        let (server, _) = get_test_server().await;

        let response = server.get("/trends").add_query_param("months", 0).await;

        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn summary_rejects_unknown_period() {
        let (server, _) = get_test_server().await;

        let response = server.get("/summary").add_query_param("period", "decade").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["type"], "validation_error");
    }

    #[tokio::test]
    async fn summary_for_year() {
        let (server, _) = get_test_server().await;

        let response = server.get("/summary").add_query_param("period", "year").await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["data"]["period"]["type"], "year");
        assert_eq!(body["data"]["statistics"]["transaction_count"], 3);
        assert_eq!(body["data"]["statistics"]["largest_expense"], 50.0);
    }

    #[tokio::test]
    async fn quick_stats_counts_today() {
        let (server, _) = get_test_server().await;

        let response = server.get("/quick-stats").await;

        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["transaction_count_today"], 3);
        assert_eq!(body["today_income"], 1000.0);
        assert_eq!(body["today_expense"], 80.0);
        assert_eq!(body["balance"], 920.0);
    }
}
