//! JSON endpoints for listing and creating budgets.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    api_error::{ApiData, ApiError},
    budget::core::{
        Budget, BudgetUsage, NewBudget, budget_spent_cents, create_budget, get_active_budgets,
    },
    currency::{Currency, amount_to_cents, cents_to_amount},
    exchange::{ExchangeRateService, RateTable},
};

/// The state needed by the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub exchange_rates: Arc<ExchangeRateService>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            exchange_rates: state.exchange_rates.clone(),
        }
    }
}

/// A budget along with how much of it has been used.
#[derive(Debug, Serialize)]
pub struct BudgetReport {
    #[serde(flatten)]
    budget: Budget,
    amount: f64,
    spent: f64,
    remaining: f64,
    percentage_used: f64,
}

/// List the active budgets, `GET /api/budgets`.
pub async fn list_budgets_api(
    State(state): State<BudgetState>,
) -> Result<Json<ApiData<Vec<BudgetReport>>>, ApiError> {
    let budgets = {
        let connection = lock(&state.db_connection)?;
        get_active_budgets(&connection)?
    };

    let mut rate_tables: HashMap<Currency, RateTable> = HashMap::new();
    for budget in &budgets {
        if !rate_tables.contains_key(&budget.currency) {
            let rates = RateTable::resolve(&state.exchange_rates, budget.currency).await;
            rate_tables.insert(budget.currency, rates);
        }
    }

    let connection = lock(&state.db_connection)?;
    let mut reports = Vec::with_capacity(budgets.len());

    for budget in budgets {
        let spent_cents = match rate_tables.get(&budget.currency) {
            Some(rates) => budget_spent_cents(&budget, rates, &connection)?,
            None => 0,
        };
        let usage = BudgetUsage::new(&budget, spent_cents);

        reports.push(BudgetReport {
            amount: cents_to_amount(budget.amount_cents),
            spent: cents_to_amount(usage.spent_cents),
            remaining: cents_to_amount(usage.remaining_cents),
            percentage_used: (usage.percentage_used * 10.0).round() / 10.0,
            budget,
        });
    }

    Ok(ApiData::json(reports))
}

/// The body for creating a budget.
#[derive(Debug, Deserialize)]
pub struct BudgetRequest {
    name: String,
    category: String,
    amount: f64,
    currency: Option<Currency>,
    start_date: Date,
    end_date: Date,
}

/// Create a budget, `POST /api/budgets`. Responds with 201 Created.
pub async fn create_budget_api(
    State(state): State<BudgetState>,
    body: Result<Json<BudgetRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiData<Budget>>), ApiError> {
    let Json(request) = body?;

    if !request.amount.is_finite() {
        return Err(Error::NonPositiveAmount.into());
    }

    let budget = create_budget(
        NewBudget {
            name: request.name,
            category: request.category,
            amount_cents: amount_to_cents(request.amount),
            currency: request.currency.unwrap_or(Currency::Usd),
            start_date: request.start_date,
            end_date: request.end_date,
        },
        &*lock(&state.db_connection)?,
    )?;

    let message = format!("Created the budget \"{}\"", budget.name);

    Ok((StatusCode::CREATED, ApiData::with_message(budget, message)))
}

fn lock(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{
        account::seed_default_accounts,
        budget::api::{BudgetState, create_budget_api, list_budgets_api},
        config::ExchangeRateConfig,
        currency::{Currency, CurrencyPair},
        db::initialize,
        endpoints,
        exchange::ExchangeRateService,
    };

    fn get_test_server() -> (TestServer, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        seed_default_accounts(&conn).unwrap();
        let db_connection = Arc::new(Mutex::new(conn));
        let config = ExchangeRateConfig::fixed(vec![(
            CurrencyPair::new(Currency::Usd, Currency::Cop),
            4000.0,
        )]);
        let state = BudgetState {
            exchange_rates: Arc::new(
                ExchangeRateService::from_config(db_connection.clone(), &config).unwrap(),
            ),
            db_connection: db_connection.clone(),
        };
        let app = Router::new()
            .route(
                endpoints::BUDGETS_API,
                get(list_budgets_api).post(create_budget_api),
            )
            .with_state(state);

        (
            TestServer::new(app).expect("Could not create test server."),
            db_connection,
        )
    }

    #[tokio::test]
    async fn create_then_list_budget_usage() {
        let (server, db_connection) = get_test_server();

        let response = server
            .post(endpoints::BUDGETS_API)
            .json(&json!({
                "name": "Groceries",
                "category": "food",
                "amount": 200.0,
                "currency": "USD",
                "start_date": "2025-03-01",
                "end_date": "2025-03-31",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        db_connection
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO \"transaction\" (date, description, category, amount_cents, currency,
                    transaction_type, account_id, tags, created_at, updated_at)
                 VALUES ('2025-03-05', 'Market', 'food', -20000000, 'COP', 'expense', 1, '[]', ?1, ?1)",
                (time::OffsetDateTime::now_utc(),),
            )
            .unwrap();

        let response = server.get(endpoints::BUDGETS_API).await;

        response.assert_status_ok();
        let body: Value = response.json();
        let budget = &body["data"][0];
        assert_eq!(budget["name"], "Groceries");
        assert_eq!(budget["amount"], 200.0);
        assert_eq!(budget["spent"], 50.0);
        assert_eq!(budget["remaining"], 150.0);
        assert_eq!(budget["percentage_used"], 25.0);
    }

    #[tokio::test]
    async fn create_rejects_invalid_budget() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::BUDGETS_API)
            .json(&json!({
                "name": "Backwards",
                "category": "food",
                "amount": 10.0,
                "start_date": "2025-03-31",
                "end_date": "2025-03-01",
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["type"], "business_error");
    }

    #[tokio::test]
    async fn create_rejects_malformed_body() {
        let (server, _) = get_test_server();

        let response = server
            .post(endpoints::BUDGETS_API)
            .json(&json!({"name": "No dates"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["type"], "validation_error");
    }
}
