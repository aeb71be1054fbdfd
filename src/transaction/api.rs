//! JSON endpoints for listing, creating, reading, updating and deleting transactions.

use axum::{
    Json,
    extract::{
        FromRef, Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    api_error::{ApiData, ApiError},
    category::{CategoryInfo, TransactionType},
    currency::Currency,
    database_id::{AccountId, TransactionId},
    pagination::{Pagination, PaginationConfig},
    transaction::{
        core::Transaction,
        query::TransactionListQuery,
        service::{TransactionChanges, TransactionDraft, TransactionService},
    },
};

/// The state needed by the transaction API.
#[derive(Debug, Clone)]
pub struct TransactionApiState {
    pub service: TransactionService,
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionApiState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            service: TransactionService::from_ref(state),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// A transaction as returned by the API, with amounts in currency units.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    #[serde(flatten)]
    transaction: Transaction,
    amount: f64,
    amount_base: Option<f64>,
    formatted_amount: String,
    category_info: CategoryInfo,
}

impl From<Transaction> for TransactionResponse {
    fn from(transaction: Transaction) -> Self {
        Self {
            amount: transaction.amount(),
            amount_base: transaction.amount_base(),
            formatted_amount: transaction.formatted_amount(),
            category_info: transaction.category_info(),
            transaction,
        }
    }
}

/// A page of transactions.
#[derive(Debug, Serialize)]
pub struct TransactionPage {
    success: bool,
    data: Vec<TransactionResponse>,
    pagination: Pagination,
}

/// List active transactions, newest first, `GET /api/transactions`.
pub async fn list_transactions_api(
    State(state): State<TransactionApiState>,
    query: Result<Query<TransactionListQuery>, QueryRejection>,
) -> Result<Json<TransactionPage>, ApiError> {
    let Query(query) = query?;
    let (page, per_page) = state
        .pagination_config
        .resolve(query.page, query.per_page);
    let mut filter = query.to_filter()?;

    let total = state.service.count(&filter)?;
    let pagination = Pagination::new(page, per_page, u64::from(total));
    filter.limit = Some(per_page);
    filter.offset = pagination.offset();

    let transactions = state.service.list(&filter)?;

    Ok(Json(TransactionPage {
        success: true,
        data: transactions.into_iter().map(TransactionResponse::from).collect(),
        pagination,
    }))
}

/// The body for recording a transaction.
#[derive(Debug, Deserialize)]
pub struct NewTransactionRequest {
    transaction_type: String,
    /// The amount without a sign.
    amount: f64,
    currency: Option<Currency>,
    description: String,
    category: String,
    subcategory: Option<String>,
    transaction_date: Option<Date>,
    account_id: Option<AccountId>,
    reference: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    notes: Option<String>,
}

/// Record a transaction, `POST /api/transactions`. Responds with 201 Created.
///
/// A budget warning for an expense is returned as the message.
pub async fn create_transaction_api(
    State(state): State<TransactionApiState>,
    body: Result<Json<NewTransactionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiData<TransactionResponse>>), ApiError> {
    let Json(request) = body?;
    let transaction_type: TransactionType = request.transaction_type.parse().map_err(Error::from)?;

    let created = state
        .service
        .create(TransactionDraft {
            transaction_type,
            amount: request.amount,
            currency: request.currency,
            description: request.description,
            category: request.category,
            subcategory: request.subcategory,
            date: request.transaction_date,
            account_id: request.account_id,
            reference: request.reference,
            tags: request.tags,
            notes: request.notes,
        })
        .await?;

    let message = match created.budget_warning {
        Some(warning) => warning.to_string(),
        None => format!("Recorded {transaction_type} #{}", created.transaction.id),
    };

    Ok((
        StatusCode::CREATED,
        ApiData::with_message(created.transaction.into(), message),
    ))
}

/// The body for quickly recording income or an expense.
#[derive(Debug, Deserialize)]
pub struct QuickAddRequest {
    amount: f64,
    description: String,
    category: Option<String>,
    subcategory: Option<String>,
    date: Option<Date>,
    notes: Option<String>,
}

/// Record income in the default income currency,
/// `POST /api/transactions/quick-add-income`. The category defaults to "other".
pub async fn quick_add_income_api(
    State(state): State<TransactionApiState>,
    body: Result<Json<QuickAddRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiData<TransactionResponse>>), ApiError> {
    let Json(request) = body?;
    let category = request.category.clone().unwrap_or_else(|| "other".to_owned());

    quick_add(&state.service, TransactionType::Income, category, request).await
}

/// Record an expense in the default expense currency,
/// `POST /api/transactions/quick-add-expense`. The category is required.
pub async fn quick_add_expense_api(
    State(state): State<TransactionApiState>,
    body: Result<Json<QuickAddRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiData<TransactionResponse>>), ApiError> {
    let Json(request) = body?;
    let Some(category) = request.category.clone() else {
        return Err(ApiError::validation("the category is required"));
    };

    quick_add(&state.service, TransactionType::Expense, category, request).await
}

async fn quick_add(
    service: &TransactionService,
    transaction_type: TransactionType,
    category: String,
    request: QuickAddRequest,
) -> Result<(StatusCode, Json<ApiData<TransactionResponse>>), ApiError> {
    let draft = TransactionDraft {
        subcategory: request.subcategory,
        date: request.date,
        notes: request.notes,
        ..TransactionDraft::new(
            transaction_type,
            request.amount,
            &request.description,
            &category,
        )
    };
    let created = service.create(draft).await?;

    let message = match created.budget_warning {
        Some(warning) => warning.to_string(),
        None => format!(
            "Added {transaction_type} of {}",
            created.transaction.formatted_amount()
        ),
    };

    Ok((
        StatusCode::CREATED,
        ApiData::with_message(created.transaction.into(), message),
    ))
}

/// Get an active transaction, `GET /api/transactions/{transaction_id}`.
pub async fn get_transaction_api(
    State(state): State<TransactionApiState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<ApiData<TransactionResponse>>, ApiError> {
    let transaction = state.service.get(transaction_id)?;

    if !transaction.is_active {
        return Err(ApiError::not_found(format!(
            "transaction #{transaction_id} has been deleted"
        )));
    }

    Ok(ApiData::json(transaction.into()))
}

/// The body for updating a transaction. Missing fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTransactionRequest {
    description: Option<String>,
    category: Option<String>,
    subcategory: Option<String>,
    notes: Option<String>,
    transaction_date: Option<Date>,
    amount: Option<f64>,
    currency: Option<Currency>,
}

/// Update a transaction, `PUT /api/transactions/{transaction_id}`.
pub async fn update_transaction_api(
    State(state): State<TransactionApiState>,
    Path(transaction_id): Path<TransactionId>,
    body: Result<Json<UpdateTransactionRequest>, JsonRejection>,
) -> Result<Json<ApiData<TransactionResponse>>, ApiError> {
    let Json(request) = body?;

    let updated = state
        .service
        .update(
            transaction_id,
            TransactionChanges {
                description: request.description,
                category: request.category,
                subcategory: request.subcategory,
                notes: request.notes,
                date: request.transaction_date,
                amount: request.amount,
                currency: request.currency,
            },
        )
        .await?;

    Ok(ApiData::with_message(
        updated.into(),
        format!("Updated transaction #{transaction_id}"),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    permanent: bool,
}

/// Delete a transaction, `DELETE /api/transactions/{transaction_id}`.
///
/// The transaction is marked inactive unless `?permanent=true` is given.
pub async fn delete_transaction_api(
    State(state): State<TransactionApiState>,
    Path(transaction_id): Path<TransactionId>,
    query: Result<Query<DeleteQuery>, QueryRejection>,
) -> Result<Json<ApiData<Option<()>>>, ApiError> {
    let Query(query) = query?;

    state.service.delete(transaction_id, query.permanent)?;

    Ok(ApiData::with_message(
        None,
        format!("Deleted transaction #{transaction_id}"),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        http::StatusCode,
        routing::{get, post},
    };
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::{
        pagination::PaginationConfig,
        transaction::{
            TransactionService,
            api::{
                TransactionApiState, create_transaction_api, delete_transaction_api,
                get_transaction_api, list_transactions_api, quick_add_expense_api,
                quick_add_income_api, update_transaction_api,
            },
            get_test_service,
        },
    };

    fn get_test_server() -> (TestServer, TransactionService) {
        let service = get_test_service();
        let state = TransactionApiState {
            service: service.clone(),
            pagination_config: PaginationConfig {
                default_page_size: 2,
                ..Default::default()
            },
        };
        let app = Router::new()
            .route(
                "/api/transactions",
                get(list_transactions_api).post(create_transaction_api),
            )
            .route("/api/transactions/quick-add-income", post(quick_add_income_api))
            .route("/api/transactions/quick-add-expense", post(quick_add_expense_api))
            .route(
                "/api/transactions/{transaction_id}",
                get(get_transaction_api)
                    .put(update_transaction_api)
                    .delete(delete_transaction_api),
            )
            .with_state(state);

        (
            TestServer::new(app).expect("Could not create test server."),
            service,
        )
    }

    fn expense(amount: f64, description: &str) -> Value {
        json!({
            "transaction_type": "expense",
            "amount": amount,
            "currency": "USD",
            "description": description,
            "category": "food",
        })
    }

    #[tokio::test]
    async fn create_returns_created_transaction() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/transactions")
            .json(&json!({
                "transaction_type": "expense",
                "amount": 80000,
                "currency": "COP",
                "description": "Market",
                "category": "food",
                "tags": ["home"],
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["amount"], -80000.0);
        assert_eq!(body["data"]["amount_base"], -20.0);
        assert_eq!(body["data"]["currency"], "COP");
        assert_eq!(body["data"]["tags"], json!(["home"]));
        assert_eq!(body["data"]["category_info"]["name"], "Food");
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/transactions")
            .json(&expense(-5.0, "Refund"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["success"], false);
        assert_eq!(body["type"], "business_error");
    }

    #[tokio::test]
    async fn create_rejects_malformed_json() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/transactions")
            .json(&json!({ "amount": "lots" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["type"], "validation_error");
    }

    #[tokio::test]
    async fn quick_add_income_uses_defaults() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/transactions/quick-add-income")
            .json(&json!({ "amount": 250000, "description": "Tutoring" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["data"]["currency"], "COP");
        assert_eq!(body["data"]["category"], "other");
        assert_eq!(body["data"]["amount"], 250000.0);
        assert_eq!(body["message"], "Added income of $250,000 COP");
    }

    #[tokio::test]
    async fn quick_add_expense_uses_default_currency() {
        let (server, _) = get_test_server();

        let response = server
            .post("/api/transactions/quick-add-expense")
            .json(&json!({
                "amount": 12.5,
                "description": "Taxi",
                "category": "transport",
                "date": "2025-01-15",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["data"]["currency"], "USD");
        assert_eq!(body["data"]["amount"], -12.5);
        assert_eq!(body["data"]["date"], "2025-01-15");
    }

    #[tokio::test]
    async fn quick_add_expense_requires_category() {
        let (server, service) = get_test_server();

        let response = server
            .post("/api/transactions/quick-add-expense")
            .json(&json!({ "amount": 12.5, "description": "Taxi" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["type"], "validation_error");
        assert_eq!(service.count(&Default::default()), Ok(0));
    }

    #[tokio::test]
    async fn create_rejects_unknown_type() {
        let (server, _) = get_test_server();
        let mut body = expense(5.0, "Snack");
        body["transaction_type"] = json!("transfer");

        let response = server.post("/api/transactions").json(&body).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["type"], "validation_error");
    }

    #[tokio::test]
    async fn list_paginates() {
        let (server, _) = get_test_server();
        for description in ["One", "Two", "Three"] {
            server
                .post("/api/transactions")
                .json(&expense(5.0, description))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let response = server
            .get("/api/transactions")
            .add_query_param("page", 2)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["pages"], 2);
        assert_eq!(body["pagination"]["has_prev"], true);
        assert_eq!(body["pagination"]["has_next"], false);
    }

    #[tokio::test]
    async fn list_rejects_bad_filter() {
        let (server, _) = get_test_server();

        let response = server
            .get("/api/transactions")
            .add_query_param("start_date", "yesterday")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["type"], "validation_error");
    }

    #[tokio::test]
    async fn update_changes_amount() {
        let (server, _) = get_test_server();
        server
            .post("/api/transactions")
            .json(&expense(5.0, "Coffee"))
            .await;

        let response = server
            .put("/api/transactions/1")
            .json(&json!({ "amount": 7.5, "description": "Two coffees" }))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["data"]["amount_cents"], -750);
        assert_eq!(body["data"]["description"], "Two coffees");
    }

    #[tokio::test]
    async fn soft_deleted_transactions_are_not_found() {
        let (server, service) = get_test_server();
        server
            .post("/api/transactions")
            .json(&expense(5.0, "Coffee"))
            .await;

        server.delete("/api/transactions/1").await.assert_status_ok();

        let response = server.get("/api/transactions/1").await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<Value>()["type"], "not_found");
        assert!(!service.get(1).unwrap().is_active);
    }

    #[tokio::test]
    async fn permanent_delete_removes_transaction() {
        let (server, service) = get_test_server();
        server
            .post("/api/transactions")
            .json(&expense(5.0, "Coffee"))
            .await;

        server
            .delete("/api/transactions/1")
            .add_query_param("permanent", true)
            .await
            .assert_status_ok();

        assert_eq!(service.get(1), Err(crate::Error::NotFound));
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let (server, _) = get_test_server();

        server
            .delete("/api/transactions/42")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
}
