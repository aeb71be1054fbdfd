//! Defines the endpoint for updating a transaction from the edit page.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use serde::Deserialize;

use crate::{
    database_id::TransactionId,
    endpoints::{self, format_endpoint},
    transaction::{
        form::TransactionForm,
        service::{TransactionChanges, TransactionService},
    },
};

#[derive(Debug, Deserialize)]
pub struct QueryParams {
    redirect_url: Option<String>,
}

/// A route handler for updating a transaction, redirects to the transaction
/// view, or `redirect_url` if given, on success.
pub async fn edit_transaction_endpoint(
    State(state): State<TransactionService>,
    Path(transaction_id): Path<TransactionId>,
    Query(query_params): Query<QueryParams>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let changes = TransactionChanges {
        description: Some(form.description),
        category: Some(form.category),
        subcategory: Some(form.subcategory.unwrap_or_default()),
        notes: Some(form.notes.unwrap_or_default()),
        date: Some(form.date),
        amount: Some(form.amount),
        currency: Some(form.currency),
    };

    if let Err(error) = state.update(transaction_id, changes).await {
        tracing::error!("Could not update transaction {transaction_id}: {error}");
        return error.into_alert_response();
    }

    let redirect_url = query_params
        .redirect_url
        .unwrap_or_else(|| format_endpoint(endpoints::TRANSACTION_VIEW, transaction_id));

    (HxRedirect(redirect_url), StatusCode::SEE_OTHER).into_response()
}
