//! Defines the endpoints for recording income and expenses from the web pages.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::{HxRedirect, HxRetarget};

use crate::{
    alert::Alert,
    category::TransactionType,
    endpoints,
    transaction::{
        form::TransactionForm,
        service::{TransactionDraft, TransactionService},
    },
};

/// A route handler for recording income, redirects to the transactions view on success.
pub async fn create_income_endpoint(
    State(state): State<TransactionService>,
    Form(form): Form<TransactionForm>,
) -> Response {
    create_transaction(TransactionType::Income, &state, form).await
}

/// A route handler for recording an expense, redirects to the transactions view on success.
///
/// If the expense exceeds or comes close to a budget, a warning is shown
/// instead of redirecting.
pub async fn create_expense_endpoint(
    State(state): State<TransactionService>,
    Form(form): Form<TransactionForm>,
) -> Response {
    create_transaction(TransactionType::Expense, &state, form).await
}

async fn create_transaction(
    transaction_type: TransactionType,
    state: &TransactionService,
    form: TransactionForm,
) -> Response {
    let tags = form.tag_list();
    let draft = TransactionDraft {
        transaction_type,
        amount: form.amount,
        currency: Some(form.currency),
        description: form.description,
        category: form.category,
        subcategory: form.subcategory,
        date: Some(form.date),
        account_id: None,
        reference: form.reference,
        tags,
        notes: form.notes,
    };

    let created = match state.create(draft).await {
        Ok(created) => created,
        Err(error) => {
            tracing::error!("could not create {transaction_type}: {error}");
            return error.into_alert_response();
        }
    };

    match created.budget_warning {
        Some(warning) => (
            HxRetarget("#alert-container".to_owned()),
            Alert::Warning {
                message: format!("Saved {}", created.transaction.description),
                details: warning.to_string(),
            }
            .into_response_with_status(StatusCode::CREATED),
        )
            .into_response(),
        None => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
    }
}
