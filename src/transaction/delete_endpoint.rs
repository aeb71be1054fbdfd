//! Defines the endpoint for deleting a transaction from the web pages.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;

use crate::{
    Error, database_id::TransactionId, endpoints, transaction::service::TransactionService,
};

/// A route handler for deleting a transaction, redirects to the transactions view.
///
/// The transaction is marked inactive rather than removed, so it still shows
/// up in exports that include inactive transactions.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionService>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    match state.delete(transaction_id, false) {
        Ok(()) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(Error::NotFound) => Error::DeleteMissingTransaction.into_alert_response(),
        Err(error) => {
            tracing::error!("Could not delete transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::{Path, State},
        http::StatusCode,
    };

    use crate::{
        TransactionType, endpoints,
        test_utils::assert_hx_redirect,
        transaction::{
            delete_endpoint::delete_transaction_endpoint,
            service::{TransactionDraft, tests::get_test_service},
        },
    };

    #[tokio::test]
    async fn marks_transaction_inactive() {
        let service = get_test_service();
        let id = service
            .create(TransactionDraft::new(TransactionType::Expense, 5.0, "Bus", "transport"))
            .await
            .unwrap()
            .transaction
            .id;

        let response = delete_transaction_endpoint(State(service.clone()), Path(id)).await;

        assert_hx_redirect(&response, endpoints::TRANSACTIONS_VIEW);
        assert!(!service.get(id).unwrap().is_active);
    }

    #[tokio::test]
    async fn missing_transaction_gives_not_found() {
        let service = get_test_service();

        let response = delete_transaction_endpoint(State(service), Path(12)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
