//! Expensa is a web app for tracking income and expenses across currencies.
//!
//! Transactions can be recorded in Colombian pesos, US dollars or euros and
//! are converted to a base currency with exchange rates that are fetched from
//! several online sources and cached in the database.
//!
//! This library provides a REST API that directly serves HTML pages, plus a
//! JSON API under `/api`.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use time::Date;
use tokio::signal;

mod account;
mod alert;
mod api_error;
mod app_state;
mod budget;
mod catalog;
mod category;
mod config;
mod currency;
mod dashboard;
mod database_id;
mod db;
mod endpoints;
mod exchange;
mod export;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod pagination;
mod report;
mod routing;
mod sample_data;
mod settings_page;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use category::TransactionType;
pub use config::{ExchangeRateConfig, LedgerConfig};
pub use currency::{Currency, CurrencyPair};
pub use db::initialize as initialize_db;
pub use exchange::{ExchangeRateService, RateLookup, RateOrigin, ResolvedRate};
pub use export::write_transactions_csv;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use sample_data::create_sample_data;
pub use transaction::{TransactionFilter, get_transactions};

use crate::{
    alert::Alert, category::ParseTransactionTypeError, currency::ParseCurrencyError,
    database_id::DatabaseId, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A date in the future was used to create a transaction.
    ///
    /// Transactions record events that have already happened, therefore future
    /// dates are not allowed.
    #[error("{0} is a date in the future, which is not allowed")]
    FutureDate(Date),

    /// A transaction or budget amount was zero or negative.
    ///
    /// Amounts are always entered as positive numbers, the sign is derived
    /// from the transaction type.
    #[error("the amount must be greater than zero")]
    NonPositiveAmount,

    /// An amount was larger than [currency::MAX_AMOUNT].
    #[error("the amount must be at most {}", currency::MAX_AMOUNT)]
    AmountTooLarge,

    /// A total could not be computed without overflowing.
    #[error("the totals are too large to compute")]
    AmountOverflow,

    /// The currency code is not one of the supported currencies.
    #[error("unsupported currency \"{0}\"")]
    UnsupportedCurrency(String),

    /// The category is not valid for the transaction type.
    #[error("\"{category}\" is not a valid {transaction_type} category")]
    InvalidCategory {
        /// The type of the transaction that was given the category.
        transaction_type: TransactionType,
        /// The category that was rejected.
        category: String,
    },

    /// The transaction type was neither "income" nor "expense".
    #[error("invalid transaction type \"{0}\"")]
    InvalidTransactionType(String),

    /// A transaction was created without a description.
    #[error("the description cannot be empty")]
    EmptyDescription,

    /// A transaction description was longer than the maximum length.
    #[error("the description must be at most {0} characters long")]
    DescriptionTooLong(usize),

    /// The account ID used to create a transaction did not match an account.
    #[error("the account ID {0} does not refer to a valid account")]
    InvalidAccount(DatabaseId),

    /// A budget was created with an invalid amount or period.
    #[error("invalid budget: {0}")]
    InvalidBudget(String),

    /// A report was requested for a period other than month, quarter or year.
    #[error("invalid period \"{0}\", expected \"month\", \"quarter\" or \"year\"")]
    InvalidPeriod(String),

    /// A query parameter or request body field could not be understood.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No exchange rate source could provide a rate and nothing was cached.
    #[error("no exchange rate found for {0}")]
    NoExchangeRateFound(String),

    /// The HTTP client used for fetching exchange rates could not be created.
    #[error("could not create the HTTP client: {0}")]
    HttpClientError(String),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The specified account name already exists in the database.
    #[error("the account \"{0}\" already exists in the database")]
    DuplicateAccountName(String),

    /// An error occurred while serializing a struct as JSON or CSV.
    #[error("could not serialize the data: {0}")]
    SerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<ParseCurrencyError> for Error {
    fn from(value: ParseCurrencyError) -> Self {
        Error::UnsupportedCurrency(value.0)
    }
}

impl From<ParseTransactionTypeError> for Error {
    fn from(value: ParseTransactionTypeError) -> Self {
        Error::InvalidTransactionType(value.0)
    }
}

impl Error {
    /// Whether the error was caused by invalid input rather than a server fault.
    pub(crate) fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Error::FutureDate(_)
                | Error::NonPositiveAmount
                | Error::AmountTooLarge
                | Error::UnsupportedCurrency(_)
                | Error::InvalidCategory { .. }
                | Error::InvalidTransactionType(_)
                | Error::EmptyDescription
                | Error::DescriptionTooLong(_)
                | Error::InvalidAccount(_)
                | Error::InvalidBudget(_)
                | Error::InvalidPeriod(_)
                | Error::InvalidRequest(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            error if error.is_validation_error() => {
                let fix = error.to_string();
                (
                    StatusCode::BAD_REQUEST,
                    InternalServerError {
                        description: "Invalid request",
                        fix: &fix,
                    }
                    .into_html(),
                )
                    .into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    fn into_alert_response(self) -> Response {
        match self {
            Error::InvalidTimezoneError(timezone) => Alert::Error {
                message: "Invalid Timezone Settings".to_owned(),
                details: format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR),
            Error::FutureDate(date) => Alert::Error {
                message: "Invalid transaction date".to_owned(),
                details: format!(
                    "{date} is a date in the future, which is not allowed. \
                    Change the date to today or earlier."
                ),
            }
            .into_response_with_status(StatusCode::BAD_REQUEST),
            Error::UpdateMissingTransaction => Alert::Error {
                message: "Could not update transaction".to_owned(),
                details: "The transaction could not be found.".to_owned(),
            }
            .into_response_with_status(StatusCode::NOT_FOUND),
            Error::DeleteMissingTransaction => Alert::Error {
                message: "Could not delete transaction".to_owned(),
                details: "The transaction could not be found. \
                    Try refreshing the page to see if the transaction has already been deleted."
                    .to_owned(),
            }
            .into_response_with_status(StatusCode::NOT_FOUND),
            Error::NoExchangeRateFound(pair) => Alert::Error {
                message: "Exchange rate unavailable".to_owned(),
                details: format!(
                    "Could not get an exchange rate for {pair}. Try again later."
                ),
            }
            .into_response_with_status(StatusCode::SERVICE_UNAVAILABLE),
            error if error.is_validation_error() => Alert::Error {
                message: "Invalid transaction".to_owned(),
                details: capitalize_first(&error.to_string()),
            }
            .into_response_with_status(StatusCode::BAD_REQUEST),
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details: "An unexpected error occurred, check the server logs for more details."
                        .to_owned(),
                }
                .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{Error, TransactionType};

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let response = Error::InvalidCategory {
            transaction_type: TransactionType::Expense,
            category: "yachts".to_owned(),
        }
        .into_alert_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unexpected_errors_are_server_errors() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_renders_404() {
        let response = Error::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
