//! The response envelopes used by the JSON API.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::Error;

/// Wraps successful responses as `{"success": true, "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiData<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T> ApiData<T> {
    pub fn json(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: None,
        })
    }

    pub fn with_message(data: T, message: String) -> Json<Self> {
        Json(Self {
            success: true,
            data,
            message: Some(message),
        })
    }
}

/// The kinds of errors reported by the JSON API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// The request was understood but breaks a rule, e.g. a future date.
    BusinessError,
    /// The request could not be understood, e.g. malformed JSON.
    ValidationError,
    NotFound,
    ServerError,
}

impl ApiErrorKind {
    fn status_code(self) -> StatusCode {
        match self {
            ApiErrorKind::BusinessError | ApiErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An error response for the JSON API, rendered as
/// `{"success": false, "error": "...", "type": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::ValidationError,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::NotFound,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let kind = match &error {
            Error::NotFound | Error::UpdateMissingTransaction | Error::DeleteMissingTransaction => {
                ApiErrorKind::NotFound
            }
            Error::FutureDate(_)
            | Error::NonPositiveAmount
            | Error::AmountTooLarge
            | Error::InvalidCategory { .. }
            | Error::InvalidAccount(_)
            | Error::InvalidBudget(_)
            | Error::DuplicateAccountName(_)
            | Error::NoExchangeRateFound(_) => ApiErrorKind::BusinessError,
            Error::UnsupportedCurrency(_)
            | Error::InvalidTransactionType(_)
            | Error::EmptyDescription
            | Error::DescriptionTooLong(_)
            | Error::InvalidPeriod(_)
            | Error::InvalidRequest(_) => ApiErrorKind::ValidationError,
            _ => ApiErrorKind::ServerError,
        };

        let message = match kind {
            ApiErrorKind::ServerError => {
                tracing::error!("An unexpected error occurred: {error}");
                "an internal server error occurred".to_owned()
            }
            _ => error.to_string(),
        };

        Self { kind, message }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(format!("invalid JSON body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(format!("invalid query: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.message,
            "type": self.kind,
        }));

        (self.kind.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::Value;

    use crate::{
        Error,
        api_error::{ApiError, ApiErrorKind},
    };

    async fn body_json(error: ApiError) -> (StatusCode, Value) {
        let response = error.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn business_errors_are_bad_requests() {
        let (status, body) = body_json(Error::NonPositiveAmount.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["type"], "business_error");
        assert_eq!(body["error"], "the amount must be greater than zero");
    }

    #[tokio::test]
    async fn missing_resources_are_not_found() {
        let (status, body) = body_json(Error::NotFound.into()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["type"], "not_found");
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let (status, body) = body_json(Error::DatabaseLockError.into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["type"], "server_error");
        assert_eq!(body["error"], "an internal server error occurred");
    }

    #[test]
    fn parse_errors_are_validation_errors() {
        assert_eq!(
            ApiError::from(Error::UnsupportedCurrency("GBP".to_owned())).kind,
            ApiErrorKind::ValidationError
        );
    }
}
