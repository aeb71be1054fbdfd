//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{header::CONTENT_TYPE, request, response},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::Error;

/// Bodies longer than this many bytes are truncated in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Query and form fields whose values must never be written to the logs.
const SECRET_FIELDS: [&str; 3] = ["access_key", "api_key", "apikey"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// API keys in the query string and in form bodies are redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body_text) = match extract_request_body(request).await {
        Ok(extracted) => extracted,
        Err(error) => return error.into_response(),
    };

    let is_form = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        log_request(&redacted_parts(&parts), &redact_secrets(&body_text));
    } else {
        log_request(&redacted_parts(&parts), &body_text);
    }

    let request = Request::from_parts(parts, Body::from(body_text));
    let response = next.run(request).await;

    let (parts, body_text) = match extract_response_body(response).await {
        Ok(extracted) => extracted,
        Err(error) => return error.into_response(),
    };
    log_response(&parts, &body_text);

    Response::from_parts(parts, Body::from(body_text))
}

/// Replace the values of the secret fields in a URL encoded string.
fn redact_secrets(text: &str) -> String {
    text.split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if SECRET_FIELDS.contains(&name.to_ascii_lowercase().as_str()) => {
                format!("{name}=********")
            }
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// A copy of the request line and headers with secrets removed from the URI.
fn redacted_parts(parts: &request::Parts) -> RedactedRequest {
    let uri = match parts.uri.query() {
        Some(query) => format!("{}?{}", parts.uri.path(), redact_secrets(query)),
        None => parts.uri.path().to_owned(),
    };

    RedactedRequest {
        method: parts.method.to_string(),
        uri,
        headers: format!("{:#?}", parts.headers),
    }
}

struct RedactedRequest {
    method: String,
    uri: String,
    headers: String,
}

async fn extract_request_body(request: Request) -> Result<(request::Parts, String), Error> {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|error| Error::InvalidRequest(format!("could not read request body: {error}")))?;

    Ok((parts, String::from_utf8_lossy(&body_bytes).to_string()))
}

async fn extract_response_body(response: Response) -> Result<(response::Parts, String), Error> {
    let (parts, body) = response.into_parts();
    let body_bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|error| {
            tracing::error!("could not read response body: {error}");
            Error::SerializationError(error.to_string())
        })?;

    Ok((parts, String::from_utf8_lossy(&body_bytes).to_string()))
}

/// The longest prefix of `body` that fits in the limit without splitting a character.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());

    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(request: &RedactedRequest, body: &str) {
    let RedactedRequest {
        method,
        uri,
        headers,
    } = request;

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {method} {uri}\nheaders: {headers}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {method} {uri}\nheaders: {headers}\nbody: {body:?}");
    }
}

fn log_response(headers: &response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {headers:#?}\nbody: {:}...",
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {headers:#?}\nbody: {body:?}");
    }
}
