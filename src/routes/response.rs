//! Response builders and request body parsing shared by the handlers

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::error;

use crate::types::{FactbookError, Result};

/// Allowed request headers, including the CSRF echo header
pub const ALLOW_HEADERS: &str = "Content-Type, X-CSRF-Token";

/// Serialize `body` as a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// `{"message": ...}` response
pub fn message_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "message": message }))
}

/// `{"error": ...}` response
pub fn error_response(status: StatusCode, error: &str) -> Response<Full<Bytes>> {
    json_response(status, &json!({ "error": error }))
}

/// Render a handler error
///
/// Authentication and authorization failures use the `message` key, like
/// the session endpoints; everything else reports under `error`. Storage
/// and internal details are logged, never returned.
pub fn from_error(err: &FactbookError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    match err {
        FactbookError::Validation(messages) => {
            json_response(status, &json!({ "message": messages }))
        }
        FactbookError::Unauthorized(message) | FactbookError::Forbidden(message) => {
            message_response(status, message)
        }
        FactbookError::NotFound(message) | FactbookError::BadRequest(message) => {
            error_response(status, message)
        }
        FactbookError::Database(detail) => {
            error!(error = %detail, "Database error");
            error_response(status, "Database error")
        }
        FactbookError::Internal(_) | FactbookError::Auth(_) => {
            error!(error = %err, "Request failed");
            error_response(status, "Internal server error")
        }
    }
}

/// Turn a handler result into a response
pub fn respond(result: Result<Response<Full<Bytes>>>) -> Response<Full<Bytes>> {
    result.unwrap_or_else(|e| from_error(&e))
}

/// Parse a JSON body that may be wrapped in a `{"<wrapper>": {...}}` object
///
/// Both `{"member": {"first_name": "Ada"}}` and `{"first_name": "Ada"}`
/// parse to the same value. An empty body parses as `{}`.
pub fn parse_body<T: DeserializeOwned>(body: &Bytes, wrapper: &str) -> Result<T> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(invalid_json)?
    };

    let inner = match value {
        Value::Object(mut map) if map.get(wrapper).is_some_and(Value::is_object) => {
            map.remove(wrapper).unwrap_or_default()
        }
        Value::Object(map) => Value::Object(map),
        _ => return Err(FactbookError::BadRequest("Invalid JSON body: expected an object".into())),
    };

    serde_json::from_value(inner).map_err(invalid_json)
}

fn invalid_json(err: serde_json::Error) -> FactbookError {
    FactbookError::BadRequest(format!("Invalid JSON body: {}", err))
}

/// RFC 3339 rendering of a stored timestamp
pub fn timestamp(value: Option<bson::DateTime>) -> Option<String> {
    value.map(|dt| dt.to_chrono().to_rfc3339())
}

/// CORS preflight response
pub fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, PATCH, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", ALLOW_HEADERS)
        .header("Access-Control-Max-Age", "86400")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

/// Not found response
pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_FOUND,
        &json!({
            "error": "Not Found",
            "path": path,
        }),
    )
}

pub fn method_not_allowed_response() -> Response<Full<Bytes>> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
