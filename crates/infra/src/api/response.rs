//! Response decoding and error normalization
//!
//! Success bodies are `{success, data}` envelopes; `data` is decoded into
//! the caller's type. Bodies without an envelope decode directly. Error
//! bodies are mined for `message`, `details`/`errors`, `code` and a trace
//! id before being classified by status.

use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use signage_domain::constants::{
    HEADER_QUOTA_EXCEEDED, HEADER_RATE_LIMIT_REMAINING, HEADER_REQUEST_ID, QUOTA_EXCEEDED_CODE,
};
use signage_domain::{ApiError, ApiErrorKind, ApiResult};

/// Decode a response into `T`, or normalize it into an [`ApiError`].
pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let headers = response.headers().clone();

    if !status.is_success() {
        // A body that cannot be read still yields a classified error.
        let body = response.bytes().await.unwrap_or_default();
        return Err(error_from_parts(status, &headers, &body));
    }

    if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
        return from_null(status);
    }

    let body = response.bytes().await.map_err(|err| {
        ApiError::network(format!("failed to read response body: {err}"))
            .with_status(status.as_u16())
    })?;
    decode_success(status, &body)
}

/// Decode a successful body (already read).
pub(crate) fn decode_success<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> ApiResult<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return from_null(status);
    }

    let value: Value = serde_json::from_slice(body).map_err(|err| {
        ApiError::server(format!("malformed response body: {err}")).with_status(status.as_u16())
    })?;

    unwrap_envelope(status, value)
}

fn unwrap_envelope<T: DeserializeOwned>(status: StatusCode, value: Value) -> ApiResult<T> {
    let payload = match value {
        Value::Object(mut map) if matches!(map.get("success"), Some(Value::Bool(_))) => {
            if map.get("success") == Some(&Value::Bool(false)) {
                let fields = ErrorFields::from_value(Value::Object(map));
                let message = fields.message.clone().unwrap_or_else(|| "request failed".into());
                return Err(fields.apply(ApiError::server(message).with_status(status.as_u16())));
            }
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    };

    serde_json::from_value(payload).map_err(|err| {
        ApiError::server(format!("unexpected response shape: {err}")).with_status(status.as_u16())
    })
}

fn from_null<T: DeserializeOwned>(status: StatusCode) -> ApiResult<T> {
    serde_json::from_value(Value::Null).map_err(|_| {
        ApiError::server(format!(
            "empty response ({}) cannot be decoded into the requested type",
            status.as_u16()
        ))
        .with_status(status.as_u16())
    })
}

/// Classify a non-success response.
pub(crate) fn error_from_parts(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> ApiError {
    let code = status.as_u16();
    let fields = serde_json::from_slice::<Value>(body)
        .map(ErrorFields::from_value)
        .unwrap_or_else(|_| ErrorFields::from_text(body));

    let quota_exhausted = code == 429
        && (fields.code.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(QUOTA_EXCEEDED_CODE))
            || header_str(headers, HEADER_QUOTA_EXCEEDED)
                .is_some_and(|v| v.eq_ignore_ascii_case("true")));

    let message = fields.message.clone().unwrap_or_else(|| {
        format!("HTTP {code} {}", status.canonical_reason().unwrap_or("unknown status"))
    });

    let mut error =
        fields.apply(ApiError::new(ApiErrorKind::from_status(code, quota_exhausted), message))
            .with_status(code);
    if error.trace_id.is_none() {
        if let Some(trace) = header_str(headers, HEADER_REQUEST_ID) {
            error = error.with_trace_id(trace);
        }
    }
    error
}

/// Parse `X-RateLimit-Remaining`, ignoring junk.
pub(crate) fn rate_limit_remaining(headers: &HeaderMap) -> Option<u32> {
    header_str(headers, HEADER_RATE_LIMIT_REMAINING).and_then(|v| v.trim().parse().ok())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Loose view over the error body shapes the backend emits.
#[derive(Debug, Default, Deserialize)]
struct ErrorFields {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<Value>,
    #[serde(default, alias = "trace_id", alias = "requestId", alias = "traceId")]
    request_id: Option<String>,
}

impl ErrorFields {
    fn from_value(value: Value) -> Self {
        let Value::Object(mut map) = value else {
            return Self::default();
        };

        // `error` may be a bare string or a nested `{code, message, details}`.
        let nested = match map.remove("error") {
            Some(Value::String(message)) => {
                Self { message: Some(message), ..Self::default() }
            }
            Some(inner @ Value::Object(_)) => serde_json::from_value(inner).unwrap_or_default(),
            _ => Self::default(),
        };
        let errors = map.remove("errors");

        let mut fields: Self = serde_json::from_value(Value::Object(map)).unwrap_or_default();
        fields.message = fields.message.or(nested.message);
        fields.code = fields.code.or(nested.code);
        fields.details = fields.details.or(nested.details).or(errors);
        fields.request_id = fields.request_id.or(nested.request_id);
        fields
    }

    fn from_text(body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body).trim().to_string();
        Self { message: (!text.is_empty()).then_some(text), ..Self::default() }
    }

    fn apply(self, mut error: ApiError) -> ApiError {
        if let Some(details) = self.details {
            error = error.with_details(details);
        }
        if let Some(trace) = self.request_id {
            error = error.with_trace_id(trace);
        }
        error
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;

    fn body(value: &Value) -> Vec<u8> {
        serde_json::to_vec(value).unwrap()
    }

    #[test]
    fn envelope_data_is_unwrapped() {
        let payload = body(&json!({"success": true, "data": {"id": "s1"}}));
        let decoded: Value = decode_success(StatusCode::OK, &payload).unwrap();
        assert_eq!(decoded, json!({"id": "s1"}));
    }

    #[test]
    fn bare_body_decodes_directly() {
        let payload = body(&json!([1, 2, 3]));
        let decoded: Vec<u32> = decode_success(StatusCode::OK, &payload).unwrap();
        assert_eq!(decoded, vec![1, 2, 3]);
    }

    #[test]
    fn failed_envelope_is_server_error() {
        let payload = body(&json!({"success": false, "message": "render farm offline"}));
        let err = decode_success::<Value>(StatusCode::OK, &payload).unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Server);
        assert_eq!(err.message, "render farm offline");
    }

    #[test]
    fn malformed_success_body_is_server_error() {
        let err = decode_success::<Value>(StatusCode::OK, b"<html>").unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Server);
        assert_eq!(err.status, Some(200));
    }

    #[test]
    fn empty_body_decodes_unit() {
        decode_success::<()>(StatusCode::OK, b"").unwrap();
        assert!(decode_success::<Vec<u8>>(StatusCode::OK, b"  ").is_err());
    }

    #[test]
    fn validation_error_keeps_details_and_trace() {
        let payload = body(&json!({
            "message": "Validation failed",
            "errors": [{"field": "name", "message": "required"}],
            "request_id": "req-9"
        }));
        let err = error_from_parts(StatusCode::UNPROCESSABLE_ENTITY, &HeaderMap::new(), &payload);

        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(err.message, "Validation failed");
        assert_eq!(err.status, Some(422));
        assert_eq!(err.trace_id.as_deref(), Some("req-9"));
        assert!(err.details.is_some());
    }

    #[test]
    fn nested_error_object_is_read() {
        let payload = body(&json!({"error": {"code": "QUOTA_EXCEEDED", "message": "Storage full"}}));
        let err = error_from_parts(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new(), &payload);

        assert_eq!(err.kind, ApiErrorKind::QuotaExceeded);
        assert_eq!(err.message, "Storage full");
    }

    #[test]
    fn quota_header_marks_quota_exceeded() {
        let mut headers = HeaderMap::new();
        headers.insert("x-quota-exceeded", HeaderValue::from_static("true"));
        let err = error_from_parts(StatusCode::TOO_MANY_REQUESTS, &headers, b"");
        assert_eq!(err.kind, ApiErrorKind::QuotaExceeded);

        let plain = error_from_parts(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new(), b"slow down");
        assert_eq!(plain.kind, ApiErrorKind::RateLimited);
        assert_eq!(plain.message, "slow down");
    }

    #[test]
    fn unlisted_client_error_is_validation() {
        let err = error_from_parts(StatusCode::CONFLICT, &HeaderMap::new(), b"");
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert_eq!(err.message, "HTTP 409 Conflict");
    }

    #[test]
    fn rate_limit_header_parses() {
        let mut headers = HeaderMap::new();
        assert_eq!(rate_limit_remaining(&headers), None);
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static(" 7 "));
        assert_eq!(rate_limit_remaining(&headers), Some(7));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("many"));
        assert_eq!(rate_limit_remaining(&headers), None);
    }
}
