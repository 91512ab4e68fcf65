//! Conversions from external infrastructure errors into domain errors.
//!
//! Transport failures become [`ApiError`]s; SQLite, pool, serialization and
//! blocking-task failures become [`StoreError`]s.

use std::time::Duration;

use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;
use signage_domain::{ApiError, ApiErrorKind, StoreError};
use tokio::task::JoinError;

/// Map a transport error onto the client error taxonomy.
pub(crate) trait IntoApiError {
    /// `timeout` is the per-request deadline the transport ran with.
    fn into_api_error(self, timeout: Duration) -> ApiError;
}

/// Map a local persistence error onto [`StoreError`].
pub(crate) trait IntoStoreError {
    fn into_store_error(self) -> StoreError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ApiError */
/* -------------------------------------------------------------------------- */

impl IntoApiError for HttpError {
    fn into_api_error(self, timeout: Duration) -> ApiError {
        if self.is_timeout() {
            return ApiError::timeout(timeout);
        }

        if self.is_builder() {
            return ApiError::validation(format!("request could not be built: {self}"));
        }

        if self.is_connect() {
            return ApiError::network(format!("connection failure: {}", root_cause(&self)));
        }

        if self.is_decode() {
            return ApiError::server(format!("response body could not be decoded: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {code} {}", status.canonical_reason().unwrap_or("unknown status"));
            return ApiError::new(ApiErrorKind::from_status(code, false), message)
                .with_status(code);
        }

        ApiError::network(self.to_string())
    }
}

fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = err;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → StoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for SqlError {
    fn into_store_error(self) -> StoreError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => StoreError::Database("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        StoreError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        StoreError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::NotADatabase, _) => {
                        StoreError::Database("file is not a SQLite database".into())
                    }
                    _ => StoreError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                StoreError::Invalid(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, name, ty) => {
                StoreError::Invalid(format!("invalid column type for {name}: {ty}"))
            }
            RE::Utf8Error(_) => StoreError::Invalid("invalid UTF-8 returned from sqlite".into()),
            RE::InvalidPath(path) => StoreError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => StoreError::Database(other.to_string()),
        }
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2 / serde_json / JoinError → StoreError */
/* -------------------------------------------------------------------------- */

impl IntoStoreError for r2d2::Error {
    fn into_store_error(self) -> StoreError {
        StoreError::Database(format!("connection pool: {self}"))
    }
}

impl IntoStoreError for serde_json::Error {
    fn into_store_error(self) -> StoreError {
        StoreError::Serialization(self.to_string())
    }
}

impl IntoStoreError for JoinError {
    fn into_store_error(self) -> StoreError {
        if self.is_cancelled() {
            StoreError::Task("storage task cancelled".into())
        } else {
            StoreError::Task(format!("storage task panic: {self}"))
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        assert_eq!(err.into_store_error(), StoreError::Database("database is busy".into()));
    }

    #[test]
    fn sqlite_unique_violation_is_named() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::ConstraintViolation, extended_code: 1555 },
            None,
        );

        assert_eq!(
            err.into_store_error(),
            StoreError::Database("unique constraint violation".into())
        );
    }

    #[test]
    fn serde_error_maps_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(err.into_store_error(), StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn connection_refused_maps_to_network() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = reqwest::Client::new().get(format!("http://{addr}")).send().await.unwrap_err();
        let api = err.into_api_error(Duration::from_secs(1));

        assert_eq!(api.kind, ApiErrorKind::Network);
        assert!(api.is_retryable());
    }

    #[tokio::test]
    async fn slow_response_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client =
            reqwest::Client::builder().timeout(Duration::from_millis(50)).build().unwrap();
        let err = client.get(server.uri()).send().await.unwrap_err();
        let api = err.into_api_error(Duration::from_millis(50));

        assert_eq!(api.kind, ApiErrorKind::Timeout);
    }

    #[tokio::test]
    async fn status_error_uses_taxonomy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = reqwest::get(server.uri()).await.unwrap().error_for_status().unwrap_err();
        let api = err.into_api_error(Duration::from_secs(1));

        assert_eq!(api.kind, ApiErrorKind::PermissionDenied);
        assert_eq!(api.status, Some(403));
    }
}
