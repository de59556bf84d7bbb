use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store operation timed out: {0}")]
    Timeout(&'static str),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Config error: {0}")]
    Config(String),

    /// A store failure tagged with the operation the caller asked for.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Store { source, .. } => source.status_code(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Tag an infrastructure error with the failed operation. Validation
    /// errors already name the problem and pass through unchanged.
    pub fn context(self, context: &'static str) -> Self {
        match self {
            AppError::Validation(_) | AppError::Store { .. } => self,
            other => AppError::Store {
                context,
                source: Box::new(other),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            AppError::Validation(ref msg) => {
                tracing::warn!("Rejected reading: {}", msg);
                json!({ "error": msg })
            }
            AppError::Store { context, ref source } => {
                tracing::error!(details = %source, "{}", context);
                json!({ "error": context, "details": source.to_string() })
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                json!({ "error": "database operation failed", "details": e.to_string() })
            }
            AppError::Timeout(op) => {
                tracing::error!("Store operation timed out: {}", op);
                json!({ "error": "store operation timed out", "details": op })
            }
            AppError::StoreUnavailable(ref msg) => {
                tracing::error!("Store unavailable: {}", msg);
                json!({ "error": "store unavailable", "details": msg })
            }
            AppError::Config(ref msg) => {
                tracing::error!("Config error: {}", msg);
                json!({ "error": "service misconfigured", "details": msg })
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_bad_request() {
        let err = AppError::Validation("missing field 'temperatura'".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_errors_are_server_errors() {
        let errors = vec![
            AppError::Database(sqlx::Error::PoolTimedOut),
            AppError::Timeout("append reading"),
            AppError::StoreUnavailable("DATABASE_URL is not set".into()),
            AppError::Config("bad table".into()),
            AppError::Timeout("list readings").context("failed to load readings"),
        ];
        for err in errors {
            assert_eq!(
                err.into_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_context_wraps_store_errors_only() {
        let err = AppError::StoreUnavailable("no url".into()).context("failed to store reading");
        assert_eq!(err.to_string(), "failed to store reading: Store unavailable: no url");

        let err = AppError::Validation("bad".into()).context("failed to store reading");
        assert!(matches!(err, AppError::Validation(_)));

        // Re-tagging keeps the innermost operation.
        let err = AppError::Timeout("append reading")
            .context("failed to store reading")
            .context("failed to load readings");
        assert!(matches!(
            err,
            AppError::Store { context: "failed to store reading", .. }
        ));
    }
}
