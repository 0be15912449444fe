use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use warp::http::StatusCode;

/// Field-keyed validation messages, rendered as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("{0}")]
    Conflict(String),
    #[error("authentication required")]
    Unauthorized,
    #[error("permission denied")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("invalid page")]
    InvalidPage,

    #[error("query failed: {0}")]
    Query(String),
    #[error("cache failed: {0}")]
    Cache(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(FieldErrors::single(field, message))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound | Self::InvalidPage => StatusCode::NOT_FOUND,
            Self::Query(_) | Self::Cache(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Validation(errors) => json!(errors),
            Self::Conflict(message) => json!({ "errors": message }),
            Self::Unauthorized => {
                json!({ "detail": "Authentication credentials were not provided." })
            }
            Self::Forbidden => {
                json!({ "detail": "You do not have permission to perform this action." })
            }
            Self::NotFound => json!({ "detail": "Not found." }),
            Self::InvalidPage => json!({ "detail": "Invalid page." }),
            Self::Query(_) | Self::Cache(_) | Self::Internal(_) => {
                json!({ "detail": "Internal server error." })
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Configuration(e) => Self::Query(format!("{e}")),
            sqlx::Error::Database(e) => Self::Query(format!("{e}")),
            sqlx::Error::Io(e) => Self::Query(format!("{e}")),
            sqlx::Error::Tls(e) => Self::Query(format!("{e}")),
            sqlx::Error::Protocol(e) => Self::Query(e),
            sqlx::Error::TypeNotFound { type_name } => {
                Self::Query(format!("Type not found: {type_name}"))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::Query(format!("Column index out of bounds {index} ({len})"))
            }
            sqlx::Error::ColumnNotFound(e) => Self::Query(e),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::Query(format!("Column decode {index} ({source})"))
            }
            sqlx::Error::Decode(e) => Self::Query(format!("{e}")),
            sqlx::Error::PoolTimedOut => Self::Query(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::Query(String::from("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::Query(String::from("Worker crashed")),
            sqlx::Error::Migrate(e) => Self::Query(format!("{e}")),
            _ => Self::Query(String::from("Unknown error")),
        }
    }
}

impl From<redis::RedisError> for ApiError {
    fn from(value: redis::RedisError) -> Self {
        Self::Cache(format!("{:?} - {:?}", value.code(), value.detail()))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(format!("{value}"))
    }
}

impl warp::reject::Reject for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("ingredients", "Duplicate ingredient.");
        errors.add("ingredients", "Ingredient 9 does not exist.");
        errors.add("name", "This field is required.");

        assert_eq!(errors.get("ingredients").map(<[String]>::len), Some(2));
        assert!(errors.contains("name"));
        assert!(!errors.contains("text"));
        let body = ApiError::Validation(errors).body();
        assert_eq!(body["name"][0], "This field is required.");
    }

    #[test]
    fn conflict_renders_errors_key() {
        let error = ApiError::Conflict(String::from("Recipe is already in favorites"));
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.body(), json!({ "errors": "Recipe is already in favorites" }));
    }

    #[test]
    fn converts_into_a_findable_rejection() {
        let rejection: warp::Rejection = ApiError::Forbidden.into();
        assert!(matches!(rejection.find::<ApiError>(), Some(ApiError::Forbidden)));
    }

    #[test]
    fn row_not_found_is_not_found() {
        let error = ApiError::from(sqlx::Error::RowNotFound);
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
    }
}
