use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

use crate::plans::repo::RepoError;
use crate::plans::validation::{FieldError, ValidationErrors};

/// JSON body of every error response: `{ "error": ..., "fields": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

/// Errors returned by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("the plan is not valid")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("this plan belongs to another professional")]
    Forbidden,
    #[error("diet plan not found")]
    NotFound,
    #[error("plan version {expected} is stale (current is {current})")]
    Conflict { expected: i32, current: i32 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::Validation(e.into_inner())
    }
}

/// A body that is not JSON, or whose values have the wrong type, is a bad
/// request like any other malformed plan.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::NotOwner => ApiError::Forbidden,
            RepoError::StaleVersion { expected, current } => {
                ApiError::Conflict { expected, current }
            }
            e @ (RepoError::ForeignMeal(_) | RepoError::DuplicateMeal(_)) => {
                ApiError::BadRequest(e.to_string())
            }
            e @ (RepoError::Corrupt(_) | RepoError::Db(_)) => ApiError::Internal(e.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(fields) => ErrorBody {
                error: "the plan is not valid".into(),
                fields,
            },
            ApiError::Internal(e) => {
                error!(error = %format!("{e:#}"), "internal error");
                ErrorBody {
                    error: "internal server error".into(),
                    fields: Vec::new(),
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                fields: Vec::new(),
            },
        };
        (status, Json(body)).into_response()
    }
}
