//! The persistence gateway as the authoring core sees it.

use std::future::Future;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::ErrorBody;
use crate::plans::dto::{DietPlan, PlanPayload};
use crate::plans::validation::FieldError;

pub mod http;
#[cfg(test)]
pub(crate) mod memory;

pub use http::HttpPlanGateway;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// 400: the backend rejected the plan; `fields` uses the same paths as
    /// the local validator.
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },
    #[error("not allowed to access this diet plan")]
    Forbidden,
    #[error("diet plan not found")]
    NotFound,
    /// 409: the plan changed since it was loaded.
    #[error("diet plan was modified since it was loaded")]
    Conflict,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("unexpected status {status}: {message}")]
    Unexpected { status: u16, message: String },
}

impl GatewayError {
    /// Map a non-success response onto the error taxonomy.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_slice(body).ok();
        match status {
            400 => {
                let (message, fields) = parsed
                    .map(|b| (b.error, b.fields))
                    .unwrap_or_else(|| ("bad request".to_string(), Vec::new()));
                GatewayError::Validation { message, fields }
            }
            403 => GatewayError::Forbidden,
            404 => GatewayError::NotFound,
            409 => GatewayError::Conflict,
            _ => GatewayError::Unexpected {
                status,
                message: parsed
                    .map(|b| b.error)
                    .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
            },
        }
    }

    /// Whether resubmitting the same request can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport(_) | GatewayError::Cancelled => true,
            GatewayError::Unexpected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the caller should leave the plan screen.
    pub fn should_navigate_away(&self) -> bool {
        matches!(self, GatewayError::NotFound)
    }

    /// Single notification text for the professional.
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::Validation { .. } => "Revisa los campos marcados del formulario.",
            GatewayError::Forbidden => "No tienes permiso para modificar este plan.",
            GatewayError::NotFound => "El plan no existe o fue eliminado.",
            GatewayError::Conflict => {
                "El plan fue modificado por otra sesión. Recárgalo antes de guardar."
            }
            GatewayError::Cancelled => "La operación fue cancelada.",
            GatewayError::Transport(_) | GatewayError::Unexpected { .. } => {
                "No se pudo guardar el plan. Inténtalo de nuevo."
            }
        }
    }
}

/// CRUD operations on diet plans, as offered by the backend.
#[async_trait]
pub trait PlanGateway: Send + Sync {
    async fn create_plan(
        &self,
        patient_id: Uuid,
        payload: &PlanPayload,
    ) -> Result<DietPlan, GatewayError>;

    async fn get_plan(&self, plan_id: Uuid) -> Result<DietPlan, GatewayError>;

    async fn list_plans(&self, patient_id: Uuid) -> Result<Vec<DietPlan>, GatewayError>;

    /// Persisted meals whose id is absent from `payload.meals` are deleted.
    async fn update_plan(
        &self,
        plan_id: Uuid,
        payload: &PlanPayload,
    ) -> Result<DietPlan, GatewayError>;

    async fn delete_plan(&self, plan_id: Uuid) -> Result<(), GatewayError>;
}

/// Run a gateway call unless `cancel` fires first.
pub async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GatewayError::Cancelled),
        res = call => res,
    }
}
