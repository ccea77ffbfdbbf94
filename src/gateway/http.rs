use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{GatewayError, PlanGateway};
use crate::config::GatewayConfig;
use crate::plans::dto::{DietPlan, PlanPayload};

/// [`PlanGateway`] over the REST API of the plans backend.
#[derive(Clone)]
pub struct HttpPlanGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPlanGateway {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn patient_plans_url(&self, patient_id: Uuid) -> String {
        format!("{}/patients/{}/diet-plans", self.base_url, patient_id)
    }

    fn plan_url(&self, plan_id: Uuid) -> String {
        format!("{}/diet-plans/{}", self.base_url, plan_id)
    }

    async fn execute(&self, req: RequestBuilder) -> Result<Response, GatewayError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let res = req.send().await.map_err(|e| {
            warn!(error = %e, "plans backend unreachable");
            GatewayError::Transport(e.to_string())
        })?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.bytes().await.unwrap_or_default();
        let err = GatewayError::from_response(status.as_u16(), &body);
        debug!(%status, error = %err, "plans backend rejected request");
        Err(err)
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, GatewayError> {
        self.execute(req)
            .await?
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Transport(format!("decode response: {e}")))
    }
}

#[async_trait]
impl PlanGateway for HttpPlanGateway {
    #[instrument(skip(self, payload), fields(meals = payload.meals.len()))]
    async fn create_plan(
        &self,
        patient_id: Uuid,
        payload: &PlanPayload,
    ) -> Result<DietPlan, GatewayError> {
        self.json(self.client.post(self.patient_plans_url(patient_id)).json(payload))
            .await
    }

    #[instrument(skip(self))]
    async fn get_plan(&self, plan_id: Uuid) -> Result<DietPlan, GatewayError> {
        self.json(self.client.get(self.plan_url(plan_id))).await
    }

    #[instrument(skip(self))]
    async fn list_plans(&self, patient_id: Uuid) -> Result<Vec<DietPlan>, GatewayError> {
        self.json(self.client.get(self.patient_plans_url(patient_id)))
            .await
    }

    #[instrument(skip(self, payload), fields(meals = payload.meals.len()))]
    async fn update_plan(
        &self,
        plan_id: Uuid,
        payload: &PlanPayload,
    ) -> Result<DietPlan, GatewayError> {
        self.json(self.client.put(self.plan_url(plan_id)).json(payload))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_plan(&self, plan_id: Uuid) -> Result<(), GatewayError> {
        self.execute(self.client.delete(self.plan_url(plan_id)))
            .await
            .map(|_| ())
    }
}
