//! In-process gateway used by tests; follows the same update contract as the
//! Postgres backend.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{GatewayError, PlanGateway};
use crate::plans::dto::{DietMeal, DietPlan, PlanPayload};

#[derive(Default)]
pub(crate) struct MemoryPlanGateway {
    plans: Mutex<HashMap<Uuid, DietPlan>>,
    pub(crate) professional_id: Uuid,
    updates: Mutex<Vec<PlanPayload>>,
}

impl MemoryPlanGateway {
    pub(crate) fn new() -> Self {
        Self {
            professional_id: Uuid::new_v4(),
            ..Self::default()
        }
    }

    pub(crate) fn stored(&self, plan_id: Uuid) -> Option<DietPlan> {
        self.plans.lock().unwrap().get(&plan_id).cloned()
    }

    pub(crate) fn last_update(&self) -> Option<PlanPayload> {
        self.updates.lock().unwrap().last().cloned()
    }

    /// Bump the stored version as if another session had saved the plan.
    pub(crate) fn touch(&self, plan_id: Uuid) {
        if let Some(plan) = self.plans.lock().unwrap().get_mut(&plan_id) {
            plan.version += 1;
        }
    }
}

fn apply_fields(plan: &mut DietPlan, payload: &PlanPayload) {
    plan.title = payload.title.clone();
    plan.description = payload.description.clone();
    plan.objectives = payload.objectives.clone();
    plan.notes = payload.notes.clone();
    plan.start_date = payload.start_date;
    plan.end_date = payload.end_date;
    plan.status = payload.status;
}

#[async_trait]
impl PlanGateway for MemoryPlanGateway {
    async fn create_plan(
        &self,
        patient_id: Uuid,
        payload: &PlanPayload,
    ) -> Result<DietPlan, GatewayError> {
        let now = OffsetDateTime::now_utc();
        let mut plan = DietPlan {
            id: Uuid::new_v4(),
            patient_id,
            professional_id: self.professional_id,
            title: String::new(),
            description: None,
            objectives: None,
            notes: None,
            start_date: None,
            end_date: None,
            status: payload.status,
            version: 1,
            meals: payload
                .meals
                .iter()
                .map(|m| DietMeal {
                    id: Uuid::new_v4(),
                    meal_type: m.meal_type,
                    content: m.content.clone(),
                    day_of_week: m.day_of_week,
                })
                .collect(),
            created_at: now,
            updated_at: now,
        };
        apply_fields(&mut plan, payload);
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn get_plan(&self, plan_id: Uuid) -> Result<DietPlan, GatewayError> {
        self.stored(plan_id).ok_or(GatewayError::NotFound)
    }

    async fn list_plans(&self, patient_id: Uuid) -> Result<Vec<DietPlan>, GatewayError> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.patient_id == patient_id)
            .cloned()
            .collect())
    }

    async fn update_plan(
        &self,
        plan_id: Uuid,
        payload: &PlanPayload,
    ) -> Result<DietPlan, GatewayError> {
        self.updates.lock().unwrap().push(payload.clone());
        let mut plans = self.plans.lock().unwrap();
        let plan = plans.get_mut(&plan_id).ok_or(GatewayError::NotFound)?;
        if payload.expected_version.is_some_and(|v| v != plan.version) {
            return Err(GatewayError::Conflict);
        }

        let rejected = |message: &str| GatewayError::Validation {
            message: message.into(),
            fields: Vec::new(),
        };
        let mut seen = HashSet::new();
        let mut meals = Vec::with_capacity(payload.meals.len());
        for m in &payload.meals {
            let id = match m.id {
                Some(id) if !plan.meals.iter().any(|existing| existing.id == id) => {
                    return Err(rejected("meal does not belong to this plan"))
                }
                Some(id) if !seen.insert(id) => {
                    return Err(rejected("meal appears more than once"))
                }
                Some(id) => id,
                None => Uuid::new_v4(),
            };
            meals.push(DietMeal {
                id,
                meal_type: m.meal_type,
                content: m.content.clone(),
                day_of_week: m.day_of_week,
            });
        }

        apply_fields(plan, payload);
        plan.meals = meals;
        plan.version += 1;
        plan.updated_at = OffsetDateTime::now_utc();
        Ok(plan.clone())
    }

    async fn delete_plan(&self, plan_id: Uuid) -> Result<(), GatewayError> {
        self.plans
            .lock()
            .unwrap()
            .remove(&plan_id)
            .map(|_| ())
            .ok_or(GatewayError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::dto::MealPayload;
    use crate::plans::vocab::{DayOfWeek, MealType, PlanStatus};

    fn meal(id: Option<Uuid>, content: &str) -> MealPayload {
        MealPayload {
            id,
            meal_type: MealType::Dinner,
            content: content.into(),
            day_of_week: DayOfWeek::Friday,
        }
    }

    fn payload(meals: Vec<MealPayload>, expected_version: Option<i32>) -> PlanPayload {
        PlanPayload {
            title: "Plan A".into(),
            description: None,
            objectives: None,
            notes: None,
            start_date: None,
            end_date: None,
            status: PlanStatus::Active,
            meals,
            expected_version,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_and_foreign_ids_without_changing_the_plan() {
        let gw = MemoryPlanGateway::new();
        let plan = gw
            .create_plan(Uuid::new_v4(), &payload(vec![meal(None, "Sopa")], None))
            .await
            .unwrap();
        let id = plan.meals[0].id;

        let dup = payload(vec![meal(Some(id), "Sopa"), meal(Some(id), "Otra")], Some(1));
        assert!(matches!(
            gw.update_plan(plan.id, &dup).await,
            Err(GatewayError::Validation { .. })
        ));
        let foreign = payload(vec![meal(Some(Uuid::new_v4()), "Sopa")], Some(1));
        assert!(matches!(
            gw.update_plan(plan.id, &foreign).await,
            Err(GatewayError::Validation { .. })
        ));
        assert_eq!(gw.stored(plan.id).unwrap(), plan);
    }
}
