//! One professional editing one plan: the working copy, its baseline and the
//! submit flow (validate, reconcile, call the gateway).

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::changes::Baseline;
use super::dto::{DietMeal, DietPlan, MealDraft, PlanDraft, PlanPayload, ValidMeal};
use super::editor::MealListEditor;
use super::reconcile::{reconcile, ReconcileStrategy};
use super::validation::{validate_plan, PlanField, ValidationErrors};
use crate::gateway::{cancellable, GatewayError, PlanGateway};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Invalid(#[from] ValidationErrors),
    #[error("nothing to save")]
    NoChanges,
    #[error("{0:?} is not a text field")]
    NotATextField(PlanField),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone)]
enum Origin {
    New { patient_id: Uuid },
    Persisted {
        plan_id: Uuid,
        version: i32,
        meals: Vec<DietMeal>,
    },
}

/// What a submit sends to the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Create {
        patient_id: Uuid,
        payload: PlanPayload,
    },
    Update {
        plan_id: Uuid,
        payload: PlanPayload,
        /// Persisted meal ids the backend will delete.
        removed: Vec<Uuid>,
    },
}

#[derive(Debug, Clone)]
pub struct AuthoringSession {
    origin: Origin,
    baseline: Baseline,
    fields: PlanDraft,
    meals: MealListEditor,
    strategy: ReconcileStrategy,
}

impl AuthoringSession {
    /// Blank plan for a patient. `first_meal` seeds the meal list.
    pub fn new_plan(patient_id: Uuid, first_meal: Option<MealDraft>) -> Self {
        let mut meals = MealListEditor::new();
        if let Some(meal) = first_meal {
            meals.append(meal);
        }
        Self {
            origin: Origin::New { patient_id },
            baseline: Baseline::from_draft(PlanDraft::default()),
            fields: PlanDraft::default(),
            meals,
            strategy: ReconcileStrategy::default(),
        }
    }

    /// Start editing a plan as returned by the gateway.
    pub fn from_plan(plan: &DietPlan, strategy: ReconcileStrategy) -> Self {
        let baseline = Baseline::capture(plan);
        let mut fields = baseline.draft().clone();
        let meals = MealListEditor::from_meals(&std::mem::take(&mut fields.meals));
        Self {
            origin: Origin::Persisted {
                plan_id: plan.id,
                version: plan.version,
                meals: plan.meals.clone(),
            },
            baseline,
            fields,
            meals,
            strategy,
        }
    }

    #[instrument(skip(gateway, cancel))]
    pub async fn load(
        gateway: &dyn PlanGateway,
        plan_id: Uuid,
        strategy: ReconcileStrategy,
        cancel: &CancellationToken,
    ) -> Result<Self, SessionError> {
        let plan = cancellable(cancel, gateway.get_plan(plan_id)).await?;
        info!(%plan_id, meals = plan.meals.len(), version = plan.version, "plan loaded");
        Ok(Self::from_plan(&plan, strategy))
    }

    pub fn plan_id(&self) -> Option<Uuid> {
        match &self.origin {
            Origin::New { .. } => None,
            Origin::Persisted { plan_id, .. } => Some(*plan_id),
        }
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        self.strategy
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// Set a plan-level text field (title, dates, status, ...).
    pub fn set_field(
        &mut self,
        field: PlanField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        let f = &mut self.fields;
        let slot = match field {
            PlanField::Title => &mut f.title,
            PlanField::Description => &mut f.description,
            PlanField::Objectives => &mut f.objectives,
            PlanField::Notes => &mut f.notes,
            PlanField::StartDate => &mut f.start_date,
            PlanField::EndDate => &mut f.end_date,
            PlanField::Status => &mut f.status,
            PlanField::Meals => return Err(SessionError::NotATextField(field)),
        };
        *slot = Some(value.into());
        Ok(())
    }

    pub fn meals(&self) -> &MealListEditor {
        &self.meals
    }

    pub fn meals_mut(&mut self) -> &mut MealListEditor {
        &mut self.meals
    }

    /// The form as it currently stands.
    pub fn working_copy(&self) -> PlanDraft {
        PlanDraft {
            meals: self.meals.meals(),
            ..self.fields.clone()
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.baseline.has_unsaved_changes(&self.working_copy())
    }

    /// Leaving the screen needs the professional's confirmation.
    pub fn confirm_discard_needed(&self) -> bool {
        self.has_unsaved_changes()
    }

    /// Whether the save control should be enabled.
    pub fn can_submit(&self) -> bool {
        match self.origin {
            Origin::New { .. } => true,
            Origin::Persisted { .. } => self.has_unsaved_changes(),
        }
    }

    /// Validate and reconcile without calling the gateway.
    pub fn prepare_submit(&self) -> Result<Submission, SessionError> {
        if !self.can_submit() {
            return Err(SessionError::NoChanges);
        }
        let plan = validate_plan(&self.working_copy())?;
        match &self.origin {
            Origin::New { patient_id } => Ok(Submission::Create {
                patient_id: *patient_id,
                payload: PlanPayload::for_create(plan),
            }),
            Origin::Persisted {
                plan_id,
                version,
                meals,
            } => {
                let working: Vec<_> = self
                    .meals
                    .entries()
                    .iter()
                    .map(|e| e.key)
                    .zip(plan.meals.iter().cloned())
                    .collect::<Vec<(_, ValidMeal)>>();
                let r = reconcile(meals, &working, self.strategy);
                Ok(Submission::Update {
                    plan_id: *plan_id,
                    payload: PlanPayload::new(plan, r.meals, Some(*version)),
                    removed: r.removed,
                })
            }
        }
    }

    /// Validate, reconcile and persist. On success the session continues from
    /// the saved plan; on failure the working copy is left as it was.
    #[instrument(skip_all)]
    pub async fn submit(
        &mut self,
        gateway: &dyn PlanGateway,
        cancel: &CancellationToken,
    ) -> Result<DietPlan, SessionError> {
        let submission = self.prepare_submit().map_err(|e| {
            warn!(error = %e, "submit rejected locally");
            e
        })?;

        let saved = match &submission {
            Submission::Create {
                patient_id,
                payload,
            } => cancellable(cancel, gateway.create_plan(*patient_id, payload)).await,
            Submission::Update {
                plan_id,
                payload,
                removed,
            } => {
                info!(
                    %plan_id,
                    meals = payload.meals.len(),
                    removed = removed.len(),
                    strategy = ?self.strategy,
                    "submitting plan update"
                );
                cancellable(cancel, gateway.update_plan(*plan_id, payload)).await
            }
        }
        .map_err(|e| {
            warn!(error = %e, retryable = e.is_retryable(), "plan submit failed");
            e
        })?;

        *self = Self::from_plan(&saved, self.strategy);
        info!(plan_id = %saved.id, version = saved.version, "plan saved");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryPlanGateway;
    use crate::plans::validation::MealField;
    use crate::plans::vocab::{DayOfWeek, MealType, PlanStatus};

    fn meal(content: &str) -> MealDraft {
        MealDraft::new(MealType::Lunch, DayOfWeek::Monday, content)
    }

    async fn saved_plan(gw: &MemoryPlanGateway, contents: &[&str]) -> DietPlan {
        let mut s = AuthoringSession::new_plan(Uuid::new_v4(), None);
        s.set_field(PlanField::Title, "Plan A").unwrap();
        for c in contents {
            s.meals_mut().append(meal(c));
        }
        s.submit(gw, &CancellationToken::new()).await.unwrap()
    }

    #[tokio::test]
    async fn create_assigns_ids_and_defaults_status() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content", "m2content"]).await;
        assert_eq!(plan.status, PlanStatus::Active);
        assert_eq!(plan.version, 1);
        assert_eq!(plan.meals.len(), 2);
        assert_ne!(plan.meals[0].id, plan.meals[1].id);
    }

    #[tokio::test]
    async fn new_plan_without_meals_cannot_be_submitted() {
        let gw = MemoryPlanGateway::new();
        let mut s = AuthoringSession::new_plan(Uuid::new_v4(), None);
        s.set_field(PlanField::Title, "Plan A").unwrap();
        let err = s.submit(&gw, &CancellationToken::new()).await.unwrap_err();
        let SessionError::Invalid(errs) = err else {
            panic!("expected validation errors");
        };
        assert!(errs.has(PlanField::Meals));
    }

    #[tokio::test]
    async fn loaded_plan_has_no_unsaved_changes() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content", "m2content"]).await;
        let cancel = CancellationToken::new();
        let mut s = AuthoringSession::load(&gw, plan.id, ReconcileStrategy::ByKey, &cancel)
            .await
            .unwrap();
        assert!(!s.has_unsaved_changes());
        assert!(!s.can_submit());
        s.set_field(PlanField::Title, "Plan A").unwrap();
        assert!(!s.confirm_discard_needed());
        assert!(matches!(s.prepare_submit(), Err(SessionError::NoChanges)));
    }

    #[tokio::test]
    async fn unchanged_meals_round_trip_with_their_ids() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content", "m2content"]).await;
        let mut s = AuthoringSession::from_plan(&plan, ReconcileStrategy::ByPosition);
        s.set_field(PlanField::Notes, "sin sal").unwrap();
        let Submission::Update { payload, removed, .. } = s.prepare_submit().unwrap() else {
            panic!("expected update");
        };
        assert_eq!(payload.meals[0].id, Some(plan.meals[0].id));
        assert_eq!(payload.meals[1].id, Some(plan.meals[1].id));
        assert_eq!(payload.expected_version, Some(1));
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn by_position_reassigns_ids_after_removing_first_meal() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content", "m2content"]).await;
        let mut s = AuthoringSession::from_plan(&plan, ReconcileStrategy::ByPosition);
        s.meals_mut().remove(0).unwrap();
        let Submission::Update { payload, .. } = s.prepare_submit().unwrap() else {
            panic!("expected update");
        };
        assert_eq!(payload.meals.len(), 1);
        assert_eq!(payload.meals[0].id, Some(plan.meals[0].id));
        assert_eq!(payload.meals[0].content, "m2content");
    }

    #[tokio::test]
    async fn by_key_submit_keeps_meal_identity() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content", "m2content", "m3content"]).await;
        let mut s = AuthoringSession::from_plan(&plan, ReconcileStrategy::ByKey);
        s.meals_mut().remove(0).unwrap();
        s.meals_mut().append(meal("m4content"));
        s.meals_mut()
            .update(0, MealField::Content, "m2 editada")
            .unwrap();

        let saved = s.submit(&gw, &CancellationToken::new()).await.unwrap();
        assert_eq!(saved.version, 2);
        let ids: Vec<_> = saved.meals.iter().map(|m| m.id).collect();
        assert_eq!(&ids[..2], &[plan.meals[1].id, plan.meals[2].id]);
        assert!(!ids.contains(&plan.meals[0].id));
        assert_eq!(saved.meals[0].content, "m2 editada");
        assert_eq!(saved.meals[2].content, "m4content");

        // the session now continues from what was saved
        assert!(!s.has_unsaved_changes());
        assert_eq!(s.meals().len(), 3);
    }

    #[tokio::test]
    async fn invalid_working_copy_never_reaches_the_gateway() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content"]).await;
        let mut s = AuthoringSession::from_plan(&plan, ReconcileStrategy::ByKey);
        s.set_field(PlanField::StartDate, "2025-06-01").unwrap();
        s.set_field(PlanField::EndDate, "2025-05-01").unwrap();
        let err = s.submit(&gw, &CancellationToken::new()).await.unwrap_err();
        let SessionError::Invalid(errs) = err else {
            panic!("expected validation errors");
        };
        assert!(errs.has(PlanField::EndDate));
        assert!(gw.last_update().is_none());
        assert!(s.has_unsaved_changes());
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict_and_keeps_the_edit() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content"]).await;
        let mut s = AuthoringSession::from_plan(&plan, ReconcileStrategy::ByKey);
        s.set_field(PlanField::Title, "Plan B").unwrap();
        gw.touch(plan.id);
        let err = s.submit(&gw, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SessionError::Gateway(GatewayError::Conflict)));
        assert_eq!(s.working_copy().title.as_deref(), Some("Plan B"));
        assert_eq!(gw.stored(plan.id).unwrap().title, "Plan A");
    }

    #[tokio::test]
    async fn cancelled_submit_leaves_session_untouched() {
        let gw = MemoryPlanGateway::new();
        let plan = saved_plan(&gw, &["m1content"]).await;
        let mut s = AuthoringSession::from_plan(&plan, ReconcileStrategy::ByKey);
        s.set_field(PlanField::Title, "Plan B").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = s.submit(&gw, &cancel).await.unwrap_err();
        assert!(matches!(err, SessionError::Gateway(GatewayError::Cancelled)));
        assert!(s.has_unsaved_changes());
        assert_eq!(gw.stored(plan.id).unwrap().version, 1);
    }

    #[tokio::test]
    async fn loading_a_missing_plan_is_not_found() {
        let gw = MemoryPlanGateway::new();
        let cancel = CancellationToken::new();
        let err = AuthoringSession::load(&gw, Uuid::new_v4(), ReconcileStrategy::ByKey, &cancel)
            .await
            .unwrap_err();
        let SessionError::Gateway(e) = err else {
            panic!("expected gateway error");
        };
        assert!(e.should_navigate_away());
    }

    #[test]
    fn meals_is_not_a_text_field() {
        let mut s = AuthoringSession::new_plan(Uuid::new_v4(), Some(meal("m1content")));
        assert!(matches!(
            s.set_field(PlanField::Meals, "x"),
            Err(SessionError::NotATextField(PlanField::Meals))
        ));
        assert_eq!(s.meals().len(), 1);
    }
}
