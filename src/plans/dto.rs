use serde::{Deserialize, Serialize};
use time::{format_description::FormatItem, macros::format_description, Date, OffsetDateTime};
use uuid::Uuid;

use super::vocab::{DayOfWeek, MealType, PlanStatus};

/// Calendar dates travel as `YYYY-MM-DD`.
pub const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// A plan as the persistence backend returns it: every meal carries its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub status: PlanStatus,
    pub version: i32,
    pub meals: Vec<DietMeal>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietMeal {
    pub id: Uuid,
    pub meal_type: MealType,
    pub content: String,
    pub day_of_week: DayOfWeek,
}

/// Form state of a plan while it is being authored.
///
/// Everything is kept as the raw value the professional typed, so that an
/// invalid draft can still be held, compared and re-rendered. The schema
/// validator turns a draft into a [`ValidPlan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub meals: Vec<MealDraft>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub meal_type: Option<String>,
    pub content: Option<String>,
    pub day_of_week: Option<String>,
}

impl MealDraft {
    /// A fresh, unsaved meal with the given defaults.
    pub fn new(meal_type: MealType, day_of_week: DayOfWeek, content: impl Into<String>) -> Self {
        Self {
            id: None,
            meal_type: Some(meal_type.as_str().to_string()),
            content: Some(content.into()),
            day_of_week: Some(day_of_week.as_str().to_string()),
        }
    }
}

impl From<&DietMeal> for MealDraft {
    fn from(m: &DietMeal) -> Self {
        Self {
            id: Some(m.id),
            meal_type: Some(m.meal_type.as_str().to_string()),
            content: Some(m.content.clone()),
            day_of_week: Some(m.day_of_week.as_str().to_string()),
        }
    }
}

impl From<&DietPlan> for PlanDraft {
    fn from(p: &DietPlan) -> Self {
        Self {
            title: Some(p.title.clone()),
            description: p.description.clone(),
            objectives: p.objectives.clone(),
            notes: p.notes.clone(),
            start_date: p.start_date.map(|d| d.to_string()),
            end_date: p.end_date.map(|d| d.to_string()),
            status: Some(p.status.as_str().to_string()),
            meals: p.meals.iter().map(MealDraft::from).collect(),
        }
    }
}

/// A plan that passed the schema validator, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidPlan {
    pub title: String,
    pub description: Option<String>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    #[serde(default, with = "iso_date::option")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option")]
    pub end_date: Option<Date>,
    pub status: PlanStatus,
    pub meals: Vec<ValidMeal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidMeal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub meal_type: MealType,
    pub content: String,
    pub day_of_week: DayOfWeek,
}

impl From<&ValidMeal> for MealDraft {
    fn from(m: &ValidMeal) -> Self {
        Self {
            id: m.id,
            meal_type: Some(m.meal_type.as_str().to_string()),
            content: Some(m.content.clone()),
            day_of_week: Some(m.day_of_week.as_str().to_string()),
        }
    }
}

impl From<&ValidPlan> for PlanDraft {
    fn from(p: &ValidPlan) -> Self {
        Self {
            title: Some(p.title.clone()),
            description: p.description.clone(),
            objectives: p.objectives.clone(),
            notes: p.notes.clone(),
            start_date: p.start_date.map(|d| d.to_string()),
            end_date: p.end_date.map(|d| d.to_string()),
            status: Some(p.status.as_str().to_string()),
            meals: p.meals.iter().map(MealDraft::from).collect(),
        }
    }
}

/// One meal of a create or update body. `id` is set only for meals that
/// already exist in the persisted plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub meal_type: MealType,
    pub content: String,
    pub day_of_week: DayOfWeek,
}

/// Body of `POST .../diet-plans` and `PUT /diet-plans/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objectives: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, with = "iso_date::option", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<Date>,
    #[serde(default, with = "iso_date::option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Date>,
    pub status: PlanStatus,
    pub meals: Vec<MealPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i32>,
}

impl PlanPayload {
    pub fn new(plan: ValidPlan, meals: Vec<MealPayload>, expected_version: Option<i32>) -> Self {
        Self {
            title: plan.title,
            description: plan.description,
            objectives: plan.objectives,
            notes: plan.notes,
            start_date: plan.start_date,
            end_date: plan.end_date,
            status: plan.status,
            meals,
            expected_version,
        }
    }

    /// Body for creating a plan: no meal carries an id.
    pub fn for_create(plan: ValidPlan) -> Self {
        let meals = plan
            .meals
            .iter()
            .map(|m| MealPayload {
                id: None,
                meal_type: m.meal_type,
                content: m.content.clone(),
                day_of_week: m.day_of_week,
            })
            .collect();
        Self::new(plan, meals, None)
    }
}

/// What the backend receives: the same fields as [`PlanPayload`], kept as
/// strings so the schema validator can report bad values by field path.
/// Values of the wrong JSON type are rejected before validation as a plain
/// bad request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequestBody {
    #[serde(flatten)]
    pub draft: PlanDraft,
    #[serde(default)]
    pub expected_version: Option<i32>,
}
