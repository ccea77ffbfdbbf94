use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::dto::{DietMeal, DietPlan};
use super::vocab::VocabError;

/// Row of `diet_plans`; enum columns are stored as their wire strings.
#[derive(Debug, FromRow)]
pub struct DietPlanRow {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub professional_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub objectives: Option<String>,
    pub notes: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status: String,
    pub version: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct DietMealRow {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub meal_type: String,
    pub content: String,
    pub day_of_week: String,
}

impl TryFrom<DietMealRow> for DietMeal {
    type Error = VocabError;

    fn try_from(r: DietMealRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            meal_type: r.meal_type.parse()?,
            content: r.content,
            day_of_week: r.day_of_week.parse()?,
        })
    }
}

impl DietPlanRow {
    /// Assemble the plan; `meals` must already be in position order.
    pub fn into_plan(self, meals: Vec<DietMealRow>) -> Result<DietPlan, VocabError> {
        Ok(DietPlan {
            id: self.id,
            patient_id: self.patient_id,
            professional_id: self.professional_id,
            title: self.title,
            description: self.description,
            objectives: self.objectives,
            notes: self.notes,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status.parse()?,
            version: self.version,
            meals: meals
                .into_iter()
                .map(DietMeal::try_from)
                .collect::<Result<_, _>>()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
