use super::dto::{DietPlan, MealDraft, PlanDraft};
use super::validation::PlanField;

/// Snapshot of a plan as it was loaded, used to tell whether the working
/// copy differs from what is persisted.
///
/// The snapshot is an owned value with no mutating API: once captured it
/// stays as loaded for the whole session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    draft: PlanDraft,
}

impl Baseline {
    pub fn capture(plan: &DietPlan) -> Self {
        Self {
            draft: PlanDraft::from(plan),
        }
    }

    pub fn from_draft(draft: PlanDraft) -> Self {
        Self { draft }
    }

    pub fn draft(&self) -> &PlanDraft {
        &self.draft
    }

    /// Structural comparison of `current` against the snapshot.
    ///
    /// Meal ids take part in the comparison. An empty optional input equals
    /// an absent one.
    pub fn has_unsaved_changes(&self, current: &PlanDraft) -> bool {
        !self.changed_fields(current).is_empty()
    }

    /// Plan fields whose value differs from the snapshot, in declaration order.
    pub fn changed_fields(&self, current: &PlanDraft) -> Vec<PlanField> {
        let base = &self.draft;
        let mut changed = Vec::new();
        let texts = [
            (PlanField::Title, &base.title, &current.title),
            (PlanField::Description, &base.description, &current.description),
            (PlanField::Objectives, &base.objectives, &current.objectives),
            (PlanField::Notes, &base.notes, &current.notes),
            (PlanField::StartDate, &base.start_date, &current.start_date),
            (PlanField::EndDate, &base.end_date, &current.end_date),
            (PlanField::Status, &base.status, &current.status),
        ];
        for (field, a, b) in texts {
            if !same_text(a, b) {
                changed.push(field);
            }
        }
        if !same_meals(&base.meals, &current.meals) {
            changed.push(PlanField::Meals);
        }
        changed
    }
}

fn same_text(a: &Option<String>, b: &Option<String>) -> bool {
    let a = a.as_deref().filter(|s| !s.is_empty());
    let b = b.as_deref().filter(|s| !s.is_empty());
    a == b
}

fn same_meals(a: &[MealDraft], b: &[MealDraft]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.id == y.id
                && same_text(&x.meal_type, &y.meal_type)
                && same_text(&x.content, &y.content)
                && same_text(&x.day_of_week, &y.day_of_week)
        })
}
