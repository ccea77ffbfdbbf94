//! Maps an edited meal list back onto the meals that were loaded, deciding
//! per entry whether it updates a persisted meal or creates a new one.
//!
//! The backend deletes every persisted meal whose id is absent from the
//! payload; [`Reconciliation::removed`] lists those ids for the caller.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dto::{DietMeal, MealPayload, ValidMeal};
use super::editor::EntryKey;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Match entries to persisted meals through their stable entry key.
    #[default]
    ByKey,
    /// Entry `i` takes the id of loaded meal `i`; entries past the loaded
    /// length are new. Removing or inserting anywhere but the end hands ids
    /// to the wrong meals; kept for clients that depend on it.
    ByPosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub meals: Vec<MealPayload>,
    pub removed: Vec<Uuid>,
}

impl Reconciliation {
    pub fn updates(&self) -> usize {
        self.meals.iter().filter(|m| m.id.is_some()).count()
    }

    pub fn creates(&self) -> usize {
        self.meals.iter().filter(|m| m.id.is_none()).count()
    }
}

/// Build the meal part of an update payload.
///
/// `original` is the meal list as loaded; `working` holds each entry's key
/// with its validated meal, in list order.
pub fn reconcile(
    original: &[DietMeal],
    working: &[(EntryKey, ValidMeal)],
    strategy: ReconcileStrategy,
) -> Reconciliation {
    let original_ids: HashSet<Uuid> = original.iter().map(|m| m.id).collect();

    let meals: Vec<MealPayload> = working
        .iter()
        .enumerate()
        .map(|(index, (key, meal))| {
            let id = match strategy {
                ReconcileStrategy::ByKey => match key {
                    EntryKey::Persisted(id) if original_ids.contains(id) => Some(*id),
                    _ => None,
                },
                ReconcileStrategy::ByPosition => original.get(index).map(|m| m.id),
            };
            MealPayload {
                id,
                meal_type: meal.meal_type,
                content: meal.content.clone(),
                day_of_week: meal.day_of_week,
            }
        })
        .collect();

    let kept: HashSet<Uuid> = meals.iter().filter_map(|m| m.id).collect();
    let removed = original
        .iter()
        .map(|m| m.id)
        .filter(|id| !kept.contains(id))
        .collect();

    Reconciliation { meals, removed }
}
