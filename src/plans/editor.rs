use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::dto::MealDraft;
use super::validation::MealField;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("no meal at index {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Stable identity of a meal entry for the lifetime of an authoring session.
///
/// Meals loaded from the backend are keyed by their persisted id; meals
/// appended during the session get a local key. Keys never change while the
/// entry lives, whatever happens to its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Persisted(Uuid),
    Local(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealEntry {
    pub key: EntryKey,
    pub meal: MealDraft,
}

/// Ordered meal list of a plan under edition.
///
/// Only `append`, `remove` and `update` mutate it; entries are never
/// reordered or merged.
#[derive(Debug, Clone, Default)]
pub struct MealListEditor {
    entries: Vec<MealEntry>,
    next_local: u64,
}

impl MealListEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from meals as loaded; those with an id keep it as their key.
    pub fn from_meals(meals: &[MealDraft]) -> Self {
        let mut editor = Self::new();
        for meal in meals {
            let key = match meal.id {
                Some(id) => EntryKey::Persisted(id),
                None => editor.mint_local(),
            };
            editor.entries.push(MealEntry {
                key,
                meal: meal.clone(),
            });
        }
        editor
    }

    fn mint_local(&mut self) -> EntryKey {
        let key = EntryKey::Local(self.next_local);
        self.next_local += 1;
        key
    }

    /// Add a new, unsaved meal at the end. Any id on `default` is dropped.
    pub fn append(&mut self, default: MealDraft) -> EntryKey {
        let key = self.mint_local();
        self.entries.push(MealEntry {
            key,
            meal: MealDraft { id: None, ..default },
        });
        debug!(?key, len = self.entries.len(), "meal appended");
        key
    }

    /// Remove the entry at `index`; later entries shift left by one.
    pub fn remove(&mut self, index: usize) -> Result<MealEntry, EditorError> {
        self.check(index)?;
        let removed = self.entries.remove(index);
        debug!(index, key = ?removed.key, len = self.entries.len(), "meal removed");
        Ok(removed)
    }

    /// Replace one field of the entry at `index`, leaving the rest untouched.
    pub fn update(
        &mut self,
        index: usize,
        field: MealField,
        value: impl Into<String>,
    ) -> Result<(), EditorError> {
        self.check(index)?;
        let meal = &mut self.entries[index].meal;
        let slot = match field {
            MealField::MealType => &mut meal.meal_type,
            MealField::Content => &mut meal.content,
            MealField::DayOfWeek => &mut meal.day_of_week,
        };
        *slot = Some(value.into());
        debug!(index, field = field.as_str(), "meal updated");
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), EditorError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(EditorError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }

    pub fn entries(&self) -> &[MealEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The meals as the form currently holds them.
    pub fn meals(&self) -> Vec<MealDraft> {
        self.entries.iter().map(|e| e.meal.clone()).collect()
    }
}
