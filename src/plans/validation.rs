//! Schema validator for diet plans.
//!
//! [`validate_plan`] checks a [`PlanDraft`] and either returns the
//! normalized [`ValidPlan`] or every problem found, keyed by field path.
//! Rules run in a fixed order:
//! 1. required fields are present,
//! 2. lengths are within bounds,
//! 3. enum values and dates parse,
//! 4. `endDate` is not before `startDate` (only when both parsed),
//! 5. the plan has between 1 and 50 meals.
//!
//! A field that failed an earlier rule is not reported again.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::Date;

use super::dto::{MealDraft, PlanDraft, ValidMeal, ValidPlan, ISO_DATE};
use super::vocab::{DayOfWeek, MealType, PlanStatus};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;
pub const OBJECTIVES_MAX: usize = 500;
pub const NOTES_MAX: usize = 1000;
pub const CONTENT_MIN: usize = 3;
pub const CONTENT_MAX: usize = 1000;
pub const MEALS_MIN: usize = 1;
pub const MEALS_MAX: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanField {
    Title,
    Description,
    Objectives,
    Notes,
    StartDate,
    EndDate,
    Status,
    Meals,
}

impl PlanField {
    const ALL: [PlanField; 8] = [
        PlanField::Title,
        PlanField::Description,
        PlanField::Objectives,
        PlanField::Notes,
        PlanField::StartDate,
        PlanField::EndDate,
        PlanField::Status,
        PlanField::Meals,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlanField::Title => "title",
            PlanField::Description => "description",
            PlanField::Objectives => "objectives",
            PlanField::Notes => "notes",
            PlanField::StartDate => "startDate",
            PlanField::EndDate => "endDate",
            PlanField::Status => "status",
            PlanField::Meals => "meals",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MealField {
    MealType,
    Content,
    DayOfWeek,
}

impl MealField {
    const ALL: [MealField; 3] = [MealField::MealType, MealField::Content, MealField::DayOfWeek];

    pub fn as_str(self) -> &'static str {
        match self {
            MealField::MealType => "mealType",
            MealField::Content => "content",
            MealField::DayOfWeek => "dayOfWeek",
        }
    }
}

/// Where an error belongs: a plan field, or one field of the meal at an index.
///
/// Rendered as `title`, `endDate`, `meals` or `meals.<index>.<field>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum FieldPath {
    Plan(PlanField),
    Meal { index: usize, field: MealField },
}

impl FieldPath {
    pub fn meal(index: usize, field: MealField) -> Self {
        FieldPath::Meal { index, field }
    }
}

impl From<PlanField> for FieldPath {
    fn from(f: PlanField) -> Self {
        FieldPath::Plan(f)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Plan(field) => f.write_str(field.as_str()),
            FieldPath::Meal { index, field } => write!(f, "meals.{}.{}", index, field.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field path {0:?}")]
pub struct UnknownFieldPath(String);

impl FromStr for FieldPath {
    type Err = UnknownFieldPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || UnknownFieldPath(s.to_string());
        if let Some(rest) = s.strip_prefix("meals.") {
            let (index, field) = rest.split_once('.').ok_or_else(unknown)?;
            let index = index.parse::<usize>().map_err(|_| unknown())?;
            let field = MealField::ALL
                .into_iter()
                .find(|f| f.as_str() == field)
                .ok_or_else(unknown)?;
            return Ok(FieldPath::Meal { index, field });
        }
        PlanField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .map(FieldPath::Plan)
            .ok_or_else(unknown)
    }
}

impl From<FieldPath> for String {
    fn from(p: FieldPath) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for FieldPath {
    type Error = UnknownFieldPath;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: FieldPath,
    pub message: String,
}

/// Non-empty list of field errors; the plan cannot be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("plan failed validation with {} error(s)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First message reported for `path`, if any.
    pub fn message_for(&self, path: impl Into<FieldPath>) -> Option<&str> {
        let path = path.into();
        self.0
            .iter()
            .find(|e| e.path == path)
            .map(|e| e.message.as_str())
    }

    pub fn has(&self, path: impl Into<FieldPath>) -> bool {
        self.message_for(path).is_some()
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

mod msg {
    pub const TITLE_REQUIRED: &str = "El título es obligatorio.";
    pub const TITLE_TOO_SHORT: &str = "El título debe tener al menos 3 caracteres.";
    pub const TITLE_TOO_LONG: &str = "El título no puede superar los 100 caracteres.";
    pub const DESCRIPTION_TOO_LONG: &str = "La descripción no puede superar los 500 caracteres.";
    pub const OBJECTIVES_TOO_LONG: &str = "Los objetivos no pueden superar los 500 caracteres.";
    pub const NOTES_TOO_LONG: &str = "Las notas no pueden superar los 1000 caracteres.";
    pub const INVALID_STATUS: &str = "Estado de plan inválido.";
    pub const INVALID_DATE: &str = "Fecha inválida.";
    pub const END_BEFORE_START: &str =
        "La fecha de fin debe ser posterior o igual a la fecha de inicio.";
    pub const NO_MEALS: &str = "El plan debe tener al menos una comida.";
    pub const TOO_MANY_MEALS: &str = "El plan no puede tener más de 50 comidas.";
    pub const MEAL_TYPE_REQUIRED: &str = "Selecciona el tipo de comida.";
    pub const INVALID_MEAL_TYPE: &str = "Tipo de comida inválido.";
    pub const DAY_REQUIRED: &str = "Selecciona el día de la semana.";
    pub const INVALID_DAY: &str = "Día de la semana inválido.";
    pub const CONTENT_REQUIRED: &str = "El contenido de la comida es obligatorio.";
    pub const CONTENT_TOO_SHORT: &str = "El contenido debe tener al menos 3 caracteres.";
    pub const CONTENT_TOO_LONG: &str = "El contenido no puede superar los 1000 caracteres.";
}

/// Validate a plan draft. Pure: the same draft always gives the same result.
pub fn validate_plan(draft: &PlanDraft) -> Result<ValidPlan, ValidationErrors> {
    let mut c = Checker::default();

    // 1. required
    c.required(PlanField::Title.into(), draft.title.as_deref(), msg::TITLE_REQUIRED);
    for (i, meal) in draft.meals.iter().enumerate() {
        let at = |field| FieldPath::meal(i, field);
        c.required(at(MealField::MealType), meal.meal_type.as_deref(), msg::MEAL_TYPE_REQUIRED);
        c.required(at(MealField::Content), meal.content.as_deref(), msg::CONTENT_REQUIRED);
        c.required(at(MealField::DayOfWeek), meal.day_of_week.as_deref(), msg::DAY_REQUIRED);
    }

    // 2. length bounds
    c.length(
        PlanField::Title.into(),
        draft.title.as_deref(),
        Some((TITLE_MIN, msg::TITLE_TOO_SHORT)),
        (TITLE_MAX, msg::TITLE_TOO_LONG),
    );
    let optional_texts = [
        (PlanField::Description, &draft.description, DESCRIPTION_MAX, msg::DESCRIPTION_TOO_LONG),
        (PlanField::Objectives, &draft.objectives, OBJECTIVES_MAX, msg::OBJECTIVES_TOO_LONG),
        (PlanField::Notes, &draft.notes, NOTES_MAX, msg::NOTES_TOO_LONG),
    ];
    for (field, value, max, message) in optional_texts {
        c.length(field.into(), value.as_deref(), None, (max, message));
    }
    for (i, meal) in draft.meals.iter().enumerate() {
        c.length(
            FieldPath::meal(i, MealField::Content),
            meal.content.as_deref(),
            Some((CONTENT_MIN, msg::CONTENT_TOO_SHORT)),
            (CONTENT_MAX, msg::CONTENT_TOO_LONG),
        );
    }

    // 3. enum membership and date format
    let status = c
        .parse::<PlanStatus>(PlanField::Status.into(), draft.status.as_deref(), msg::INVALID_STATUS)
        .unwrap_or_default();
    let start_date = c.date(PlanField::StartDate.into(), draft.start_date.as_deref());
    let end_date = c.date(PlanField::EndDate.into(), draft.end_date.as_deref());
    let mut meal_enums = Vec::with_capacity(draft.meals.len());
    for (i, meal) in draft.meals.iter().enumerate() {
        let meal_type = c.parse::<MealType>(
            FieldPath::meal(i, MealField::MealType),
            meal.meal_type.as_deref(),
            msg::INVALID_MEAL_TYPE,
        );
        let day = c.parse::<DayOfWeek>(
            FieldPath::meal(i, MealField::DayOfWeek),
            meal.day_of_week.as_deref(),
            msg::INVALID_DAY,
        );
        meal_enums.push((meal_type, day));
    }

    // 4. date ordering
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end < start {
            c.push(PlanField::EndDate.into(), msg::END_BEFORE_START);
        }
    }

    // 5. cardinality
    if draft.meals.len() < MEALS_MIN {
        c.push(PlanField::Meals.into(), msg::NO_MEALS);
    } else if draft.meals.len() > MEALS_MAX {
        c.push(PlanField::Meals.into(), msg::TOO_MANY_MEALS);
    }

    if !c.errors.is_empty() {
        return Err(ValidationErrors(c.errors));
    }

    let meals = draft
        .meals
        .iter()
        .zip(meal_enums)
        .filter_map(|(meal, enums)| match enums {
            (Some(meal_type), Some(day_of_week)) => Some(valid_meal(meal, meal_type, day_of_week)),
            _ => None,
        })
        .collect();

    Ok(ValidPlan {
        title: draft.title.clone().unwrap_or_default(),
        description: non_empty(&draft.description),
        objectives: non_empty(&draft.objectives),
        notes: non_empty(&draft.notes),
        start_date,
        end_date,
        status,
        meals,
    })
}

fn valid_meal(meal: &MealDraft, meal_type: MealType, day_of_week: DayOfWeek) -> ValidMeal {
    ValidMeal {
        id: meal.id,
        meal_type,
        content: meal.content.clone().unwrap_or_default(),
        day_of_week,
    }
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_ref().filter(|s| !s.is_empty()).cloned()
}

fn is_blank(v: Option<&str>) -> bool {
    v.map_or(true, |s| s.trim().is_empty())
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn push(&mut self, path: FieldPath, message: &str) {
        self.errors.push(FieldError {
            path,
            message: message.to_string(),
        });
    }

    fn failed(&self, path: FieldPath) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }

    fn required(&mut self, path: FieldPath, value: Option<&str>, message: &str) {
        if is_blank(value) {
            self.push(path, message);
        }
    }

    fn length(
        &mut self,
        path: FieldPath,
        value: Option<&str>,
        min: Option<(usize, &str)>,
        max: (usize, &str),
    ) {
        let Some(value) = value else { return };
        if self.failed(path) {
            return;
        }
        let len = value.chars().count();
        match min {
            Some((min, message)) if len < min => self.push(path, message),
            _ if len > max.0 => self.push(path, max.1),
            _ => {}
        }
    }

    /// Parse an enum value. Absent optional values give `None` without error.
    fn parse<T: FromStr>(
        &mut self,
        path: FieldPath,
        value: Option<&str>,
        message: &str,
    ) -> Option<T> {
        if self.failed(path) || is_blank(value) {
            return None;
        }
        let parsed = value.and_then(|v| v.parse::<T>().ok());
        if parsed.is_none() {
            self.push(path, message);
        }
        parsed
    }

    /// Empty strings count as "no date": forms send them for cleared inputs.
    fn date(&mut self, path: FieldPath, value: Option<&str>) -> Option<Date> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        match Date::parse(value, ISO_DATE) {
            Ok(d) => Some(d),
            Err(_) => {
                self.push(path, msg::INVALID_DATE);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use uuid::Uuid;

    fn meal(content: &str) -> MealDraft {
        MealDraft::new(MealType::Lunch, DayOfWeek::Monday, content)
    }

    fn draft(title: &str, meals: usize) -> PlanDraft {
        PlanDraft {
            title: Some(title.to_string()),
            meals: (0..meals).map(|i| meal(&format!("Comida número {i}"))).collect(),
            ..PlanDraft::default()
        }
    }

    #[test]
    fn accepts_valid_plan_and_defaults_status() {
        let mut d = draft("Plan semanal", 2);
        d.description = Some("Plan de descenso de peso".into());
        d.start_date = Some("2025-06-01".into());
        d.end_date = Some("2025-06-30".into());

        let plan = validate_plan(&d).expect("valid plan");
        assert_eq!(plan.status, PlanStatus::Active);
        assert_eq!(plan.title, "Plan semanal");
        assert_eq!(plan.description.as_deref(), Some("Plan de descenso de peso"));
        assert_eq!(plan.start_date, Some(date!(2025 - 06 - 01)));
        assert_eq!(plan.end_date, Some(date!(2025 - 06 - 30)));
        assert_eq!(plan.meals.len(), 2);
        assert_eq!(plan.meals[1].content, "Comida número 1");
    }

    #[test]
    fn keeps_explicit_status_and_meal_ids() {
        let mut d = draft("Plan semanal", 1);
        d.status = Some("DRAFT".into());
        let id = Uuid::new_v4();
        d.meals[0].id = Some(id);
        let plan = validate_plan(&d).unwrap();
        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.meals[0].id, Some(id));
    }

    #[test]
    fn short_title_is_rejected() {
        let errs = validate_plan(&draft("AB", 1)).unwrap_err();
        assert_eq!(
            errs.message_for(PlanField::Title),
            Some("El título debe tener al menos 3 caracteres.")
        );
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        assert!(validate_plan(&draft("Ñoño", 1)).is_ok());
        assert!(validate_plan(&draft(&"á".repeat(100), 1)).is_ok());
        let errs = validate_plan(&draft(&"á".repeat(101), 1)).unwrap_err();
        assert_eq!(errs.message_for(PlanField::Title), Some(msg::TITLE_TOO_LONG));
    }

    #[test]
    fn missing_title_reports_required_only() {
        let mut d = draft("x", 1);
        d.title = None;
        let errs = validate_plan(&d).unwrap_err();
        let title_errors: Vec<_> = errs
            .iter()
            .filter(|e| e.path == FieldPath::Plan(PlanField::Title))
            .collect();
        assert_eq!(title_errors.len(), 1);
        assert_eq!(title_errors[0].message, msg::TITLE_REQUIRED);
    }

    #[test]
    fn optional_texts_are_bounded() {
        let mut d = draft("Plan semanal", 1);
        d.description = Some("a".repeat(501));
        d.objectives = Some("a".repeat(500));
        d.notes = Some("a".repeat(1001));
        let errs = validate_plan(&d).unwrap_err();
        assert!(errs.has(PlanField::Description));
        assert!(!errs.has(PlanField::Objectives));
        assert!(errs.has(PlanField::Notes));
    }

    #[test]
    fn end_before_start_is_reported_on_end_date() {
        let mut d = draft("Plan semanal", 1);
        d.start_date = Some("2025-06-01".into());
        d.end_date = Some("2025-05-01".into());
        let errs = validate_plan(&d).unwrap_err();
        assert_eq!(errs.0.len(), 1);
        assert_eq!(errs.0[0].path, FieldPath::Plan(PlanField::EndDate));
        assert_eq!(errs.0[0].message, msg::END_BEFORE_START);
    }

    #[test]
    fn same_start_and_end_date_is_allowed() {
        let mut d = draft("Plan semanal", 1);
        d.start_date = Some("2025-06-01".into());
        d.end_date = Some("2025-06-01".into());
        assert!(validate_plan(&d).is_ok());
    }

    #[test]
    fn date_ordering_skipped_when_a_date_is_malformed() {
        let mut d = draft("Plan semanal", 1);
        d.start_date = Some("2025-13-45".into());
        d.end_date = Some("2025-05-01".into());
        let errs = validate_plan(&d).unwrap_err();
        assert_eq!(errs.message_for(PlanField::StartDate), Some(msg::INVALID_DATE));
        assert!(!errs.has(PlanField::EndDate));
    }

    #[test]
    fn empty_dates_are_absent() {
        let mut d = draft("Plan semanal", 1);
        d.start_date = Some(String::new());
        d.end_date = Some("2025-05-01".into());
        let plan = validate_plan(&d).unwrap();
        assert_eq!(plan.start_date, None);
    }

    #[test]
    fn zero_meals_is_a_plan_level_error() {
        let errs = validate_plan(&draft("Plan semanal", 0)).unwrap_err();
        assert_eq!(errs.message_for(PlanField::Meals), Some(msg::NO_MEALS));
    }

    #[test]
    fn fifty_meals_pass_and_fifty_one_fail() {
        assert!(validate_plan(&draft("Plan semanal", 50)).is_ok());
        let errs = validate_plan(&draft("Plan semanal", 51)).unwrap_err();
        assert_eq!(
            errs.message_for(PlanField::Meals),
            Some("El plan no puede tener más de 50 comidas.")
        );
    }

    #[test]
    fn meal_errors_carry_index_and_field() {
        let mut d = draft("Plan semanal", 3);
        d.meals[1].content = Some("ok".into());
        d.meals[2].meal_type = Some("BRUNCH".into());
        d.meals[2].day_of_week = None;
        let errs = validate_plan(&d).unwrap_err();
        assert_eq!(
            errs.message_for(FieldPath::meal(1, MealField::Content)),
            Some(msg::CONTENT_TOO_SHORT)
        );
        assert_eq!(
            errs.message_for(FieldPath::meal(2, MealField::MealType)),
            Some(msg::INVALID_MEAL_TYPE)
        );
        assert_eq!(
            errs.message_for(FieldPath::meal(2, MealField::DayOfWeek)),
            Some(msg::DAY_REQUIRED)
        );
        assert!(!errs.has(FieldPath::meal(0, MealField::Content)));
    }

    #[test]
    fn errors_follow_rule_order() {
        let mut d = draft("AB", 0);
        d.status = Some("ARCHIVED".into());
        d.start_date = Some("2025-06-01".into());
        d.end_date = Some("2025-05-01".into());
        let paths: Vec<String> = validate_plan(&d)
            .unwrap_err()
            .iter()
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(paths, ["title", "status", "endDate", "meals"]);
    }

    #[test]
    fn validating_a_normalized_plan_is_idempotent() {
        let mut d = draft("Plan semanal", 4);
        d.notes = Some(String::new());
        d.start_date = Some("2025-01-06".into());
        let once = validate_plan(&d).unwrap();
        let twice = validate_plan(&PlanDraft::from(&once)).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.notes, None);
    }

    #[test]
    fn field_paths_render_and_parse() {
        let p = FieldPath::meal(12, MealField::DayOfWeek);
        assert_eq!(p.to_string(), "meals.12.dayOfWeek");
        assert_eq!("meals.12.dayOfWeek".parse::<FieldPath>().unwrap(), p);
        assert_eq!(
            "endDate".parse::<FieldPath>().unwrap(),
            FieldPath::Plan(PlanField::EndDate)
        );
        assert!("meals.x.content".parse::<FieldPath>().is_err());
        assert!("colour".parse::<FieldPath>().is_err());

        let json = serde_json::to_string(&FieldError {
            path: p,
            message: "m".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"path":"meals.12.dayOfWeek","message":"m"}"#);
    }
}
