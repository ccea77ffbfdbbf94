use std::collections::{HashMap, HashSet};

use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::dto::{DietPlan, ValidMeal, ValidPlan};
use super::repo_types::{DietMealRow, DietPlanRow};
use super::vocab::VocabError;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("diet plan not found")]
    NotFound,
    #[error("diet plan belongs to another professional")]
    NotOwner,
    #[error("plan version {expected} is stale (current is {current})")]
    StaleVersion { expected: i32, current: i32 },
    #[error("meal {0} does not belong to this plan")]
    ForeignMeal(Uuid),
    #[error("meal {0} appears more than once")]
    DuplicateMeal(Uuid),
    #[error("stored value is not valid: {0}")]
    Corrupt(#[from] VocabError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

const PLAN_COLUMNS: &str = "id, patient_id, professional_id, title, description, objectives, \
     notes, start_date, end_date, status, version, created_at, updated_at";

async fn fetch_meals(
    conn: &mut PgConnection,
    plan_id: Uuid,
) -> Result<Vec<DietMealRow>, RepoError> {
    let rows = sqlx::query_as::<_, DietMealRow>(
        r#"
        SELECT id, plan_id, meal_type, content, day_of_week
          FROM diet_meals
         WHERE plan_id = $1
         ORDER BY position ASC
        "#,
    )
    .bind(plan_id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

async fn load_plan(
    conn: &mut PgConnection,
    plan_id: Uuid,
) -> Result<Option<DietPlan>, RepoError> {
    let row = sqlx::query_as::<_, DietPlanRow>(&format!(
        "SELECT {PLAN_COLUMNS} FROM diet_plans WHERE id = $1"
    ))
    .bind(plan_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else { return Ok(None) };
    let meals = fetch_meals(conn, plan_id).await?;
    Ok(Some(row.into_plan(meals)?))
}

async fn insert_meal(
    conn: &mut PgConnection,
    plan_id: Uuid,
    position: usize,
    meal: &ValidMeal,
) -> Result<(), RepoError> {
    sqlx::query(
        r#"
        INSERT INTO diet_meals (id, plan_id, position, meal_type, content, day_of_week)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(plan_id)
    .bind(position as i32)
    .bind(meal.meal_type.as_str())
    .bind(&meal.content)
    .bind(meal.day_of_week.as_str())
    .execute(conn)
    .await?;
    Ok(())
}

/// Create a plan and its meals; every meal gets a fresh id, whatever the
/// request carried.
pub async fn insert_plan(
    db: &PgPool,
    patient_id: Uuid,
    professional_id: Uuid,
    plan: &ValidPlan,
) -> Result<DietPlan, RepoError> {
    let plan_id = Uuid::new_v4();
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO diet_plans
            (id, patient_id, professional_id, title, description, objectives, notes,
             start_date, end_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(plan_id)
    .bind(patient_id)
    .bind(professional_id)
    .bind(&plan.title)
    .bind(&plan.description)
    .bind(&plan.objectives)
    .bind(&plan.notes)
    .bind(plan.start_date)
    .bind(plan.end_date)
    .bind(plan.status.as_str())
    .execute(&mut *tx)
    .await?;

    for (position, meal) in plan.meals.iter().enumerate() {
        insert_meal(&mut tx, plan_id, position, meal).await?;
    }

    let created = load_plan(&mut tx, plan_id).await?.ok_or(RepoError::NotFound)?;
    tx.commit().await?;
    Ok(created)
}

pub async fn get_plan(db: &PgPool, plan_id: Uuid) -> Result<Option<DietPlan>, RepoError> {
    let mut conn = db.acquire().await?;
    load_plan(&mut conn, plan_id).await
}

/// Plans of a patient authored by `professional_id`, newest first.
pub async fn list_by_patient(
    db: &PgPool,
    patient_id: Uuid,
    professional_id: Uuid,
) -> Result<Vec<DietPlan>, RepoError> {
    let plans = sqlx::query_as::<_, DietPlanRow>(&format!(
        "SELECT {PLAN_COLUMNS} FROM diet_plans \
         WHERE patient_id = $1 AND professional_id = $2 \
         ORDER BY created_at DESC"
    ))
    .bind(patient_id)
    .bind(professional_id)
    .fetch_all(db)
    .await?;

    let ids: Vec<Uuid> = plans.iter().map(|p| p.id).collect();
    let meal_rows = sqlx::query_as::<_, DietMealRow>(
        r#"
        SELECT id, plan_id, meal_type, content, day_of_week
          FROM diet_meals
         WHERE plan_id = ANY($1)
         ORDER BY plan_id, position ASC
        "#,
    )
    .bind(&ids)
    .fetch_all(db)
    .await?;

    let mut by_plan: HashMap<Uuid, Vec<DietMealRow>> = HashMap::new();
    for row in meal_rows {
        by_plan.entry(row.plan_id).or_default().push(row);
    }

    plans
        .into_iter()
        .map(|p| {
            let meals = by_plan.remove(&p.id).unwrap_or_default();
            p.into_plan(meals).map_err(RepoError::from)
        })
        .collect()
}

/// Replace a plan's fields and meals in one transaction.
///
/// Meals with an id are updated in place, meals without one are created, and
/// stored meals whose id is not listed are deleted. With `expected_version`
/// set, the update only applies to that version of the plan.
pub async fn update_plan(
    db: &PgPool,
    plan_id: Uuid,
    professional_id: Uuid,
    plan: &ValidPlan,
    expected_version: Option<i32>,
) -> Result<DietPlan, RepoError> {
    let mut tx = db.begin().await?;

    let current: Option<(Uuid, i32)> = sqlx::query_as(
        "SELECT professional_id, version FROM diet_plans WHERE id = $1 FOR UPDATE",
    )
    .bind(plan_id)
    .fetch_optional(&mut *tx)
    .await?;
    let (owner, version) = current.ok_or(RepoError::NotFound)?;
    if owner != professional_id {
        return Err(RepoError::NotOwner);
    }
    if let Some(expected) = expected_version.filter(|v| *v != version) {
        return Err(RepoError::StaleVersion {
            expected,
            current: version,
        });
    }

    let existing: HashSet<Uuid> = fetch_meals(&mut tx, plan_id)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    let mut kept = HashSet::new();
    for id in plan.meals.iter().filter_map(|m| m.id) {
        if !existing.contains(&id) {
            return Err(RepoError::ForeignMeal(id));
        }
        if !kept.insert(id) {
            return Err(RepoError::DuplicateMeal(id));
        }
    }

    let kept: Vec<Uuid> = kept.into_iter().collect();
    let deleted = sqlx::query("DELETE FROM diet_meals WHERE plan_id = $1 AND NOT (id = ANY($2))")
        .bind(plan_id)
        .bind(&kept)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    for (position, meal) in plan.meals.iter().enumerate() {
        match meal.id {
            Some(id) => {
                sqlx::query(
                    r#"
                    UPDATE diet_meals
                       SET position = $3, meal_type = $4, content = $5, day_of_week = $6
                     WHERE id = $1 AND plan_id = $2
                    "#,
                )
                .bind(id)
                .bind(plan_id)
                .bind(position as i32)
                .bind(meal.meal_type.as_str())
                .bind(&meal.content)
                .bind(meal.day_of_week.as_str())
                .execute(&mut *tx)
                .await?;
            }
            None => insert_meal(&mut tx, plan_id, position, meal).await?,
        }
    }

    sqlx::query(
        r#"
        UPDATE diet_plans
           SET title = $2, description = $3, objectives = $4, notes = $5,
               start_date = $6, end_date = $7, status = $8,
               version = version + 1, updated_at = now()
         WHERE id = $1
        "#,
    )
    .bind(plan_id)
    .bind(&plan.title)
    .bind(&plan.description)
    .bind(&plan.objectives)
    .bind(&plan.notes)
    .bind(plan.start_date)
    .bind(plan.end_date)
    .bind(plan.status.as_str())
    .execute(&mut *tx)
    .await?;

    let updated = load_plan(&mut tx, plan_id).await?.ok_or(RepoError::NotFound)?;
    tx.commit().await?;
    debug!(%plan_id, deleted, version = updated.version, "plan updated");
    Ok(updated)
}

/// Delete a plan; its meals go with it.
pub async fn delete_plan(
    db: &PgPool,
    plan_id: Uuid,
    professional_id: Uuid,
) -> Result<(), RepoError> {
    let mut tx = db.begin().await?;
    let owner: Option<Uuid> =
        sqlx::query_scalar("SELECT professional_id FROM diet_plans WHERE id = $1 FOR UPDATE")
            .bind(plan_id)
            .fetch_optional(&mut *tx)
            .await?;
    match owner {
        None => return Err(RepoError::NotFound),
        Some(owner) if owner != professional_id => return Err(RepoError::NotOwner),
        Some(_) => {}
    }
    sqlx::query("DELETE FROM diet_plans WHERE id = $1")
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
