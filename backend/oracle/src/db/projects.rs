//! Project rows.
//!
//! Every write goes through [`update_project`], which only succeeds when the
//! caller holds the latest `version` of the row.

use sqlx::types::Json;
use sqlx::SqlitePool;

use crate::db::is_unique_violation;
use crate::errors::{OracleError, Result};
use crate::models::{Project, ProjectStatus, CLEARED_ACTIVITY_DATE};

const COLUMNS: &str = "id, contract_address, created_at, completed_at, status, \
                       next_activity_date, activities_completed, parameters, version";

pub async fn insert_project(pool: &SqlitePool, project: &Project) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO projects
            (id, contract_address, created_at, completed_at, status,
             next_activity_date, activities_completed, parameters, version)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)
        "#,
    )
    .bind(project.id)
    .bind(&project.contract_address)
    .bind(project.created_at)
    .bind(project.completed_at)
    .bind(project.status)
    .bind(project.next_activity_date)
    .bind(Json(&project.activities_completed))
    .bind(Json(&project.parameters))
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Err(OracleError::AlreadyExists(format!(
            "project {}",
            project.id
        ))),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_project(pool: &SqlitePool, id: i64) -> Result<Option<Project>> {
    let sql = format!("SELECT {COLUMNS} FROM projects WHERE id = ?1");
    let row = sqlx::query_as::<_, Project>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Like [`find_project`] but a missing row is a `NotFound` error.
pub async fn get_project(pool: &SqlitePool, id: i64) -> Result<Project> {
    find_project(pool, id)
        .await?
        .ok_or_else(|| OracleError::NotFound(format!("project {id}")))
}

/// Persist every mutable field of `project`, bumping its version.
pub async fn update_project(pool: &SqlitePool, project: &mut Project) -> Result<()> {
    let rows = sqlx::query(
        r#"
        UPDATE projects
        SET    contract_address     = ?1,
               completed_at         = ?2,
               status               = ?3,
               next_activity_date   = ?4,
               activities_completed = ?5,
               parameters           = ?6,
               version              = version + 1
        WHERE  id = ?7 AND version = ?8
        "#,
    )
    .bind(&project.contract_address)
    .bind(project.completed_at)
    .bind(project.status)
    .bind(project.next_activity_date)
    .bind(Json(&project.activities_completed))
    .bind(Json(&project.parameters))
    .bind(project.id)
    .bind(project.version)
    .execute(pool)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(OracleError::StaleWrite(format!("project {}", project.id)));
    }
    project.version += 1;
    Ok(())
}

/// Projects the milestone tick may act on: deployed or later, and not
/// cleared by fund recovery.
pub async fn active_projects(pool: &SqlitePool) -> Result<Vec<Project>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM projects \
         WHERE status >= ?1 AND next_activity_date > ?2 ORDER BY id ASC"
    );
    let rows = sqlx::query_as::<_, Project>(&sql)
        .bind(ProjectStatus::Deployed)
        .bind(CLEARED_ACTIVITY_DATE)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn projects_with_status(
    pool: &SqlitePool,
    status: ProjectStatus,
) -> Result<Vec<Project>> {
    let sql = format!("SELECT {COLUMNS} FROM projects WHERE status = ?1 ORDER BY id ASC");
    let rows = sqlx::query_as::<_, Project>(&sql)
        .bind(status)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
