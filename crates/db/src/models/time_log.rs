//! Start/stop timers and the counters they feed.
//!
//! A log starts running with no end time. Stopping it freezes `time_spent`
//! (hours) and adds that amount to the project's `total_hours` and, when a
//! task is linked, the task's running total. Every counter change happens in
//! the same transaction as the log write, and the stop itself only applies to
//! rows whose end time is still null, so a log can contribute at most once.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
    sea_query::{Expr, ExprTrait},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::ids;
use crate::{
    entities::{project, task, time_log},
    retry::{AsDbErr, retry_on_sqlite_busy},
};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Error)]
pub enum TimeLogError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Log not found")]
    NotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Task not found")]
    TaskNotFound,
    #[error("Log already stopped")]
    AlreadyStopped,
    #[error("Task belongs to a different project than the log")]
    TaskProjectMismatch,
}

impl AsDbErr for TimeLogError {
    fn as_db_err(&self) -> Option<&DbErr> {
        match self {
            TimeLogError::Database(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLog {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "task")]
    pub task_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_time_of_log: DateTime<Utc>,
    pub end_time_of_log: Option<DateTime<Utc>>,
    /// Hours, frozen when the log is stopped.
    pub time_spent: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeLog {
    #[serde(default)]
    #[validate(custom(function = "utils::validation::not_blank"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "utils::validation::not_blank"))]
    pub description: String,
    #[serde(default, alias = "task")]
    pub task_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_fields"))]
pub struct UpdateTimeLog {
    #[validate(length(min = 3, message = "Name must be at least 3 characters long"))]
    pub name: Option<String>,
    #[validate(length(min = 5, message = "Description must be at least 5 characters long"))]
    pub description: Option<String>,
}

fn validate_update_fields(data: &UpdateTimeLog) -> Result<(), ValidationError> {
    if data.name.is_none() && data.description.is_none() {
        return Err(ValidationError::new("empty_update")
            .with_message("At least one of name or description must be provided".into()));
    }
    Ok(())
}

/// Elapsed time between two instants in fractional hours.
pub fn elapsed_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = Ord::max((end - start).num_milliseconds(), 0);
    millis as f64 / MILLIS_PER_HOUR
}

impl TimeLog {
    async fn from_model<C: ConnectionTrait>(db: &C, model: time_log::Model) -> Result<Self, DbErr> {
        let project_id =
            ids::require_uuid(ids::project_uuid_by_id(db, model.project_id), "Project", model.project_id)
                .await?;
        let user_id =
            ids::require_uuid(ids::user_uuid_by_id(db, model.user_id), "User", model.user_id)
                .await?;
        let task_id = match model.task_id {
            Some(task_row) => ids::task_uuid_by_id(db, task_row).await?,
            None => None,
        };

        Ok(Self {
            id: model.uuid,
            project_id,
            user_id,
            task_id,
            name: model.name,
            description: model.description,
            start_time_of_log: model.started_at.into(),
            end_time_of_log: model.ended_at.map(Into::into),
            time_spent: model.time_spent,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<time_log::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut logs = Vec::with_capacity(models.len());
        for model in models {
            logs.push(Self::from_model(db, model).await?);
        }
        Ok(logs)
    }

    async fn find_record<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<time_log::Model, TimeLogError> {
        time_log::Entity::find()
            .filter(time_log::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TimeLogError::NotFound)
    }

    pub fn is_running(&self) -> bool {
        self.end_time_of_log.is_none()
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = time_log::Entity::find()
            .filter(time_log::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_project_id<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(project_row) = ids::project_id_by_uuid(db, project_id).await? else {
            return Ok(Vec::new());
        };
        let records = time_log::Entity::find()
            .filter(time_log::Column::ProjectId.eq(project_row))
            .order_by_asc(time_log::Column::StartedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn find_by_user_id<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(user_row) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };
        let records = time_log::Entity::find()
            .filter(time_log::Column::UserId.eq(user_row))
            .order_by_desc(time_log::Column::StartedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    /// Logs of the user whose start lies within `[start, end]`, both ends inclusive.
    pub async fn find_by_user_started_between<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(user_row) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };
        let records = time_log::Entity::find()
            .filter(time_log::Column::UserId.eq(user_row))
            .filter(time_log::Column::StartedAt.gte(start))
            .filter(time_log::Column::StartedAt.lte(end))
            .order_by_asc(time_log::Column::StartedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn start<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        user_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<Self, TimeLogError> {
        let project_row = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(TimeLogError::ProjectNotFound)?;
        let user_row = ids::user_id_by_uuid(db, user_id)
            .await?
            .ok_or(TimeLogError::UserNotFound)?;

        let now = Utc::now();
        let model = time_log::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(project_row),
            user_id: Set(user_row),
            task_id: Set(None),
            name: Set(None),
            description: Set(None),
            started_at: Set(started_at.into()),
            ended_at: Set(None),
            time_spent: Set(0.0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(Self::from_model(db, model).await?)
    }

    /// Stops a running log at `ended_at` and propagates its hours.
    pub async fn stop<C>(
        db: &C,
        id: Uuid,
        data: &StopTimeLog,
        ended_at: DateTime<Utc>,
    ) -> Result<Self, TimeLogError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let model = retry_on_sqlite_busy(|| Self::stop_in_transaction(db, id, data, ended_at)).await?;
        Ok(Self::from_model(db, model).await?)
    }

    async fn stop_in_transaction<C>(
        db: &C,
        id: Uuid,
        data: &StopTimeLog,
        ended_at: DateTime<Utc>,
    ) -> Result<time_log::Model, TimeLogError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let record = Self::find_record(&txn, id).await?;
        if record.ended_at.is_some() {
            return Err(TimeLogError::AlreadyStopped);
        }

        let task_row = match data.task_id {
            Some(task_id) => {
                let task = task::Entity::find()
                    .filter(task::Column::Uuid.eq(task_id))
                    .one(&txn)
                    .await?;
                match task {
                    Some(task) if task.project_id == record.project_id => Some(task.id),
                    Some(_) => return Err(TimeLogError::TaskProjectMismatch),
                    None => {
                        tracing::warn!(log_id = %id, task_id = %task_id, "Task not found; keeping the log's existing task link");
                        record.task_id
                    }
                }
            }
            // A log linked while running still owes its hours to that task.
            None => record.task_id,
        };

        let time_spent = elapsed_hours(record.started_at.into(), ended_at);
        let mut update = time_log::Entity::update_many()
            .col_expr(time_log::Column::Name, Expr::value(data.name.trim().to_string()))
            .col_expr(
                time_log::Column::Description,
                Expr::value(data.description.trim().to_string()),
            )
            .col_expr(time_log::Column::EndedAt, Expr::value(ended_at))
            .col_expr(time_log::Column::TimeSpent, Expr::value(time_spent))
            .col_expr(time_log::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(time_log::Column::Id.eq(record.id))
            .filter(time_log::Column::EndedAt.is_null());
        if let Some(task_row) = task_row {
            update = update.col_expr(time_log::Column::TaskId, Expr::value(task_row));
        }

        // Zero rows means another request stopped it first.
        if update.exec(&txn).await?.rows_affected == 0 {
            return Err(TimeLogError::AlreadyStopped);
        }

        add_project_hours(&txn, record.project_id, time_spent).await?;
        if let Some(task_row) = task_row {
            add_task_hours(&txn, task_row, time_spent).await?;
        }

        let stopped = Self::find_record(&txn, id).await?;
        txn.commit().await?;

        tracing::info!(
            log_id = %id,
            time_spent,
            linked_task = task_row.is_some(),
            "Stopped time log"
        );
        Ok(stopped)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateTimeLog,
    ) -> Result<Self, TimeLogError> {
        let record = Self::find_record(db, id).await?;

        let mut active: time_log::ActiveModel = record.into();
        if let Some(name) = payload.name.as_deref() {
            active.name = Set(Some(name.trim().to_string()));
        }
        if let Some(description) = payload.description.as_deref() {
            active.description = Set(Some(description.trim().to_string()));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Removes the log and takes its hours back out of the project and task totals.
    pub async fn delete<C>(db: &C, id: Uuid) -> Result<u64, TimeLogError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        retry_on_sqlite_busy(|| Self::delete_in_transaction(db, id)).await
    }

    async fn delete_in_transaction<C>(db: &C, id: Uuid) -> Result<u64, TimeLogError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let record = Self::find_record(&txn, id).await?;

        let result = time_log::Entity::delete_many()
            .filter(time_log::Column::Id.eq(record.id))
            .exec(&txn)
            .await?;
        if result.rows_affected > 0 && record.time_spent != 0.0 {
            add_project_hours(&txn, record.project_id, -record.time_spent).await?;
            if let Some(task_row) = record.task_id {
                add_task_hours(&txn, task_row, -record.time_spent).await?;
            }
        }
        txn.commit().await?;

        tracing::info!(log_id = %id, time_spent = record.time_spent, "Deleted time log");
        Ok(result.rows_affected)
    }

    /// Links the log to a task of the same project, moving any recorded hours with it.
    pub async fn attach_to_task<C>(db: &C, id: Uuid, task_id: Uuid) -> Result<Self, TimeLogError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let txn = db.begin().await?;
        let record = Self::find_record(&txn, id).await?;
        let task = task::Entity::find()
            .filter(task::Column::Uuid.eq(task_id))
            .one(&txn)
            .await?
            .ok_or(TimeLogError::TaskNotFound)?;
        if task.project_id != record.project_id {
            return Err(TimeLogError::TaskProjectMismatch);
        }

        if record.task_id != Some(task.id) {
            if record.ended_at.is_some() && record.time_spent != 0.0 {
                if let Some(previous) = record.task_id {
                    add_task_hours(&txn, previous, -record.time_spent).await?;
                }
                add_task_hours(&txn, task.id, record.time_spent).await?;
            }
            time_log::Entity::update_many()
                .col_expr(time_log::Column::TaskId, Expr::value(task.id))
                .col_expr(time_log::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(time_log::Column::Id.eq(record.id))
                .exec(&txn)
                .await?;
        }

        let updated = Self::find_record(&txn, id).await?;
        txn.commit().await?;
        Ok(Self::from_model(db, updated).await?)
    }
}

async fn add_project_hours<C: ConnectionTrait>(
    db: &C,
    project_row: i64,
    hours: f64,
) -> Result<(), DbErr> {
    let result = project::Entity::update_many()
        .col_expr(
            project::Column::TotalHours,
            Expr::col(project::Column::TotalHours).add(hours),
        )
        .filter(project::Column::Id.eq(project_row))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(DbErr::RecordNotFound(format!("Project {project_row} not found")));
    }
    Ok(())
}

async fn add_task_hours<C: ConnectionTrait>(db: &C, task_row: i64, hours: f64) -> Result<(), DbErr> {
    task::Entity::update_many()
        .col_expr(
            task::Column::TotalTimeSpent,
            Expr::col(task::Column::TotalTimeSpent).add(hours),
        )
        .filter(task::Column::Id.eq(task_row))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::{
        project::{Project, tests::new_project},
        task::{Task, tests::new_task},
        user::tests::{create_user, setup_db},
    };

    fn stop_payload(task_id: Option<Uuid>) -> StopTimeLog {
        StopTimeLog {
            name: "Design review".to_string(),
            description: "Went through mockups".to_string(),
            task_id,
        }
    }

    #[test]
    fn elapsed_hours_is_millis_over_an_hour() {
        let start = Utc::now();
        assert_eq!(elapsed_hours(start, start + Duration::milliseconds(3_600_000)), 1.0);
        assert_eq!(elapsed_hours(start, start + Duration::minutes(90)), 1.5);
        assert_eq!(elapsed_hours(start, start - Duration::minutes(5)), 0.0);
    }

    #[tokio::test]
    async fn start_on_missing_project_is_rejected() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;

        let result = TimeLog::start(&db, Uuid::new_v4(), user.id, Utc::now()).await;
        assert!(matches!(result, Err(TimeLogError::ProjectNotFound)));
    }

    #[tokio::test]
    async fn start_appends_log_to_project() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("Timers"), user.id)
            .await
            .unwrap();

        let log = TimeLog::start(&db, project.id, user.id, Utc::now()).await.unwrap();
        assert!(log.is_running());
        assert_eq!(log.time_spent, 0.0);

        let project = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(project.logs, vec![log.id]);
    }

    #[tokio::test]
    async fn stopping_one_hour_adds_one_hour_to_project_and_task() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("Billing"), user.id)
            .await
            .unwrap();
        let task = Task::create(&db, project.id, user.id, &new_task("Invoice export"))
            .await
            .unwrap();

        let t0 = Utc::now() - Duration::hours(2);
        let log = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        let stopped = TimeLog::stop(
            &db,
            log.id,
            &stop_payload(Some(task.id)),
            t0 + Duration::milliseconds(3_600_000),
        )
        .await
        .unwrap();

        assert_eq!(stopped.time_spent, 1.0);
        assert_eq!(stopped.task_id, Some(task.id));
        assert_eq!(stopped.name.as_deref(), Some("Design review"));
        assert!(!stopped.is_running());

        let project = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(project.total_hours, 1.0);
        let task = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(task.total_time_spent_on_task, 1.0);
    }

    #[tokio::test]
    async fn second_stop_is_rejected_and_time_stays_frozen() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("Frozen"), user.id)
            .await
            .unwrap();

        let t0 = Utc::now() - Duration::hours(3);
        let log = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        TimeLog::stop(&db, log.id, &stop_payload(None), t0 + Duration::minutes(30))
            .await
            .unwrap();

        let again = TimeLog::stop(&db, log.id, &stop_payload(None), t0 + Duration::hours(2)).await;
        assert!(matches!(again, Err(TimeLogError::AlreadyStopped)));

        let log = TimeLog::find_by_id(&db, log.id).await.unwrap().unwrap();
        assert_eq!(log.time_spent, 0.5);
        let project = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(project.total_hours, 0.5);
    }

    #[tokio::test]
    async fn stop_with_unknown_task_still_stops_without_link() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("No task"), user.id)
            .await
            .unwrap();

        let t0 = Utc::now() - Duration::hours(1);
        let log = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        let stopped = TimeLog::stop(
            &db,
            log.id,
            &stop_payload(Some(Uuid::new_v4())),
            t0 + Duration::minutes(15),
        )
        .await
        .unwrap();

        assert_eq!(stopped.task_id, None);
        assert_eq!(stopped.time_spent, 0.25);
    }

    #[tokio::test]
    async fn stop_rejects_task_from_another_project() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let first = Project::create(&db, &new_project("First project"), user.id)
            .await
            .unwrap();
        let second = Project::create(&db, &new_project("Second project"), user.id)
            .await
            .unwrap();
        let foreign_task = Task::create(&db, second.id, user.id, &new_task("Elsewhere"))
            .await
            .unwrap();

        let log = TimeLog::start(&db, first.id, user.id, Utc::now()).await.unwrap();
        let result = TimeLog::stop(&db, log.id, &stop_payload(Some(foreign_task.id)), Utc::now()).await;
        assert!(matches!(result, Err(TimeLogError::TaskProjectMismatch)));

        let log = TimeLog::find_by_id(&db, log.id).await.unwrap().unwrap();
        assert!(log.is_running());
    }

    #[tokio::test]
    async fn delete_reverses_project_and_task_hours() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("Reversal"), user.id)
            .await
            .unwrap();
        let task = Task::create(&db, project.id, user.id, &new_task("Reconcile"))
            .await
            .unwrap();

        let t0 = Utc::now() - Duration::hours(5);
        let kept = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        TimeLog::stop(&db, kept.id, &stop_payload(None), t0 + Duration::hours(2))
            .await
            .unwrap();
        let removed = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        TimeLog::stop(&db, removed.id, &stop_payload(Some(task.id)), t0 + Duration::minutes(45))
            .await
            .unwrap();

        let project_before = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(project_before.total_hours, 2.75);

        assert_eq!(TimeLog::delete(&db, removed.id).await.unwrap(), 1);

        let project_after = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(project_after.total_hours, 2.0);
        assert_eq!(project_after.logs, vec![kept.id]);
        let task = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(task.total_time_spent_on_task, 0.0);

        let missing = TimeLog::delete(&db, removed.id).await;
        assert!(matches!(missing, Err(TimeLogError::NotFound)));
    }

    #[tokio::test]
    async fn attach_moves_hours_between_tasks() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("Moves"), user.id)
            .await
            .unwrap();
        let first = Task::create(&db, project.id, user.id, &new_task("First task"))
            .await
            .unwrap();
        let second = Task::create(&db, project.id, user.id, &new_task("Second task"))
            .await
            .unwrap();

        let t0 = Utc::now() - Duration::hours(2);
        let log = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        TimeLog::stop(&db, log.id, &stop_payload(Some(first.id)), t0 + Duration::hours(1))
            .await
            .unwrap();

        let moved = TimeLog::attach_to_task(&db, log.id, second.id).await.unwrap();
        assert_eq!(moved.task_id, Some(second.id));

        let first = Task::find_by_id(&db, first.id).await.unwrap().unwrap();
        let second = Task::find_by_id(&db, second.id).await.unwrap().unwrap();
        assert_eq!(first.total_time_spent_on_task, 0.0);
        assert_eq!(second.total_time_spent_on_task, 1.0);
        let project = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(project.total_hours, 1.0);
    }

    #[tokio::test]
    async fn running_log_linked_to_task_credits_it_on_stop() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("Linked early"), user.id)
            .await
            .unwrap();
        let task = Task::create(&db, project.id, user.id, &new_task("Early link"))
            .await
            .unwrap();

        let t0 = Utc::now() - Duration::hours(2);
        let log = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        let linked = TimeLog::attach_to_task(&db, log.id, task.id).await.unwrap();
        assert_eq!(linked.task_id, Some(task.id));
        let untouched = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(untouched.total_time_spent_on_task, 0.0);

        let stopped = TimeLog::stop(&db, log.id, &stop_payload(None), t0 + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(stopped.task_id, Some(task.id));
        assert_eq!(stopped.time_spent, 1.0);

        let credited = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(credited.total_time_spent_on_task, 1.0);

        TimeLog::delete(&db, log.id).await.unwrap();
        let reversed = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(reversed.total_time_spent_on_task, 0.0);
        let project = Project::find_by_id(&db, project.id).await.unwrap().unwrap();
        assert_eq!(project.total_hours, 0.0);
    }

    #[tokio::test]
    async fn unknown_task_on_stop_keeps_existing_link() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let project = Project::create(&db, &new_project("Keep link"), user.id)
            .await
            .unwrap();
        let task = Task::create(&db, project.id, user.id, &new_task("Kept task"))
            .await
            .unwrap();

        let t0 = Utc::now() - Duration::hours(1);
        let log = TimeLog::start(&db, project.id, user.id, t0).await.unwrap();
        TimeLog::attach_to_task(&db, log.id, task.id).await.unwrap();
        let stopped = TimeLog::stop(
            &db,
            log.id,
            &stop_payload(Some(Uuid::new_v4())),
            t0 + Duration::minutes(30),
        )
        .await
        .unwrap();

        assert_eq!(stopped.task_id, Some(task.id));
        let task = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(task.total_time_spent_on_task, 0.5);
    }

    #[tokio::test]
    async fn range_query_is_inclusive_and_scoped_to_user() {
        let db = setup_db().await;
        let user = create_user(&db, "timer").await;
        let other = create_user(&db, "other").await;
        let project = Project::create(&db, &new_project("Ranges"), user.id)
            .await
            .unwrap();

        let day = Utc::now() - Duration::days(10);
        let inside = TimeLog::start(&db, project.id, user.id, day).await.unwrap();
        TimeLog::start(&db, project.id, user.id, day + Duration::days(3))
            .await
            .unwrap();
        TimeLog::start(&db, project.id, other.id, day).await.unwrap();

        let logs = TimeLog::find_by_user_started_between(&db, user.id, day, day + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, inside.id);
    }

    #[test]
    fn stop_requires_name_and_description() {
        let payload = StopTimeLog {
            name: "  ".to_string(),
            description: String::new(),
            task_id: None,
        };
        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("description"));
    }
}
