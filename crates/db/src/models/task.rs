use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::ids;
use crate::{
    entities::{checklist_item, task, time_log},
    types::TaskStatus,
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Project not found")]
    ProjectNotFound,
    #[error("User not found")]
    UserNotFound,
    #[error("Checklist item not found")]
    ChecklistItemNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: Uuid,
    pub item: String,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "project")]
    pub project_id: Uuid,
    #[serde(rename = "assignedUser")]
    pub assigned_user_id: Uuid,
    pub subject: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub start_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub checklist: Vec<ChecklistItem>,
    pub total_time_spent_on_task: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewChecklistItem {
    #[validate(length(min = 3, max = 200, message = "Checklist item must be between 3 and 200 characters"))]
    pub item: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTask {
    #[validate(length(min = 5, max = 100, message = "Subject must be between 5 and 100 characters"))]
    pub subject: String,
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default, with = "utils::time::flexible_option")]
    #[validate(custom(function = "utils::validation::in_future"))]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(nested)]
    pub checklist: Option<Vec<NewChecklistItem>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_fields"))]
pub struct UpdateTask {
    #[validate(length(min = 5, max = 100, message = "Subject must be between 5 and 100 characters"))]
    pub subject: Option<String>,
    #[validate(length(min = 5, max = 500, message = "Description must be between 5 and 500 characters"))]
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    #[serde(default, with = "utils::time::flexible_option")]
    #[validate(custom(function = "utils::validation::in_future"))]
    pub due_date: Option<DateTime<Utc>>,
}

fn validate_update_fields(data: &UpdateTask) -> Result<(), ValidationError> {
    if data.subject.is_none()
        && data.description.is_none()
        && data.status.is_none()
        && data.due_date.is_none()
    {
        return Err(ValidationError::new("empty_update")
            .with_message("At least one field must be provided for update".into()));
    }
    Ok(())
}

impl Task {
    async fn from_model<C: ConnectionTrait>(db: &C, model: task::Model) -> Result<Self, DbErr> {
        let project_id =
            ids::require_uuid(ids::project_uuid_by_id(db, model.project_id), "Project", model.project_id)
                .await?;
        let assigned_user_id = ids::require_uuid(
            ids::user_uuid_by_id(db, model.assigned_user_id),
            "User",
            model.assigned_user_id,
        )
        .await?;
        let checklist = checklist_item::Entity::find()
            .filter(checklist_item::Column::TaskId.eq(model.id))
            .order_by_asc(checklist_item::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|item| ChecklistItem {
                id: item.uuid,
                item: item.item,
                is_completed: item.is_completed,
            })
            .collect();

        Ok(Self {
            id: model.uuid,
            project_id,
            assigned_user_id,
            subject: model.subject,
            description: model.description,
            status: model.status,
            start_date: model.start_date.into(),
            due_date: model.due_date.map(Into::into),
            checklist,
            total_time_spent_on_task: model.total_time_spent,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<task::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut tasks = Vec::with_capacity(models.len());
        for model in models {
            tasks.push(Self::from_model(db, model).await?);
        }
        Ok(tasks)
    }

    async fn find_record<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<task::Model, TaskError> {
        task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(TaskError::TaskNotFound)
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = task::Entity::find()
            .order_by_desc(task::Column::CreatedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find()
            .filter(task::Column::Uuid.eq(id))
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
        let records = task::Entity::find()
            .filter(task::Column::ProjectId.eq(project_row))
            .order_by_asc(task::Column::CreatedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn create<C>(
        db: &C,
        project_id: Uuid,
        assigned_user_id: Uuid,
        data: &CreateTask,
    ) -> Result<Self, TaskError>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let project_row = ids::project_id_by_uuid(db, project_id)
            .await?
            .ok_or(TaskError::ProjectNotFound)?;
        let user_row = ids::user_id_by_uuid(db, assigned_user_id)
            .await?
            .ok_or(TaskError::UserNotFound)?;

        let now = Utc::now();
        let txn = db.begin().await?;
        let model = task::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            project_id: Set(project_row),
            assigned_user_id: Set(user_row),
            subject: Set(data.subject.trim().to_string()),
            description: Set(Some(data.description.trim().to_string())),
            status: Set(data.status.unwrap_or_default()),
            start_date: Set(now.into()),
            due_date: Set(data.due_date.map(Into::into)),
            total_time_spent: Set(0.0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for entry in data.checklist.iter().flatten() {
            insert_checklist_item(&txn, model.id, &entry.item).await?;
        }
        txn.commit().await?;

        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateTask,
    ) -> Result<Self, TaskError> {
        let record = Self::find_record(db, id).await?;

        let mut active: task::ActiveModel = record.into();
        if let Some(subject) = payload.subject.as_deref() {
            active.subject = Set(subject.trim().to_string());
        }
        if let Some(description) = payload.description.as_deref() {
            active.description = Set(Some(description.trim().to_string()));
        }
        if let Some(status) = payload.status {
            active.status = Set(status);
        }
        if let Some(due_date) = payload.due_date {
            active.due_date = Set(Some(due_date.into()));
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Deletes the task and its checklist; logs that referenced it are kept but unlinked.
    pub async fn delete<C>(db: &C, id: Uuid) -> Result<u64, DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let Some(task_row) = ids::task_id_by_uuid(db, id).await? else {
            return Ok(0);
        };

        let txn = db.begin().await?;
        time_log::Entity::update_many()
            .col_expr(time_log::Column::TaskId, Expr::value(Option::<i64>::None))
            .filter(time_log::Column::TaskId.eq(task_row))
            .exec(&txn)
            .await?;
        checklist_item::Entity::delete_many()
            .filter(checklist_item::Column::TaskId.eq(task_row))
            .exec(&txn)
            .await?;
        let result = task::Entity::delete_many()
            .filter(task::Column::Id.eq(task_row))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(result.rows_affected)
    }

    pub async fn add_checklist_item<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        entry: &NewChecklistItem,
    ) -> Result<Self, TaskError> {
        let record = Self::find_record(db, id).await?;
        insert_checklist_item(db, record.id, &entry.item).await?;
        touch(db, record.id).await?;
        Ok(Self::from_model(db, record).await?)
    }

    /// Flips `isCompleted` on one checklist entry of the task.
    pub async fn toggle_checklist_item<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        item_id: Uuid,
    ) -> Result<Self, TaskError> {
        let record = Self::find_record(db, id).await?;
        let item = checklist_item::Entity::find()
            .filter(checklist_item::Column::Uuid.eq(item_id))
            .filter(checklist_item::Column::TaskId.eq(record.id))
            .one(db)
            .await?
            .ok_or(TaskError::ChecklistItemNotFound)?;

        let completed = !item.is_completed;
        let mut active: checklist_item::ActiveModel = item.into();
        active.is_completed = Set(completed);
        active.update(db).await?;
        touch(db, record.id).await?;

        Ok(Self::from_model(db, record).await?)
    }
}

async fn insert_checklist_item<C: ConnectionTrait>(
    db: &C,
    task_row: i64,
    item: &str,
) -> Result<checklist_item::Model, DbErr> {
    checklist_item::ActiveModel {
        uuid: Set(Uuid::new_v4()),
        task_id: Set(task_row),
        item: Set(item.trim().to_string()),
        is_completed: Set(false),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(db)
    .await
}

async fn touch<C: ConnectionTrait>(db: &C, task_row: i64) -> Result<(), DbErr> {
    task::Entity::update_many()
        .col_expr(task::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(task::Column::Id.eq(task_row))
        .exec(db)
        .await?;
    Ok(())
}
