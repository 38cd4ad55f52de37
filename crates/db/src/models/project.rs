use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::ids;
use crate::{
    entities::{checklist_item, project, project_member, task, time_log, user},
    types::ProjectStatus,
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
    #[error("A project with this name already exists")]
    DuplicateName,
    #[error("End date must be after start date")]
    InvalidDateRange,
    #[error("User not found")]
    UserNotFound,
    #[error("User is already a member of this project")]
    AlreadyMember,
    #[error("User is not a member of this project")]
    NotMember,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ProjectStatus,
    pub total_hours: f64,
    /// Owner of the project.
    pub user_id: Uuid,
    pub members: Vec<Uuid>,
    pub logs: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_create_dates"))]
pub struct CreateProject {
    #[validate(length(min = 5, max = 80, message = "Project name must be between 5 and 80 characters"))]
    pub name: String,
    #[validate(length(min = 5, message = "Description must be at least 5 characters long"))]
    pub description: String,
    #[serde(with = "utils::time::flexible")]
    pub start_date: DateTime<Utc>,
    #[serde(with = "utils::time::flexible")]
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
}

fn validate_create_dates(data: &CreateProject) -> Result<(), ValidationError> {
    utils::validation::date_order(&data.start_date, &data.end_date)
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_update_fields"))]
pub struct UpdateProject {
    #[validate(length(min = 5, max = 80, message = "Project name must be between 5 and 80 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 5, message = "Description must be at least 5 characters long"))]
    pub description: Option<String>,
    #[serde(default, with = "utils::time::flexible_option")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "utils::time::flexible_option")]
    pub end_date: Option<DateTime<Utc>>,
    pub status: Option<ProjectStatus>,
}

fn validate_update_fields(data: &UpdateProject) -> Result<(), ValidationError> {
    if data.name.is_none()
        && data.description.is_none()
        && data.start_date.is_none()
        && data.end_date.is_none()
        && data.status.is_none()
    {
        return Err(ValidationError::new("empty_update")
            .with_message("At least one field must be provided for update".into()));
    }
    match (&data.start_date, &data.end_date) {
        (Some(start), Some(end)) => utils::validation::date_order(start, end),
        _ => Ok(()),
    }
}

impl Project {
    async fn from_model<C: ConnectionTrait>(db: &C, model: project::Model) -> Result<Self, DbErr> {
        let user_id =
            ids::require_uuid(ids::user_uuid_by_id(db, model.owner_id), "User", model.owner_id)
                .await?;
        let members = Self::member_uuids(db, model.id).await?;
        let logs = ids::time_log_uuids_by_project(db, model.id).await?;

        Ok(Self {
            id: model.uuid,
            name: model.name,
            description: model.description,
            start_date: model.start_date.into(),
            end_date: model.end_date.into(),
            status: model.status,
            total_hours: model.total_hours,
            user_id,
            members,
            logs,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        })
    }

    async fn from_models<C: ConnectionTrait>(
        db: &C,
        models: Vec<project::Model>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut projects = Vec::with_capacity(models.len());
        for model in models {
            projects.push(Self::from_model(db, model).await?);
        }
        Ok(projects)
    }

    async fn member_uuids<C: ConnectionTrait>(db: &C, project_id: i64) -> Result<Vec<Uuid>, DbErr> {
        let member_ids: Vec<i64> = project_member::Entity::find()
            .select_only()
            .column(project_member::Column::UserId)
            .filter(project_member::Column::ProjectId.eq(project_id))
            .order_by_asc(project_member::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        if member_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut members = Vec::with_capacity(member_ids.len());
        for member_id in member_ids {
            if let Some(uuid) = ids::user_uuid_by_id(db, member_id).await? {
                members.push(uuid);
            }
        }
        Ok(members)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = project::Entity::find()
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?;
        match record {
            Some(model) => Ok(Some(Self::from_model(db, model).await?)),
            None => Ok(None),
        }
    }

    /// Projects the user owns.
    pub async fn find_owned_by<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(owner_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };
        let records = project::Entity::find()
            .filter(project::Column::OwnerId.eq(owner_id))
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    /// Projects the user owns or has been added to.
    pub async fn find_for_user<C: ConnectionTrait>(
        db: &C,
        user_id: Uuid,
    ) -> Result<Vec<Self>, DbErr> {
        let Some(row_id) = ids::user_id_by_uuid(db, user_id).await? else {
            return Ok(Vec::new());
        };
        let shared: Vec<i64> = project_member::Entity::find()
            .select_only()
            .column(project_member::Column::ProjectId)
            .filter(project_member::Column::UserId.eq(row_id))
            .into_tuple()
            .all(db)
            .await?;

        let records = project::Entity::find()
            .filter(
                Condition::any()
                    .add(project::Column::OwnerId.eq(row_id))
                    .add(project::Column::Id.is_in(shared)),
            )
            .order_by_desc(project::Column::CreatedAt)
            .all(db)
            .await?;
        Self::from_models(db, records).await
    }

    pub async fn create<C: ConnectionTrait>(
        db: &C,
        data: &CreateProject,
        owner: Uuid,
    ) -> Result<Self, ProjectError> {
        if data.end_date < data.start_date {
            return Err(ProjectError::InvalidDateRange);
        }
        let owner_id = ids::user_id_by_uuid(db, owner)
            .await?
            .ok_or(ProjectError::UserNotFound)?;
        let name = data.name.trim().to_string();
        if Self::name_taken(db, &name, None).await? {
            return Err(ProjectError::DuplicateName);
        }

        let now = Utc::now();
        let active = project::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(name),
            description: Set(data.description.trim().to_string()),
            start_date: Set(data.start_date.into()),
            end_date: Set(data.end_date.into()),
            status: Set(data.status.unwrap_or_default()),
            total_hours: Set(0.0),
            owner_id: Set(owner_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        let model = active.insert(db).await.map_err(map_unique_name)?;
        Ok(Self::from_model(db, model).await?)
    }

    pub async fn update<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        payload: &UpdateProject,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;

        let start: DateTime<Utc> = payload.start_date.unwrap_or(record.start_date.into());
        let end: DateTime<Utc> = payload.end_date.unwrap_or(record.end_date.into());
        if end < start {
            return Err(ProjectError::InvalidDateRange);
        }

        let record_id = record.id;
        let mut active: project::ActiveModel = record.into();
        if let Some(name) = payload.name.as_deref().map(str::trim) {
            if Self::name_taken(db, name, Some(record_id)).await? {
                return Err(ProjectError::DuplicateName);
            }
            active.name = Set(name.to_string());
        }
        if let Some(description) = payload.description.as_deref() {
            active.description = Set(description.trim().to_string());
        }
        if payload.start_date.is_some() {
            active.start_date = Set(start.into());
        }
        if payload.end_date.is_some() {
            active.end_date = Set(end.into());
        }
        if let Some(status) = payload.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now().into());

        let updated = active.update(db).await.map_err(map_unique_name)?;
        Ok(Self::from_model(db, updated).await?)
    }

    /// Deletes the project together with its tasks, checklist items, logs and memberships.
    pub async fn delete<C>(db: &C, id: Uuid) -> Result<u64, DbErr>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let Some(project_id) = ids::project_id_by_uuid(db, id).await? else {
            return Ok(0);
        };

        let txn = db.begin().await?;
        let task_ids: Vec<i64> = task::Entity::find()
            .select_only()
            .column(task::Column::Id)
            .filter(task::Column::ProjectId.eq(project_id))
            .into_tuple()
            .all(&txn)
            .await?;

        time_log::Entity::delete_many()
            .filter(time_log::Column::ProjectId.eq(project_id))
            .exec(&txn)
            .await?;
        if !task_ids.is_empty() {
            checklist_item::Entity::delete_many()
                .filter(checklist_item::Column::TaskId.is_in(task_ids))
                .exec(&txn)
                .await?;
        }
        task::Entity::delete_many()
            .filter(task::Column::ProjectId.eq(project_id))
            .exec(&txn)
            .await?;
        project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .exec(&txn)
            .await?;
        let result = project::Entity::delete_many()
            .filter(project::Column::Id.eq(project_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(result.rows_affected)
    }

    pub async fn add_member<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        member: Uuid,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;
        let member_id = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .filter(user::Column::Uuid.eq(member))
            .into_tuple::<i64>()
            .one(db)
            .await?
            .ok_or(ProjectError::UserNotFound)?;

        if record.owner_id == member_id || Self::membership(db, record.id, member_id).await?.is_some()
        {
            return Err(ProjectError::AlreadyMember);
        }

        project_member::ActiveModel {
            project_id: Set(record.id),
            user_id: Set(member_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => ProjectError::AlreadyMember,
            _ => ProjectError::Database(err),
        })?;

        Ok(Self::from_model(db, record).await?)
    }

    pub async fn remove_member<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        member: Uuid,
    ) -> Result<Self, ProjectError> {
        let record = project::Entity::find()
            .filter(project::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;
        let member_id = ids::user_id_by_uuid(db, member)
            .await?
            .ok_or(ProjectError::UserNotFound)?;

        let membership = Self::membership(db, record.id, member_id)
            .await?
            .ok_or(ProjectError::NotMember)?;
        project_member::Entity::delete_by_id(membership.id)
            .exec(db)
            .await?;

        Ok(Self::from_model(db, record).await?)
    }

    async fn membership<C: ConnectionTrait>(
        db: &C,
        project_id: i64,
        user_id: i64,
    ) -> Result<Option<project_member::Model>, DbErr> {
        project_member::Entity::find()
            .filter(project_member::Column::ProjectId.eq(project_id))
            .filter(project_member::Column::UserId.eq(user_id))
            .one(db)
            .await
    }

    async fn name_taken<C: ConnectionTrait>(
        db: &C,
        name: &str,
        exclude: Option<i64>,
    ) -> Result<bool, DbErr> {
        let mut query = project::Entity::find().filter(project::Column::Name.eq(name));
        if let Some(exclude) = exclude {
            query = query.filter(project::Column::Id.ne(exclude));
        }
        Ok(query.one(db).await?.is_some())
    }
}

fn map_unique_name(err: DbErr) -> ProjectError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ProjectError::DuplicateName,
        _ => ProjectError::Database(err),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::Duration;

    use super::*;
    use crate::models::user::tests::{create_user, setup_db};

    pub(crate) fn new_project(name: &str) -> CreateProject {
        let start = Utc::now();
        CreateProject {
            name: name.to_string(),
            description: "Client website rebuild".to_string(),
            start_date: start,
            end_date: start + Duration::days(30),
            status: None,
        }
    }

    #[tokio::test]
    async fn create_sets_defaults_and_rejects_duplicate_names() {
        let db = setup_db().await;
        let owner = create_user(&db, "owner").await;

        let project = Project::create(&db, &new_project("Website"), owner.id)
            .await
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Pending);
        assert_eq!(project.total_hours, 0.0);
        assert_eq!(project.user_id, owner.id);
        assert!(project.logs.is_empty());

        let duplicate = Project::create(&db, &new_project("Website"), owner.id).await;
        assert!(matches!(duplicate, Err(ProjectError::DuplicateName)));
    }

    #[tokio::test]
    async fn create_rejects_end_before_start() {
        let db = setup_db().await;
        let owner = create_user(&db, "owner").await;
        let mut data = new_project("Backwards");
        data.end_date = data.start_date - Duration::days(1);

        assert!(data.validate().is_err());
        let result = Project::create(&db, &data, owner.id).await;
        assert!(matches!(result, Err(ProjectError::InvalidDateRange)));
    }

    #[tokio::test]
    async fn update_checks_dates_against_stored_values() {
        let db = setup_db().await;
        let owner = create_user(&db, "owner").await;
        let project = Project::create(&db, &new_project("Mobile app"), owner.id)
            .await
            .unwrap();

        let bad = UpdateProject {
            end_date: Some(project.start_date - Duration::days(2)),
            ..Default::default()
        };
        let result = Project::update(&db, project.id, &bad).await;
        assert!(matches!(result, Err(ProjectError::InvalidDateRange)));

        let good = UpdateProject {
            status: Some(ProjectStatus::InProgress),
            description: Some("Native iOS client".to_string()),
            ..Default::default()
        };
        let updated = Project::update(&db, project.id, &good).await.unwrap();
        assert_eq!(updated.status, ProjectStatus::InProgress);
        assert_eq!(updated.description, "Native iOS client");
        assert_eq!(updated.name, "Mobile app");
    }

    #[test]
    fn empty_update_fails_validation() {
        assert!(UpdateProject::default().validate().is_err());
    }

    #[tokio::test]
    async fn members_are_added_once_and_listed_for_the_member() {
        let db = setup_db().await;
        let owner = create_user(&db, "owner").await;
        let member = create_user(&db, "member").await;
        let project = Project::create(&db, &new_project("Shared work"), owner.id)
            .await
            .unwrap();

        let updated = Project::add_member(&db, project.id, member.id).await.unwrap();
        assert_eq!(updated.members, vec![member.id]);
        assert!(updated.members.contains(&member.id));

        let again = Project::add_member(&db, project.id, member.id).await;
        assert!(matches!(again, Err(ProjectError::AlreadyMember)));
        let owner_again = Project::add_member(&db, project.id, owner.id).await;
        assert!(matches!(owner_again, Err(ProjectError::AlreadyMember)));

        let visible = Project::find_for_user(&db, member.id).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert!(Project::find_owned_by(&db, member.id).await.unwrap().is_empty());

        let removed = Project::remove_member(&db, project.id, member.id).await.unwrap();
        assert!(removed.members.is_empty());
        let missing = Project::remove_member(&db, project.id, member.id).await;
        assert!(matches!(missing, Err(ProjectError::NotMember)));
    }

    #[tokio::test]
    async fn delete_removes_project() {
        let db = setup_db().await;
        let owner = create_user(&db, "owner").await;
        let project = Project::create(&db, &new_project("Throwaway"), owner.id)
            .await
            .unwrap();

        assert_eq!(Project::delete(&db, project.id).await.unwrap(), 1);
        assert!(Project::find_by_id(&db, project.id).await.unwrap().is_none());
        assert_eq!(Project::delete(&db, project.id).await.unwrap(), 0);
    }
}
