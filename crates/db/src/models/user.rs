use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{entities::user, types::UserRole};

#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("User not found")]
    NotFound,
    #[error("User with this username or email already exists")]
    AlreadyExists,
}

/// A user as exposed to clients. Password hash and refresh token stay in the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    #[validate(length(min = 3, max = 50, message = "Name must be between 3 and 50 characters"))]
    pub name: String,
    #[validate(
        length(min = 3, max = 30, message = "Username must be between 3 and 30 characters"),
        custom(function = "utils::validation::no_whitespace")
    )]
    pub user_name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 5, message = "Password must be at least 5 characters long"),
        custom(function = "utils::validation::password_strength")
    )]
    pub password: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_login_identity"))]
pub struct LoginUser {
    pub user_name: Option<String>,
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

fn validate_login_identity(login: &LoginUser) -> Result<(), ValidationError> {
    let has = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
    if has(&login.user_name) || has(&login.email) {
        Ok(())
    } else {
        Err(ValidationError::new("login_identity")
            .with_message("Username or email is required".into()))
    }
}

/// Insert payload once the password has been hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub user_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

impl User {
    fn from_model(model: user::Model) -> Self {
        Self {
            id: model.uuid,
            name: model.name,
            user_name: model.user_name,
            email: model.email,
            role: model.role,
            created_at: model.created_at.into(),
            updated_at: model.updated_at.into(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<Option<Self>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?;
        Ok(record.map(Self::from_model))
    }

    /// Looks a user up by username or email and returns it with its password hash.
    pub async fn find_with_password<C: ConnectionTrait>(
        db: &C,
        user_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<(Self, String)>, DbErr> {
        let mut condition = Condition::any();
        if let Some(user_name) = user_name.map(str::trim).filter(|v| !v.is_empty()) {
            condition = condition.add(user::Column::UserName.eq(user_name));
        }
        if let Some(email) = email.map(str::trim).filter(|v| !v.is_empty()) {
            condition = condition.add(user::Column::Email.eq(email.to_lowercase()));
        }
        if condition.is_empty() {
            return Ok(None);
        }

        let record = user::Entity::find().filter(condition).one(db).await?;
        Ok(record.map(|model| {
            let hash = model.password_hash.clone();
            (Self::from_model(model), hash)
        }))
    }

    pub async fn exists_with<C: ConnectionTrait>(
        db: &C,
        user_name: &str,
        email: &str,
    ) -> Result<bool, DbErr> {
        let found = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::UserName.eq(user_name.trim()))
                    .add(user::Column::Email.eq(email.trim().to_lowercase())),
            )
            .one(db)
            .await?;
        Ok(found.is_some())
    }

    pub async fn create<C: ConnectionTrait>(db: &C, data: &CreateUser) -> Result<Self, UserError> {
        if Self::exists_with(db, &data.user_name, &data.email).await? {
            return Err(UserError::AlreadyExists);
        }

        let now = Utc::now();
        let active = user::ActiveModel {
            uuid: Set(Uuid::new_v4()),
            name: Set(data.name.trim().to_string()),
            user_name: Set(data.user_name.trim().to_string()),
            email: Set(data.email.trim().to_lowercase()),
            password_hash: Set(data.password_hash.clone()),
            role: Set(data.role),
            refresh_token: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        };

        match active.insert(db).await {
            Ok(model) => Ok(Self::from_model(model)),
            // Lost a race with a concurrent registration.
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(UserError::AlreadyExists)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn refresh_token<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
    ) -> Result<Option<String>, DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;
        Ok(record.refresh_token)
    }

    pub async fn set_refresh_token<C: ConnectionTrait>(
        db: &C,
        id: Uuid,
        token: Option<String>,
    ) -> Result<(), DbErr> {
        let record = user::Entity::find()
            .filter(user::Column::Uuid.eq(id))
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

        let mut active: user::ActiveModel = record.into();
        active.refresh_token = Set(token);
        active.updated_at = Set(Utc::now().into());
        active.update(db).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use sea_orm::{Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;

    pub(crate) async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    pub(crate) async fn create_user(db: &DatabaseConnection, user_name: &str) -> User {
        User::create(
            db,
            &CreateUser {
                name: format!("{user_name} tester"),
                user_name: user_name.to_string(),
                email: format!("{user_name}@Example.com"),
                password_hash: "hash".to_string(),
                role: UserRole::User,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_lowercases_email_and_rejects_duplicates() {
        let db = setup_db().await;
        let user = create_user(&db, "grace").await;
        assert_eq!(user.email, "grace@example.com");

        let duplicate_name = User::create(
            &db,
            &CreateUser {
                name: "Other".to_string(),
                user_name: "grace".to_string(),
                email: "other@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
            },
        )
        .await;
        assert!(matches!(duplicate_name, Err(UserError::AlreadyExists)));

        let duplicate_email = User::create(
            &db,
            &CreateUser {
                name: "Other".to_string(),
                user_name: "someone".to_string(),
                email: "GRACE@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: UserRole::User,
            },
        )
        .await;
        assert!(matches!(duplicate_email, Err(UserError::AlreadyExists)));
    }

    #[tokio::test]
    async fn find_with_password_matches_username_or_email() {
        let db = setup_db().await;
        let user = create_user(&db, "linus").await;

        let (by_name, hash) = User::find_with_password(&db, Some("linus"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, user.id);
        assert_eq!(hash, "hash");

        let (by_email, _) = User::find_with_password(&db, None, Some("LINUS@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(User::find_with_password(&db, None, None).await.unwrap().is_none());
        assert!(
            User::find_with_password(&db, Some("nobody"), None)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn refresh_token_is_stored_and_cleared() {
        let db = setup_db().await;
        let user = create_user(&db, "barbara").await;

        User::set_refresh_token(&db, user.id, Some("rt".to_string()))
            .await
            .unwrap();
        assert_eq!(
            User::refresh_token(&db, user.id).await.unwrap().as_deref(),
            Some("rt")
        );

        User::set_refresh_token(&db, user.id, None).await.unwrap();
        assert_eq!(User::refresh_token(&db, user.id).await.unwrap(), None);
    }

    #[test]
    fn registration_enforces_password_rules() {
        let mut payload = RegisterUser {
            name: "Ken Thompson".to_string(),
            user_name: "ken".to_string(),
            email: "ken@example.com".to_string(),
            password: "Secret!".to_string(),
            role: None,
        };
        assert!(payload.validate().is_ok());

        payload.password = "secret!".to_string();
        assert!(payload.validate().is_err());

        payload.password = "Secret1".to_string();
        assert!(payload.validate().is_err());

        payload.password = "S!".to_string();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn login_requires_an_identity() {
        let login = LoginUser {
            user_name: None,
            email: Some("  ".to_string()),
            password: "x".to_string(),
        };
        let errors = login.validate().unwrap_err();
        assert!(errors.errors().contains_key("__all__"));
    }
}
