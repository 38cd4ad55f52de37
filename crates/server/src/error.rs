use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{project::ProjectError, task::TaskError, time_log::TimeLogError, user::UserError},
};
use deployment::DeploymentError;
use services::services::{
    config::ConfigError, password::PasswordError, summary::SummaryError,
};
use thiserror::Error;
use utils::response::{ApiResponse, field_errors};
use utils_jwt::TokenError;
use validator::ValidationErrors;

const GENERIC_SERVER_ERROR: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    TimeLog(#[from] TimeLogError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Validation failed")]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid user credentials")]
    InvalidCredentials,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Too many requests")]
    TooManyRequests { retry_after_secs: u64 },
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

fn database_status(err: &DbErr) -> StatusCode {
    match err {
        DbErr::RecordNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::User(err) => match err {
                UserError::NotFound => (StatusCode::NOT_FOUND, "UserError"),
                UserError::AlreadyExists => (StatusCode::CONFLICT, "UserError"),
                UserError::Database(db_err) => (database_status(db_err), "UserError"),
            },
            ApiError::Project(err) => match err {
                ProjectError::ProjectNotFound
                | ProjectError::UserNotFound
                | ProjectError::NotMember => (StatusCode::NOT_FOUND, "ProjectError"),
                ProjectError::DuplicateName | ProjectError::AlreadyMember => {
                    (StatusCode::CONFLICT, "ProjectError")
                }
                ProjectError::InvalidDateRange => (StatusCode::BAD_REQUEST, "ProjectError"),
                ProjectError::Database(db_err) => (database_status(db_err), "ProjectError"),
            },
            ApiError::Task(err) => match err {
                TaskError::Database(db_err) => (database_status(db_err), "TaskError"),
                _ => (StatusCode::NOT_FOUND, "TaskError"),
            },
            ApiError::TimeLog(err) => match err {
                TimeLogError::AlreadyStopped | TimeLogError::TaskProjectMismatch => {
                    (StatusCode::BAD_REQUEST, "TimeLogError")
                }
                TimeLogError::Database(db_err) => (database_status(db_err), "TimeLogError"),
                _ => (StatusCode::NOT_FOUND, "TimeLogError"),
            },
            ApiError::Database(db_err) => (database_status(db_err), "DatabaseError"),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ApiError::Token(TokenError::Signing(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "TokenError")
            }
            ApiError::Token(_) => (StatusCode::UNAUTHORIZED, "TokenError"),
            ApiError::Password(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PasswordError"),
            ApiError::Summary(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SummaryError"),
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            ApiError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ConfigError"),
            ApiError::Unauthorized | ApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "ForbiddenError"),
            ApiError::TooManyRequests { .. } => (StatusCode::TOO_MANY_REQUESTS, "RateLimited"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = self.status_and_type();

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
            let response = ApiResponse::<()>::error(GENERIC_SERVER_ERROR);
            return (status_code, Json(response)).into_response();
        }

        let response = match &self {
            ApiError::Validation(errors) => {
                ApiResponse::<()>::validation_error("Validation failed", field_errors(errors))
            }
            ApiError::Token(TokenError::Expired) => ApiResponse::error("Access token expired"),
            ApiError::Token(_) => ApiResponse::error("Invalid or expired token"),
            ApiError::NotFound(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Forbidden(msg) => ApiResponse::error(msg.clone()),
            ApiError::TooManyRequests { .. } => ApiResponse::error(
                "Too many requests from this IP, please try again later",
            ),
            ApiError::Database(DbErr::RecordNotFound(msg)) => ApiResponse::error(msg.clone()),
            _ => ApiResponse::error(self.to_string()),
        };

        let mut http_response = (status_code, Json(response)).into_response();
        if let ApiError::TooManyRequests { retry_after_secs } = self {
            http_response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        http_response
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use validator::ValidationError;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn api_error_maps_to_expected_http_statuses() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("nope".to_string())
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("conflict".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("boom".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn domain_errors_map_to_expected_http_statuses() {
        assert_eq!(
            ApiError::from(UserError::AlreadyExists)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ProjectError::DuplicateName)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(ProjectError::ProjectNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TaskError::ChecklistItemNotFound)
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TimeLogError::AlreadyStopped)
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(DbErr::RecordNotFound("gone".to_string()))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TokenError::Expired).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn server_errors_hide_details() {
        let response = ApiError::from(DbErr::Custom("disk on fire".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], GENERIC_SERVER_ERROR);
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "name",
            ValidationError::new("length").with_message("Name is too short".into()),
        );

        let json = body_json(ApiError::from(errors).into_response()).await;
        assert_eq!(json["message"], "Validation failed");
        assert_eq!(json["errors"][0]["field"], "name");
        assert_eq!(json["errors"][0]["message"], "Name is too short");
    }

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let response = ApiError::TooManyRequests {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            "42"
        );
    }
}
