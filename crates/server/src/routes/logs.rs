use axum::{
    Extension, Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{delete, get, patch, post},
};
use chrono::Utc;
use db::models::{
    project::Project,
    time_log::{StopTimeLog, TimeLog, UpdateTimeLog},
    user::User,
};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::ValidatedJson,
    middleware::{load_project_middleware, load_time_log_middleware},
};

/// Only the user who started a log may change it.
pub(crate) fn ensure_author(log: &TimeLog, user: &User) -> Result<(), ApiError> {
    if log.user_id == user.id {
        return Ok(());
    }
    tracing::warn!(log_id = %log.id, user_id = %user.id, "Rejected log change by non-author");
    Err(ApiError::Forbidden(
        "You can only modify your own logs".to_string(),
    ))
}

pub async fn start_log(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<TimeLog>>), ApiError> {
    let log = TimeLog::start(&deployment.db().pool, project.id, user.id, Utc::now()).await?;
    tracing::info!(log_id = %log.id, project_id = %project.id, user_id = %user.id, "Started time log");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(
            log,
            "Log started successfully",
        )),
    ))
}

pub async fn stop_log(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(log): Extension<TimeLog>,
    ValidatedJson(payload): ValidatedJson<StopTimeLog>,
) -> Result<ResponseJson<ApiResponse<TimeLog>>, ApiError> {
    ensure_author(&log, &user)?;
    let stopped = TimeLog::stop(&deployment.db().pool, log.id, &payload, Utc::now()).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        stopped,
        "Log stopped successfully",
    )))
}

pub async fn update_log(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(log): Extension<TimeLog>,
    ValidatedJson(payload): ValidatedJson<UpdateTimeLog>,
) -> Result<ResponseJson<ApiResponse<TimeLog>>, ApiError> {
    ensure_author(&log, &user)?;
    let updated = TimeLog::update(&deployment.db().pool, log.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        updated,
        "Log updated successfully",
    )))
}

pub async fn delete_log(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(log): Extension<TimeLog>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ensure_author(&log, &user)?;
    TimeLog::delete(&deployment.db().pool, log.id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Log deleted successfully",
    )))
}

pub async fn get_project_logs(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Vec<TimeLog>>>, ApiError> {
    let logs = TimeLog::find_by_project_id(&deployment.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(logs)))
}

pub async fn get_user_logs(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<TimeLog>>>, ApiError> {
    let logs = TimeLog::find_by_user_id(&deployment.db().pool, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(logs)))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let project_router = Router::new()
        .route("/start/{projectId}", post(start_log))
        .route("/getAllLogsOfAProject/{projectId}", get(get_project_logs))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<DeploymentImpl>,
        ));

    let log_router = Router::new()
        .route("/stop/{logId}", post(stop_log))
        .route("/updateLog/{logId}", patch(update_log))
        .route("/deleteLog/{logId}", delete(delete_log))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_time_log_middleware::<DeploymentImpl>,
        ));

    let logs_router = Router::new()
        .route("/getAllLogsOfAUser", get(get_user_logs))
        .merge(project_router)
        .merge(log_router);

    Router::new().nest("/logs", logs_router)
}
