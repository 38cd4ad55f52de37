use std::collections::HashMap;

use axum::{
    Extension, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware::{from_fn, from_fn_with_state},
    response::Json as ResponseJson,
    routing::{delete, get, patch, post},
};
use db::models::{
    project::Project,
    task::{CreateTask, NewChecklistItem, Task, UpdateTask},
    time_log::TimeLog,
    user::User,
};
use deployment::Deployment;
use utils::response::ApiResponse;

use super::logs::ensure_author;
use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::ValidatedJson,
    http::require_admin,
    middleware::{
        load_project_middleware, load_task_middleware, load_time_log_middleware, path_uuid,
    },
};

pub async fn create_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    ValidatedJson(payload): ValidatedJson<CreateTask>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Task>>), ApiError> {
    let task = Task::create(&deployment.db().pool, project.id, user.id, &payload).await?;
    tracing::info!(task_id = %task.id, project_id = %project.id, "Created task");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(
            task,
            "Task created successfully",
        )),
    ))
}

pub async fn update_task(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
    ValidatedJson(payload): ValidatedJson<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let updated = Task::update(&deployment.db().pool, task.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        updated,
        "Task updated successfully",
    )))
}

pub async fn delete_task(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Task::delete(&deployment.db().pool, task.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }
    tracing::info!(task_id = %task.id, "Deleted task");
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Task deleted successfully",
    )))
}

pub async fn get_task(Extension(task): Extension<Task>) -> ResponseJson<ApiResponse<Task>> {
    ResponseJson(ApiResponse::success(task))
}

pub async fn get_project_tasks(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_by_project_id(&deployment.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_all_tasks(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn add_checklist_item(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
    ValidatedJson(payload): ValidatedJson<NewChecklistItem>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let updated = Task::add_checklist_item(&deployment.db().pool, task.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        updated,
        "Checklist item added",
    )))
}

pub async fn toggle_checklist_item(
    State(deployment): State<DeploymentImpl>,
    Extension(task): Extension<Task>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let item_id = path_uuid(&params, "itemId")?;
    let updated = Task::toggle_checklist_item(&deployment.db().pool, task.id, item_id).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        updated,
        "Checklist item updated",
    )))
}

pub async fn add_log_to_task(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(task): Extension<Task>,
    Extension(log): Extension<TimeLog>,
) -> Result<ResponseJson<ApiResponse<TimeLog>>, ApiError> {
    ensure_author(&log, &user)?;
    let linked = TimeLog::attach_to_task(&deployment.db().pool, log.id, task.id).await?;
    tracing::info!(log_id = %log.id, task_id = %task.id, time_spent = linked.time_spent, "Linked log to task");
    Ok(ResponseJson(ApiResponse::success_with_message(
        linked,
        "Log added to task",
    )))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let project_router = Router::new()
        .route("/createTask/{projectId}", post(create_task))
        .route("/getProjectTasks/{projectId}", get(get_project_tasks))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<DeploymentImpl>,
        ));

    let log_link_router = Router::new()
        .route("/addLogToTask/{taskId}/{logId}", patch(add_log_to_task))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_time_log_middleware::<DeploymentImpl>,
        ));

    let task_router = Router::new()
        .route("/updateTask/{taskId}", patch(update_task))
        .route("/deleteTask/{taskId}", delete(delete_task))
        .route("/getTaskById/{taskId}", get(get_task))
        .route("/addChecklistItem/{taskId}", patch(add_checklist_item))
        .route(
            "/updateChecklistItem/task/{taskId}/item/{itemId}",
            patch(toggle_checklist_item),
        )
        .merge(log_link_router)
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_task_middleware::<DeploymentImpl>,
        ));

    let admin_router = Router::new()
        .route("/getAllTasks", get(get_all_tasks))
        .route_layer(from_fn(require_admin));

    let tasks_router = Router::new()
        .merge(project_router)
        .merge(task_router)
        .merge(admin_router);

    Router::new().nest("/task", tasks_router)
}
