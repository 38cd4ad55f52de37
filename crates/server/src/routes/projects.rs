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
    project::{CreateProject, Project, UpdateProject},
    user::User,
};
use deployment::Deployment;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::ValidatedJson,
    http::require_admin,
    middleware::{load_project_middleware, path_uuid},
};

fn ensure_owner(project: &Project, user: &User) -> Result<(), ApiError> {
    if project.is_owned_by(user.id) {
        return Ok(());
    }
    tracing::warn!(
        project_id = %project.id,
        user_id = %user.id,
        "Rejected project change by non-owner"
    );
    Err(ApiError::Forbidden(
        "Only the project owner can perform this action".to_string(),
    ))
}

pub async fn create_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    ValidatedJson(payload): ValidatedJson<CreateProject>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<Project>>), ApiError> {
    let project = Project::create(&deployment.db().pool, &payload, user.id).await?;
    tracing::info!(project_id = %project.id, user_id = %user.id, "Created project");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(
            project,
            "Project created successfully",
        )),
    ))
}

pub async fn get_project(
    Extension(project): Extension<Project>,
) -> ResponseJson<ApiResponse<Project>> {
    ResponseJson(ApiResponse::success(project))
}

pub async fn get_projects_of_user(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_for_user(&deployment.db().pool, user.id).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_all_projects(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn update_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    ValidatedJson(payload): ValidatedJson<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_owner(&project, &user)?;
    let updated = Project::update(&deployment.db().pool, project.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success_with_message(
        updated,
        "Project updated successfully",
    )))
}

pub async fn delete_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if !user.is_admin() {
        ensure_owner(&project, &user)?;
    }

    let rows_affected = Project::delete(&deployment.db().pool, project.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }
    tracing::info!(project_id = %project.id, user_id = %user.id, "Deleted project");
    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Project deleted successfully",
    )))
}

pub async fn add_member(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_owner(&project, &user)?;
    let member = path_uuid(&params, "userId")?;

    let updated = Project::add_member(&deployment.db().pool, project.id, member).await?;
    tracing::info!(project_id = %project.id, member_id = %member, "Added project member");
    Ok(ResponseJson(ApiResponse::success_with_message(
        updated,
        "Member added successfully",
    )))
}

pub async fn remove_member(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Extension(project): Extension<Project>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    ensure_owner(&project, &user)?;
    let member = path_uuid(&params, "userId")?;

    let updated = Project::remove_member(&deployment.db().pool, project.id, member).await?;
    tracing::info!(project_id = %project.id, member_id = %member, "Removed project member");
    Ok(ResponseJson(ApiResponse::success_with_message(
        updated,
        "Member removed successfully",
    )))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let project_id_router = Router::new()
        .route("/getProjectById/{projectId}", get(get_project))
        .route("/updateProject/{projectId}", patch(update_project))
        .route("/deleteProject/{projectId}", delete(delete_project))
        .route("/addMember/{projectId}/{userId}", post(add_member))
        .route("/removeMember/{projectId}/{userId}", delete(remove_member))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<DeploymentImpl>,
        ));

    let admin_router = Router::new()
        .route("/getAllProjects", get(get_all_projects))
        .route_layer(from_fn(require_admin));

    let projects_router = Router::new()
        .route("/createProject", post(create_project))
        .route("/getProjectsOfAUser", get(get_projects_of_user))
        .merge(admin_router)
        .merge(project_id_router);

    Router::new().nest("/project", projects_router)
}
