use axum::{
    Extension, Router,
    extract::{Query, State},
    http::header,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson},
    routing::get,
};
use db::models::{project::Project, time_log::TimeLog, user::User};
use deployment::Deployment;
use serde::Deserialize;
use services::services::summary::{
    ProjectHours, RangeHours, csv_filename, logs_to_csv, project_hours, range_hours,
};
use utils::{
    response::ApiResponse,
    time::{parse_flexible, parse_flexible_end},
};

use crate::{DeploymentImpl, error::ApiError, middleware::load_project_middleware};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

pub async fn get_total_hours_per_project(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectHours>>>, ApiError> {
    let projects = Project::find_owned_by(&deployment.db().pool, user.id).await?;
    let summary: Vec<ProjectHours> = projects.iter().map(project_hours).collect();
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub async fn get_total_hours_for_date_range(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
    Query(query): Query<DateRangeQuery>,
) -> Result<ResponseJson<ApiResponse<RangeHours>>, ApiError> {
    let (Some(start_raw), Some(end_raw)) = (
        query.start_date.as_deref().filter(|v| !v.trim().is_empty()),
        query.end_date.as_deref().filter(|v| !v.trim().is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Both startDate and endDate are required".to_string(),
        ));
    };

    let start = parse_flexible(start_raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid startDate: {start_raw}")))?;
    let end = parse_flexible_end(end_raw)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid endDate: {end_raw}")))?;
    if end < start {
        return Err(ApiError::BadRequest(
            "endDate must not be before startDate".to_string(),
        ));
    }

    let logs =
        TimeLog::find_by_user_started_between(&deployment.db().pool, user.id, start, end).await?;
    Ok(ResponseJson(ApiResponse::success(range_hours(&logs))))
}

pub async fn download_project_csv(
    State(deployment): State<DeploymentImpl>,
    Extension(project): Extension<Project>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = TimeLog::find_by_project_id(&deployment.db().pool, project.id).await?;
    if logs.is_empty() {
        return Err(ApiError::NotFound(
            "No logs found for this project".to_string(),
        ));
    }

    let body = logs_to_csv(&logs)?;
    let disposition = format!("attachment; filename=\"{}\"", csv_filename(project.id));
    tracing::info!(project_id = %project.id, rows = logs.len(), "Exported project logs as CSV");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

pub fn router(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let export_router = Router::new()
        .route("/download/{projectId}/csv", get(download_project_csv))
        .route_layer(from_fn_with_state(
            deployment.clone(),
            load_project_middleware::<DeploymentImpl>,
        ));

    let summary_router = Router::new()
        .route("/getTotalHoursPerProject", get(get_total_hours_per_project))
        .route(
            "/getTotalHoursForADateRange",
            get(get_total_hours_for_date_range),
        )
        .merge(export_router);

    Router::new().nest("/summary", summary_router)
}
