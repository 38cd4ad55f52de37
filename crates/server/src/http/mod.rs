use axum::{Router, middleware::from_fn_with_state, routing::get};
use tower_http::trace::TraceLayer;

use crate::{DeploymentImpl, routes};

mod auth;
pub mod cookies;
mod rate_limit;

pub use auth::require_admin;

pub fn router(deployment: DeploymentImpl) -> Router {
    let protected_routes = Router::new()
        .merge(routes::users::router())
        .merge(routes::projects::router(&deployment))
        .merge(routes::logs::router(&deployment))
        .merge(routes::tasks::router(&deployment))
        .merge(routes::summary::router(&deployment))
        .route_layer(from_fn_with_state(deployment.clone(), auth::require_auth));

    let api_routes = Router::new()
        .merge(routes::users::public_router())
        .merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api_routes)
        .layer(from_fn_with_state(
            deployment.clone(),
            rate_limit::enforce_rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(deployment)
}
