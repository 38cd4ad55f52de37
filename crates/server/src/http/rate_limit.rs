use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use deployment::Deployment;

use crate::{DeploymentImpl, error::ApiError};

const LIMIT_HEADER: &str = "x-ratelimit-limit";
const REMAINING_HEADER: &str = "x-ratelimit-remaining";

fn client_key(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Per-IP fixed window, applied to every route.
pub async fn enforce_rate_limit(
    State(deployment): State<DeploymentImpl>,
    req: Request,
    next: Next,
) -> Response {
    if !deployment.config().read().await.rate_limit.enabled {
        return next.run(req).await;
    }

    let client = client_key(&req);
    let decision = deployment.rate_limiter().check(&client);
    if !decision.allowed {
        tracing::warn!(
            client = %client,
            path = %req.uri().path(),
            limit = decision.limit,
            "Rate limit exceeded"
        );
        return ApiError::TooManyRequests {
            retry_after_secs: decision.reset_after.as_secs().max(1),
        }
        .into_response();
    }

    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    response
}
