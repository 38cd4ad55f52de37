use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::models::user::User;
use deployment::Deployment;

use super::cookies::{ACCESS_TOKEN_COOKIE, read_cookie};
use crate::{DeploymentImpl, error::ApiError};

fn parse_authorization_bearer(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    let (prefix, rest) = trimmed.split_once(' ')?;
    if !prefix.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = rest.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

fn extract_request_token(req: &Request) -> Option<String> {
    // 1) accessToken cookie
    if let Some(value) = read_cookie(req.headers(), ACCESS_TOKEN_COOKIE) {
        return Some(value.to_string());
    }

    // 2) Authorization: Bearer <token>
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_authorization_bearer)
        .map(str::to_string)
}

fn peer(req: &Request) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn reject(req: &Request, reason: &'static str) -> Response {
    tracing::warn!(
        path = %req.uri().path(),
        method = %req.method(),
        peer = %peer(req),
        reason,
        "Unauthorized API request"
    );
    ApiError::Unauthorized.into_response()
}

/// Resolves the access token to a [`User`] and stores it as a request extension.
pub async fn require_auth(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_request_token(&req) else {
        return reject(&req, "missing_token");
    };

    let claims = match deployment.tokens().verify_access(&token) {
        Ok(claims) => claims,
        Err(utils_jwt::TokenError::Expired) => return reject(&req, "expired_token"),
        Err(_) => return reject(&req, "invalid_token"),
    };

    let user = match User::find_by_id(&deployment.db().pool, claims.sub).await {
        Ok(Some(user)) => user,
        Ok(None) => return reject(&req, "unknown_user"),
        Err(err) => return ApiError::from(err).into_response(),
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Must run inside [`require_auth`].
pub async fn require_admin(req: Request, next: Next) -> Response {
    let is_admin = req
        .extensions()
        .get::<User>()
        .is_some_and(User::is_admin);
    if !is_admin {
        tracing::warn!(
            path = %req.uri().path(),
            peer = %peer(&req),
            "Admin route requested by non-admin"
        );
        return ApiError::Forbidden("Admin access required".to_string()).into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[test]
    fn bearer_parsing_is_case_insensitive_and_rejects_empty() {
        assert_eq!(parse_authorization_bearer("Bearer abc"), Some("abc"));
        assert_eq!(parse_authorization_bearer("bearer   abc  "), Some("abc"));
        assert_eq!(parse_authorization_bearer("Basic abc"), None);
        assert_eq!(parse_authorization_bearer("Bearer "), None);
    }

    #[test]
    fn cookie_wins_over_header() {
        let req = Request::builder()
            .header(header::COOKIE, "accessToken=from-cookie")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_request_token(&req).as_deref(), Some("from-cookie"));

        let req = Request::builder()
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_request_token(&req).as_deref(), Some("from-header"));
    }
}
