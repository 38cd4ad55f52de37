use axum::{
    Extension, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Json as ResponseJson},
    routing::{get, post},
};
use db::{
    models::user::{CreateUser, LoginUser, RegisterUser, User, UserError},
    types::UserRole,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::password::{hash_password, verify_password};
use utils::response::ApiResponse;
use utils_jwt::{TokenPair, TokenSubject};

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::ValidatedJson,
    http::cookies::{
        ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, expired_cookie, read_cookie, session_cookie,
    },
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

fn token_subject(user: &User) -> TokenSubject<'_> {
    TokenSubject {
        id: user.id,
        name: &user.name,
        user_name: &user.user_name,
        email: &user.email,
        role: if user.is_admin() { "Admin" } else { "User" },
    }
}

/// Issues a fresh pair, persists the refresh half and builds both cookies.
async fn start_session(
    deployment: &DeploymentImpl,
    user: User,
    message: &'static str,
) -> Result<impl IntoResponse + use<>, ApiError> {
    let TokenPair {
        access_token,
        refresh_token,
    } = deployment.tokens().issue_pair(token_subject(&user))?;
    User::set_refresh_token(&deployment.db().pool, user.id, Some(refresh_token.clone())).await?;

    let (secure, access_ttl, refresh_ttl) = {
        let config = deployment.config().read().await;
        (
            config.auth.secure_cookies,
            config.auth.access_token_expiry_secs,
            config.auth.refresh_token_expiry_secs,
        )
    };
    let cookies = AppendHeaders([
        (SET_COOKIE, session_cookie(ACCESS_TOKEN_COOKIE, &access_token, access_ttl, secure)?),
        (SET_COOKIE, session_cookie(REFRESH_TOKEN_COOKIE, &refresh_token, refresh_ttl, secure)?),
    ]);

    tracing::info!(user_id = %user.id, "Issued session tokens");
    let body = AuthResponse {
        user,
        access_token,
        refresh_token,
    };
    Ok((
        cookies,
        ResponseJson(ApiResponse::success_with_message(body, message)),
    ))
}

pub async fn register(
    State(deployment): State<DeploymentImpl>,
    ValidatedJson(payload): ValidatedJson<RegisterUser>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<User>>), ApiError> {
    let pool = &deployment.db().pool;
    if User::exists_with(pool, &payload.user_name, &payload.email).await? {
        return Err(UserError::AlreadyExists.into());
    }

    let allow_role = deployment.config().read().await.auth.allow_role_on_register;
    let role = match payload.role {
        Some(role) if allow_role => role,
        _ => UserRole::User,
    };

    let password_hash = hash_password(payload.password).await?;
    let user = User::create(
        pool,
        &CreateUser {
            name: payload.name,
            user_name: payload.user_name,
            email: payload.email,
            password_hash,
            role,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Registered user");
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success_with_message(
            user,
            "User registered successfully",
        )),
    ))
}

pub async fn login(
    State(deployment): State<DeploymentImpl>,
    ValidatedJson(payload): ValidatedJson<LoginUser>,
) -> Result<impl IntoResponse, ApiError> {
    let (user, password_hash) = User::find_with_password(
        &deployment.db().pool,
        payload.user_name.as_deref(),
        payload.email.as_deref(),
    )
    .await?
    .ok_or(UserError::NotFound)?;

    if !verify_password(payload.password, password_hash).await? {
        tracing::warn!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::InvalidCredentials);
    }

    start_session(&deployment, user, "User logged in successfully").await
}

pub async fn logout(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<User>,
) -> Result<impl IntoResponse, ApiError> {
    User::set_refresh_token(&deployment.db().pool, user.id, None).await?;

    let secure = deployment.config().read().await.auth.secure_cookies;
    let cookies = AppendHeaders([
        (SET_COOKIE, expired_cookie(ACCESS_TOKEN_COOKIE, secure)?),
        (SET_COOKIE, expired_cookie(REFRESH_TOKEN_COOKIE, secure)?),
    ]);

    tracing::info!(user_id = %user.id, "User logged out");
    Ok((
        cookies,
        ResponseJson(ApiResponse::<()>::success_with_message(
            (),
            "User logged out successfully",
        )),
    ))
}

/// Rotates both tokens. The presented refresh token must match the stored one.
pub async fn refresh_token(
    State(deployment): State<DeploymentImpl>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let from_body = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|err| ApiError::BadRequest(format!("Invalid request body: {err}")))?
    };
    let presented = from_body
        .refresh_token
        .filter(|token| !token.trim().is_empty())
        .or_else(|| read_cookie(&headers, REFRESH_TOKEN_COOKIE).map(str::to_string))
        .ok_or(ApiError::Unauthorized)?;

    let claims = deployment.tokens().verify_refresh(&presented)?;
    let pool = &deployment.db().pool;
    let user = User::find_by_id(pool, claims.sub)
        .await?
        .ok_or(ApiError::Unauthorized)?;
    let stored = User::refresh_token(pool, user.id).await?;
    if stored.as_deref() != Some(presented.as_str()) {
        tracing::warn!(user_id = %user.id, "Refresh token does not match the stored one");
        return Err(ApiError::Unauthorized);
    }

    start_session(&deployment, user, "Access token refreshed").await
}

pub async fn me(Extension(user): Extension<User>) -> ResponseJson<ApiResponse<User>> {
    ResponseJson(ApiResponse::success(user))
}

/// Routes reachable without an access token.
pub fn public_router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/refreshToken", post(refresh_token))
}

pub fn router() -> Router<DeploymentImpl> {
    Router::new()
        .route("/user/logout", post(logout))
        .route("/user/me", get(me))
}
