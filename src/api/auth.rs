use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, validation};
use crate::services::auth_service::RegisterRequest as ServiceRegisterRequest;
use crate::services::{AuthError, UserInfo};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub invite_code: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

/// The token rides in the HttpOnly cookie for browsers and in the body for
/// API clients that authenticate with `Authorization: Bearer`.
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserInfo,
    pub token: String,
}

use super::MessageResponse;

/// Authenticated principal attached to request extensions by the middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: String,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that checks:
/// 1. The token cookie (from login)
/// 2. `Authorization: Bearer <token>` header
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let cookie_name = state.cookie_name();

    let token = jar
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .or_else(|| extract_bearer(&headers));

    let Some(token) = token else {
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response());
    };

    let Ok(claims) = state.tokens().verify(&token) else {
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response());
    };

    let Ok(user_id) = claims.user_id() else {
        return Ok((StatusCode::UNAUTHORIZED, "Unauthorized").into_response());
    };

    tracing::Span::current().record("user_id", &claims.username);

    request.extensions_mut().insert(CurrentUser {
        id: user_id,
        username: claims.username,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Gate for admin-only route groups. Must run after `auth_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Result<impl IntoResponse, ApiError> {
    let is_admin = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(CurrentUser::is_admin);

    if !is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Session-style cookie: no Max-Age, the embedded token expiry bounds it.
fn token_cookie(state: &AppState, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(state.cookie_name().to_string(), value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_secure(state.secure_cookies());
    cookie
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with username/email and password; sets the token cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginResponse>>), ApiError> {
    if payload.login.is_empty() {
        return Err(ApiError::validation("Login is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let session = state.auth().login(&payload.login, &payload.password).await?;

    let jar = jar.add(token_cookie(&state, session.token.clone()));

    Ok((
        jar,
        Json(ApiResponse::success(LoginResponse {
            user: session.user,
            token: session.token,
        })),
    ))
}

/// POST /auth/logout
/// Clears the token cookie. The token itself simply ages out.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let mut removal = Cookie::from(state.cookie_name().to_string());
    removal.set_path("/");
    let jar = jar.remove(removal);
    (jar, (StatusCode::OK, "Logged out"))
}

/// POST /auth/register
/// Invite-gated self-registration.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let username = validation::validate_username(&payload.username)?.to_string();

    let result = state
        .auth()
        .register(ServiceRegisterRequest {
            username,
            email: payload.email.trim().to_string(),
            password: payload.password,
            invite_code: payload.invite_code,
        })
        .await;

    match result {
        Ok(user) => Ok(Json(ApiResponse::success(user))),
        // Registrants get one generic message regardless of why the code was
        // rejected; the precise reason is visible to admins in the code list.
        Err(AuthError::Code(code_err)) => {
            tracing::info!("Registration rejected: {}", code_err);
            Err(ApiError::validation("Registration code is not valid"))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /auth/me
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<CurrentUser>,
) -> Result<Json<ApiResponse<UserInfo>>, ApiError> {
    let info = state.auth().get_user_info(user.id).await?;
    Ok(Json(ApiResponse::success(info)))
}

/// PUT /auth/password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    axum::Extension(user): axum::Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth()
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password updated successfully".to_string(),
    })))
}

/// POST /auth/reset/request
/// Always responds with the same success shape; account existence is never
/// disclosed.
pub async fn request_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.auth().request_password_reset(payload.email.trim()).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "If the address exists, a reset link has been sent".to_string(),
    })))
}

/// POST /auth/reset/confirm
pub async fn confirm_reset(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetConfirmRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth()
        .reset_password(&payload.token, &payload.new_password)
        .await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Password has been reset".to_string(),
    })))
}
