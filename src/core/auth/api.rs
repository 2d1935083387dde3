//! Auth API endpoints
//!
//! REST surface for the account service:
//! - POST /user/register - Create an account
//! - POST /user/login - Verify credentials and get a token pair
//! - POST /user/refresh - Rotate a refresh token into a new pair
//! - POST /user/logout - Invalidate a refresh token
//! - GET /user/{email}/profile - Read a profile (optional auth)
//! - PUT /user/{email}/profile - Update a profile (owner only)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::core::auth::gate::{AuthAttempt, AuthGate};
use crate::core::auth::service::{AuthError, AuthService, ProfileView, TokenPairResult};
use crate::core::db::models::FullProfile;
use crate::core::validation;

/// API state shared by all handlers
#[derive(Clone)]
pub struct ApiState {
    pub auth: AuthService,
    pub gate: AuthGate,
}

/// Error body shape: `{"error": true, "message": "..."}`
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: bool,
    message: String,
}

/// Success body for operations without a payload
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub error: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            error: false,
            message: message.into(),
        }
    }
}

/// Convert AuthError to an API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::InvalidToken | AuthError::TokenExpired | AuthError::MissingAuthHeader => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::BackendUnavailable(detail) => {
                // The detail stays in the logs; clients get the generic line
                tracing::error!("Backend unavailable: {}", detail);
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        let body = ErrorBody {
            error: true,
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Registration request body
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login request body; TTL overrides are optional
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub bearer_expires_in_seconds: Option<i64>,
    pub refresh_expires_in_seconds: Option<i64>,
}

/// Refresh/logout request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Create the user-facing router
pub fn user_router(state: ApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/user/register", post(register_handler))
        .route("/user/login", post(login_handler))
        .route("/user/refresh", post(refresh_handler))
        .route("/user/logout", post(logout_handler))
        .route(
            "/user/{email}/profile",
            get(get_profile_handler).put(put_profile_handler),
        )
        .with_state(state)
}

/// POST /user/register
async fn register_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let (email, password) = require_credentials(
        request.email,
        request.password,
        "Request body incomplete, both email and password needed",
    )?;

    tracing::info!("Registration attempt for email: {}", email);
    state.auth.register(&email, &password).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::ok("User successfully created")),
    ))
}

/// POST /user/login
async fn login_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPairResult>, AuthError> {
    let (email, password) = require_credentials(
        request.email,
        request.password,
        "Request body incomplete, both email and password are required",
    )?;

    tracing::info!("Login attempt for email: {}", email);
    let pair = state
        .auth
        .login(
            &email,
            &password,
            request.bearer_expires_in_seconds,
            request.refresh_expires_in_seconds,
        )
        .await?;

    Ok(Json(pair))
}

/// POST /user/refresh
async fn refresh_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPairResult>, AuthError> {
    let token = require_refresh_token(request)?;

    tracing::debug!("Token refresh request");
    let pair = state.auth.refresh(&token).await?;

    Ok(Json(pair))
}

/// POST /user/logout
async fn logout_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let token = require_refresh_token(request)?;

    state.auth.logout(&token).await?;

    Ok(Json(MessageResponse::ok("Token successfully invalidated")))
}

/// GET /user/{email}/profile
///
/// Authentication is optional: anonymous callers and non-owners get the
/// public view, the owner gets the full view. A present-but-invalid header
/// is still rejected.
async fn get_profile_handler(
    State(state): State<Arc<ApiState>>,
    Path(email): Path<String>,
    headers: HeaderMap,
) -> Result<Json<ProfileView>, AuthError> {
    let viewer = match state.gate.resolve(auth_header(&headers))? {
        AuthAttempt::Identity(identity) => Some(identity),
        AuthAttempt::Anonymous => None,
    };

    let view = state.auth.read_profile(&email, viewer.as_ref()).await?;

    Ok(Json(view))
}

/// PUT /user/{email}/profile
async fn put_profile_handler(
    State(state): State<Arc<ApiState>>,
    Path(email): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<FullProfile>, AuthError> {
    let identity = match state.gate.resolve(auth_header(&headers))? {
        AuthAttempt::Identity(identity) => identity,
        AuthAttempt::Anonymous => return Err(AuthError::MissingAuthHeader),
    };

    if identity.email != email {
        return Err(AuthError::Forbidden);
    }

    let update = validation::parse_profile_update(&body)
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let profile = state.auth.update_profile(&email, &identity, &update).await?;

    tracing::info!("Profile updated: {}", email);
    Ok(Json(profile))
}

/// Extract the Authorization header as a string, if any
fn auth_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

fn require_credentials(
    email: Option<String>,
    password: Option<String>,
    message: &str,
) -> Result<(String, String), AuthError> {
    match (email, password) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            Ok((email, password))
        }
        _ => Err(AuthError::Validation(message.to_string())),
    }
}

fn require_refresh_token(request: RefreshRequest) -> Result<String, AuthError> {
    request
        .refresh_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AuthError::Validation("Request body incomplete, refresh token required".to_string())
        })
}
