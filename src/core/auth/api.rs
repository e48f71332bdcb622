//! Auth API endpoints
//!
//! Provides REST API endpoints for authentication:
//! - POST /api/register - Register a new account
//! - POST /api/login - Login and get a token
//! - POST /api/change-password - Change password with a token
//!
//! Every logical outcome is HTTP 200 with `{"status": "ok" | "error", ...}`.
//! Only infrastructure failures produce a 500.
//!
//! Bodies may be a JSON object or a urlencoded form. Fields are only ever
//! read by name; anything else counts as an empty request.

use axum::{
    Form, Json, Router,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use crate::core::auth::{
    AuthError, AuthService, ChangePasswordRequest, LoginRequest, RegisterRequest,
};

/// Auth API state containing the auth service
#[derive(Clone)]
pub struct AuthApiState {
    pub auth_service: AuthService,
}

/// Outcome marker of every response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Ok,
    Error,
}

/// API response body
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status: ApiStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            status: ApiStatus::Ok,
            data: None,
            error: None,
        }
    }

    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::ok()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            status: ApiStatus::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Convert AuthError to API response
impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            tracing::error!("Request failed: {}", self);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error("Internal server error")),
            )
                .into_response();
        }

        (StatusCode::OK, Json(ApiResponse::error(self.to_string()))).into_response()
    }
}

/// Named fields of a request body
#[derive(Debug, Default)]
struct BodyFields(Map<String, Value>);

impl<S> FromRequest<S> for BodyFields
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            return match Form::<HashMap<String, String>>::from_request(req, state).await {
                Ok(Form(fields)) => Ok(Self(
                    fields
                        .into_iter()
                        .map(|(name, value)| (name, Value::String(value)))
                        .collect(),
                )),
                Err(rejection) => {
                    tracing::debug!("Unreadable form body: {}", rejection.body_text());
                    Ok(Self::default())
                }
            };
        }

        match Json::<Value>::from_request(req, state).await {
            Ok(Json(Value::Object(fields))) => Ok(Self(fields)),
            Ok(Json(_)) => {
                tracing::debug!("Ignoring JSON body that is not an object");
                Ok(Self::default())
            }
            Err(rejection) => {
                tracing::debug!("Unreadable request body: {}", rejection.body_text());
                Ok(Self::default())
            }
        }
    }
}

impl BodyFields {
    /// Pick the named fields of a request type out of the body
    fn into_request<T: DeserializeOwned + Default>(self) -> T {
        serde_json::from_value(Value::Object(self.0)).unwrap_or_else(|err| {
            tracing::debug!("Unusable request fields: {}", err);
            T::default()
        })
    }
}

/// Create the auth API router
pub fn auth_api_router(state: AuthApiState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/change-password", post(change_password_handler))
        .with_state(state)
}

/// Username as given by the client, for logging only
fn claimed_username(username: Option<&Value>) -> String {
    username
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// POST /api/register
async fn register_handler(
    State(state): State<Arc<AuthApiState>>,
    body: BodyFields,
) -> Result<Json<ApiResponse>, AuthError> {
    let request: RegisterRequest = body.into_request();
    let username = claimed_username(request.username.as_ref());

    tracing::info!(?username, "Registration attempt");

    match state.auth_service.register(request).await {
        Ok(()) => {
            tracing::info!(?username, "Account registered");
            Ok(Json(ApiResponse::ok()))
        }
        Err(err) => {
            if !err.is_internal() {
                tracing::debug!(?username, "Registration rejected: {}", err);
            }
            Err(err)
        }
    }
}

/// POST /api/login
async fn login_handler(
    State(state): State<Arc<AuthApiState>>,
    body: BodyFields,
) -> Result<Json<ApiResponse>, AuthError> {
    let request: LoginRequest = body.into_request();
    let username = claimed_username(request.username.as_ref());

    tracing::info!(?username, "Login attempt");

    let token = state.auth_service.login(request).await.inspect_err(|err| {
        if !err.is_internal() {
            tracing::warn!(?username, "Login failed");
        }
    })?;

    tracing::info!(?username, "User logged in successfully");

    Ok(Json(ApiResponse::with_data(token)))
}

/// POST /api/change-password
async fn change_password_handler(
    State(state): State<Arc<AuthApiState>>,
    body: BodyFields,
) -> Result<Json<ApiResponse>, AuthError> {
    let request: ChangePasswordRequest = body.into_request();

    state.auth_service.change_password(request).await?;

    tracing::info!("Password changed");

    Ok(Json(ApiResponse::ok()))
}
