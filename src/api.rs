use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{
    auth::{google_auth_url, Registration, TokenVerifier, UserStore},
    errors::{ApiError, ErrorContext},
    llm_providers::{GeminiProvider, GenerationOptions, LLMError, DEFAULT_GEMINI_MODEL},
    models::UserProfile,
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success, log_api_warn};

#[derive(Clone)]
pub struct AppState {
    /// `None` when no API key is configured
    pub gemini: Option<Arc<GeminiProvider>>,
    pub users: UserStore,
    pub verifier: Arc<dyn TokenVerifier>,
    pub google_client_id: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestRequest {
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserProfile,
}

/// Relays a prompt to Gemini with the server-held key
pub async fn generate_test(State(state): State<AppState>, body: Bytes) -> Response {
    let request: GenerateTestRequest = serde_json::from_slice(&body).unwrap_or(GenerateTestRequest {
        prompt: None,
        model: None,
        temperature: None,
        max_output_tokens: None,
    });

    let Some(prompt) = request.prompt.filter(|p| !p.is_empty()) else {
        log_api_warn!("generate_test", "missing prompt");
        return ApiError::BadRequest("Missing prompt in request body".to_string())
            .to_response_with_context(ErrorContext::new("generate_test", "prompt"));
    };

    log_api_start!("generate_test", prompt_length = prompt.len());

    let Some(gemini) = state.gemini.as_ref() else {
        return ApiError::NotConfigured("Server not configured with GEMINI_API_KEY".to_string())
            .to_response_with_context(ErrorContext::new("generate_test", "gemini"));
    };

    let defaults = GenerationOptions::default();
    let options = GenerationOptions {
        model: Some(request.model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string())),
        temperature: request.temperature.unwrap_or(defaults.temperature),
        max_output_tokens: request.max_output_tokens.unwrap_or(defaults.max_output_tokens),
    };

    let reply = match gemini.call(&prompt, &options).await {
        Ok(reply) => reply,
        Err(e) => {
            log_api_error!("generate_test", error = e, "upstream unreachable");
            let message = match e {
                LLMError::Transport(msg) | LLMError::Configuration(msg) => msg,
                LLMError::Status { body, .. } => body,
            };
            return ApiError::Internal(anyhow::anyhow!(message))
                .to_response_with_context(ErrorContext::new("generate_test", "gemini"));
        }
    };

    if !reply.status.is_success() {
        return ApiError::Upstream {
            status: reply.status,
            body: reply.body,
        }
        .to_response_with_context(ErrorContext::new("generate_test", "gemini"));
    }

    let text = GeminiProvider::extract_text(&reply.body);
    log_api_success!("generate_test", status = reply.status, format!("{} characters relayed", text.len()));

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response()
}

fn credentials(body: &Bytes) -> Option<(String, String)> {
    let request: CredentialsRequest = serde_json::from_slice(body).ok()?;
    let username = request.username.filter(|u| !u.is_empty())?;
    let password = request.password.filter(|p| !p.is_empty())?;
    Some((username, password))
}

pub async fn register(State(state): State<AppState>, body: Bytes) -> Result<Json<UserResponse>, Response> {
    let Some((username, password)) = credentials(&body) else {
        return Err(crate::api_error!(bad_request, "register", "user", "Missing username or password"));
    };
    log_api_start!("register", username = username);

    match state.users.register(&username, &password).await {
        Ok(Registration::Created(account)) => {
            log_api_success!("register", username = username, "account created");
            Ok(Json(UserResponse { user: account.profile() }))
        }
        Ok(Registration::Duplicate) => Err(crate::api_error!(conflict, "register", "user", &username, "User exists")),
        Err(e) => Err(crate::api_error!(internal, "register", "user", e, "Internal error")),
    }
}

pub async fn login(State(state): State<AppState>, body: Bytes) -> Result<Json<UserResponse>, Response> {
    let Some((username, password)) = credentials(&body) else {
        return Err(crate::api_error!(bad_request, "login", "user", "Missing username or password"));
    };
    log_api_start!("login", username = username);

    match state.users.authenticate(&username, &password).await {
        Some(account) => {
            log_api_success!("login", username = username, "credentials accepted");
            Ok(Json(UserResponse { user: account.profile() }))
        }
        None => Err(ApiError::Unauthorized("Invalid credentials".to_string())
            .to_response_with_context(ErrorContext::new("login", "user").with_id(&username))),
    }
}

pub async fn google_login(State(state): State<AppState>, body: Bytes) -> Result<Json<UserResponse>, Response> {
    let token = serde_json::from_slice::<GoogleTokenRequest>(&body)
        .ok()
        .and_then(|r| r.token)
        .filter(|t| !t.is_empty());
    let Some(token) = token else {
        return Err(crate::api_error!(bad_request, "google_login", "token", "No token provided"));
    };
    log_api_start!("google_login");

    match state.verifier.verify(&token).await {
        Some(identity) => {
            let user = identity.into_profile(Utc::now());
            log_api_success!("google_login", username = user.username, "token verified");
            Ok(Json(UserResponse { user }))
        }
        None => Err(crate::api_error!(unauthorized, "google_login", "token", "Invalid token")),
    }
}

pub async fn google_url(State(state): State<AppState>) -> Result<Json<serde_json::Value>, Response> {
    let url = google_auth_url(&state.google_client_id, &state.redirect_uri)
        .map_err(|e| crate::api_error!(internal, "google_url", "oauth", e, "Internal error"))?;
    Ok(Json(json!({ "url": url })))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Answers every preflight with 204 before routing
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    info!(path = %request.uri().path(), "CORS preflight");
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    response
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Model relay
        .route("/generate-test", post(generate_test))
        // Accounts
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/google/url", get(google_url))
        .route("/health", get(health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(preflight))
                .layer(CorsLayer::permissive()),
        )
}
