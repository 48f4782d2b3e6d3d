//! HTTP endpoints for the first-blood announcer's admin surface.
//!
//! Mounted under `/admin/first_blood_telegram`, mirroring where the host
//! platform hangs plugin admin pages:
//! - `GET /` – current settings (token masked) plus supported placeholders,
//!   as JSON or a rendered HTML page depending on what the caller asked for
//! - `POST /` – partial settings update from a JSON or form body
//! - `POST /test` – send a test message with the stored settings
//!
//! A `GET /health` liveness probe lives outside the admin prefix.
//!
//! Every admin route sits behind [`AdminAuth`]; mutations are JSON or
//! non-browser form posts, so no CSRF token is involved.

use axum::extract::{FromRequest, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::instrument;

use crate::notifier::ChatSink;
use crate::security::AdminAuth;
use crate::settings::{
    mask_token, truthy, ParseMode, SettingsError, SettingsStore, CFG_CHAT_ID, CFG_ENABLED,
    CFG_PARSE_MODE, CFG_TEMPLATE, CFG_TOKEN, DEFAULT_TEMPLATE, PLACEHOLDERS,
};

const TEST_MESSAGE: &str = "✅ FirstBloodTelegram test message";

/// Shared state behind the admin surface.
pub struct AdminState {
    pub settings: SettingsStore,
    pub sink: Arc<dyn ChatSink>,
    pub pool: SqlitePool,
}

/// Settings as shown to admins. The raw token never leaves the server.
#[derive(Debug, Serialize)]
struct SettingsView {
    enabled: bool,
    token_masked: String,
    token_is_set: bool,
    chat_id: String,
    template: String,
    parse_mode: String,
}

#[derive(Debug, Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

impl ErrorResponse {
    fn new<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Boolean-like request field: JSON booleans and numbers, or truthy strings
/// from form bodies.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Num(i64),
    Str(String),
}

impl BoolLike {
    fn as_bool(&self) -> bool {
        match self {
            BoolLike::Bool(value) => *value,
            BoolLike::Num(value) => *value != 0,
            BoolLike::Str(value) => truthy(value),
        }
    }
}

/// Partial settings update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpdateSettings {
    enabled: Option<BoolLike>,
    token: Option<String>,
    clear_token: Option<BoolLike>,
    chat_id: Option<String>,
    template: Option<String>,
    parse_mode: Option<String>,
}

/// Extractor accepting either a JSON or an urlencoded form body.
struct JsonOrForm<T>(T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned + 'static,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();

        if content_type.starts_with("application/json") {
            let Json(payload) = Json::<T>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(JsonOrForm(payload));
        }
        let Form(payload) = Form::<T>::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(JsonOrForm(payload))
    }
}

/// Routes for the announcer: admin surface under `/admin/first_blood_telegram`
/// plus an unauthenticated `/health` probe.
pub fn routes(state: Arc<AdminState>, admin_auth: AdminAuth) -> Router {
    let admin = Router::new()
        .route(
            "/admin/first_blood_telegram/",
            get(get_settings).post(set_settings),
        )
        .route("/admin/first_blood_telegram/test", post(test_message))
        .with_state(Arc::clone(&state))
        .layer(axum::middleware::from_fn(move |req, next| {
            let auth = admin_auth.clone();
            async move { auth.middleware(req, next).await }
        }));

    Router::new()
        .route("/health", get(get_health))
        .with_state(state)
        .merge(admin)
}

#[derive(Debug, Default, Deserialize)]
struct SettingsQuery {
    format: Option<String>,
}

/// `GET /admin/first_blood_telegram/`: current settings and placeholders.
#[instrument(skip_all)]
async fn get_settings(
    State(state): State<Arc<AdminState>>,
    Query(query): Query<SettingsQuery>,
    headers: HeaderMap,
) -> Response {
    let view = match settings_view(&state.settings).await {
        Ok(view) => view,
        Err(error) => return internal_error(error),
    };

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());
    if prefers_json(query.format.as_deref(), accept) {
        return Json(json!({
            "success": true,
            "settings": view,
            "placeholders": PLACEHOLDERS,
            "how_to_update": {
                "method": "POST",
                "content_type": "application/json",
                "body_example": {
                    "enabled": true,
                    "token": "123456:ABCDEF...",
                    "chat_id": "-1001234567890",
                    "template": DEFAULT_TEMPLATE,
                    "parse_mode": "",
                },
            },
        }))
        .into_response();
    }

    Html(render_admin_page(&view)).into_response()
}

/// `POST /admin/first_blood_telegram/`: partial settings update.
///
/// `parse_mode` is validated before anything is written, so an invalid value
/// leaves every stored setting untouched.
#[instrument(skip_all)]
async fn set_settings(
    State(state): State<Arc<AdminState>>,
    JsonOrForm(update): JsonOrForm<UpdateSettings>,
) -> Response {
    let parse_mode = match update.parse_mode.as_deref() {
        Some(raw) => match raw.parse::<ParseMode>() {
            Ok(mode) => Some(mode),
            Err(error) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error.to_string())))
                    .into_response();
            }
        },
        None => None,
    };

    let result = apply_update(&state.settings, &update, parse_mode).await;
    match result {
        Ok(()) => Json(SuccessResponse { success: true }).into_response(),
        Err(error) => internal_error(error),
    }
}

async fn apply_update(
    store: &SettingsStore,
    update: &UpdateSettings,
    parse_mode: Option<ParseMode>,
) -> Result<(), SettingsError> {
    if let Some(mode) = parse_mode {
        store.set(CFG_PARSE_MODE, mode.as_str()).await?;
    }

    if let Some(enabled) = &update.enabled {
        store
            .set(CFG_ENABLED, if enabled.as_bool() { "1" } else { "0" })
            .await?;
    }

    let clear_token = update
        .clear_token
        .as_ref()
        .map(BoolLike::as_bool)
        .unwrap_or(false);
    if clear_token {
        store.set(CFG_TOKEN, "").await?;
    } else if let Some(token) = &update.token {
        let token = token.trim();
        if !token.is_empty() {
            store.set(CFG_TOKEN, token).await?;
        }
    }

    if let Some(chat_id) = &update.chat_id {
        store.set(CFG_CHAT_ID, chat_id.trim()).await?;
    }

    if let Some(template) = &update.template {
        let template = template.trim();
        store
            .set(
                CFG_TEMPLATE,
                if template.is_empty() {
                    DEFAULT_TEMPLATE
                } else {
                    template
                },
            )
            .await?;
    }

    Ok(())
}

/// `POST /admin/first_blood_telegram/test`: send a test message with the
/// stored settings.
#[instrument(skip_all)]
async fn test_message(State(state): State<Arc<AdminState>>) -> Response {
    let snapshot = match state.settings.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(error) => return internal_error(error),
    };
    if !snapshot.is_configured() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("token/chat_id not set")),
        )
            .into_response();
    }

    state
        .sink
        .send(
            snapshot.token.trim(),
            snapshot.chat_id.trim(),
            TEST_MESSAGE,
            snapshot.parse_mode,
        )
        .await;
    Json(SuccessResponse { success: true }).into_response()
}

/// `GET /health`: liveness probe with a database ping.
#[instrument(skip_all)]
async fn get_health(State(state): State<Arc<AdminState>>) -> Response {
    match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => Json(SuccessResponse { success: true }).into_response(),
        Err(error) => {
            tracing::error!(error = %error, "health check database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse::new("database unavailable")),
            )
                .into_response()
        }
    }
}

async fn settings_view(store: &SettingsStore) -> Result<SettingsView, SettingsError> {
    let token = store.get_or(CFG_TOKEN, "").await?;
    let snapshot = store.snapshot().await?;
    Ok(SettingsView {
        enabled: snapshot.enabled,
        token_masked: mask_token(&token),
        token_is_set: !token.trim().is_empty(),
        chat_id: snapshot.chat_id,
        template: snapshot.template,
        parse_mode: snapshot.parse_mode.as_str().to_string(),
    })
}

fn internal_error(error: SettingsError) -> Response {
    tracing::error!(error = %error, "admin settings operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("settings storage unavailable")),
    )
        .into_response()
}

/// JSON wins on an explicit `?format=json`, or when the Accept header
/// mentions JSON and does not rank HTML ahead of it.
fn prefers_json(format: Option<&str>, accept: Option<&str>) -> bool {
    if format == Some("json") {
        return true;
    }
    let Some(accept) = accept else { return false };
    match (accept.find("application/json"), accept.find("text/html")) {
        (Some(json_at), Some(html_at)) => json_at < html_at,
        (Some(_), None) => true,
        _ => false,
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_admin_page(view: &SettingsView) -> String {
    let placeholders = PLACEHOLDERS
        .iter()
        .map(|p| format!("<code>{}</code>", escape_html(p)))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>First Blood Telegram</title>
</head>
<body>
  <h1>First Blood Telegram</h1>
  <table>
    <tr><th>Enabled</th><td>{enabled}</td></tr>
    <tr><th>Bot token</th><td>{token}</td></tr>
    <tr><th>Chat id</th><td>{chat_id}</td></tr>
    <tr><th>Template</th><td>{template}</td></tr>
    <tr><th>Parse mode</th><td>{parse_mode}</td></tr>
  </table>
  <p>Placeholders: {placeholders}</p>
  <p>Update with <code>POST /admin/first_blood_telegram/</code> (JSON or form),
     test with <code>POST /admin/first_blood_telegram/test</code>.</p>
</body>
</html>
"#,
        enabled = view.enabled,
        token = if view.token_is_set {
            escape_html(&view.token_masked)
        } else {
            "(not set)".to_string()
        },
        chat_id = escape_html(&view.chat_id),
        template = escape_html(&view.template),
        parse_mode = if view.parse_mode.is_empty() {
            "(plain)".to_string()
        } else {
            escape_html(&view.parse_mode)
        },
        placeholders = placeholders,
    )
}
