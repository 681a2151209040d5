use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use crate::config::BridgeConfig;
use crate::donation::DonationNotification;
use crate::error::BridgeError;
use crate::messaging::MessagingClient;

pub const WEBHOOK_PATH: &str = "/saweria-webhook";

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BridgeConfig>,
    pub messaging: MessagingClient,
}

impl AppState {
    pub fn new(config: BridgeConfig) -> Self {
        let config = Arc::new(config);
        Self {
            messaging: MessagingClient::new(config.clone()),
            config,
        }
    }
}

// ── Request / response types ───────────────────────────────────────────────────

#[derive(Serialize)]
struct WebhookResponse {
    success: bool,
    message: &'static str,
    data: DonationNotification,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    universe_id: Option<String>,
    api_key_configured: bool,
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            details: self.details().cloned(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Webhook body decoded from JSON or a urlencoded form. Anything else is
/// treated as an empty object so the donation falls back to defaults. JSON
/// bodies must be an object or an array.
pub struct WebhookBody(pub Value);

impl<S> FromRequest<S> for WebhookBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            let object: Map<String, Value> = fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            return Ok(Self(Value::Object(object)));
        }

        if content_type.starts_with("application/") && content_type.contains("json") {
            let bytes = Bytes::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Self(Value::Object(Map::new())));
            }
            let value: Value = serde_json::from_slice(&bytes)
                .map_err(|e| bad_request(format!("Invalid JSON body: {e}")))?;
            if !(value.is_object() || value.is_array()) {
                return Err(bad_request(
                    "JSON body must be an object or an array".to_string(),
                ));
            }
            return Ok(Self(value));
        }

        Ok(Self(Value::Object(Map::new())))
    }
}

fn bad_request(error: String) -> Response {
    let body = ErrorResponse {
        success: false,
        error,
        details: None,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

// ── Handlers ───────────────────────────────────────────────────────────────────

async fn saweria_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    WebhookBody(body): WebhookBody,
) -> Result<Json<WebhookResponse>, BridgeError> {
    let received_at = Utc::now();
    info!(
        "Webhook received at: {}",
        received_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    debug!("Request body: {}", body);
    debug!("Headers: {:?}", headers);

    let notification = DonationNotification::from_webhook(&body, received_at.timestamp_millis());
    info!(
        donor = %notification.donor_name,
        amount = notification.amount,
        donation_id = %notification.donation_id,
        "Formatted donation for Roblox"
    );

    match state.messaging.publish(&notification).await {
        Ok(status) => {
            info!("Successfully sent to Roblox ({})", status);
            Ok(Json(WebhookResponse {
                success: true,
                message: "Donation processed and sent to Roblox",
                data: notification,
            }))
        }
        Err(e) => {
            error!("Failed to relay donation: {}", e);
            if let BridgeError::Upstream { status, body } = &e {
                error!("Roblox response status: {}, body: {}", status, body);
            }
            Err(e)
        }
    }
}

async fn status_page(State(state): State<AppState>) -> Html<String> {
    let universe = state
        .config
        .universe_id
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| "Not configured".to_string());
    let api_key = if state.config.api_key_configured() {
        "✅ Configured"
    } else {
        "❌ Missing"
    };

    Html(format!(
        r#"<h1>🎮 Saweria to Roblox Bridge</h1>
<p>Status: <strong style="color: green;">Running</strong></p>
<p>Universe ID: <strong>{universe}</strong></p>
<p>API Key: <strong>{api_key}</strong></p>
<hr>
<p>Webhook endpoint: <code>POST {WEBHOOK_PATH}</code></p>
"#
    ))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        universe_id: state.config.universe_id.clone(),
        api_key_configured: state.config.api_key_configured(),
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": "Not found" })),
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_page))
        .route("/health", get(health))
        .route(WEBHOOK_PATH, post(saweria_webhook))
        .fallback(not_found)
        .with_state(state)
}

/// Binds the listener and serves until Ctrl-C.
pub async fn run(state: AppState) -> Result<()> {
    let port = state.config.port;
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Server running on port {}", port);
    info!("Webhook endpoint: http://localhost:{}{}", port, WEBHOOK_PATH);
    info!("Health check: http://localhost:{}/health", port);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
