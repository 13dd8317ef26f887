//! Ingestion service and dashboard.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/save-result` | Validate and append `{"wpm": n, "accuracy": n}` |
//! | `POST` | `/api/save_result` | Same handler, path used by older clients |
//! | `GET`  | `/` | HTML dashboard over the progress log |
//! | `GET`  | `/debug/csv` | Raw log dump |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "status": "error", "message": "Missing field: wpm" }
//! ```
//!
//! Validation failures are `400`, failures to write the log are `500`.
//! Nothing is appended unless the request is fully valid.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dashboard::{display_rows, escape_html, render_dashboard, Summary};
use crate::progress_log::{validate, LogHealth, ProgressLog, ResultRecord};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    log: Arc<ProgressLog>,
    /// Serializes appends from concurrent requests within this process.
    writer: Arc<Mutex<()>>,
}

/// Builds the router over `log`.
pub fn router(log: ProgressLog) -> Router {
    let state = AppState {
        log: Arc::new(log),
        writer: Arc::new(Mutex::new(())),
    };

    Router::new()
        .route("/", get(handle_dashboard))
        .route("/save-result", post(handle_save_result))
        .route("/api/save_result", post(handle_save_result))
        .route("/debug/csv", get(handle_debug_csv))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Serves on an already bound listener until the process is terminated.
pub async fn serve(listener: TcpListener, log: ProgressLog) -> std::io::Result<()> {
    axum::serve(listener, router(log)).await
}

/// Starts the server on the address configured in `bind`.
///
/// The log is validated once before accepting requests.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let log = ProgressLog::new(config.server_log_path());

    let check = log.clone();
    match tokio::task::spawn_blocking(move || check.ensure()).await? {
        Ok(LogHealth::Quarantined(backup)) => warn!(
            "progress log was corrupted, backed up as {}",
            backup.display()
        ),
        Ok(_) => info!("using progress log {}", log.path().display()),
        Err(e) => warn!("progress log is not usable yet: {}", e),
    }

    let listener = TcpListener::bind(&config.bind).await?;
    info!("typing dashboard listening on http://{}", listener.local_addr()?);
    serve(listener, log).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = StatusBody {
            status: "error",
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn server_error(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: message.into(),
    }
}

// ============ POST /save-result ============

/// Reads one numeric field. Numeric strings are accepted as well.
fn number_field(data: &serde_json::Map<String, Value>, name: &str) -> Result<f64, ApiError> {
    match data.get(name) {
        None | Some(Value::Null) => Err(bad_request(format!("Missing field: {}", name))),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| bad_request(format!("Invalid {} value", name))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| bad_request(format!("Invalid {} value", name))),
        Some(_) => Err(bad_request(format!("Invalid {} value", name))),
    }
}

fn parse_result(body: &[u8]) -> Result<(f64, f64), ApiError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|_| bad_request("Invalid JSON body"))?;
    let Value::Object(data) = value else {
        return Err(bad_request("Invalid data"));
    };
    let wpm = number_field(&data, "wpm")?;
    let accuracy = number_field(&data, "accuracy")?;
    validate(wpm, accuracy).map_err(|e| bad_request(e.to_string()))?;
    Ok((wpm, accuracy))
}

async fn handle_save_result(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<StatusBody>, ApiError> {
    let (wpm, accuracy) = parse_result(&body).inspect_err(|e| {
        warn!("rejected result: {}", e.message);
    })?;
    let record = ResultRecord::now(wpm, accuracy).map_err(|e| bad_request(e.to_string()))?;

    let _guard = state.writer.lock().await;
    let log = state.log.clone();
    let appended = tokio::task::spawn_blocking(move || log.append(&record))
        .await
        .map_err(|e| server_error(format!("Could not write to file: {}", e)))?;

    match appended {
        Ok(health) => {
            if let LogHealth::Quarantined(backup) = health {
                warn!("progress log was corrupted, backed up as {}", backup.display());
            }
            info!("saved result: WPM={}, Accuracy={}%", wpm, accuracy);
            Ok(Json(StatusBody {
                status: "success",
                message: "Result saved".to_string(),
            }))
        }
        Err(e) => {
            error!("file I/O error: {}", e);
            Err(server_error(format!("Could not write to file: {}", e)))
        }
    }
}

// ============ GET / ============

async fn handle_dashboard(State(state): State<AppState>) -> Html<String> {
    let log = state.log.clone();
    let history = tokio::task::spawn_blocking(move || {
        log.ensure()?;
        log.read_history()
    })
    .await;

    let entries = match history {
        Ok(Ok(history)) => {
            if history.skipped > 0 {
                warn!("skipped {} malformed rows in progress log", history.skipped);
            }
            history.entries
        }
        Ok(Err(e)) => {
            error!("error reading progress file: {}", e);
            Vec::new()
        }
        Err(e) => {
            error!("dashboard task failed: {}", e);
            Vec::new()
        }
    };

    let summary = Summary::from_entries(&entries);
    Html(render_dashboard(&summary, &display_rows(&entries)))
}

// ============ GET /debug/csv ============

async fn handle_debug_csv(State(state): State<AppState>) -> Html<String> {
    let log = state.log.clone();
    let contents = tokio::task::spawn_blocking(move || log.raw_contents()).await;
    Html(match contents {
        Ok(Ok(Some(text))) => format!("<pre>CSV Content:\n{}</pre>", escape_html(&text)),
        Ok(Ok(None)) => "CSV file not found".to_string(),
        Ok(Err(e)) => format!("Error reading CSV: {}", escape_html(&e.to_string())),
        Err(e) => format!("Error reading CSV: {}", escape_html(&e.to_string())),
    })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
