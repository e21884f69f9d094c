//! HTTP API for the to-do service.
//!
//! Thin layer over the store, the scheduler, and the extraction logic.
//! Every response carries the `{ ok, ... }` envelope the browser client
//! expects; errors use stable snake_case codes.

use crate::config::AppConfig;
use crate::extract::{self, TaskDraft};
use crate::reminder::ReminderScheduler;
use crate::store::TaskStore;
use crate::task::{self, SortKey, Task, TaskFilter};
use crate::watsonx::WatsonxClient;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Local, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::error;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TaskStore>,
    pub scheduler: Arc<ReminderScheduler>,
    /// `None` when watsonx credentials are absent; the parse endpoint
    /// then degrades to its heuristic fallback.
    pub watsonx: Option<Arc<WatsonxClient>>,
    pub config: Arc<AppConfig>,
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/tasks", get(get_tasks).put(put_tasks))
        .route("/api/ai/parse", post(ai_parse))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Configuration/status probe. Diagnostic only.
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let watsonx = &state.config.watsonx;
    Json(serde_json::json!({
        "ok": true,
        "ts": Utc::now().timestamp_millis(),
        "watsonx": {
            "configured": watsonx.is_configured(),
            "serviceUrl": watsonx.service_url,
            "modelId": watsonx.model_id,
            "version": watsonx.version,
        }
    }))
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ListQuery {
    filter: Option<String>,
    sort: Option<String>,
}

async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let tasks = match state.store.read_all().await {
        Ok(tasks) => tasks,
        Err(e) => {
            error!("task read failed: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "ok": false, "error": "read_failed" })),
            );
        }
    };

    // Without query parameters the full document comes back untouched.
    let tasks = if query.filter.is_some() || query.sort.is_some() {
        let filter = query
            .filter
            .as_deref()
            .and_then(TaskFilter::parse)
            .unwrap_or_default();
        let sort = query
            .sort
            .as_deref()
            .and_then(SortKey::parse)
            .unwrap_or_default();
        let mut view = task::filter_tasks(&tasks, filter, Utc::now());
        task::sort_tasks(&mut view, sort);
        view.into_iter().cloned().collect()
    } else {
        tasks
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({ "ok": true, "tasks": tasks })),
    )
}

async fn put_tasks(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let invalid = (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "ok": false, "error": "tasks_must_be_array" })),
    );

    let Some(tasks_value) = body.get("tasks").filter(|v| v.is_array()).cloned() else {
        return invalid;
    };
    let Ok(tasks) = serde_json::from_value::<Vec<Task>>(tasks_value) else {
        return invalid;
    };

    if let Err(e) = state.store.write_all(&tasks).await {
        error!("task write failed: {e}");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "ok": false, "error": "write_failed" })),
        );
    }

    // Reschedule from the new snapshot without delaying the response.
    let scheduler = Arc::clone(&state.scheduler);
    tokio::spawn(async move {
        scheduler.rebuild(&tasks).await;
    });

    (StatusCode::OK, Json(serde_json::json!({ "ok": true })))
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ParseBody {
    input: Option<serde_json::Value>,
    /// Legacy alias for `input`.
    text: Option<serde_json::Value>,
}

async fn ai_parse(
    State(state): State<AppState>,
    Json(body): Json<ParseBody>,
) -> impl IntoResponse {
    let raw = body.input.or(body.text);
    let input = raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_owned();

    if input.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "ok": false,
                "error": "missing_input",
                "message": "Body harus punya field \"input\" (string tidak kosong).",
            })),
        );
    }

    let Some(client) = &state.watsonx else {
        // No LLM: answer with the best-effort heuristic and flag the
        // degraded service.
        let data = extract::naive_parse(&input).unwrap_or_else(|| TaskDraft::bare(&input));
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "ok": false,
                "error": "watsonx_not_configured",
                "message": "Watsonx tidak terkonfigurasi. Menggunakan fallback sederhana.",
                "data": data,
            })),
        );
    };

    match client.generate_text(&extract::build_prompt(&input)).await {
        Ok(reply) => {
            let data = extract::normalize_llm_reply(&reply, &input, Local::now().naive_local());
            (
                StatusCode::OK,
                Json(serde_json::json!({ "ok": true, "data": data })),
            )
        }
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({
                "ok": false,
                "error": "watsonx_failed",
                "message": e.to_string(),
            })),
        ),
    }
}
