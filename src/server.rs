//! HTTP front: routes requests into a [`SpeechOrchestrator`].

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::codec::AudioEncoder;
use crate::orchestrator::{EngineState, SpeechError, SpeechOrchestrator};
use crate::{SynthesisEngine, MODEL_NAME};

const SERVICE_NAME: &str = "Hebrew TTS Service";

/// Inference always runs on the CPU execution provider.
const DEVICE: &str = "cpu";

type Shared<E, C> = Arc<SpeechOrchestrator<E, C>>;

/// Build the service router.
pub fn router<E, C>(orchestrator: Shared<E, C>) -> Router
where
    E: SynthesisEngine + 'static,
    C: AudioEncoder + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health::<E, C>))
        .route("/stats", get(stats::<E, C>))
        .route("/speak", get(speak::<E, C>))
        .route("/clear-cache", get(clear_cache::<E, C>))
        .with_state(orchestrator)
}

impl IntoResponse for SpeechError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct SpeakParams {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    engine: &'static str,
    error: Option<String>,
    model: &'static str,
    cache_size: usize,
    device: &'static str,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    total_cached_texts: usize,
    model_loaded: bool,
    device: &'static str,
    recent_texts: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ClearCacheResponse {
    message: String,
    cache_size: usize,
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "service": SERVICE_NAME,
        "model": MODEL_NAME,
        "endpoints": {
            "health": "/health",
            "speak": "/speak?text=YOUR_TEXT",
            "stats": "/stats",
            "clear_cache": "/clear-cache",
        },
        "example": "curl 'http://localhost:8000/speak?text=שלום עולם' -o hello.mp3",
    }))
}

async fn health<E, C>(State(orchestrator): State<Shared<E, C>>) -> Json<HealthResponse>
where
    E: SynthesisEngine + 'static,
    C: AudioEncoder + 'static,
{
    let status = orchestrator.status();
    let summary = match &status.engine_state {
        EngineState::Ready => "ok",
        EngineState::Unloaded | EngineState::Loading => "loading",
        EngineState::Failed(_) => "error",
    };

    Json(HealthResponse {
        status: summary,
        engine: status.engine_state.label(),
        error: status.engine_state.failure().map(str::to_string),
        model: MODEL_NAME,
        cache_size: status.cache_size,
        device: DEVICE,
    })
}

async fn stats<E, C>(State(orchestrator): State<Shared<E, C>>) -> Json<StatsResponse>
where
    E: SynthesisEngine + 'static,
    C: AudioEncoder + 'static,
{
    let status = orchestrator.status();
    Json(StatsResponse {
        total_cached_texts: status.cache_size,
        model_loaded: status.engine_state.is_ready(),
        device: DEVICE,
        recent_texts: status.recent_keys,
    })
}

async fn speak<E, C>(
    State(orchestrator): State<Shared<E, C>>,
    Query(params): Query<SpeakParams>,
) -> Result<Response, SpeechError>
where
    E: SynthesisEngine + 'static,
    C: AudioEncoder + 'static,
{
    let worker = Arc::clone(&orchestrator);
    let text = params.text;
    let audio = tokio::task::spawn_blocking(move || worker.synthesize(&text))
        .await
        .map_err(|e| SpeechError::SynthesisFailed(format!("worker task failed: {e}")))??;

    let encoder = orchestrator.encoder();
    let headers = [
        (header::CONTENT_TYPE, encoder.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", encoder.file_name()),
        ),
    ];
    Ok((headers, audio).into_response())
}

async fn clear_cache<E, C>(State(orchestrator): State<Shared<E, C>>) -> Json<ClearCacheResponse>
where
    E: SynthesisEngine + 'static,
    C: AudioEncoder + 'static,
{
    let removed = orchestrator.clear_cache();
    Json(ClearCacheResponse {
        message: format!("Cache cleared. Removed {removed} items."),
        cache_size: orchestrator.status().cache_size,
    })
}
