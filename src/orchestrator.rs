//! Request orchestration: engine readiness, cache lookup, synthesis,
//! transcoding and cache population.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::cache::ResultCache;
use crate::codec::AudioEncoder;
use crate::SynthesisEngine;

/// Number of keys reported by [`SpeechOrchestrator::status`].
pub const RECENT_KEYS: usize = 5;

/// Logged texts are cut to this many characters.
const LOG_PREVIEW_CHARS: usize = 50;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("No text provided")]
    InvalidInput,
    #[error("Model not loaded: {0}")]
    EngineUnavailable(String),
    #[error("Speech generation failed: {0}")]
    SynthesisFailed(String),
    #[error("Audio conversion failed: {0}")]
    TranscodeFailed(String),
}

impl SpeechError {
    /// HTTP status reported for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::EngineUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::SynthesisFailed(_) | Self::TranscodeFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Lifecycle of the synthesis engine.
///
/// `Unloaded`/`Failed` → `Loading` → `Ready` | `Failed`. `Ready` is final.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Failed(String),
}

impl EngineState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed(_) => "failed",
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Read-only snapshot returned by [`SpeechOrchestrator::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub engine_state: EngineState,
    pub cache_size: usize,
    pub recent_keys: Vec<String>,
}

/// Owns the engine, its lifecycle state, the encoder and the result cache.
///
/// All methods take `&self` and are safe to call from many threads; share the
/// orchestrator through an `Arc`. Calls block while the model loads or runs,
/// so async callers should go through `spawn_blocking`.
pub struct SpeechOrchestrator<E, C> {
    engine: Mutex<E>,
    state: RwLock<EngineState>,
    encoder: C,
    cache: ResultCache,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<E, C> SpeechOrchestrator<E, C>
where
    E: SynthesisEngine,
    C: AudioEncoder,
{
    pub fn new(engine: E, encoder: C) -> Self {
        Self {
            engine: Mutex::new(engine),
            state: RwLock::new(EngineState::Unloaded),
            encoder,
            cache: ResultCache::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn encoder(&self) -> &C {
        &self.encoder
    }

    /// Turn `text` into compressed audio, serving repeats from the cache.
    pub fn synthesize(&self, text: &str) -> Result<Bytes, SpeechError> {
        if text.trim().is_empty() {
            return Err(SpeechError::InvalidInput);
        }

        self.ensure_ready()?;

        if let Some(audio) = self.cache.get(text) {
            log::debug!("Cache hit for: {}", preview(text));
            return Ok(audio);
        }

        // One caller per distinct text does the work; the others wait here
        // and then find its result in the cache.
        let flight = self.join_flight(text);
        let result = {
            let _guard = flight.lock();
            match self.cache.get(text) {
                Some(audio) => {
                    log::debug!("Cache hit after wait for: {}", preview(text));
                    Ok(audio)
                }
                None => self.generate(text),
            }
        };
        self.leave_flight(text, flight);

        result
    }

    /// Make sure the engine is loaded, attempting a load if it is not.
    ///
    /// Used at startup to load eagerly; a failure here is recoverable and the
    /// next [`SpeechOrchestrator::synthesize`] tries again.
    pub fn warm_up(&self) -> Result<(), SpeechError> {
        self.ensure_ready()
    }

    /// Drop every cached result, returning how many were removed.
    pub fn clear_cache(&self) -> usize {
        let removed = self.cache.clear();
        log::info!("Cache cleared, removed {removed} items");
        removed
    }

    pub fn status(&self) -> Status {
        Status {
            engine_state: self.state.read().clone(),
            cache_size: self.cache.len(),
            recent_keys: self.cache.recent_keys(RECENT_KEYS),
        }
    }

    fn ensure_ready(&self) -> Result<(), SpeechError> {
        if self.state.read().is_ready() {
            return Ok(());
        }

        // Holding the engine lock makes concurrent callers wait for the
        // outcome of an in-progress load instead of starting another.
        let mut engine = self.engine.lock();
        if self.state.read().is_ready() {
            return Ok(());
        }

        *self.state.write() = EngineState::Loading;
        log::info!("Loading synthesis engine");

        match engine.load_model() {
            Ok(()) => {
                *self.state.write() = EngineState::Ready;
                log::info!("Synthesis engine ready");
                Ok(())
            }
            Err(e) => {
                engine.unload_model();
                let reason = e.to_string();
                log::warn!("Synthesis engine failed to load: {reason}");
                *self.state.write() = EngineState::Failed(reason.clone());
                Err(SpeechError::EngineUnavailable(reason))
            }
        }
    }

    fn generate(&self, text: &str) -> Result<Bytes, SpeechError> {
        log::info!("Generating speech for: {}", preview(text));

        let waveform = self
            .engine
            .lock()
            .synthesize(text)
            .map_err(|e| SpeechError::SynthesisFailed(e.to_string()))?;

        let audio = self
            .encoder
            .encode(&waveform)
            .map_err(|e| SpeechError::TranscodeFailed(e.to_string()))?;

        let audio = Bytes::from(audio);
        self.cache.put(text, audio.clone());
        log::info!(
            "Speech generated and cached ({:.2}s audio). Cache size: {}",
            waveform.duration_secs(),
            self.cache.len()
        );
        Ok(audio)
    }

    fn join_flight(&self, text: &str) -> Arc<Mutex<()>> {
        self.in_flight
            .lock()
            .entry(text.to_string())
            .or_default()
            .clone()
    }

    fn leave_flight(&self, text: &str, flight: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock();
        // The map holds one reference and we hold the other: nobody else is
        // waiting on this text.
        if Arc::strong_count(&flight) == 2 {
            in_flight.remove(text);
        }
        drop(flight);
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().len()
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(LOG_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
