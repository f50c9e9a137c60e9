//! Counting test doubles for the engine and the encoder.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::codec::{AudioEncoder, CodecError};
use crate::{EngineError, SynthesisEngine, SynthesisResult};

#[derive(Default)]
struct EngineCounters {
    loads: AtomicUsize,
    runs: AtomicUsize,
    failing_loads: AtomicUsize,
    failing_runs: AtomicUsize,
}

/// Engine returning `[0, 0, 0]` at 16 kHz. Clones share counters.
#[derive(Clone, Default)]
pub struct MockEngine {
    counters: Arc<EngineCounters>,
    loaded: bool,
    delay: Duration,
    load_delay: Duration,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` loads.
    pub fn failing_loads(self, n: usize) -> Self {
        self.counters.failing_loads.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the next `n` syntheses.
    pub fn failing_runs(self, n: usize) -> Self {
        self.counters.failing_runs.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    /// Every load sleeps this long before succeeding or failing.
    pub fn with_load_delay_ms(mut self, ms: u64) -> Self {
        self.load_delay = Duration::from_millis(ms);
        self
    }

    pub fn loads(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.counters.runs.load(Ordering::SeqCst)
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl SynthesisEngine for MockEngine {
    fn load_model(&mut self) -> Result<(), EngineError> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }
        if take_failure(&self.counters.failing_loads) {
            return Err(EngineError::Load("weights unavailable".to_string()));
        }
        self.loaded = true;
        Ok(())
    }

    fn unload_model(&mut self) {
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn synthesize(&mut self, _text: &str) -> Result<SynthesisResult, EngineError> {
        if !self.loaded {
            return Err(EngineError::NotLoaded);
        }
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if take_failure(&self.counters.failing_runs) {
            return Err(EngineError::Inference("tokenizer rejected input".to_string()));
        }
        Ok(SynthesisResult {
            samples: vec![0.0, 0.0, 0.0],
            sample_rate: 16_000,
        })
    }
}

#[derive(Default)]
struct EncoderState {
    calls: AtomicUsize,
    last_input: Mutex<Option<SynthesisResult>>,
}

/// Encoder echoing fixed bytes, or always failing. Clones share counters.
#[derive(Clone)]
pub struct MockEncoder {
    output: Option<&'static [u8]>,
    state: Arc<EncoderState>,
}

impl MockEncoder {
    pub fn echo(output: &'static [u8]) -> Self {
        Self {
            output: Some(output),
            state: Arc::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            output: None,
            state: Arc::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<SynthesisResult> {
        self.state.last_input.lock().clone()
    }
}

impl AudioEncoder for MockEncoder {
    fn encode(&self, waveform: &SynthesisResult) -> Result<Vec<u8>, CodecError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        *self.state.last_input.lock() = Some(waveform.clone());
        match self.output {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(CodecError::Failed {
                code: Some(1),
                stderr: "Invalid data found when processing input".to_string(),
            }),
        }
    }

    fn content_type(&self) -> &str {
        "audio/mpeg"
    }

    fn file_name(&self) -> String {
        "speech.mp3".to_string()
    }
}
