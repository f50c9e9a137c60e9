//! # hebrew-tts
//!
//! A Hebrew text-to-speech service: text goes in over HTTP, an MP3 comes back.
//!
//! ## Features
//!
//! - **MMS-TTS engine**: Meta's `facebook/mms-tts-heb` VITS model exported to ONNX
//!   (enable the `mms` feature)
//! - **Result cache**: identical texts are synthesized once per process
//! - **Lazy, retryable model loading**: a failed load is retried on the next request
//! - **ffmpeg transcoding**: raw waveforms are encoded through an external `ffmpeg`
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! hebrew-tts = { version = "0.1", features = ["mms"] }
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use hebrew_tts::{
//!     codec::FfmpegEncoderBuilder, engines::mms::MmsEngine, orchestrator::SpeechOrchestrator,
//! };
//!
//! let engine = MmsEngine::new("models/mms-tts-heb");
//! let encoder = FfmpegEncoderBuilder::default().build()?;
//! let orchestrator = Arc::new(SpeechOrchestrator::new(engine, encoder));
//!
//! let mp3 = orchestrator.synthesize("שלום עולם")?;
//! std::fs::write("hello.mp3", &mp3)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod codec;
pub mod engines;
pub mod orchestrator;
pub mod server;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;

/// Hugging Face identifier of the model the service runs.
pub const MODEL_NAME: &str = "facebook/mms-tts-heb";

/// Errors reported by a [`SynthesisEngine`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Model or tokenizer construction failed.
    #[error("model load failed: {0}")]
    Load(String),
    /// Tokenization or inference failed.
    #[error("inference failed: {0}")]
    Inference(String),
    /// `synthesize` was called before a successful `load_model`.
    #[error("model not loaded, call load_model() first")]
    NotLoaded,
}

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (16000 for MMS-TTS)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float mono WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// An engine knows where its model lives; loading takes no arguments so the
/// orchestrator can retry it after a failure without extra bookkeeping.
pub trait SynthesisEngine: Send {
    /// Construct the model and tokenizer.
    ///
    /// A failed load must leave the engine unloaded, so calling this again is
    /// always safe.
    fn load_model(&mut self) -> Result<(), EngineError>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Whether a model is loaded and ready for [`SynthesisEngine::synthesize`].
    fn is_loaded(&self) -> bool;

    /// Synthesize speech from the given text.
    fn synthesize(&mut self, text: &str) -> Result<SynthesisResult, EngineError>;
}
