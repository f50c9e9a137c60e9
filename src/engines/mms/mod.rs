//! MMS-TTS (Hebrew) text-to-speech engine implementation.
//!
//! This module runs Meta's `facebook/mms-tts-heb` VITS model through ONNX
//! Runtime. MMS models are character-level: the tokenizer maps each input
//! character straight to a vocabulary id, so no phonemizer is involved.
//!
//! # Model Directory Layout
//!
//! ```text
//! models/mms-tts-heb/
//! ├── model.onnx              # VITS graph exported with `optimum-cli export onnx`
//! ├── vocab.json              # character -> token id
//! ├── tokenizer_config.json   # optional: add_blank, do_lower_case, normalize
//! └── config.json             # optional: sampling_rate
//! ```
//!
//! Export:
//!
//! ```text
//! optimum-cli export onnx --model facebook/mms-tts-heb models/mms-tts-heb
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use hebrew_tts::{SynthesisEngine, engines::mms::MmsEngine};
//!
//! let mut engine = MmsEngine::new("models/mms-tts-heb");
//! engine.load_model()?;
//!
//! let result = engine.synthesize("שלום עולם")?;
//! println!("Generated {} samples at {}Hz", result.samples.len(), result.sample_rate);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod model;
pub mod tokenizer;

pub use engine::{MmsEngine, MmsModelParams};
pub use model::MmsError;

pub use crate::MODEL_NAME;
