//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `mms` - Meta MMS-TTS (VITS, ONNX format)

#[cfg(feature = "mms")]
pub mod mms;
