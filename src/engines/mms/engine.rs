use std::path::{Path, PathBuf};

use crate::{EngineError, SynthesisEngine, SynthesisResult};

use super::model::MmsModel;

/// Parameters for configuring MMS model loading.
#[derive(Debug, Clone, Default)]
pub struct MmsModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
}

/// MMS-TTS text-to-speech engine.
///
/// The engine is created unloaded; [`SynthesisEngine::load_model`] builds the
/// ONNX session and tokenizer from `model_dir`.
pub struct MmsEngine {
    model: Option<MmsModel>,
    model_dir: PathBuf,
    params: MmsModelParams,
}

impl MmsEngine {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self::with_params(model_dir, MmsModelParams::default())
    }

    pub fn with_params(model_dir: impl Into<PathBuf>, params: MmsModelParams) -> Self {
        Self {
            model: None,
            model_dir: model_dir.into(),
            params,
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl Drop for MmsEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for MmsEngine {
    fn load_model(&mut self) -> Result<(), EngineError> {
        // Only replace the slot once everything is built, so a failure leaves
        // the engine unloaded and ready for another attempt.
        self.model = None;
        let model = MmsModel::load(&self.model_dir, self.params.num_threads)
            .map_err(|e| EngineError::Load(e.to_string()))?;
        self.model = Some(model);
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
    }

    fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn synthesize(&mut self, text: &str) -> Result<SynthesisResult, EngineError> {
        let model = self.model.as_mut().ok_or(EngineError::NotLoaded)?;

        let samples = model
            .synthesize_text(text)
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        Ok(SynthesisResult {
            samples,
            sample_rate: model.sample_rate(),
        })
    }
}
