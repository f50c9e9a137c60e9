use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use serde::Deserialize;

use super::tokenizer::MmsTokenizer;

/// Output sample rate of the MMS-TTS models.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

#[derive(thiserror::Error, Debug)]
pub enum MmsError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Invalid model config: {0}")]
    Config(String),
    #[error("Text contains no characters supported by the model")]
    NoTokens,
}

/// The subset of the Hugging Face `config.json` the engine needs.
#[derive(Debug, Deserialize)]
struct ModelConfig {
    #[serde(default = "default_sampling_rate")]
    sampling_rate: u32,
}

fn default_sampling_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

/// Internal MMS ONNX model state.
pub struct MmsModel {
    session: Session,
    tokenizer: MmsTokenizer,
    sample_rate: u32,
    /// True if the exported graph takes an `attention_mask` input
    has_attention_mask: bool,
}

impl MmsModel {
    /// Load the model and its tokenizer from a directory.
    pub fn load(model_dir: &Path, num_threads: Option<usize>) -> Result<Self, MmsError> {
        let onnx_path = find_onnx_file(model_dir)?;
        log::info!("Loading MMS model from {}", onnx_path.display());

        let tokenizer = MmsTokenizer::from_dir(model_dir)?;
        let sample_rate = load_sample_rate(model_dir)?;
        let session = init_session(&onnx_path, num_threads)?;

        let has_attention_mask = session
            .inputs()
            .iter()
            .any(|input| input.name() == "attention_mask");

        log::info!("Detected: attention_mask={has_attention_mask}, sample_rate={sample_rate}");

        Ok(Self {
            session,
            tokenizer,
            sample_rate,
            has_attention_mask,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Tokenize `text` and run the VITS graph, returning the waveform.
    pub fn synthesize_text(&mut self, text: &str) -> Result<Vec<f32>, MmsError> {
        let ids = self.tokenizer.encode(text);
        if ids.is_empty() {
            return Err(MmsError::NoTokens);
        }

        let seq_len = ids.len();
        let ids_arr = Array2::from_shape_vec((1, seq_len), ids)?;

        let output = if self.has_attention_mask {
            let mask_arr = Array2::<i64>::ones((1, seq_len));
            let inputs = inputs![
                "input_ids" => TensorRef::from_array_view(ids_arr.view())?,
                "attention_mask" => TensorRef::from_array_view(mask_arr.view())?,
            ];
            self.session.run(inputs)?
        } else {
            let inputs = inputs![
                "input_ids" => TensorRef::from_array_view(ids_arr.view())?,
            ];
            self.session.run(inputs)?
        };

        // First output is the waveform, shaped [1, samples]
        let first_output = output
            .iter()
            .next()
            .ok_or_else(|| MmsError::Ort(ort::Error::new("No output from model")))?;
        let waveform = first_output.1.try_extract_array::<f32>()?;

        Ok(waveform.iter().copied().collect())
    }
}

/// Find the ONNX model file in the given directory.
///
/// Prefers `model.onnx`, then falls back to the first `.onnx` file found.
fn find_onnx_file(model_dir: &Path) -> Result<PathBuf, MmsError> {
    let preferred = model_dir.join("model.onnx");
    if preferred.exists() {
        return Ok(preferred);
    }

    for entry in std::fs::read_dir(model_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            log::info!("Using ONNX file: {}", path.display());
            return Ok(path);
        }
    }

    Err(MmsError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("No .onnx file found in {}", model_dir.display()),
    )))
}

fn load_sample_rate(model_dir: &Path) -> Result<u32, MmsError> {
    let config_path = model_dir.join("config.json");
    if !config_path.exists() {
        log::warn!("config.json not found, assuming {DEFAULT_SAMPLE_RATE}Hz");
        return Ok(DEFAULT_SAMPLE_RATE);
    }

    let content = std::fs::read_to_string(&config_path)?;
    let config: ModelConfig = serde_json::from_str(&content)
        .map_err(|e| MmsError::Config(format!("Failed to parse config.json: {e}")))?;
    if config.sampling_rate == 0 {
        return Err(MmsError::Config("sampling_rate must be positive".to_string()));
    }
    Ok(config.sampling_rate)
}

/// Build a CPU session with deterministic kernels so repeated runs of the
/// same text produce the same waveform.
fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, MmsError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(providers)?
        .with_deterministic_compute(true)?;

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}

#[cfg(test)]
mod tests {
    use super::{find_onnx_file, load_sample_rate, DEFAULT_SAMPLE_RATE};

    #[test]
    fn sample_rate_defaults_without_config() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_sample_rate(dir.path()).unwrap(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn sample_rate_read_from_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"model_type": "vits", "sampling_rate": 22050}"#,
        )
        .unwrap();
        assert_eq!(load_sample_rate(dir.path()).unwrap(), 22_050);
    }

    #[test]
    fn finds_any_onnx_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_onnx_file(dir.path()).is_err());

        std::fs::write(dir.path().join("vits-heb.onnx"), b"").unwrap();
        let found = find_onnx_file(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap(), "vits-heb.onnx");
    }
}
