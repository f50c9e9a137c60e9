//! Raw waveform to compressed audio, via an external encoder process.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use derive_builder::Builder;

use crate::SynthesisResult;

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("encoder program '{0}' not found, install ffmpeg or point FFMPEG_BIN at it")]
    ProgramNotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write WAV input: {0}")]
    Wav(#[from] hound::Error),
    #[error("encoder exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },
    #[error("encoder produced no output")]
    MissingOutput,
}

/// Converts one raw waveform into one compressed audio artifact.
pub trait AudioEncoder: Send + Sync {
    fn encode(&self, waveform: &SynthesisResult) -> Result<Vec<u8>, CodecError>;

    /// MIME type of the produced bytes.
    fn content_type(&self) -> &str;

    /// Suggested download name for the produced bytes.
    fn file_name(&self) -> String;
}

/// [`AudioEncoder`] that shells out to `ffmpeg`.
///
/// Every call works inside its own temporary directory, removed when the call
/// returns whatever the outcome.
///
/// ```rust,no_run
/// use hebrew_tts::codec::FfmpegEncoderBuilder;
///
/// let encoder = FfmpegEncoderBuilder::default()
///     .program("/usr/local/bin/ffmpeg")
///     .extra_args(vec!["-b:a".to_string(), "64k".to_string()])
///     .build()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct FfmpegEncoder {
    #[builder(default = "PathBuf::from(\"ffmpeg\")")]
    program: PathBuf,
    /// Extension of the output file; ffmpeg picks the muxer from it.
    #[builder(default = "\"mp3\".to_string()")]
    output_extension: String,
    /// Arguments inserted between the input and the output path.
    #[builder(default)]
    extra_args: Vec<String>,
    /// Parent of the per-call working directories; the system temp dir when unset.
    #[builder(default)]
    temp_root: Option<PathBuf>,
}

impl FfmpegEncoder {
    fn run(&self, input: &std::path::Path, output: &std::path::Path) -> Result<(), CodecError> {
        let result = Command::new(&self.program)
            .args(["-y", "-loglevel", "error", "-i"])
            .arg(input)
            .args(&self.extra_args)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CodecError::ProgramNotFound(self.program.display().to_string())
                } else {
                    CodecError::Io(e)
                }
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(CodecError::Failed {
                code: result.status.code(),
                stderr,
            });
        }
        Ok(())
    }
}

impl AudioEncoder for FfmpegEncoder {
    fn encode(&self, waveform: &SynthesisResult) -> Result<Vec<u8>, CodecError> {
        let mut workdir = tempfile::Builder::new();
        workdir.prefix("hebrew-tts-");
        let workdir = match &self.temp_root {
            Some(root) => workdir.tempdir_in(root)?,
            None => workdir.tempdir()?,
        };
        let input = workdir.path().join("input.wav");
        let output = workdir
            .path()
            .join(format!("output.{}", self.output_extension));

        waveform.write_wav(&input)?;
        self.run(&input, &output)?;

        let bytes = match std::fs::read(&output) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CodecError::MissingOutput)
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.is_empty() {
            return Err(CodecError::MissingOutput);
        }
        Ok(bytes)
    }

    fn content_type(&self) -> &str {
        match self.output_extension.as_str() {
            "mp3" => "audio/mpeg",
            "ogg" | "opus" => "audio/ogg",
            "wav" => "audio/wav",
            "flac" => "audio/flac",
            "aac" | "m4a" => "audio/aac",
            _ => "application/octet-stream",
        }
    }

    fn file_name(&self) -> String {
        format!("speech.{}", self.output_extension)
    }
}
