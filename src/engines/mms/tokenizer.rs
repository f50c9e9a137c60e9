use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::model::MmsError;

/// Id of the blank token interspersed between characters. MMS checkpoints
/// reserve 0 for it regardless of the configured pad token.
pub const BLANK_ID: i64 = 0;

/// Settings read from `tokenizer_config.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenizerSettings {
    /// Intersperse [`BLANK_ID`] between characters (VITS "blank" tokens).
    pub add_blank: bool,
    pub do_lower_case: bool,
    /// Characters missing from the vocabulary are retried in lowercase.
    pub normalize: bool,
}

impl Default for TokenizerSettings {
    fn default() -> Self {
        Self {
            add_blank: true,
            do_lower_case: false,
            normalize: true,
        }
    }
}

/// Character-level MMS tokenizer.
#[derive(Debug, Clone)]
pub struct MmsTokenizer {
    vocab: HashMap<char, i64>,
    settings: TokenizerSettings,
}

impl MmsTokenizer {
    pub fn new(vocab: HashMap<char, i64>, settings: TokenizerSettings) -> Self {
        Self { vocab, settings }
    }

    /// Load the tokenizer from a model directory.
    ///
    /// `vocab.json` is required; `tokenizer_config.json` is optional.
    pub fn from_dir(model_dir: &Path) -> Result<Self, MmsError> {
        let vocab_path = model_dir.join("vocab.json");
        if !vocab_path.exists() {
            return Err(MmsError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Vocabulary not found at {}", vocab_path.display()),
            )));
        }
        let vocab = load_vocab(&vocab_path)?;

        let config_path = model_dir.join("tokenizer_config.json");
        let settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content).map_err(|e| {
                MmsError::Config(format!("Failed to parse tokenizer_config.json: {e}"))
            })?
        } else {
            log::warn!("tokenizer_config.json not found, using MMS defaults");
            TokenizerSettings::default()
        };

        Ok(Self::new(vocab, settings))
    }

    /// Convert text into model input ids.
    ///
    /// Characters missing from the vocabulary are dropped.
    pub fn encode(&self, text: &str) -> Vec<i64> {
        let mut ids = Vec::with_capacity(text.len());
        let mut dropped = 0usize;

        for ch in text.chars() {
            match self.lookup(ch) {
                Some(id) => ids.push(id),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            log::debug!("Dropped {dropped} unsupported characters");
        }

        if self.settings.add_blank && !ids.is_empty() {
            intersperse(&ids, BLANK_ID)
        } else {
            ids
        }
    }

    fn lookup(&self, ch: char) -> Option<i64> {
        let lower = || ch.to_lowercase().next().unwrap_or(ch);
        if self.settings.do_lower_case {
            return self.vocab.get(&lower()).copied();
        }
        self.vocab
            .get(&ch)
            .or_else(|| {
                self.settings
                    .normalize
                    .then(|| self.vocab.get(&lower()))
                    .flatten()
            })
            .copied()
    }
}

/// `[blank, t1, blank, t2, ..., tn, blank]`
fn intersperse(ids: &[i64], blank: i64) -> Vec<i64> {
    let mut out = vec![blank; ids.len() * 2 + 1];
    for (i, &id) in ids.iter().enumerate() {
        out[i * 2 + 1] = id;
    }
    out
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    }
}

/// Load an MMS `vocab.json` (a flat object of token -> id).
///
/// Only single-character entries are kept; special tokens such as `<pad>`
/// never match input text.
pub fn load_vocab(vocab_path: &Path) -> Result<HashMap<char, i64>, MmsError> {
    let content = std::fs::read_to_string(vocab_path)?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| MmsError::Config(format!("Failed to parse JSON: {e}")))?;

    let vocab_obj = json
        .as_object()
        .ok_or_else(|| MmsError::Config("vocab.json must be an object".to_string()))?;

    let mut chars = HashMap::new();
    for (k, v) in vocab_obj {
        if k.is_empty() {
            return Err(MmsError::Config("Empty key in vocab".to_string()));
        }
        let id = v
            .as_i64()
            .ok_or_else(|| MmsError::Config(format!("Non-integer vocab value for key {k:?}")))?;
        if let Some(ch) = single_char(k) {
            chars.insert(ch, id);
        }
    }

    Ok(chars)
}

#[cfg(test)]
mod tests {
    use super::{load_vocab, MmsTokenizer, TokenizerSettings, BLANK_ID};
    use std::collections::HashMap;

    fn hebrew_vocab() -> HashMap<char, i64> {
        [('ש', 5), ('ל', 7), ('ו', 9), ('ם', 11), (' ', 2)]
            .into_iter()
            .collect()
    }

    #[test]
    fn intersperses_pad_between_characters() {
        let tokenizer = MmsTokenizer::new(hebrew_vocab(), TokenizerSettings::default());
        assert_eq!(
            tokenizer.encode("שלום"),
            vec![0, 5, 0, 7, 0, 9, 0, 11, 0]
        );
    }

    #[test]
    fn drops_characters_outside_vocab() {
        let settings = TokenizerSettings {
            add_blank: false,
            ..Default::default()
        };
        let tokenizer = MmsTokenizer::new(hebrew_vocab(), settings);
        assert_eq!(tokenizer.encode("ש!ל?"), vec![5, 7]);
    }

    #[test]
    fn unsupported_text_yields_no_ids() {
        let tokenizer = MmsTokenizer::new(hebrew_vocab(), TokenizerSettings::default());
        assert!(tokenizer.encode("hello").is_empty());
    }

    #[test]
    fn lowercases_when_configured() {
        let vocab: HashMap<char, i64> = [('a', 3), ('A', 4)].into_iter().collect();
        let settings = TokenizerSettings {
            add_blank: false,
            do_lower_case: true,
            ..Default::default()
        };
        let tokenizer = MmsTokenizer::new(vocab, settings);
        assert_eq!(tokenizer.encode("Aa"), vec![3, 3]);
    }

    #[test]
    fn normalize_lowercases_only_missing_characters() {
        let vocab: HashMap<char, i64> = [('a', 3), ('B', 8)].into_iter().collect();
        let settings = TokenizerSettings {
            add_blank: false,
            ..Default::default()
        };
        let tokenizer = MmsTokenizer::new(vocab.clone(), settings.clone());
        assert_eq!(tokenizer.encode("AB"), vec![3, 8]);

        let strict = MmsTokenizer::new(
            vocab,
            TokenizerSettings {
                normalize: false,
                ..settings
            },
        );
        assert_eq!(strict.encode("AB"), vec![8]);
    }

    #[test]
    fn blank_is_zero_whatever_the_pad_token_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vocab.json"),
            r#"{"<pad>": 4, "ש": 5, "ל": 7}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("tokenizer_config.json"),
            r#"{"add_blank": true, "pad_token": "<pad>"}"#,
        )
        .unwrap();

        let chars = load_vocab(&dir.path().join("vocab.json")).unwrap();
        assert_eq!(chars.len(), 2);

        let tokenizer = MmsTokenizer::from_dir(dir.path()).unwrap();
        assert_eq!(tokenizer.encode("של"), vec![BLANK_ID, 5, BLANK_ID, 7, BLANK_ID]);
        assert_eq!(BLANK_ID, 0);
    }

    #[test]
    fn missing_vocab_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(MmsTokenizer::from_dir(dir.path()).is_err());
    }
}
