// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads the pretrained tokenizer artifact of a task and installs
// the post-processing template every sequence goes through:
//
//   single: "[BOS] $A [EOS]"
//
// Only single sequences are templated — the model never sees
// sentence pairs packed into one input.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokenizers::processors::template::TemplateProcessing;
use tokenizers::Tokenizer;

use crate::application::config::Config;
use crate::domain::error::SetupError;
use crate::infra::layout::Workspace;

/// Boundary tokens and the ids they must map to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryTokens {
    pub bos_token: String,
    pub bos_id:    u32,
    pub eos_token: String,
    pub eos_id:    u32,
}

impl BoundaryTokens {
    pub fn from_config(config: &Config) -> Self {
        let s = &config.settings;
        Self {
            bos_token: s.bos_token.clone(),
            bos_id:    s.bos_id,
            eos_token: s.eos_token.clone(),
            eos_id:    s.eos_id,
        }
    }

    pub fn single_template(&self) -> String {
        format!("{} $A {}", self.bos_token, self.eos_token)
    }
}

pub struct TokenizerStore {
    path: PathBuf,
}

impl TokenizerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the artifact as-is, without touching its post-processor.
    pub fn load(&self) -> Result<Tokenizer> {
        if !self.path.exists() {
            return Err(SetupError::MissingTokenizer(self.path.clone()).into());
        }
        Tokenizer::from_file(&self.path)
            .map_err(|e| anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}", self.path.display(), e
            ))
    }

    /// Load the artifact and wrap every single sequence in BOS/EOS.
    pub fn load_with_template(&self, tokens: &BoundaryTokens) -> Result<Tokenizer> {
        let mut tokenizer = self.load()?;
        attach_template(&mut tokenizer, tokens)
            .with_context(|| format!("Cannot template tokenizer '{}'", self.path.display()))?;
        tracing::info!(
            "Loaded tokenizer '{}' ({} tokens)",
            self.path.display(),
            tokenizer.get_vocab_size(true)
        );
        Ok(tokenizer)
    }
}

pub fn attach_template(tokenizer: &mut Tokenizer, tokens: &BoundaryTokens) -> Result<()> {
    let mut builder = TemplateProcessing::builder();
    builder
        .try_single(tokens.single_template())
        .map_err(|e| anyhow::anyhow!("Invalid single-sequence template: {e}"))?;
    builder.special_tokens(vec![
        (tokens.bos_token.clone(), tokens.bos_id),
        (tokens.eos_token.clone(), tokens.eos_id),
    ]);
    let processor = builder
        .build()
        .map_err(|e| anyhow::anyhow!("Cannot build template processor: {e}"))?;

    tokenizer.with_post_processor(processor);
    Ok(())
}

/// Tokenizer for the task named in `config`, templated with its BOS/EOS.
/// Fails if it can emit ids the model's embeddings do not cover.
pub fn load_tokenizer(config: &Config, workspace: &Workspace) -> Result<Tokenizer> {
    let tokenizer = TokenizerStore::new(workspace.tokenizer_file(config.task))
        .load_with_template(&BoundaryTokens::from_config(config))?;
    check_vocab_size(&tokenizer, config.settings.vocab_size)?;
    Ok(tokenizer)
}

pub fn check_vocab_size(tokenizer: &Tokenizer, vocab_size: usize) -> Result<(), SetupError> {
    let needed = tokenizer.get_vocab_size(true);
    if needed > vocab_size {
        return Err(SetupError::InvalidConfig(format!(
            "tokenizer has {needed} tokens but vocab_size is {vocab_size}"
        )));
    }
    Ok(())
}

// ─── Test fixtures ────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::Path;

    /// Special tokens first, in id order, then the given words.
    pub const SPECIALS: [&str; 4] = ["[PAD]", "[UNK]", "[BOS]", "[EOS]"];

    /// Write a word-level tokenizer in HuggingFace JSON format.
    /// Ids: [PAD]=0 [UNK]=1 [BOS]=2 [EOS]=3, words from 4 upwards.
    pub fn write_word_level(path: &Path, words: &[&str]) {
        let mut vocab = serde_json::Map::new();
        for (id, tok) in SPECIALS.iter().chain(words.iter()).enumerate() {
            vocab.insert(tok.to_string(), serde_json::json!(id));
        }
        let added: Vec<serde_json::Value> = SPECIALS
            .iter()
            .enumerate()
            .map(|(id, tok)| serde_json::json!({
                "id": id, "content": tok, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added,
            "normalizer": null,
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, serde_json::to_string_pretty(&tokenizer_json).unwrap()).unwrap();
    }

    pub fn boundary() -> super::BoundaryTokens {
        super::BoundaryTokens {
            bos_token: "[BOS]".into(),
            bos_id:    2,
            eos_token: "[EOS]".into(),
            eos_id:    3,
        }
    }
}
