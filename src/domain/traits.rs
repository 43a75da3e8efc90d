// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between orchestration and the heavy components.
// The application layer only sees these traits, so the
// interactive loop and the decoding strategies can be exercised
// without building a model.

use anyhow::Result;

use crate::domain::{pair::TextPair, task::Split};

// ─── PairSource ───────────────────────────────────────────────────────────────
/// Anything that can hand out the raw text pairs of a split.
///
/// Implementations:
///   - JsonSplitLoader → reads data/<task>/<split>.json
pub trait PairSource {
    fn load_split(&self, split: Split) -> Result<Vec<TextPair>>;
}

// ─── Generate ─────────────────────────────────────────────────────────────────
/// Turns one input sentence into one output sentence.
///
/// Implementations:
///   - Generator → encodes, searches, decodes with the trained model
pub trait Generate {
    fn generate(&self, input: &str) -> Result<String>;
}

// ─── StepScorer ───────────────────────────────────────────────────────────────
/// Scores the next token given a decoded prefix.
///
/// Search strategies only ever talk to this trait; the model
/// adapter owns the encoder memory for the current source.
pub trait StepScorer {
    /// Log-probabilities over the whole vocabulary for the token
    /// following `prefix`.
    fn next_log_probs(&self, prefix: &[u32]) -> Result<Vec<f32>>;
}
