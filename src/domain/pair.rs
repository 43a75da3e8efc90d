use serde::{Deserialize, Serialize};

/// One source/target example as stored in `data/<task>/<split>.json`.
/// For translation `trg` is the reference translation, for dialogue the
/// reply, for summarization the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPair {
    pub src: String,
    pub trg: String,
}

impl TextPair {
    #[cfg(test)]
    pub fn new(src: impl Into<String>, trg: impl Into<String>) -> Self {
        Self { src: src.into(), trg: trg.into() }
    }

    /// A pair with an empty side cannot produce a training signal.
    pub fn is_empty(&self) -> bool {
        self.src.trim().is_empty() || self.trg.trim().is_empty()
    }
}
