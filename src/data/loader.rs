// ============================================================
// Layer 4 — Split Loader
// ============================================================
// Reads the raw text pairs of one split from
// data/<task>/<split>.json:
//
//   [
//     { "src": "Guten Morgen.", "trg": "Good morning." },
//     ...
//   ]
//
// Pairs with an empty side are skipped.

use anyhow::{Context, Result};
use std::fs;

use crate::domain::{
    error::SetupError,
    pair::TextPair,
    task::{Split, Task},
    traits::PairSource,
};
use crate::infra::layout::Workspace;

pub struct JsonSplitLoader {
    workspace: Workspace,
    task:      Task,
}

impl JsonSplitLoader {
    pub fn new(workspace: Workspace, task: Task) -> Self {
        Self { workspace, task }
    }
}

impl PairSource for JsonSplitLoader {
    fn load_split(&self, split: Split) -> Result<Vec<TextPair>> {
        let path = self.workspace.split_file(self.task, split);
        if !path.exists() {
            return Err(SetupError::MissingSplit(path).into());
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let pairs: Vec<TextPair> = serde_json::from_str(&text)
            .with_context(|| format!("'{}' is not a JSON list of {{src, trg}} pairs", path.display()))?;

        let total = pairs.len();
        let pairs: Vec<TextPair> = pairs.into_iter().filter(|p| !p.is_empty()).collect();
        if pairs.len() < total {
            tracing::debug!("Skipped {} empty pair(s) in '{}'", total - pairs.len(), path.display());
        }

        tracing::info!("Loaded {} {} pairs", pairs.len(), split);
        Ok(pairs)
    }
}
