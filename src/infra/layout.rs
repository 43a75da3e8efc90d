// ============================================================
// Layer 6 — Workspace Layout
// ============================================================
// Every file the program reads or writes lives at a fixed place
// relative to the working directory:
//
//   config.yaml
//   data/<task>/tokenizer.json
//   data/<task>/{train,valid,test}.json
//   ckpt/<task>/aux_<d>0_model.pt
//   ckpt/<task>/aux_<d>0_metrics.csv
//
// Keeping the root explicit lets tests point the whole layout
// at a temporary directory.

use std::path::PathBuf;

use crate::domain::task::{AuxRatio, Split, Task};

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The process working directory.
    pub fn current() -> Self {
        Self::new(".")
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.yaml")
    }

    pub fn data_dir(&self, task: Task) -> PathBuf {
        self.root.join("data").join(task.as_str())
    }

    pub fn tokenizer_file(&self, task: Task) -> PathBuf {
        self.data_dir(task).join("tokenizer.json")
    }

    pub fn split_file(&self, task: Task, split: Split) -> PathBuf {
        self.data_dir(task).join(format!("{}.json", split.as_str()))
    }

    pub fn checkpoint_dir(&self, task: Task) -> PathBuf {
        self.root.join("ckpt").join(task.as_str())
    }

    pub fn checkpoint_file(&self, task: Task, ratio: AuxRatio) -> PathBuf {
        self.checkpoint_dir(task)
            .join(format!("aux_{}_model.pt", ratio.checkpoint_tag()))
    }

    pub fn metrics_file(&self, task: Task, ratio: AuxRatio) -> PathBuf {
        self.checkpoint_dir(task)
            .join(format!("aux_{}_metrics.csv", ratio.checkpoint_tag()))
    }
}
