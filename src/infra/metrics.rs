// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records one CSV row per training epoch next to the checkpoint:
//
//   epoch,train_loss,valid_loss,train_ppl,valid_ppl,aux_loss,elapsed_secs
//   1,6.912300,6.540100,1004.512000,692.301000,0.412000,31.200000
//
// Perplexity is exp(loss); it is capped so a diverging run
// still writes a finite number.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const MAX_LOG_LOSS: f64 = 100.0;

pub fn perplexity(loss: f64) -> f64 {
    loss.min(MAX_LOG_LOSS).exp()
}

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:        usize,
    pub train_loss:   f64,
    pub valid_loss:   f64,
    /// Mean auxiliary term over the epoch, before ratio weighting
    pub aux_loss:     f64,
    pub elapsed_secs: f64,
}

impl EpochMetrics {
    pub fn train_ppl(&self) -> f64 {
        perplexity(self.train_loss)
    }

    pub fn valid_ppl(&self) -> f64 {
        perplexity(self.valid_loss)
    }

    pub fn is_improvement(&self, best_valid_loss: f64) -> bool {
        self.valid_loss < best_valid_loss
    }

    pub fn csv_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6}",
            self.epoch,
            self.train_loss,
            self.valid_loss,
            self.train_ppl(),
            self.valid_ppl(),
            self.aux_loss,
            self.elapsed_secs,
        )
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet;
    /// later runs append below earlier ones.
    pub fn new(csv_path: impl Into<PathBuf>) -> Result<Self> {
        let csv_path = csv_path.into();
        if let Some(dir) = csv_path.parent() {
            fs::create_dir_all(dir)?;
        }

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,valid_loss,train_ppl,valid_ppl,aux_loss,elapsed_secs")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;
        writeln!(f, "{}", m.csv_row())?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Early stopping ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// New best validation loss — save the model
    Improved,
    /// No improvement, patience not yet exhausted
    Stalled,
    /// Patience exhausted — stop training
    Stop,
}

/// Tracks the best validation loss and how long it has not moved.
#[derive(Debug, Clone)]
pub struct EarlyStopping {
    enabled:    bool,
    patience:   usize,
    best:       f64,
    bad_epochs: usize,
}

impl EarlyStopping {
    pub fn new(enabled: bool, patience: usize) -> Self {
        Self { enabled, patience, best: f64::INFINITY, bad_epochs: 0 }
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    pub fn update(&mut self, m: &EpochMetrics) -> Verdict {
        if m.is_improvement(self.best) {
            self.best = m.valid_loss;
            self.bad_epochs = 0;
            return Verdict::Improved;
        }

        self.bad_epochs += 1;
        if self.enabled && self.bad_epochs >= self.patience {
            Verdict::Stop
        } else {
            Verdict::Stalled
        }
    }
}
