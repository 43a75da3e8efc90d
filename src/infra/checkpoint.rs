// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights at the run's checkpoint path,
// `ckpt/<task>/aux_<d>0_model.pt`.
//
// Burn's file recorders rewrite the extension they are given,
// so weights are serialised to bytes with BinBytesRecorder and
// written to the exact path ourselves. Loading fails if the
// architecture in the config does not match the saved record.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};

use crate::domain::error::SetupError;
use crate::ml::model::Seq2SeqModel;

type WeightsRecorder = BinBytesRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Fails with `SetupError::MissingCheckpoint` unless the file exists.
    pub fn require(&self) -> Result<()> {
        if self.exists() {
            Ok(())
        } else {
            Err(SetupError::MissingCheckpoint(self.path.clone()).into())
        }
    }

    /// Overwrite the checkpoint with the current weights.
    pub fn save_model<B: Backend>(&self, model: &Seq2SeqModel<B>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        }

        let bytes = Recorder::<B>::record(&WeightsRecorder::default(), model.clone().into_record(), ())
            .with_context(|| "Failed to serialise model weights")?;

        fs::write(&self.path, bytes)
            .with_context(|| format!("Failed to save checkpoint to '{}'", self.path.display()))?;

        tracing::debug!("Saved checkpoint '{}'", self.path.display());
        Ok(())
    }

    /// Restore weights into a freshly initialised model of the same shape.
    pub fn load_model<B: Backend>(
        &self,
        model:  Seq2SeqModel<B>,
        device: &B::Device,
    ) -> Result<Seq2SeqModel<B>> {
        self.require()?;

        let bytes = fs::read(&self.path)
            .with_context(|| format!("Cannot read checkpoint '{}'", self.path.display()))?;

        let record = Recorder::<B>::load(&WeightsRecorder::default(), bytes, device)
            .with_context(|| format!(
                "Checkpoint '{}' does not match the configured model",
                self.path.display()
            ))?;

        tracing::info!("Restored weights from '{}'", self.path.display());
        Ok(model.load_record(record))
    }
}
