// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From split files to tensor batches:
//
//   data/<task>/<split>.json
//       │
//       ▼
//   JsonSplitLoader   → raw TextPairs
//       │
//       ▼
//   Preprocessor      → clean, encode [BOS]..[EOS], truncate
//       │
//       ▼
//   Seq2SeqDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   Seq2SeqBatcher    → pads per batch, builds masks
//       │
//       ▼
//   DataLoader        → feeds batches to trainer / tester

/// Reads data/<task>/<split>.json
pub mod loader;

/// Cleans and encodes sentences
pub mod preprocessor;

/// Implements Burn's Dataset trait for tokenised pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

use std::sync::Arc;

use anyhow::Result;
use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::application::config::Config;
use crate::domain::{task::Split, traits::PairSource};
use crate::infra::layout::Workspace;
use batcher::{Seq2SeqBatch, Seq2SeqBatcher};
use dataset::Seq2SeqDataset;
use loader::JsonSplitLoader;
use preprocessor::Preprocessor;

pub type BatchLoader<B> = Arc<dyn DataLoader<Seq2SeqBatch<B>>>;

/// Tokenise a whole split and wrap it in a DataLoader.
/// `shuffle` carries the seed for splits that are shuffled.
pub fn load_dataloader<B: Backend>(
    config:    &Config,
    tokenizer: &Tokenizer,
    workspace: &Workspace,
    split:     Split,
    device:    &B::Device,
    shuffle:   Option<u64>,
) -> Result<BatchLoader<B>> {
    let pairs = JsonSplitLoader::new(workspace.clone(), config.task).load_split(split)?;

    let preprocessor = Preprocessor::new(config.settings.max_len, config.settings.eos_id);
    let samples = pairs
        .iter()
        .map(|pair| preprocessor.encode_pair(tokenizer, pair))
        .collect::<Result<Vec<_>>>()?;
    let dataset = Seq2SeqDataset::new(samples);

    tracing::info!("{} split: {} samples", split, dataset.sample_count());

    let batcher = Seq2SeqBatcher::<B>::new(device.clone(), config.settings.pad_id);
    let builder = DataLoaderBuilder::new(batcher)
        .batch_size(config.settings.batch_size)
        .num_workers(1);
    let builder = match shuffle {
        Some(seed) => builder.shuffle(seed),
        None       => builder,
    };

    Ok(builder.build(dataset))
}
