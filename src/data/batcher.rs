// ============================================================
// Layer 4 — Seq2Seq Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks a Vec<Seq2SeqSample>
// into tensors, padding every row to the longest sequence of
// the batch (not of the dataset) with pad_id.
//
//   src        [batch, src_len]      [BOS] x1 .. xn [EOS] [PAD]..
//   trg_input  [batch, trg_len - 1]  [BOS] y1 .. ym       [PAD]..
//   trg_output [batch, trg_len - 1]  y1 .. ym [EOS]       [PAD]..
//
// The padding masks are `true` wherever the id is a pad.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::Seq2SeqSample;

#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    pub src:          Tensor<B, 2, Int>,
    pub trg_input:    Tensor<B, 2, Int>,
    pub trg_output:   Tensor<B, 2, Int>,
    pub src_pad_mask: Tensor<B, 2, Bool>,
    pub trg_pad_mask: Tensor<B, 2, Bool>,
}

#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher<B: Backend> {
    device: B::Device,
    pad_id: u32,
}

impl<B: Backend> Seq2SeqBatcher<B> {
    pub fn new(device: B::Device, pad_id: u32) -> Self {
        Self { device, pad_id }
    }

    fn to_tensor(&self, flat: Vec<i32>, rows: usize, width: usize) -> Tensor<B, 2, Int> {
        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device).reshape([rows, width])
    }
}

/// Flatten rows into one row-major Vec, right-padding each to `width`.
pub fn pad_rows<'a>(rows: impl IntoIterator<Item = &'a [u32]>, width: usize, pad_id: u32) -> Vec<i32> {
    let mut flat = Vec::new();
    for row in rows {
        let kept = row.len().min(width);
        flat.extend(row[..kept].iter().map(|&id| id as i32));
        flat.extend(std::iter::repeat(pad_id as i32).take(width - kept));
    }
    flat
}

impl<B: Backend> Batcher<Seq2SeqSample, Seq2SeqBatch<B>> for Seq2SeqBatcher<B> {
    fn batch(&self, items: Vec<Seq2SeqSample>) -> Seq2SeqBatch<B> {
        let batch_size = items.len();
        // at least one column so reshape never sees a zero dimension
        let src_len = items.iter().map(|s| s.src.len()).max().unwrap_or(0).max(1);
        let trg_len = items.iter().map(|s| s.trg_input().len()).max().unwrap_or(0).max(1);

        let src        = pad_rows(items.iter().map(|s| s.src.as_slice()), src_len, self.pad_id);
        let trg_input  = pad_rows(items.iter().map(|s| s.trg_input()),   trg_len, self.pad_id);
        let trg_output = pad_rows(items.iter().map(|s| s.trg_output()),  trg_len, self.pad_id);

        let src        = self.to_tensor(src,        batch_size, src_len);
        let trg_input  = self.to_tensor(trg_input,  batch_size, trg_len);
        let trg_output = self.to_tensor(trg_output, batch_size, trg_len);

        let pad = self.pad_id as i64;
        Seq2SeqBatch {
            src_pad_mask: src.clone().equal_elem(pad),
            trg_pad_mask: trg_input.clone().equal_elem(pad),
            src,
            trg_input,
            trg_output,
        }
    }
}
