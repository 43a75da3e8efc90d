// ============================================================
// Layer 5 — Tester
// ============================================================
// Evaluates a restored model on the test split:
//   - mean token cross-entropy (main objective only) and perplexity
//   - token accuracy under teacher forcing, pads excluded
//   - one decoded example with the configured search, printed
//     next to its reference

use anyhow::Result;
use burn::prelude::*;
use tokenizers::Tokenizer;

use crate::application::config::Config;
use crate::data::{batcher::Seq2SeqBatch, BatchLoader};
use crate::infra::metrics::perplexity;
use crate::ml::loss::token_cross_entropy;
use crate::ml::model::Seq2SeqModel;
use crate::ml::search::{search, ModelScorer, SearchParams};

#[derive(Debug, Clone, PartialEq)]
pub struct SamplePrediction {
    pub source:     String,
    pub reference:  String,
    pub hypothesis: String,
}

#[derive(Debug, Clone)]
pub struct TestReport {
    pub loss:           f64,
    pub token_accuracy: f64,
    pub batches:        usize,
    pub tokens:         usize,
    pub sample:         Option<SamplePrediction>,
}

impl TestReport {
    pub fn perplexity(&self) -> f64 {
        perplexity(self.loss)
    }
}

pub struct Tester<'a, B: Backend> {
    model:     Seq2SeqModel<B>,
    tokenizer: &'a Tokenizer,
    loader:    BatchLoader<B>,
    params:    SearchParams,
    pad_id:    u32,
}

impl<'a, B: Backend> Tester<'a, B> {
    pub fn new(
        config:    &Config,
        model:     Seq2SeqModel<B>,
        tokenizer: &'a Tokenizer,
        loader:    BatchLoader<B>,
    ) -> Self {
        Self {
            model,
            tokenizer,
            loader,
            params: SearchParams::from_config(config),
            pad_id: config.settings.pad_id,
        }
    }

    pub fn test(&self) -> Result<TestReport> {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut correct  = 0usize;
        let mut tokens   = 0usize;
        let mut sample   = None;

        for batch in self.loader.iter() {
            let output = self.model.forward(&batch);

            let (c, t) = token_accuracy(output.logits.clone(), batch.trg_output.clone(), self.pad_id);
            correct += c;
            tokens  += t;

            let loss: f64 = token_cross_entropy(output.logits, batch.trg_output.clone(), self.pad_id)
                .into_scalar()
                .elem::<f64>();
            loss_sum += loss;
            batches  += 1;

            if sample.is_none() {
                sample = Some(self.predict_first(&batch)?);
            }
        }

        let report = TestReport {
            loss:           if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
            token_accuracy: if tokens  > 0 { correct as f64 / tokens as f64 } else { 0.0 },
            batches,
            tokens,
            sample,
        };

        if let Some(s) = &report.sample {
            println!("* source:     {}", s.source);
            println!("* reference:  {}", s.reference);
            println!("* hypothesis: {}", s.hypothesis);
        }
        tracing::info!("Tested {} batches, {} target tokens", report.batches, report.tokens);
        Ok(report)
    }

    /// Decode the first row of a batch and render the three texts.
    fn predict_first(&self, batch: &Seq2SeqBatch<B>) -> Result<SamplePrediction> {
        let src_ids = int_row(batch.src.clone(), 0, self.pad_id)?;
        let ref_ids = int_row(batch.trg_output.clone(), 0, self.pad_id)?;

        let src_len = src_ids.len().max(1);
        let src = batch.src.clone().slice([0..1, 0..src_len]);
        let hyp_ids = search(&ModelScorer::new(&self.model, src, self.pad_id), &self.params)?;

        let decode = |ids: &[u32]| {
            self.tokenizer
                .decode(ids, true)
                .map_err(|e| anyhow::anyhow!("Decode: {e}"))
        };
        Ok(SamplePrediction {
            source:     decode(&src_ids)?,
            reference:  decode(&ref_ids)?,
            hypothesis: decode(&hyp_ids)?,
        })
    }
}

/// (correct, counted) predictions over non-pad target positions.
pub fn token_accuracy<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
    pad_id:  u32,
) -> (usize, usize) {
    let [batch_size, seq_len, _] = logits.dims();
    let preds = logits.argmax(2).reshape([batch_size, seq_len]);
    let keep  = targets.clone().equal_elem(pad_id as i64).bool_not().int();

    let correct: i64 = (preds.equal(targets).int() * keep.clone())
        .sum()
        .into_scalar()
        .elem::<i64>();
    let counted: i64 = keep.sum().into_scalar().elem::<i64>();
    (correct.max(0) as usize, counted.max(0) as usize)
}

/// One row of an id tensor, with right padding stripped.
fn int_row<B: Backend>(ids: Tensor<B, 2, Int>, row: usize, pad_id: u32) -> Result<Vec<u32>> {
    let [_, width] = ids.dims();
    let values: Vec<i64> = ids
        .slice([row..row + 1, 0..width])
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow::anyhow!("Cannot read ids: {e:?}"))?;

    let mut out: Vec<u32> = values.into_iter().map(|v| v as u32).collect();
    while out.last() == Some(&pad_id) {
        out.pop();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_token_accuracy_skips_pads() {
        let device = Default::default();
        // argmax per position: 1, 2, 1
        let logits = Tensor::<TestBackend, 3>::from_floats(
            [[[0.0, 5.0, 0.0], [0.0, 0.0, 5.0], [0.0, 5.0, 0.0]]], &device,
        );
        // last position is a pad (0) and must not count
        let targets = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 0]], &device);
        assert_eq!(token_accuracy(logits, targets, 0), (1, 2));
    }

    #[test]
    fn test_int_row_strips_padding() {
        let device = Default::default();
        let ids = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3, 0], [2, 6, 7, 3]], &device);
        assert_eq!(int_row(ids.clone(), 0, 0).unwrap(), vec![2, 5, 3]);
        assert_eq!(int_row(ids, 1, 0).unwrap(), vec![2, 6, 7, 3]);
    }
}
