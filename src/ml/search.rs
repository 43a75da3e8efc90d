// ============================================================
// Layer 5 — Decoding Search
// ============================================================
// Greedy and beam search over any StepScorer. Both start from
// [BOS], stop at [EOS] or at max_len ids, and return the full id
// sequence (special tokens included; the tokenizer drops them
// when decoding to text).
//
// Beam hypotheses are ranked by log-probability divided by the
// number of generated tokens, so short outputs are not favoured.

use anyhow::Result;
use burn::{prelude::*, tensor::activation::log_softmax};

use crate::application::config::Config;
use crate::domain::{task::SearchMethod, traits::StepScorer};
use crate::ml::model::Seq2SeqModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    pub method:    SearchMethod,
    pub beam_size: usize,
    pub max_len:   usize,
    pub bos_id:    u32,
    pub eos_id:    u32,
}

impl SearchParams {
    pub fn from_config(config: &Config) -> Self {
        let s = &config.settings;
        Self {
            method:    config.search_method,
            beam_size: s.beam_size,
            max_len:   s.max_len,
            bos_id:    s.bos_id,
            eos_id:    s.eos_id,
        }
    }
}

pub fn search<S: StepScorer>(scorer: &S, params: &SearchParams) -> Result<Vec<u32>> {
    match params.method {
        SearchMethod::Greedy => greedy_search(scorer, params),
        SearchMethod::Beam   => beam_search(scorer, params),
    }
}

pub fn greedy_search<S: StepScorer>(scorer: &S, params: &SearchParams) -> Result<Vec<u32>> {
    let mut ids = vec![params.bos_id];
    while ids.len() < params.max_len {
        let scores = scorer.next_log_probs(&ids)?;
        let next = top_k(&scores, 1)
            .first()
            .map(|&(id, _)| id)
            .ok_or_else(|| anyhow::anyhow!("scorer returned an empty distribution"))?;
        ids.push(next);
        if next == params.eos_id {
            break;
        }
    }
    Ok(ids)
}

#[derive(Debug, Clone)]
struct Hypothesis {
    ids:   Vec<u32>,
    score: f32,
}

impl Hypothesis {
    fn normalized(&self) -> f32 {
        self.score / (self.ids.len().saturating_sub(1).max(1)) as f32
    }
}

pub fn beam_search<S: StepScorer>(scorer: &S, params: &SearchParams) -> Result<Vec<u32>> {
    let width = params.beam_size.max(1);
    let mut alive    = vec![Hypothesis { ids: vec![params.bos_id], score: 0.0 }];
    let mut finished: Vec<Hypothesis> = Vec::new();

    while !alive.is_empty() && finished.len() < width {
        let mut candidates = Vec::with_capacity(alive.len() * width);
        for hyp in &alive {
            let scores = scorer.next_log_probs(&hyp.ids)?;
            for (id, log_prob) in top_k(&scores, width) {
                let mut ids = hyp.ids.clone();
                ids.push(id);
                candidates.push(Hypothesis { ids, score: hyp.score + log_prob });
            }
        }
        if candidates.is_empty() {
            anyhow::bail!("scorer returned an empty distribution");
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(width);

        alive.clear();
        for hyp in candidates {
            let ended = hyp.ids.last() == Some(&params.eos_id) || hyp.ids.len() >= params.max_len;
            if ended { finished.push(hyp) } else { alive.push(hyp) }
        }
    }

    finished.extend(alive);
    finished
        .into_iter()
        .max_by(|a, b| a.normalized().total_cmp(&b.normalized()))
        .map(|hyp| hyp.ids)
        .ok_or_else(|| anyhow::anyhow!("beam search produced no hypothesis"))
}

/// The `k` best (id, score) pairs, best first; ties go to the lower id.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut ranked: Vec<(u32, f32)> = scores
        .iter()
        .enumerate()
        .map(|(id, &s)| (id as u32, s))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

// ─── Model adapter ────────────────────────────────────────────────────────────
/// Scores next tokens with the model for one source sentence.
/// The source is encoded once; every step re-runs the decoder on
/// the prefix.
pub struct ModelScorer<'a, B: Backend> {
    model:        &'a Seq2SeqModel<B>,
    memory:       Tensor<B, 3>,
    src_pad_mask: Tensor<B, 2, Bool>,
}

impl<'a, B: Backend> ModelScorer<'a, B> {
    /// src: [1, src_len]
    pub fn new(model: &'a Seq2SeqModel<B>, src: Tensor<B, 2, Int>, pad_id: u32) -> Self {
        let src_pad_mask = src.clone().equal_elem(pad_id as i64);
        let memory = model.encode(src, src_pad_mask.clone());
        Self { model, memory, src_pad_mask }
    }
}

impl<B: Backend> StepScorer for ModelScorer<'_, B> {
    fn next_log_probs(&self, prefix: &[u32]) -> Result<Vec<f32>> {
        let device = self.memory.device();
        let ids: Vec<i32> = prefix.iter().map(|&id| id as i32).collect();
        let trg = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &device)
            .reshape([1, prefix.len()]);

        let states = self.model.decode(trg, self.memory.clone(), self.src_pad_mask.clone(), None);
        let [_, len, hidden] = states.last.dims();
        let last = states.last.slice([0..1, len - 1..len, 0..hidden]).reshape([1, hidden]);

        log_softmax(self.model.project(last), 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read decoder scores: {e:?}"))
    }
}
