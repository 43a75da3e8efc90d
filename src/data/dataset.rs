use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One tokenised pair. Both sides are `[BOS] ... [EOS]`, unpadded;
/// padding happens per batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seq2SeqSample {
    pub src: Vec<u32>,
    pub trg: Vec<u32>,
}

impl Seq2SeqSample {
    /// Decoder input: the target without its last token.
    pub fn trg_input(&self) -> &[u32] {
        &self.trg[..self.trg.len().saturating_sub(1)]
    }

    /// Decoder labels: the target shifted left by one.
    pub fn trg_output(&self) -> &[u32] {
        self.trg.get(1..).unwrap_or(&[])
    }
}

pub struct Seq2SeqDataset {
    samples: Vec<Seq2SeqSample>,
}

impl Seq2SeqDataset {
    pub fn new(samples: Vec<Seq2SeqSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<Seq2SeqSample> for Seq2SeqDataset {
    fn get(&self, index: usize) -> Option<Seq2SeqSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_forcing_shift() {
        let s = Seq2SeqSample { src: vec![2, 9, 3], trg: vec![2, 7, 8, 3] };
        assert_eq!(s.trg_input(),  &[2, 7, 8]);
        assert_eq!(s.trg_output(), &[7, 8, 3]);
    }

    #[test]
    fn test_dataset_access() {
        let s  = Seq2SeqSample { src: vec![2, 3], trg: vec![2, 3] };
        let ds = Seq2SeqDataset::new(vec![s.clone()]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get(0), Some(s));
        assert_eq!(ds.get(1), None);
    }
}
