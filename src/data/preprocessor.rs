// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Turns one raw sentence into the id sequence the model sees.
//
// Steps (applied in order):
//   1. Replace Unicode whitespace variants with plain space
//   2. Drop invisible control characters
//   3. Collapse whitespace runs into a single space and trim
//   4. Encode with the templated tokenizer → [BOS] ... [EOS]
//   5. Truncate to max_len, keeping the closing [EOS]

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::data::dataset::Seq2SeqSample;
use crate::domain::pair::TextPair;

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    max_len: usize,
    eos_id:  u32,
}

impl Preprocessor {
    pub fn new(max_len: usize, eos_id: u32) -> Self {
        Self { max_len, eos_id }
    }

    /// Normalise a sentence to single-spaced, control-free text.
    pub fn clean(&self, text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '\u{00A0}' | '\u{2009}' | '\u{202F}' | '\t' | '\r' | '\n' => ' ',
                _ => c,
            })
            .filter(|c| !c.is_control() && *c != '\u{200B}' && *c != '\u{FEFF}')
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Clean, encode with special tokens, and bound the length.
    pub fn encode(&self, tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
        let enc = tokenizer
            .encode(self.clean(text), true)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(self.truncate(enc.get_ids().to_vec()))
    }

    pub fn encode_pair(&self, tokenizer: &Tokenizer, pair: &TextPair) -> Result<Seq2SeqSample> {
        Ok(Seq2SeqSample {
            src: self.encode(tokenizer, &pair.src)?,
            trg: self.encode(tokenizer, &pair.trg)?,
        })
    }

    /// Cut to `max_len` ids; a cut sequence still ends in EOS.
    pub fn truncate(&self, mut ids: Vec<u32>) -> Vec<u32> {
        if ids.len() > self.max_len {
            ids.truncate(self.max_len.saturating_sub(1));
            ids.push(self.eos_id);
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::tokenizer_store::{fixtures, TokenizerStore};

    #[test]
    fn test_collapses_whitespace() {
        let p = Preprocessor::new(16, 3);
        assert_eq!(p.clean("  hello \t\n  world  "), "hello world");
    }

    #[test]
    fn test_removes_control_chars() {
        let p = Preprocessor::new(16, 3);
        assert_eq!(p.clean("hello\u{0001}\u{200B}world"), "helloworld");
        assert_eq!(p.clean("hello\u{00A0}world"), "hello world");
    }

    #[test]
    fn test_truncate_keeps_eos() {
        let p = Preprocessor::new(4, 3);
        assert_eq!(p.truncate(vec![2, 10, 11, 12, 13, 3]), vec![2, 10, 11, 3]);
        assert_eq!(p.truncate(vec![2, 10, 3]), vec![2, 10, 3]);
    }

    #[test]
    fn test_encode_pair_wraps_both_sides() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokenizer.json");
        fixtures::write_word_level(&path, &["guten", "tag", "good", "day"]);
        let tokenizer = TokenizerStore::new(&path)
            .load_with_template(&fixtures::boundary())
            .unwrap();

        let p = Preprocessor::new(16, 3);
        let sample = p
            .encode_pair(&tokenizer, &TextPair::new("guten  tag", "good day"))
            .unwrap();
        assert_eq!(sample.src, vec![2, 4, 5, 3]);
        assert_eq!(sample.trg, vec![2, 6, 7, 3]);
    }
}
