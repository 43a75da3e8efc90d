// ============================================================
// Layer 5 — Generator
// ============================================================
// Interactive inference: read a sentence from stdin, encode it,
// decode with the configured search, print the result. An empty
// line is ignored; `quit` or end of input stops the loop.

use anyhow::Result;
use burn::prelude::*;
use std::io::{self, BufRead, Write};
use tokenizers::Tokenizer;

use crate::application::config::Config;
use crate::data::preprocessor::Preprocessor;
use crate::domain::traits::Generate;
use crate::ml::model::Seq2SeqModel;
use crate::ml::search::{search, ModelScorer, SearchParams};

pub struct Generator<'a, B: Backend> {
    model:        Seq2SeqModel<B>,
    tokenizer:    &'a Tokenizer,
    preprocessor: Preprocessor,
    params:       SearchParams,
    pad_id:       u32,
    device:       B::Device,
}

impl<'a, B: Backend> Generator<'a, B> {
    pub fn new(config: &Config, model: Seq2SeqModel<B>, tokenizer: &'a Tokenizer) -> Self {
        let device = model.devices().into_iter().next().unwrap_or_default();
        Self {
            model,
            tokenizer,
            preprocessor: Preprocessor::new(config.settings.max_len, config.settings.eos_id),
            params:       SearchParams::from_config(config),
            pad_id:       config.settings.pad_id,
            device,
        }
    }

    /// Source ids (already wrapped in BOS/EOS) → generated ids.
    pub fn generate_ids(&self, src_ids: &[u32]) -> Result<Vec<u32>> {
        let ids: Vec<i32> = src_ids.iter().map(|&id| id as i32).collect();
        let src = Tensor::<B, 1, Int>::from_ints(ids.as_slice(), &self.device)
            .reshape([1, src_ids.len()]);
        let scorer = ModelScorer::new(&self.model, src, self.pad_id);
        search(&scorer, &self.params)
    }

    /// Read sentences from stdin until `quit` or end of input.
    pub fn inference(&self) -> Result<()> {
        tracing::info!("Inference with {} search", self.params.method);
        let stdin  = io::stdin();
        let stdout = io::stdout();
        let answered = run_interactive(self, stdin.lock(), stdout.lock())?;
        tracing::info!("Inference finished after {} sentence(s)", answered);
        Ok(())
    }
}

impl<B: Backend> Generate for Generator<'_, B> {
    fn generate(&self, input: &str) -> Result<String> {
        let src_ids = self.preprocessor.encode(self.tokenizer, input)?;
        let out_ids = self.generate_ids(&src_ids)?;
        self.tokenizer
            .decode(&out_ids, true)
            .map_err(|e| anyhow::anyhow!("Decode: {e}"))
    }
}

/// Prompt/answer loop over any reader and writer. Returns how many
/// sentences were answered.
pub fn run_interactive<G, R, W>(generator: &G, mut input: R, mut out: W) -> Result<usize>
where
    G: Generate,
    R: BufRead,
    W: Write,
{
    writeln!(out, "Type a sentence and press enter ('quit' to exit).")?;
    let mut answered = 0;
    let mut line = String::new();

    loop {
        write!(out, "\n>> ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = generator.generate(text)?;
        writeln!(out, "{reply}")?;
        answered += 1;
    }

    Ok(answered)
}
