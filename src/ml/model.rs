use anyhow::Result;
use burn::{
    nn::{
        attention::generate_autoregressive_mask,
        transformer::{
            TransformerDecoder, TransformerDecoderConfig, TransformerDecoderInput,
            TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
        },
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::application::config::{Config as RunConfig, Settings};
use crate::data::batcher::Seq2SeqBatch;
use crate::infra::checkpoint::CheckpointManager;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub vocab_size: usize,
    pub max_len:    usize,
    pub hidden_dim: usize,
    pub pff_dim:    usize,
    pub n_heads:    usize,
    pub n_layers:   usize,
    pub pad_id:     usize,
    #[config(default = 0.1)]
    pub dropout:    f64,
}

impl Seq2SeqConfig {
    pub fn from_settings(s: &Settings) -> Self {
        Self::new(
            s.vocab_size, s.max_len, s.hidden_dim,
            s.pff_dim, s.n_heads, s.n_layers, s.pad_id as usize,
        )
        .with_dropout(s.dropout)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Seq2SeqModel<B> {
        let src_embedding      = EmbeddingConfig::new(self.vocab_size, self.hidden_dim).init(device);
        let trg_embedding      = EmbeddingConfig::new(self.vocab_size, self.hidden_dim).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_len, self.hidden_dim).init(device);
        let encoder = TransformerEncoderConfig::new(
            self.hidden_dim, self.pff_dim, self.n_heads, self.n_layers,
        )
        .with_dropout(self.dropout)
        .init(device);
        // One single-layer decoder per level, so every level's output is visible
        let decoder_layers: Vec<TransformerDecoder<B>> = (0..self.n_layers)
            .map(|_| {
                TransformerDecoderConfig::new(self.hidden_dim, self.pff_dim, self.n_heads, 1)
                    .with_dropout(self.dropout)
                    .init(device)
            })
            .collect();
        let generator = LinearConfig::new(self.hidden_dim, self.vocab_size).init(device);
        let dropout   = DropoutConfig::new(self.dropout).init();
        Seq2SeqModel {
            src_embedding, trg_embedding, position_embedding,
            encoder, decoder_layers, generator, dropout,
        }
    }
}

#[derive(Module, Debug)]
pub struct Seq2SeqModel<B: Backend> {
    pub src_embedding:      Embedding<B>,
    pub trg_embedding:      Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub encoder:            TransformerEncoder<B>,
    pub decoder_layers:     Vec<TransformerDecoder<B>>,
    pub generator:          Linear<B>,
    pub dropout:            Dropout,
}

/// Hidden states of the first and the last decoder level, [batch, trg_len, hidden].
/// With a single level both are the same tensor.
pub struct DecoderStates<B: Backend> {
    pub first: Tensor<B, 3>,
    pub last:  Tensor<B, 3>,
}

pub struct Seq2SeqOutput<B: Backend> {
    /// [batch, trg_len, vocab]
    pub logits: Tensor<B, 3>,
    pub states: DecoderStates<B>,
}

impl<B: Backend> Seq2SeqModel<B> {
    fn embed(&self, embedding: &Embedding<B>, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &ids.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let x = embedding.forward(ids) + self.position_embedding.forward(positions);
        self.dropout.forward(x)
    }

    /// src: [batch, src_len] → memory: [batch, src_len, hidden]
    pub fn encode(&self, src: Tensor<B, 2, Int>, src_pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let x = self.embed(&self.src_embedding, src);
        self.encoder.forward(TransformerEncoderInput::new(x).mask_pad(src_pad_mask))
    }

    pub fn decode(
        &self,
        trg_input:    Tensor<B, 2, Int>,
        memory:       Tensor<B, 3>,
        src_pad_mask: Tensor<B, 2, Bool>,
        trg_pad_mask: Option<Tensor<B, 2, Bool>>,
    ) -> DecoderStates<B> {
        let [batch_size, trg_len] = trg_input.dims();
        let causal = generate_autoregressive_mask::<B>(batch_size, trg_len, &trg_input.device());

        let mut x = self.embed(&self.trg_embedding, trg_input);
        let mut first = None;
        for layer in &self.decoder_layers {
            let mut input = TransformerDecoderInput::new(x, memory.clone())
                .target_mask_attn(causal.clone())
                .memory_mask_pad(src_pad_mask.clone());
            if let Some(mask) = &trg_pad_mask {
                input = input.target_mask_pad(mask.clone());
            }
            x = layer.forward(input);
            if first.is_none() {
                first = Some(x.clone());
            }
        }

        DecoderStates { first: first.unwrap_or_else(|| x.clone()), last: x }
    }

    /// Hidden states → vocabulary logits. Shared by every decoder level.
    pub fn project<const D: usize>(&self, hidden: Tensor<B, D>) -> Tensor<B, D> {
        self.generator.forward(hidden)
    }

    /// Teacher-forced pass over a whole batch.
    pub fn forward(&self, batch: &Seq2SeqBatch<B>) -> Seq2SeqOutput<B> {
        let memory = self.encode(batch.src.clone(), batch.src_pad_mask.clone());
        let states = self.decode(
            batch.trg_input.clone(),
            memory,
            batch.src_pad_mask.clone(),
            Some(batch.trg_pad_mask.clone()),
        );
        Seq2SeqOutput { logits: self.project(states.last.clone()), states }
    }
}

/// Build the model described by the config. Every mode except
/// `train` restores the weights from the run's checkpoint.
pub fn load_model<B: Backend>(config: &RunConfig, device: &B::Device) -> Result<Seq2SeqModel<B>> {
    let model: Seq2SeqModel<B> = Seq2SeqConfig::from_settings(&config.settings).init(device);
    tracing::info!(
        "Model ready: {} layers, hidden_dim={}, {} parameters",
        config.settings.n_layers,
        config.settings.hidden_dim,
        model.num_params(),
    );

    if config.mode.needs_checkpoint() {
        CheckpointManager::new(config.ckpt()).load_model(model, device)
    } else {
        Ok(model)
    }
}
