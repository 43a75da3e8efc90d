// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation per epoch with Burn's DataLoader and Adam.
//
//   - Training batches live on the autodiff backend B
//   - model.valid() drops to B::InnerBackend, so validation
//     batches are built there and dropout is off
//   - The training objective mixes in the auxiliary term;
//     validation reports the main cross-entropy only
//   - The checkpoint is overwritten whenever validation improves

use anyhow::Result;
use std::time::Instant;
use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::config::Config;
use crate::data::BatchLoader;
use crate::domain::task::{AuxRatio, AuxType};
use crate::infra::{
    checkpoint::CheckpointManager,
    layout::Workspace,
    metrics::{perplexity, EarlyStopping, EpochMetrics, MetricsLogger, Verdict},
};
use crate::ml::loss::{token_cross_entropy, training_loss};
use crate::ml::model::Seq2SeqModel;

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs_run:      usize,
    pub best_valid_loss: f64,
    pub history:         Vec<EpochMetrics>,
}

impl TrainReport {
    pub fn best_valid_ppl(&self) -> f64 {
        perplexity(self.best_valid_loss)
    }
}

pub struct Trainer<B: AutodiffBackend> {
    model:      Seq2SeqModel<B>,
    train:      BatchLoader<B>,
    valid:      BatchLoader<B::InnerBackend>,
    n_epochs:   usize,
    lr:         f64,
    clip:       f64,
    pad_id:     u32,
    aux_type:   AuxType,
    aux_ratio:  AuxRatio,
    stopper:    EarlyStopping,
    logger:     MetricsLogger,
    checkpoint: CheckpointManager,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(
        config:    &Config,
        model:     Seq2SeqModel<B>,
        train:     BatchLoader<B>,
        valid:     BatchLoader<B::InnerBackend>,
        workspace: &Workspace,
    ) -> Result<Self> {
        let s = &config.settings;
        Ok(Self {
            model,
            train,
            valid,
            n_epochs:   s.n_epochs,
            lr:         s.lr,
            clip:       s.clip,
            pad_id:     s.pad_id,
            aux_type:   config.aux_type,
            aux_ratio:  config.aux_ratio,
            stopper:    EarlyStopping::new(s.early_stop, s.patience),
            logger:     MetricsLogger::new(workspace.metrics_file(config.task, config.aux_ratio))?,
            checkpoint: CheckpointManager::new(config.ckpt()),
        })
    }

    pub fn train(self) -> Result<TrainReport> {
        let Self {
            mut model, train, valid, n_epochs, lr, clip, pad_id,
            aux_type, aux_ratio, mut stopper, logger, checkpoint,
        } = self;

        // ── Adam optimiser ────────────────────────────────────────────────────
        // m = β1*m + (1-β1)*g        (mean)
        // v = β2*v + (1-β2)*g²       (variance)
        // θ = θ - lr * m / (√v + ε)  (update)
        let clipping  = (clip > 0.0).then(|| GradientClippingConfig::Norm(clip as f32));
        let optim_cfg = AdamConfig::new().with_epsilon(1e-8).with_grad_clipping(clipping);
        let mut optim = optim_cfg.init();

        let mut history = Vec::with_capacity(n_epochs);

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in 1..=n_epochs {
            let started = Instant::now();

            // ── Training phase ────────────────────────────────────────────────
            let mut train_loss_sum = 0.0f64;
            let mut aux_loss_sum   = 0.0f64;
            let mut train_batches  = 0usize;

            for batch in train.iter() {
                let parts = training_loss(&model, &batch, aux_type, aux_ratio, pad_id);

                train_loss_sum += parts.main.into_scalar().elem::<f64>();
                aux_loss_sum   += parts.aux.into_scalar().elem::<f64>();
                train_batches  += 1;

                // Backward pass + Adam update
                let grads = parts.total.backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(lr, model, grads);
            }

            // ── Validation phase ──────────────────────────────────────────────
            let model_valid = model.valid();

            let mut valid_loss_sum = 0.0f64;
            let mut valid_batches  = 0usize;

            for batch in valid.iter() {
                let output = model_valid.forward(&batch);
                let loss: f64 = token_cross_entropy(output.logits, batch.trg_output, pad_id)
                    .into_scalar()
                    .elem::<f64>();
                valid_loss_sum += loss;
                valid_batches  += 1;
            }

            let metrics = EpochMetrics {
                epoch,
                train_loss:   mean(train_loss_sum, train_batches),
                valid_loss:   mean(valid_loss_sum, valid_batches),
                aux_loss:     mean(aux_loss_sum, train_batches),
                elapsed_secs: started.elapsed().as_secs_f64(),
            };

            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | train_ppl={:.2} | valid_loss={:.4} | valid_ppl={:.2} | {:.1}s",
                epoch, n_epochs,
                metrics.train_loss, metrics.train_ppl(),
                metrics.valid_loss, metrics.valid_ppl(),
                metrics.elapsed_secs,
            );
            logger.log(&metrics)?;

            let verdict = stopper.update(&metrics);
            history.push(metrics);

            match verdict {
                Verdict::Improved => {
                    checkpoint.save_model(&model)?;
                    tracing::info!("Validation improved, saved '{}'", checkpoint.path().display());
                }
                Verdict::Stalled => {}
                Verdict::Stop => {
                    tracing::info!("Early stopping after epoch {}", epoch);
                    break;
                }
            }
        }

        tracing::info!("Training complete, metrics in '{}'", logger.csv_path().display());
        Ok(TrainReport {
            epochs_run:      history.len(),
            best_valid_loss: stopper.best(),
            history,
        })
    }
}

/// NaN when nothing was averaged, so an empty split never counts as
/// an improvement.
fn mean(sum: f64, count: usize) -> f64 {
    if count > 0 { sum / count as f64 } else { f64::NAN }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_nothing_is_nan() {
        assert!(mean(3.0, 0).is_nan());
        assert_eq!(mean(3.0, 2), 1.5);
    }

    #[test]
    fn test_report_perplexity() {
        let report = TrainReport { epochs_run: 1, best_valid_loss: 0.0, history: vec![] };
        assert!((report.best_valid_ppl() - 1.0).abs() < 1e-12);
    }
}
