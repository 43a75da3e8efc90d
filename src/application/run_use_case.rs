// ============================================================
// Layer 2 — RunUseCase
// ============================================================
// Runs exactly one mode per process, in a fixed order:
//
//   Step 1: Checkpoint invariants   train → create ckpt/<task>/
//                                   else  → checkpoint must exist
//   Step 2: Seed                    backends + host RNG
//   Step 3: Config                  config.yaml + request
//   Step 4: Model + tokenizer       built on the selected device
//   Step 5: Session                 dataloaders for this mode only
//   Step 6: Trainer | Tester | Generator
//
// Arguments were validated by the CLI layer before we get here,
// so an invalid request never touches the filesystem.

use anyhow::{Context, Result};
use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use tokenizers::Tokenizer;

use crate::application::config::Config;
use crate::data::{load_dataloader, BatchLoader};
use crate::domain::task::{AuxRatio, AuxType, Mode, SearchMethod, Split, Task};
use crate::infra::{
    checkpoint::CheckpointManager,
    device::{accelerator_available, DeviceKind},
    layout::Workspace,
    seed::{set_seed, SeededRng, SEED},
    tokenizer_store::load_tokenizer,
};
use crate::ml::{generator::Generator, model::load_model, tester::Tester, trainer::Trainer};

/// Everything the command line decides. Already validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunRequest {
    pub task:      Task,
    pub mode:      Mode,
    pub aux_type:  AuxType,
    pub aux_ratio: AuxRatio,
    pub search:    SearchMethod,
}

pub struct RunUseCase {
    request:     RunRequest,
    workspace:   Workspace,
    accelerator: bool,
}

impl RunUseCase {
    pub fn new(request: RunRequest, workspace: Workspace) -> Self {
        Self { request, workspace, accelerator: accelerator_available() }
    }

    /// Override accelerator detection.
    #[cfg(test)]
    pub fn with_accelerator(mut self, available: bool) -> Self {
        self.accelerator = available;
        self
    }

    pub fn execute(&self) -> Result<()> {
        self.prepare_checkpoint()?;

        let seeded = set_seed(SEED);
        tracing::debug!("Seeded backends and host RNG with {}", seeded.seed());

        let config = Config::load(&self.workspace, &self.request, self.accelerator)?;
        config.print_attr();
        tracing::info!(
            "Running {} on {} ({} backend)",
            config.mode, config.task, config.device
        );

        match config.device {
            DeviceKind::Accelerator => run_on_accelerator(&config, &self.workspace, seeded),
            DeviceKind::Cpu => run_session::<Autodiff<NdArray>>(
                &config, &self.workspace, seeded, NdArrayDevice::Cpu,
            ),
        }
    }

    /// Train creates the checkpoint directory; every other mode
    /// needs the checkpoint file to be there already.
    fn prepare_checkpoint(&self) -> Result<()> {
        let RunRequest { task, aux_ratio, mode, .. } = self.request;
        match mode {
            Mode::Train => {
                let dir = self.workspace.checkpoint_dir(task);
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("Cannot create '{}'", dir.display()))
            }
            Mode::Test | Mode::Inference => {
                CheckpointManager::new(self.workspace.checkpoint_file(task, aux_ratio)).require()
            }
        }
    }
}

#[cfg(feature = "wgpu")]
fn run_on_accelerator(config: &Config, workspace: &Workspace, seeded: SeededRng) -> Result<()> {
    use burn::backend::{wgpu::WgpuDevice, Wgpu};
    run_session::<Autodiff<Wgpu>>(config, workspace, seeded, WgpuDevice::default())
}

#[cfg(not(feature = "wgpu"))]
fn run_on_accelerator(config: &Config, workspace: &Workspace, seeded: SeededRng) -> Result<()> {
    tracing::warn!("Built without the wgpu backend, running on the CPU");
    run_session::<Autodiff<NdArray>>(config, workspace, seeded, NdArrayDevice::Cpu)
}

// ─── Session ──────────────────────────────────────────────────────────────────
/// The data each mode needs, and nothing else. Training batches
/// carry gradients; validation and test batches run on the inner
/// (non-autodiff) backend.
pub enum Session<B: AutodiffBackend> {
    Train {
        train: BatchLoader<B>,
        valid: BatchLoader<B::InnerBackend>,
    },
    Test {
        test: BatchLoader<B::InnerBackend>,
    },
    Inference,
}

impl<B: AutodiffBackend> Session<B> {
    pub fn open(
        config:    &Config,
        tokenizer: &Tokenizer,
        workspace: &Workspace,
        seeded:    &mut SeededRng,
        device:    &B::Device,
    ) -> Result<Self> {
        let session = match config.mode {
            Mode::Train => Session::Train {
                train: load_dataloader::<B>(
                    config, tokenizer, workspace, Split::Train, device,
                    Some(seeded.next_seed()),
                )?,
                valid: load_dataloader::<B::InnerBackend>(
                    config, tokenizer, workspace, Split::Valid, device, None,
                )?,
            },
            Mode::Test => Session::Test {
                test: load_dataloader::<B::InnerBackend>(
                    config, tokenizer, workspace, Split::Test, device, None,
                )?,
            },
            Mode::Inference => Session::Inference,
        };
        Ok(session)
    }
}

fn run_session<B: AutodiffBackend>(
    config:     &Config,
    workspace:  &Workspace,
    mut seeded: SeededRng,
    device:     B::Device,
) -> Result<()> {
    let model     = load_model::<B>(config, &device)?;
    let tokenizer = load_tokenizer(config, workspace)?;

    match Session::<B>::open(config, &tokenizer, workspace, &mut seeded, &device)? {
        Session::Train { train, valid } => {
            let trainer = Trainer::new(config, model, train, valid, workspace)?;
            let report  = trainer.train()?;
            for epoch in &report.history {
                tracing::debug!(
                    "epoch {}: train {:.4} | valid {:.4} | aux {:.4}",
                    epoch.epoch, epoch.train_loss, epoch.valid_loss, epoch.aux_loss,
                );
            }
            println!(
                "Training finished after {} epoch(s), best valid loss {:.4} (ppl {:.2})",
                report.epochs_run, report.best_valid_loss, report.best_valid_ppl(),
            );
        }
        Session::Test { test } => {
            let tester = Tester::new(config, model.valid(), &tokenizer, test);
            let report = tester.test()?;
            println!(
                "Test loss {:.4} | ppl {:.2} | token accuracy {:.2}%",
                report.loss, report.perplexity(), report.token_accuracy * 100.0,
            );
        }
        Session::Inference => {
            let generator = Generator::new(config, model.valid(), &tokenizer);
            generator.inference()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::SetupError;

    fn request(mode: Mode) -> RunRequest {
        RunRequest {
            task:      Task::Translation,
            mode,
            aux_type:  AuxType::Cosine,
            aux_ratio: AuxRatio::new(0.3).unwrap(),
            search:    SearchMethod::Greedy,
        }
    }

    #[test]
    fn test_test_mode_without_checkpoint_aborts_first() {
        // No config.yaml either: the checkpoint check must fire before it is read
        let dir = tempfile::tempdir().unwrap();
        let err = RunUseCase::new(request(Mode::Test), Workspace::new(dir.path()))
            .execute()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::MissingCheckpoint(_))
        ));
    }

    #[test]
    fn test_inference_without_checkpoint_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunUseCase::new(request(Mode::Inference), Workspace::new(dir.path()))
            .execute()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::MissingCheckpoint(_))
        ));
    }

    #[test]
    fn test_train_creates_checkpoint_dir_before_config() {
        let _guard = crate::infra::seed::backend_lock();
        let dir = tempfile::tempdir().unwrap();
        let ws  = Workspace::new(dir.path());

        let err = RunUseCase::new(request(Mode::Train), ws.clone())
            .execute()
            .unwrap_err();

        assert!(ws.checkpoint_dir(Task::Translation).is_dir());
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::MissingConfig(_))
        ));
    }

    const TINY_CONFIG: &str = "\
setup:
  n_epochs: 2
  batch_size: 2
  lr: 0.001
  early_stop: false
  max_len: 16
  beam_size: 2
tokenizer:
  vocab_size: 12
model:
  hidden_dim: 8
  pff_dim: 16
  n_heads: 2
  n_layers: 2
  dropout: 0.0
";

    fn tiny_workspace(dir: &std::path::Path) -> Workspace {
        use crate::infra::tokenizer_store::fixtures::write_word_level;

        let ws = Workspace::new(dir);
        std::fs::write(ws.config_file(), TINY_CONFIG).unwrap();
        write_word_level(
            &ws.tokenizer_file(Task::Translation),
            &["hello", "world", "good", "morning", "bonjour", "monde"],
        );
        let pairs = r#"[
            {"src": "hello world", "trg": "bonjour monde"},
            {"src": "good morning", "trg": "bonjour"},
            {"src": "hello", "trg": "bonjour"}
        ]"#;
        for split in [Split::Train, Split::Valid, Split::Test] {
            std::fs::write(ws.split_file(Task::Translation, split), pairs).unwrap();
        }
        ws
    }

    #[test]
    fn test_small_vocab_size_is_setup_error() {
        let _guard = crate::infra::seed::backend_lock();
        let dir = tempfile::tempdir().unwrap();
        let ws  = tiny_workspace(dir.path());
        // the fixture tokenizer has 10 tokens
        std::fs::write(ws.config_file(), TINY_CONFIG.replace("vocab_size: 12", "vocab_size: 6")).unwrap();

        let err = RunUseCase::new(request(Mode::Train), ws)
            .with_accelerator(false)
            .execute()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_train_then_test_on_cpu() {
        let _guard = crate::infra::seed::backend_lock();
        let dir = tempfile::tempdir().unwrap();
        let ws  = tiny_workspace(dir.path());
        let ratio = AuxRatio::new(0.3).unwrap();

        RunUseCase::new(request(Mode::Train), ws.clone())
            .with_accelerator(false)
            .execute()
            .unwrap();

        assert!(ws.checkpoint_file(Task::Translation, ratio).is_file());
        let csv = std::fs::read_to_string(ws.metrics_file(Task::Translation, ratio)).unwrap();
        assert_eq!(csv.lines().count(), 3);

        RunUseCase::new(request(Mode::Test), ws)
            .with_accelerator(false)
            .execute()
            .unwrap();
    }
}
