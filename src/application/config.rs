// ============================================================
// Layer 2 — Run Configuration
// ============================================================
// One immutable Config per process, assembled in three steps:
//
//   1. config.yaml is a mapping of groups (setup, tokenizer,
//      model, ...). Every key of every group is lifted to the top
//      level, in file order; a later group silently overwrites an
//      earlier key of the same name.
//   2. The flattened keys are deserialised into `Settings`, whose
//      defaults fill whatever the file leaves out. Keys Settings
//      does not know are kept verbatim in `extras`.
//   3. The command-line fields are laid on top unconditionally,
//      then the checkpoint path and the device are derived.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

use crate::application::run_use_case::RunRequest;
use crate::domain::error::SetupError;
use crate::domain::task::{AuxRatio, AuxType, Mode, SearchMethod, Task};
use crate::infra::device::{select_device, DeviceKind};
use crate::infra::layout::Workspace;

/// Keys owned by the command line. A file entry with one of these
/// names is dropped in favour of the CLI value.
const CLI_KEYS: [&str; 5] = ["task", "mode", "aux_type", "aux_ratio", "search_method"];

// ─── Settings ─────────────────────────────────────────────────────────────────
/// Every file-sourced hyperparameter the program understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // setup
    pub n_epochs:   usize,
    pub batch_size: usize,
    pub lr:         f64,
    pub clip:       f64,
    pub early_stop: bool,
    pub patience:   usize,
    pub max_len:    usize,
    pub beam_size:  usize,

    // tokenizer
    pub vocab_size: usize,
    pub pad_id:     u32,
    pub unk_id:     u32,
    pub bos_id:     u32,
    pub eos_id:     u32,
    pub pad_token:  String,
    pub unk_token:  String,
    pub bos_token:  String,
    pub eos_token:  String,

    // model
    pub hidden_dim: usize,
    pub pff_dim:    usize,
    pub n_heads:    usize,
    pub n_layers:   usize,
    pub dropout:    f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            n_epochs:   10,
            batch_size: 32,
            lr:         5e-4,
            clip:       1.0,
            early_stop: true,
            patience:   3,
            max_len:    128,
            beam_size:  4,

            vocab_size: 15000,
            pad_id:     0,
            unk_id:     1,
            bos_id:     2,
            eos_id:     3,
            pad_token:  "[PAD]".to_string(),
            unk_token:  "[UNK]".to_string(),
            bos_token:  "[BOS]".to_string(),
            eos_token:  "[EOS]".to_string(),

            hidden_dim: 256,
            pff_dim:    512,
            n_heads:    8,
            n_layers:   3,
            dropout:    0.1,
        }
    }
}

impl Settings {
    /// Reject combinations the model or the data pipeline cannot run with.
    pub fn validate(&self) -> Result<(), SetupError> {
        let fail = |msg: String| Err(SetupError::InvalidConfig(msg));

        if self.batch_size == 0 {
            return fail("batch_size must be at least 1".into());
        }
        if self.max_len < 2 {
            return fail(format!("max_len must fit BOS and EOS, got {}", self.max_len));
        }
        if self.n_layers == 0 {
            return fail("n_layers must be at least 1".into());
        }
        if self.n_heads == 0 || self.hidden_dim % self.n_heads != 0 {
            return fail(format!(
                "hidden_dim ({}) must be divisible by n_heads ({})",
                self.hidden_dim, self.n_heads
            ));
        }
        if self.beam_size == 0 {
            return fail("beam_size must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return fail(format!("dropout must be in [0, 1), got {}", self.dropout));
        }
        let max_special = self.pad_id.max(self.unk_id).max(self.bos_id).max(self.eos_id);
        if max_special as usize >= self.vocab_size {
            return fail(format!(
                "special token id {} is outside vocab_size {}",
                max_special, self.vocab_size
            ));
        }
        Ok(())
    }
}

// ─── Config ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    /// File keys not covered by `Settings`, in file order.
    pub extras: Vec<(String, Value)>,

    pub task:          Task,
    pub mode:          Mode,
    pub aux_type:      AuxType,
    pub aux_ratio:     AuxRatio,
    pub search_method: SearchMethod,

    pub ckpt:   PathBuf,
    pub device: DeviceKind,
}

impl Config {
    /// Read `config.yaml` from the workspace and merge the request into it.
    pub fn load(
        workspace:             &Workspace,
        request:               &RunRequest,
        accelerator_available: bool,
    ) -> Result<Self> {
        let path = workspace.config_file();
        if !path.exists() {
            return Err(SetupError::MissingConfig(path).into());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;

        Self::from_yaml(
            &text,
            request,
            workspace.checkpoint_file(request.task, request.aux_ratio),
            accelerator_available,
        )
        .with_context(|| format!("Invalid configuration in '{}'", path.display()))
    }

    pub fn from_yaml(
        text:                  &str,
        request:               &RunRequest,
        ckpt:                  PathBuf,
        accelerator_available: bool,
    ) -> Result<Self> {
        let mut flat = flatten_groups(text)?;
        for key in CLI_KEYS {
            if flat.remove(key).is_some() {
                tracing::debug!("config key '{}' overridden by the command line", key);
            }
        }

        let settings: Settings = serde_yaml::from_value(Value::Mapping(flat.clone()))
            .context("Cannot read settings")?;
        settings.validate()?;

        let known = settings_mapping(&settings)?;
        let extras = flat
            .into_iter()
            .filter(|(key, _)| !known.contains_key(key))
            .map(|(key, value)| (key_name(&key), value))
            .collect();

        Ok(Self {
            settings,
            extras,
            task:          request.task,
            mode:          request.mode,
            aux_type:      request.aux_type,
            aux_ratio:     request.aux_ratio,
            search_method: request.search,
            ckpt,
            device:        select_device(request.mode, accelerator_available),
        })
    }

    pub fn ckpt(&self) -> &Path {
        &self.ckpt
    }

    /// Every attribute as (name, value), settings first.
    pub fn attributes(&self) -> Vec<(String, String)> {
        let mut attrs: Vec<(String, String)> = settings_mapping(&self.settings)
            .map(|m| m.into_iter().map(|(k, v)| (key_name(&k), value_text(&v))).collect())
            .unwrap_or_default();

        attrs.extend(self.extras.iter().map(|(k, v)| (k.clone(), value_text(v))));

        attrs.extend([
            ("task".to_string(),          self.task.to_string()),
            ("mode".to_string(),          self.mode.to_string()),
            ("aux_type".to_string(),      self.aux_type.to_string()),
            ("aux_ratio".to_string(),     self.aux_ratio.to_string()),
            ("search_method".to_string(), self.search_method.to_string()),
            ("ckpt".to_string(),          self.ckpt.display().to_string()),
            ("device".to_string(),        self.device.to_string()),
        ]);
        attrs
    }

    pub fn print_attr(&self) {
        for (name, value) in self.attributes() {
            println!("* {name}: {value}");
        }
    }
}

// ─── YAML helpers ─────────────────────────────────────────────────────────────

/// Lift the keys of every top-level group into one mapping.
/// A group that is empty in the file (`group:`) contributes nothing.
fn flatten_groups(text: &str) -> Result<Mapping> {
    let doc: Mapping = serde_yaml::from_str(text).context("config is not a YAML mapping")?;

    let mut flat = Mapping::new();
    for (group, values) in doc {
        match values {
            Value::Mapping(entries) => {
                for (key, value) in entries {
                    flat.insert(key, value);
                }
            }
            Value::Null => {}
            _ => anyhow::bail!("config group '{}' is not a mapping", key_name(&group)),
        }
    }
    Ok(flat)
}

fn settings_mapping(settings: &Settings) -> Result<Mapping> {
    match serde_yaml::to_value(settings)? {
        Value::Mapping(m) => Ok(m),
        _ => anyhow::bail!("settings did not serialise to a mapping"),
    }
}

fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => value_text(other),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null      => "null".to_string(),
        Value::Bool(b)   => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: Mode) -> RunRequest {
        RunRequest {
            task:      Task::Translation,
            mode,
            aux_type:  AuxType::First,
            aux_ratio: AuxRatio::new(0.3).unwrap(),
            search:    SearchMethod::Beam,
        }
    }

    fn build(text: &str, mode: Mode, accel: bool) -> Result<Config> {
        let ws = Workspace::new("");
        let req = request(mode);
        Config::from_yaml(text, &req, ws.checkpoint_file(req.task, req.aux_ratio), accel)
    }

    const YAML: &str = "
setup:
  n_epochs: 3
  batch_size: 16
tokenizer:
  bos_token: '<s>'
  eos_token: '</s>'
model:
  hidden_dim: 64
  n_heads: 4
";

    #[test]
    fn test_groups_are_flattened() {
        let cfg = build(YAML, Mode::Train, false).unwrap();
        assert_eq!(cfg.settings.n_epochs, 3);
        assert_eq!(cfg.settings.batch_size, 16);
        assert_eq!(cfg.settings.bos_token, "<s>");
        assert_eq!(cfg.settings.hidden_dim, 64);
        // untouched keys keep their defaults
        assert_eq!(cfg.settings.pff_dim, Settings::default().pff_dim);
    }

    #[test]
    fn test_later_group_overwrites_earlier() {
        let text = "a:\n  n_epochs: 3\nb:\n  n_epochs: 7\n";
        let cfg = build(text, Mode::Train, false).unwrap();
        assert_eq!(cfg.settings.n_epochs, 7);
    }

    #[test]
    fn test_cli_fields_win_over_file() {
        let text = "setup:\n  mode: inference\n  task: dialogue\n  search_method: greedy\n";
        let cfg = build(text, Mode::Train, false).unwrap();
        assert_eq!(cfg.mode, Mode::Train);
        assert_eq!(cfg.task, Task::Translation);
        assert_eq!(cfg.search_method, SearchMethod::Beam);
        assert!(cfg.extras.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let text = "setup:\n  n_epochs: 2\n  warmup_steps: 4000\n";
        let cfg = build(text, Mode::Train, false).unwrap();
        assert_eq!(cfg.extras.len(), 1);
        assert_eq!(cfg.extras[0].0, "warmup_steps");
        assert!(cfg
            .attributes()
            .contains(&("warmup_steps".to_string(), "4000".to_string())));
    }

    #[test]
    fn test_derived_fields() {
        let cfg = build(YAML, Mode::Train, true).unwrap();
        assert_eq!(cfg.ckpt(), Path::new("ckpt/translation/aux_30_model.pt"));
        assert_eq!(cfg.device, DeviceKind::Accelerator);

        let cfg = build(YAML, Mode::Inference, true).unwrap();
        assert_eq!(cfg.device, DeviceKind::Cpu);
    }

    #[test]
    fn test_attributes_list_everything() {
        let cfg   = build(YAML, Mode::Test, false).unwrap();
        let attrs = cfg.attributes();
        let names: Vec<&str> = attrs.iter().map(|(k, _)| k.as_str()).collect();
        for expected in ["n_epochs", "bos_token", "task", "mode", "aux_ratio", "ckpt", "device"] {
            assert!(names.contains(&expected), "missing {expected}");
        }
        assert!(attrs.contains(&("aux_ratio".to_string(), "0.3".to_string())));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(build("setup: [1, 2]\n", Mode::Train, false).is_err());
        assert!(build("setup:\n  n_epochs: many\n", Mode::Train, false).is_err());
        assert!(build("model:\n  hidden_dim: 30\n  n_heads: 4\n", Mode::Train, false).is_err());
        assert!(build("- not\n- a mapping\n", Mode::Train, false).is_err());
    }

    #[test]
    fn test_missing_file_is_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&Workspace::new(dir.path()), &request(Mode::Train), false)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SetupError>(),
            Some(SetupError::MissingConfig(_))
        ));
    }

    #[test]
    fn test_shipped_config_parses() {
        let text = include_str!("../../config.yaml");
        let cfg = build(text, Mode::Train, false).unwrap();
        assert_eq!(cfg.settings, Settings::default());
        assert!(cfg.extras.is_empty());
    }
}
