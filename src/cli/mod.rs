// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses and validates the command line with `clap`, then hands
// a RunRequest to Layer 2. Every value is a closed enum or a
// range-checked number, so a bad argument is rejected here,
// before any file is touched.
//
//   seq2seq-aux -task translation -mode train -aux_type first -aux_ratio 0.3
//   seq2seq-aux --task dialogue --mode inference --aux_type cosine \
//               --aux_ratio 0.5 --search beam
//
// Reference: Rust Book §12 (CLI programs)

pub mod args;

use anyhow::Result;
use clap::Parser;

use crate::application::run_use_case::RunUseCase;
use crate::domain::task::{AuxRatio, AuxType, Mode, SearchMethod, Task};
use crate::infra::layout::Workspace;

pub use args::normalize_flags;

#[derive(Parser, Debug)]
#[command(
    name = "seq2seq-aux",
    version,
    about = "Train, test or run a seq2seq transformer with an auxiliary decoder loss."
)]
pub struct Cli {
    /// Dataset family: data/<task>/ and ckpt/<task>/
    #[arg(long, value_enum, ignore_case = true)]
    pub task: Task,

    /// What this run does
    #[arg(long, value_enum, ignore_case = true)]
    pub mode: Mode,

    /// Signal the auxiliary loss is computed from
    #[arg(long = "aux_type", alias = "aux-type", value_enum, ignore_case = true)]
    pub aux_type: AuxType,

    /// Weight of the auxiliary loss, in [0.0, 1.0]
    #[arg(long = "aux_ratio", alias = "aux-ratio")]
    pub aux_ratio: AuxRatio,

    /// Decoding strategy for test and inference
    #[arg(long, value_enum, ignore_case = true, default_value_t = SearchMethod::Greedy)]
    pub search: SearchMethod,
}

impl Cli {
    /// Runs against the current directory.
    pub fn run(self) -> Result<()> {
        tracing::debug!("{:?}", self);
        RunUseCase::new(self.into(), Workspace::current()).execute()
    }
}
