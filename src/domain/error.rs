// ============================================================
// Layer 3 — Startup Errors
// ============================================================
// The resource checks performed before any model work starts.
// Anything else travels as a plain anyhow::Error.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("checkpoint '{0}' does not exist; run with -mode train first")]
    MissingCheckpoint(PathBuf),

    #[error("tokenizer '{0}' does not exist")]
    MissingTokenizer(PathBuf),

    #[error("config file '{0}' does not exist")]
    MissingConfig(PathBuf),

    #[error("data split '{0}' does not exist")]
    MissingSplit(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
