// ============================================================
// Layer 1 — Argument normalisation
// ============================================================
// The tool is driven with single-dash long flags (`-task x`).
// clap reads `-task` as a cluster of short flags, so those are
// rewritten to `--task` before parsing. Short flags (`-h`,
// `-V`) and negative numbers are left alone.

use std::ffi::OsString;

use super::Cli;
use crate::application::run_use_case::RunRequest;

pub fn normalize_flags<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) if is_single_dash_long(s) => OsString::from(format!("-{s}")),
            _ => arg,
        })
        .collect()
}

fn is_single_dash_long(arg: &str) -> bool {
    let Some(name) = arg.strip_prefix('-') else {
        return false;
    };
    let name = name.split('=').next().unwrap_or(name);
    !name.starts_with('-')
        && name.len() > 1
        && name.chars().all(|c| c.is_ascii_alphabetic() || c == '_' || c == '-')
}

/// The application layer never sees clap types.
impl From<Cli> for RunRequest {
    fn from(cli: Cli) -> Self {
        RunRequest {
            task:      cli.task,
            mode:      cli.mode,
            aux_type:  cli.aux_type,
            aux_ratio: cli.aux_ratio,
            search:    cli.search,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(args: &[&str]) -> Vec<String> {
        normalize_flags(args.iter().map(OsString::from))
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect()
    }

    #[test]
    fn test_rewrites_single_dash_long_flags() {
        assert_eq!(
            normalize(&["bin", "-task", "dialogue", "-aux_ratio=0.5"]),
            vec!["bin", "--task", "dialogue", "--aux_ratio=0.5"],
        );
    }

    #[test]
    fn test_leaves_short_flags_values_and_numbers() {
        assert_eq!(
            normalize(&["bin", "-h", "--mode", "test", "-0.5", "-"]),
            vec!["bin", "-h", "--mode", "test", "-0.5", "-"],
        );
    }
}
