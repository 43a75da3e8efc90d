// ============================================================
// Layer 3 — Run Vocabulary
// ============================================================
// Every choice the command line offers is a closed set, so each
// one is an enum. clap derives its parser from `ValueEnum`, which
// means an unknown value never makes it past argument parsing.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The dataset family a run works on. Each task owns its own
/// `data/<task>/` directory and `ckpt/<task>/` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Translation,
    Dialogue,
    Summarization,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Translation   => "translation",
            Task::Dialogue      => "dialogue",
            Task::Summarization => "summarization",
        }
    }
}

/// What a single process invocation does. Fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Train,
    Test,
    Inference,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Train     => "train",
            Mode::Test      => "test",
            Mode::Inference => "inference",
        }
    }

    /// Every mode except `train` starts from a saved checkpoint.
    pub fn needs_checkpoint(&self) -> bool {
        !matches!(self, Mode::Train)
    }
}

/// Which decoder signal the auxiliary loss is computed from.
///
///   first  — cross-entropy on the first decoder layer's states
///   cosine — cosine distance between first and last decoder layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuxType {
    First,
    Cosine,
}

impl AuxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuxType::First  => "first",
            AuxType::Cosine => "cosine",
        }
    }
}

/// Decoding strategy used by the tester and the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    #[default]
    Greedy,
    Beam,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Greedy => "greedy",
            SearchMethod::Beam   => "beam",
        }
    }
}

/// Dataset split, one JSON file per split under `data/<task>/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test  => "test",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

display_as_str!(Task, Mode, AuxType, SearchMethod, Split);

// ─── AuxRatio ─────────────────────────────────────────────────────────────────
/// Weight of the auxiliary loss term, always within [0.0, 1.0].
///
/// The ratio also names the checkpoint: `aux_<d>0_model.pt`, where `<d>`
/// is the last character of the ratio written in its shortest decimal
/// form with at least one fractional digit (0.3 → "30", 1.0 → "00").
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct AuxRatio(f64);

impl AuxRatio {
    pub fn new(value: f64) -> Result<Self, String> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!(
                "The aux_ratio should be within the range of 0.0 to 1.0, got {value}"
            ))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Shortest round-trip form with a guaranteed fractional part
    /// (`1` becomes `1.0`). Below 1e-4 it switches to scientific
    /// notation with a signed two-digit exponent (`1e-05`).
    pub fn decimal_repr(&self) -> String {
        if self.0 != 0.0 && self.0 < 1e-4 {
            let sci = format!("{:e}", self.0);
            return match sci.split_once('e') {
                Some((mantissa, exp)) => {
                    let (sign, digits) = match exp.strip_prefix('-') {
                        Some(d) => ('-', d),
                        None    => ('+', exp),
                    };
                    format!("{mantissa}e{sign}{digits:0>2}")
                }
                None => sci,
            };
        }
        let s = self.0.to_string();
        if s.contains('.') { s } else { format!("{s}.0") }
    }

    /// The two-character tag embedded in checkpoint file names.
    pub fn checkpoint_tag(&self) -> String {
        let repr = self.decimal_repr();
        // decimal_repr always has at least "0.0"
        let last = repr.chars().last().unwrap_or('0');
        format!("{last}0")
    }
}

impl fmt::Display for AuxRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decimal_repr())
    }
}

impl std::str::FromStr for AuxRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not a number"))?;
        if value.is_nan() {
            return Err("aux_ratio cannot be NaN".to_string());
        }
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(v: f64) -> String {
        AuxRatio::new(v).unwrap().checkpoint_tag()
    }

    #[test]
    fn test_checkpoint_tag_uses_last_digit() {
        assert_eq!(tag(0.3), "30");
        assert_eq!(tag(0.25), "50");
        assert_eq!(tag(0.7), "70");
    }

    #[test]
    fn test_checkpoint_tag_whole_numbers() {
        // 1.0 and 0.0 both print with a trailing ".0"
        assert_eq!(tag(1.0), "00");
        assert_eq!(tag(0.0), "00");
    }

    #[test]
    fn test_tiny_ratios_use_scientific_notation() {
        let repr = |v: f64| AuxRatio::new(v).unwrap().decimal_repr();
        assert_eq!(repr(1e-5), "1e-05");
        assert_eq!(repr(2.5e-7), "2.5e-07");
        assert_eq!(repr(1e-4), "0.0001");
        assert_eq!(tag(1e-5), "50");
        assert_eq!(tag(2.5e-7), "70");
    }

    #[test]
    fn test_ratio_range() {
        assert!(AuxRatio::new(1.5).is_err());
        assert!(AuxRatio::new(-0.1).is_err());
        assert!(AuxRatio::new(0.0).is_ok());
        assert!(AuxRatio::new(1.0).is_ok());
    }

    #[test]
    fn test_ratio_from_str() {
        assert_eq!("0.5".parse::<AuxRatio>().unwrap().value(), 0.5);
        assert!("abc".parse::<AuxRatio>().is_err());
        assert!("NaN".parse::<AuxRatio>().is_err());
        assert!("1.5".parse::<AuxRatio>().is_err());
    }

    #[test]
    fn test_needs_checkpoint() {
        assert!(!Mode::Train.needs_checkpoint());
        assert!(Mode::Test.needs_checkpoint());
        assert!(Mode::Inference.needs_checkpoint());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(Task::Summarization.to_string(), "summarization");
        assert_eq!(SearchMethod::default().to_string(), "greedy");
        assert_eq!(Split::Valid.to_string(), "valid");
    }
}
