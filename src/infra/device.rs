// ============================================================
// Layer 6 — Device Selection
// ============================================================
// One decision per process: run on the GPU backend (wgpu) or on
// the ndarray CPU backend. Inference is pinned to the CPU even
// when a GPU is present.

use std::fmt;

use crate::domain::task::Mode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Accelerator,
    Cpu,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceKind::Accelerator => f.write_str("wgpu"),
            DeviceKind::Cpu         => f.write_str("cpu"),
        }
    }
}

/// True when the binary was built with the GPU backend.
/// `SEQ2SEQ_FORCE_CPU` set to anything but "0" hides it.
pub fn accelerator_available() -> bool {
    let forced_off = std::env::var("SEQ2SEQ_FORCE_CPU")
        .map(|v| v != "0")
        .unwrap_or(false);
    cfg!(feature = "wgpu") && !forced_off
}

pub fn select_device(mode: Mode, accelerator_available: bool) -> DeviceKind {
    if accelerator_available && mode != Mode::Inference {
        DeviceKind::Accelerator
    } else {
        DeviceKind::Cpu
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inference_always_cpu() {
        assert_eq!(select_device(Mode::Inference, true),  DeviceKind::Cpu);
        assert_eq!(select_device(Mode::Inference, false), DeviceKind::Cpu);
    }

    #[test]
    fn test_train_and_test_use_accelerator() {
        assert_eq!(select_device(Mode::Train, true), DeviceKind::Accelerator);
        assert_eq!(select_device(Mode::Test,  true), DeviceKind::Accelerator);
    }

    #[test]
    fn test_no_accelerator_falls_back() {
        assert_eq!(select_device(Mode::Train, false), DeviceKind::Cpu);
        assert_eq!(select_device(Mode::Test,  false), DeviceKind::Cpu);
    }
}
