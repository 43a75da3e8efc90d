// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns the use cases lean on:
//
//   layout.rs          — where every file lives on disk
//   device.rs          — CPU vs GPU backend decision
//   seed.rs            — deterministic seeding
//   tokenizer_store.rs — tokenizer loading + BOS/EOS template
//   checkpoint.rs      — saving and restoring model weights
//   metrics.rs         — per-epoch CSV log and early stopping

pub mod layout;

pub mod device;

pub mod seed;

pub mod tokenizer_store;

pub mod checkpoint;

pub mod metrics;
