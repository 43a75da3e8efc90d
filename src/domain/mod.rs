// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that name the concepts every other layer
// talks about: which task, which run mode, how the auxiliary
// loss is mixed, and how text is decoded.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

/// Task, run mode, auxiliary loss and search method enums
pub mod task;

/// Source/target sentence pair as stored in the split files
pub mod pair;

/// Typed startup failures
pub mod error;

/// Core abstractions (traits) that other layers implement
pub mod traits;
