// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that builds, trains or runs the network lives here.
//
//   model.rs     — embeddings, stock transformer encoder, a stack
//                  of single-level decoders, shared vocabulary head
//   loss.rs      — main cross-entropy mixed with the auxiliary term
//   search.rs    — greedy and beam decoding over a StepScorer
//   trainer.rs   — epoch loop, validation, early stopping,
//                  checkpoint on improvement
//   tester.rs    — loss, perplexity and token accuracy on test
//   generator.rs — interactive stdin → stdout decoding
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Encoder-decoder transformer with observable decoder levels
pub mod model;

/// Training objective with the auxiliary term
pub mod loss;

/// Greedy and beam search
pub mod search;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Test-split evaluation
pub mod tester;

/// Interactive inference loop
pub mod generator;
