// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one run:
//
//   config.rs       — typed configuration assembled from
//                     config.yaml plus the command line
//   run_use_case.rs — checkpoint invariants, seeding, model and
//                     tokenizer construction, mode dispatch
//
// No ML math here and no argument parsing; only workflow.

pub mod config;

pub mod run_use_case;
