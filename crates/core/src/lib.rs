//! Domain logic for the prompt evaluation service.
//!
//! Everything in this crate is pure: score arithmetic, the heuristic
//! fallback scorer, the intent classifier used by "create" mode, readiness
//! predicates, and revision decisions. I/O lives in the `db`, `llm` and
//! `pipeline` crates.

pub mod classifier;
pub mod error;
pub mod readiness;
pub mod revision;
pub mod scoring;
pub mod simulation;
pub mod types;
