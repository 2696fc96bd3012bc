//! Judgment logic. Everything here is pure: time only enters through the
//! timestamps passed in by the caller.

pub mod engine;

pub use engine::JudgmentEngine;
