//! Scoring: features → detector labels → annotated result table.

mod engine;

pub use engine::{AnnotatedResult, AnnotatedRow, ScoringEngine, ScoringError};
