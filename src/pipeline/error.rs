//! Error types for the character analysis pipeline.
//!
//! Component-level failures are pure-function failures reported by return
//! value; a failed merge never leaves the accumulator half-written.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// An invalid token budget. Raised at construction, never at call time —
    /// a budget that cannot fit is a programming error, not a runtime one.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single batch's engine call failed or returned garbage. Recovered
    /// locally by skipping that batch's merge; the session continues.
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    /// Normalization produced zero paragraphs from non-empty input, so no
    /// batching or extraction can proceed.
    #[error("Normalization produced no paragraphs from non-empty input")]
    EmptyNormalization,

    #[error("Analysis cancelled")]
    Cancelled,
}
