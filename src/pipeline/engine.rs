//! The extraction engine boundary.
//!
//! The generative model lives outside this crate (llama.cpp server, Ollama,
//! a test mock, ...). The pipeline consumes it through this single
//! request/response trait and assumes nothing about its internals beyond
//! the token budget contract.

use super::budget::PassTokenBudget;
use super::error::AnalysisError;
use super::types::ExtractedCharacter;

/// A single-call character extraction capability.
///
/// The engine holds internal generation state (a context window) and must
/// never be invoked reentrantly; the orchestrator guarantees strictly
/// sequential calls. A failed call is recovered by skipping that batch, not
/// by retrying it, within one orchestration run.
pub trait ExtractionEngine: Send + Sync {
    /// Analyze one batch of text and return the characters found in it.
    ///
    /// `batch_index`/`total_batches` are informational (prompt context,
    /// logging); `budget` is the pass budget the batch was packed against.
    fn analyze(
        &self,
        batch_text: &str,
        batch_index: usize,
        total_batches: usize,
        budget: &PassTokenBudget,
    ) -> Result<Vec<ExtractedCharacter>, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_is_object_safe() {
        fn _assert(_: &dyn ExtractionEngine) {}
    }
}
