//! Token budget accounting for engine calls.
//!
//! The engine's context window is a hard constraint: prompt + input + output
//! must fit within [`TOTAL_TOKEN_BUDGET`] tokens per call. Token counts use
//! a fixed characters-per-token heuristic rather than a real sub-word
//! tokenizer — intentional, the pipeline never needs exact counts, only a
//! conservative bound.

use serde::{Deserialize, Serialize};

use super::error::AnalysisError;

/// Context window of the extraction engine, in tokens.
pub const TOTAL_TOKEN_BUDGET: usize = 4096;

/// English prose averages ~4 chars/token for subword tokenizers.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimate tokens for a text: `ceil(len / CHARS_PER_TOKEN)`, 0 for empty.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Whether `text` fits within `token_limit` tokens.
pub fn fits_within_tokens(text: &str, token_limit: usize) -> bool {
    estimate_tokens(text) <= token_limit
}

/// Per-pass split of the engine's context window.
///
/// Construction validates `prompt + input + output <= TOTAL_TOKEN_BUDGET`
/// and fails fast with [`AnalysisError::Config`] — an oversized budget is a
/// programming error, not a recoverable runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassTokenBudget {
    prompt_tokens: usize,
    input_tokens: usize,
    output_tokens: usize,
}

impl PassTokenBudget {
    pub fn new(
        prompt_tokens: usize,
        input_tokens: usize,
        output_tokens: usize,
    ) -> Result<Self, AnalysisError> {
        let total = prompt_tokens + input_tokens + output_tokens;
        if total > TOTAL_TOKEN_BUDGET {
            return Err(AnalysisError::Config(format!(
                "pass budget {total} tokens exceeds total budget {TOTAL_TOKEN_BUDGET} \
                 (prompt={prompt_tokens}, input={input_tokens}, output={output_tokens})"
            )));
        }
        Ok(Self {
            prompt_tokens,
            input_tokens,
            output_tokens,
        })
    }

    /// Budget for the character/dialog/trait extraction pass: most of the
    /// window goes to book text, with room for the compact JSON answer.
    pub fn character_extraction() -> Self {
        Self {
            prompt_tokens: 512,
            input_tokens: 2560,
            output_tokens: 1024,
        }
    }

    /// Budget for the per-character dialog attribution pass.
    pub fn dialog_extraction() -> Self {
        Self {
            prompt_tokens: 768,
            input_tokens: 2304,
            output_tokens: 1024,
        }
    }

    /// Budget for voice-profile inference: small input (traits + sample
    /// dialogs), small structured output.
    pub fn voice_inference() -> Self {
        Self {
            prompt_tokens: 1024,
            input_tokens: 2688,
            output_tokens: 384,
        }
    }

    pub fn prompt_tokens(&self) -> usize {
        self.prompt_tokens
    }

    pub fn input_tokens(&self) -> usize {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> usize {
        self.output_tokens
    }

    pub fn total_tokens(&self) -> usize {
        self.prompt_tokens + self.input_tokens + self.output_tokens
    }

    pub fn input_chars(&self) -> usize {
        self.input_tokens * CHARS_PER_TOKEN
    }

    pub fn output_chars(&self) -> usize {
        self.output_tokens * CHARS_PER_TOKEN
    }

    /// Fit `text` into this budget's input allowance.
    ///
    /// Text within budget passes through unchanged. Oversized text is
    /// truncated to at most [`Self::input_chars`] characters, cutting at the
    /// last paragraph boundary (blank line) at or before the limit, falling
    /// back to the last sentence-ending punctuation, falling back to a hard
    /// cut at a char boundary. Never exceeds the character budget.
    pub fn prepare_input_text(&self, text: &str) -> String {
        let limit = self.input_chars();
        if text.len() <= limit {
            return text.to_string();
        }

        let hard_cut = floor_char_boundary(text, limit);
        let window = &text[..hard_cut];

        if let Some(pos) = window.rfind("\n\n") {
            if pos > 0 {
                return window[..pos].to_string();
            }
        }

        if let Some(pos) = window.rfind(['.', '!', '?']) {
            if pos > 0 {
                return window[..=pos].to_string();
            }
        }

        window.to_string()
    }
}

/// Largest char boundary at or below `index` (stable stand-in for
/// `str::floor_char_boundary`).
fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_tokens_at_four_chars_each() {
        assert_eq!(estimate_tokens(&"A".repeat(100)), 25);
        assert_eq!(estimate_tokens(""), 0);
        // Partial token rounds up.
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn fits_within_tokens_at_boundary() {
        let text = "A".repeat(40); // 10 tokens
        assert!(fits_within_tokens(&text, 10));
        assert!(!fits_within_tokens(&text, 9));
    }

    #[test]
    fn oversized_budget_fails_at_construction() {
        let result = PassTokenBudget::new(2048, 2048, 1024);
        assert!(matches!(result, Err(AnalysisError::Config(_))));
    }

    #[test]
    fn budget_at_exact_total_is_accepted() {
        let budget = PassTokenBudget::new(1024, 2048, 1024).unwrap();
        assert_eq!(budget.total_tokens(), TOTAL_TOKEN_BUDGET);
    }

    #[test]
    fn predefined_budgets_respect_total() {
        for budget in [
            PassTokenBudget::character_extraction(),
            PassTokenBudget::dialog_extraction(),
            PassTokenBudget::voice_inference(),
        ] {
            assert!(budget.total_tokens() <= TOTAL_TOKEN_BUDGET);
        }
    }

    #[test]
    fn derived_char_counts() {
        let budget = PassTokenBudget::new(100, 200, 300).unwrap();
        assert_eq!(budget.input_chars(), 800);
        assert_eq!(budget.output_chars(), 1200);
    }

    #[test]
    fn prepare_passes_through_text_within_budget() {
        let budget = PassTokenBudget::new(0, 100, 0).unwrap();
        let text = "Short enough.";
        assert_eq!(budget.prepare_input_text(text), text);
    }

    #[test]
    fn prepare_prefers_paragraph_boundary() {
        let budget = PassTokenBudget::new(0, 10, 0).unwrap(); // 40 chars
        let text = format!("{}\n\n{}", "A".repeat(20), "B".repeat(40));
        let prepared = budget.prepare_input_text(&text);
        assert_eq!(prepared, "A".repeat(20));
    }

    #[test]
    fn prepare_falls_back_to_sentence_boundary() {
        let budget = PassTokenBudget::new(0, 10, 0).unwrap(); // 40 chars
        let text = format!("One sentence here. {}", "B".repeat(60));
        let prepared = budget.prepare_input_text(&text);
        assert_eq!(prepared, "One sentence here.");
    }

    #[test]
    fn prepare_hard_cuts_when_no_boundary() {
        let budget = PassTokenBudget::new(0, 10, 0).unwrap(); // 40 chars
        let text = "C".repeat(100);
        let prepared = budget.prepare_input_text(&text);
        assert_eq!(prepared.len(), 40);
    }

    #[test]
    fn prepare_never_exceeds_char_budget() {
        let budget = PassTokenBudget::new(0, 10, 0).unwrap();
        for text in [
            format!("{}\n\n{}", "A".repeat(35), "B".repeat(35)),
            format!("Sentence. {}", "B".repeat(80)),
            "D".repeat(200),
        ] {
            assert!(budget.prepare_input_text(&text).len() <= budget.input_chars());
        }
    }

    #[test]
    fn prepare_respects_multibyte_char_boundaries() {
        let budget = PassTokenBudget::new(0, 10, 0).unwrap(); // 40 chars
        let text = "é".repeat(50); // 100 bytes, no boundaries
        let prepared = budget.prepare_input_text(&text);
        assert!(prepared.len() <= 40);
        assert!(text.starts_with(&prepared));
    }
}
