//! Paragraph batching: pack normalized paragraphs into contiguous batches
//! that each fit the extraction pass's input token budget.
//!
//! Packing is greedy and order-preserving. A paragraph is never split and
//! never dropped: one larger than the whole budget still forms its own
//! batch and the budget overrun is the engine's truncation problem, not a
//! data-loss problem.

use super::budget::estimate_tokens;
use super::types::ParagraphBatch;

/// Separator used when joining a batch's paragraphs back into text.
const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Pack `paragraphs` into contiguous batches of at most `max_input_tokens`
/// estimated tokens each. Empty input yields an empty list.
pub fn create_batches(paragraphs: &[String], max_input_tokens: usize) -> Vec<ParagraphBatch> {
    create_batches_from_index(paragraphs, max_input_tokens, 0)
}

/// Identical packing starting at global paragraph index `start_index`
/// (supports resuming after a prior partial pass). All returned indices are
/// in the original global numbering; out-of-range `start_index` yields an
/// empty list.
pub fn create_batches_from_index(
    paragraphs: &[String],
    max_input_tokens: usize,
    start_index: usize,
) -> Vec<ParagraphBatch> {
    if start_index >= paragraphs.len() {
        return Vec::new();
    }

    let mut batches = Vec::new();
    let mut batch_start = start_index;
    let mut batch_text = String::new();

    for (offset, paragraph) in paragraphs[start_index..].iter().enumerate() {
        let index = start_index + offset;

        if batch_text.is_empty() {
            batch_text.push_str(paragraph);
            continue;
        }

        let candidate_len = batch_text.len() + PARAGRAPH_SEPARATOR.len() + paragraph.len();
        if estimate_tokens_for_len(candidate_len) <= max_input_tokens {
            batch_text.push_str(PARAGRAPH_SEPARATOR);
            batch_text.push_str(paragraph);
        } else {
            batches.push(close_batch(batches.len(), batch_start, index - 1, batch_text));
            batch_start = index;
            batch_text = paragraph.clone();
        }
    }

    batches.push(close_batch(
        batches.len(),
        batch_start,
        paragraphs.len() - 1,
        batch_text,
    ));
    batches
}

/// Cheap upper-bound batch count for progress reporting before actual
/// batching runs: total estimated tokens / budget, rounded up, minimum 1
/// for non-empty input.
pub fn estimate_batch_count(paragraphs: &[String], max_input_tokens: usize) -> usize {
    if paragraphs.is_empty() {
        return 0;
    }
    let total_tokens: usize = paragraphs.iter().map(|p| estimate_tokens(p)).sum();
    total_tokens.div_ceil(max_input_tokens.max(1)).max(1)
}

fn estimate_tokens_for_len(len: usize) -> usize {
    len.div_ceil(super::budget::CHARS_PER_TOKEN)
}

fn close_batch(batch_index: usize, start: usize, end: usize, text: String) -> ParagraphBatch {
    let estimated_tokens = estimate_tokens(&text);
    ParagraphBatch {
        batch_index,
        start_paragraph_index: start,
        end_paragraph_index: end,
        paragraph_count: end - start + 1,
        estimated_tokens,
        text,
    }
}
