//! Batch-and-merge character analysis pipeline.
//!
//! A book is far larger than one model call can take, so the text is split
//! into token-budgeted batches, each analyzed independently, and the results
//! folded into a running accumulator:
//!
//! ```text
//! pages → normalize → batcher → orchestrator ⇄ engine (one call per batch)
//!                                    ↓
//!                                 merger → accumulated characters
//! ```
//!
//! Design rules:
//! - The engine is a single shared, stateful resource: batches run strictly
//!   sequentially, never concurrently.
//! - Batch `i` is fully merged before batch `i + 1` starts, so progress
//!   callbacks always observe a monotonically growing character list.
//! - A single batch failure skips that batch's merge and continues; it never
//!   aborts the session.
//! - All accumulator state is session-owned. No process-wide mutable state.

pub mod background;
pub mod batcher;
pub mod budget;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod merger;
pub mod normalize;
pub mod orchestrator;
pub mod parse;
pub mod types;
pub mod voice;

pub use background::{spawn_session, SessionHandle};
pub use batcher::{create_batches, create_batches_from_index, estimate_batch_count};
pub use budget::{
    estimate_tokens, fits_within_tokens, PassTokenBudget, CHARS_PER_TOKEN, TOTAL_TOKEN_BUDGET,
};
pub use engine::ExtractionEngine;
pub use error::AnalysisError;
pub use matcher::{FuzzyNameMatcher, NameMatcher, StrictNameMatcher};
pub use merger::CharacterAccumulator;
pub use normalize::{
    clean_page, find_pages_for_paragraph_range, split_into_paragraphs, split_with_page_mapping,
};
pub use orchestrator::{new_session_id, AnalysisSession};
pub use parse::{extract_json_block, parse_batched_response, parse_voice_string};
pub use types::*;
pub use voice::{PreferDetailedVoiceMerger, VoiceMerger, VoiceProfile};
