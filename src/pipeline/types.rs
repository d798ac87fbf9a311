//! Core types for the character analysis pipeline.
//!
//! These types model the full lifecycle:
//! Pages → Paragraphs → Batches → Extraction → Merge → Accumulated Characters.

use serde::{Deserialize, Serialize};

use super::budget::PassTokenBudget;
use super::voice::VoiceProfile;

// ═══════════════════════════════════════════
// Session State
// ═══════════════════════════════════════════

/// State machine for one document-analysis session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    /// Pipeline-level failure before any batch ran (e.g. normalization
    /// produced zero paragraphs). Individual batch failures never escalate
    /// to this state.
    Failed,
    Cancelled,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Paragraph Batch (output of the batcher)
// ═══════════════════════════════════════════

/// A contiguous run of paragraphs packed to fit one engine call's input
/// budget. Paragraph indices are global and inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphBatch {
    pub batch_index: usize,
    pub start_paragraph_index: usize,
    pub end_paragraph_index: usize,
    /// Paragraphs in range joined with a blank-line separator.
    pub text: String,
    pub paragraph_count: usize,
    pub estimated_tokens: usize,
}

// ═══════════════════════════════════════════
// Extracted Character (per-batch engine output)
// ═══════════════════════════════════════════

/// One character as reported by the engine for a single batch.
/// Ephemeral: consumed by the merger and discarded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedCharacter {
    pub name: String,
    #[serde(default)]
    pub dialogs: Vec<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub voice_profile: Option<VoiceProfile>,
}

// ═══════════════════════════════════════════
// Merged Character (accumulator entry)
// ═══════════════════════════════════════════

/// The accumulated view of one character across all batches merged so far.
/// Owned exclusively by the session's accumulator, keyed by `canonical_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCharacter {
    /// First-seen display form of the name.
    pub name: String,
    pub canonical_name: String,
    /// Append-only; order of first observation preserved across batches.
    /// Repeated lines are legitimate and never de-duplicated.
    pub dialogs: Vec<String>,
    /// Case-insensitive set semantics; first-seen casing retained.
    pub traits: Vec<String>,
    pub voice_profile: Option<VoiceProfile>,
    /// Canonical forms of every name this character was seen under.
    pub known_variants: Vec<String>,
}

// ═══════════════════════════════════════════
// Batch Status Events (progress callback)
// ═══════════════════════════════════════════

/// Event emitted during session processing for progress reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BatchStatusEvent {
    Started {
        total_batches: usize,
    },
    /// Emitted once per successfully-merged batch, after the merge is fully
    /// applied, with the accumulated character list so far.
    BatchCompleted {
        batch_index: usize,
        total_batches: usize,
        characters: Vec<MergedCharacter>,
    },
    BatchFailed {
        batch_index: usize,
        total_batches: usize,
        error: String,
    },
    SessionCompleted {
        characters: Vec<MergedCharacter>,
        failed_batches: usize,
    },
}

// ═══════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════

/// Name-matching strictness, selected at session construction.
///
/// Fuzzy trades a small false-merge risk for much better recall across a
/// model's inconsistent naming of the same character ("Harry" vs "Harry
/// Potter"). Strict is for corpora normalized upstream where false merges
/// must be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Fuzzy,
    Strict,
}

/// Configuration for one analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// How character names are resolved across batches.
    pub match_strategy: MatchStrategy,
    /// Token budget the batcher packs against and each engine call receives.
    pub budget: PassTokenBudget,
    /// Seed a "Narrator" entry so narration has a voice even when the engine
    /// never reports one.
    pub include_narrator: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            match_strategy: MatchStrategy::Fuzzy,
            budget: PassTokenBudget::character_extraction(),
            include_narrator: true,
        }
    }
}

/// Display name for the seeded narrator entry.
pub const NARRATOR_NAME: &str = "Narrator";

// ═══════════════════════════════════════════
// Session Outcome
// ═══════════════════════════════════════════

/// Final result of one analysis session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: String,
    pub state: SessionState,
    /// Characters sorted by dialog count descending. Partial when cancelled.
    pub characters: Vec<MergedCharacter>,
    pub total_batches: usize,
    /// 0 indicates full success.
    pub failed_batches: usize,
    pub duration_ms: u64,
}
