//! Incremental entity merging: folds one batch's extracted characters into
//! the running accumulator.
//!
//! The accumulator is the session-owned map of canonical name → merged
//! character. It is mutated only here, and only between engine calls, so a
//! progress callback always observes a consistent, monotonically growing
//! character list. Entries are kept in first-seen order so fuzzy lookups are
//! deterministic across runs.

use super::matcher::{FuzzyNameMatcher, NameMatcher, StrictNameMatcher};
use super::types::{ExtractedCharacter, MatchStrategy, MergedCharacter};
use super::voice::{PreferDetailedVoiceMerger, VoiceMerger};

/// Accumulated character state for one analysis session.
///
/// Construct one per document; drop it (or [`clear`](Self::clear)) when the
/// caller starts a new document. Matching and voice-merge strategies are
/// injected at construction and fixed for the session's lifetime.
pub struct CharacterAccumulator {
    /// First-seen insertion order; at most one entry per canonical name.
    entries: Vec<MergedCharacter>,
    matcher: Box<dyn NameMatcher>,
    voice_merger: Box<dyn VoiceMerger>,
}

impl CharacterAccumulator {
    pub fn new(matcher: Box<dyn NameMatcher>, voice_merger: Box<dyn VoiceMerger>) -> Self {
        Self {
            entries: Vec::new(),
            matcher,
            voice_merger,
        }
    }

    /// Accumulator with the named matching strategy and the prefer-detailed
    /// voice merger.
    pub fn with_strategy(strategy: MatchStrategy) -> Self {
        let matcher: Box<dyn NameMatcher> = match strategy {
            MatchStrategy::Fuzzy => Box::new(FuzzyNameMatcher),
            MatchStrategy::Strict => Box::new(StrictNameMatcher),
        };
        Self::new(matcher, Box::new(PreferDetailedVoiceMerger))
    }

    /// Fold one batch's extracted characters into the accumulator.
    ///
    /// Entities are processed in batch order. When two entities in the same
    /// batch would fuzzy-match each other, the first one claims the entry
    /// and the second merges into it; there is no smarter tie-break, and
    /// this can conflate two distinct characters with colliding names. An
    /// empty batch output is a no-op.
    pub fn merge_batch(&mut self, batch_output: &[ExtractedCharacter]) {
        for extracted in batch_output {
            let canonical = self.matcher.canonicalize(&extracted.name);
            if canonical.is_empty() {
                tracing::debug!(name = %extracted.name, "Skipping entity with blank name");
                continue;
            }

            match self.find_entry(&extracted.name) {
                Some(index) => self.merge_into(index, extracted, canonical),
                None => self.insert_new(extracted, canonical),
            }
        }
    }

    /// Ensure an entry exists for `name` (e.g. a narrator that the engine
    /// never reports). No-op when a matching entry already exists.
    pub fn ensure_character(&mut self, name: &str) {
        if self.find_entry(name).is_none() {
            self.insert_new(
                &ExtractedCharacter {
                    name: name.to_string(),
                    ..ExtractedCharacter::default()
                },
                self.matcher.canonicalize(name),
            );
        }
    }

    /// All entries, most-quoted characters first (dialog count descending,
    /// canonical name ascending on ties).
    pub fn to_list(&self) -> Vec<MergedCharacter> {
        let mut list = self.entries.clone();
        list.sort_by(|a, b| {
            b.dialogs
                .len()
                .cmp(&a.dialogs.len())
                .then_with(|| a.canonical_name.cmp(&b.canonical_name))
        });
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Discard all accumulated state, keeping the configured strategies.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// First entry (in first-seen order) whose canonical name or known
    /// variants match, under the configured matcher.
    fn find_entry(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| {
                self.matcher
                    .is_variant(name, &entry.canonical_name, &entry.known_variants)
            })
    }

    fn merge_into(&mut self, index: usize, extracted: &ExtractedCharacter, canonical: String) {
        let merged_voice = {
            let entry = &self.entries[index];
            self.voice_merger
                .merge(entry.voice_profile.as_ref(), extracted.voice_profile.as_ref())
        };

        let entry = &mut self.entries[index];
        entry.dialogs.extend(extracted.dialogs.iter().cloned());
        for trait_text in &extracted.traits {
            add_trait(&mut entry.traits, trait_text);
        }
        entry.voice_profile = merged_voice;
        if !entry
            .known_variants
            .iter()
            .any(|v| v.eq_ignore_ascii_case(&canonical))
        {
            entry.known_variants.push(canonical);
        }
    }

    fn insert_new(&mut self, extracted: &ExtractedCharacter, canonical: String) {
        let mut traits = Vec::new();
        for trait_text in &extracted.traits {
            add_trait(&mut traits, trait_text);
        }

        self.entries.push(MergedCharacter {
            name: extracted.name.clone(),
            canonical_name: canonical.clone(),
            dialogs: extracted.dialogs.clone(),
            traits,
            voice_profile: extracted.voice_profile.clone(),
            known_variants: vec![canonical],
        });
    }
}

/// Case-insensitive set insert keeping the first-seen casing.
fn add_trait(traits: &mut Vec<String>, incoming: &str) {
    let incoming = incoming.trim();
    if incoming.is_empty() {
        return;
    }
    if !traits.iter().any(|t| t.eq_ignore_ascii_case(incoming)) {
        traits.push(incoming.to_string());
    }
}
