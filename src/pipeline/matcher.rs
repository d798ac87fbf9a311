//! Character name matching: decides whether two name strings denote the
//! same entity.
//!
//! Matching is lexical only. The fuzzy strategy trades a small false-merge
//! risk for much better recall across a model's inconsistent naming of one
//! character ("Harry" / "Harry Potter" / "Harold Potter"); the strict
//! strategy is for corpora where names are normalized upstream and false
//! merges must be zero.

/// Tokens shorter than this are excluded from word-overlap matching, so
/// titles don't collide ("Mr A" vs "Mr B").
const MIN_OVERLAP_TOKEN_LEN: usize = 3;

/// Strategy contract for name canonicalization and matching.
pub trait NameMatcher: Send + Sync {
    /// Normalize a name into its canonical merge-key form.
    fn canonicalize(&self, name: &str) -> String;

    /// Whether `a` and `b` denote the same character.
    fn matches(&self, a: &str, b: &str) -> bool;

    /// Whether `name` is a known or matching variant of an accumulator
    /// entry. Checks the variant set first (exact, case-insensitive), then
    /// falls back to [`NameMatcher::matches`] against the canonical
    /// reference.
    fn is_variant(&self, name: &str, canonical_reference: &str, known_variants: &[String]) -> bool {
        let canonical = self.canonicalize(name);
        if known_variants
            .iter()
            .any(|v| v.eq_ignore_ascii_case(&canonical))
        {
            return true;
        }
        self.matches(name, canonical_reference)
    }
}

/// Lowercase, trim, collapse internal whitespace.
fn normalize_whitespace_lowercase(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Matches only on canonical equality.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictNameMatcher;

impl NameMatcher for StrictNameMatcher {
    fn canonicalize(&self, name: &str) -> String {
        normalize_whitespace_lowercase(name)
    }

    fn matches(&self, a: &str, b: &str) -> bool {
        let ca = self.canonicalize(a);
        !ca.is_empty() && ca == self.canonicalize(b)
    }
}

/// Matches on canonical equality, substring containment, or a shared name
/// token of length ≥ 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyNameMatcher;

impl NameMatcher for FuzzyNameMatcher {
    fn canonicalize(&self, name: &str) -> String {
        // Strip punctuation before whitespace collapse so "O'Brien," and
        // "OBrien" canonicalize identically.
        let depunctuated: String = name
            .chars()
            .filter(|c| !c.is_ascii_punctuation())
            .collect();
        normalize_whitespace_lowercase(&depunctuated)
    }

    fn matches(&self, a: &str, b: &str) -> bool {
        let ca = self.canonicalize(a);
        let cb = self.canonicalize(b);
        if ca.is_empty() || cb.is_empty() {
            return false;
        }
        if ca == cb {
            return true;
        }
        if ca.contains(&cb) || cb.contains(&ca) {
            return true;
        }
        // Word overlap: share at least one token long enough to be a name.
        ca.split_whitespace()
            .filter(|t| t.len() >= MIN_OVERLAP_TOKEN_LEN)
            .any(|t| cb.split_whitespace().any(|u| u == t))
    }
}
