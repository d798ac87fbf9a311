//! Text normalization: page cleanup and paragraph segmentation.
//!
//! Raw per-page text from an ebook/PDF extractor carries page-number lines,
//! ragged whitespace, and stray headers. Cleaning is deterministic and
//! idempotent; paragraphs are the atomic unit of batching and are never
//! split once formed.

use std::sync::OnceLock;

use regex::Regex;

/// Fragments at or below this trimmed length are discarded — guards against
/// stray headers and footers surviving as paragraphs.
const MIN_PARAGRAPH_CHARS: usize = 10;

/// A line that is only a page number: bare digits, digits wrapped in dashes
/// or other bare punctuation, or a "Page N" marker.
fn page_number_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // \p{P} (not [:punct:]) so unicode dashes around numbers match too.
        Regex::new(r"(?i)^\s*(?:page\b)?[\s\p{P}]*\d+[\s\p{P}]*$").expect("valid regex")
    })
}

fn horizontal_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").expect("valid regex"))
}

fn excess_newlines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"))
}

fn blank_line_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid regex"))
}

/// Clean one page of raw text.
///
/// Strips page-number-only lines, collapses runs of horizontal whitespace to
/// a single space, collapses three-or-more consecutive newlines to exactly
/// two, and trims each line. Idempotent: `clean_page(clean_page(x)) ==
/// clean_page(x)`.
pub fn clean_page(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let cleaned_lines: Vec<String> = raw
        .lines()
        .filter(|line| !page_number_line().is_match(line))
        .map(|line| horizontal_whitespace().replace_all(line.trim(), " ").into_owned())
        .collect();

    let joined = cleaned_lines.join("\n");
    excess_newlines().replace_all(&joined, "\n\n").into_owned()
}

/// Split one cleaned page into kept paragraph fragments.
fn paragraphs_of(cleaned: &str) -> Vec<String> {
    blank_line_boundary()
        .split(cleaned)
        .map(str::trim)
        .filter(|fragment| fragment.len() > MIN_PARAGRAPH_CHARS)
        .map(str::to_string)
        .collect()
}

/// Clean and concatenate pages, splitting on blank-line boundaries.
/// Deterministic and order-preserving; fragments of trimmed length ≤ 10
/// characters are discarded.
pub fn split_into_paragraphs(pages: &[String]) -> Vec<String> {
    pages
        .iter()
        .flat_map(|page| paragraphs_of(&clean_page(page)))
        .collect()
}

/// Same splitting as [`split_into_paragraphs`], plus a paragraph→page map.
///
/// `boundaries[i]` is the index of the first paragraph contributed by page
/// `i`; a trailing sentinel equals the total paragraph count. The array is
/// non-decreasing with length `pages.len() + 1` (a page may contribute zero
/// paragraphs).
pub fn split_with_page_mapping(pages: &[String]) -> (Vec<String>, Vec<usize>) {
    let mut paragraphs = Vec::new();
    let mut boundaries = Vec::with_capacity(pages.len() + 1);

    for page in pages {
        boundaries.push(paragraphs.len());
        paragraphs.extend(paragraphs_of(&clean_page(page)));
    }
    boundaries.push(paragraphs.len());

    (paragraphs, boundaries)
}

/// Find the inclusive page-index range overlapping paragraph range
/// `[start_paragraph, end_paragraph]`.
///
/// Returns `None` when the paragraph range is empty, inverted, or entirely
/// past the last paragraph. Pages contributing zero paragraphs never appear
/// as endpoints.
pub fn find_pages_for_paragraph_range(
    boundaries: &[usize],
    start_paragraph: usize,
    end_paragraph: usize,
) -> Option<(usize, usize)> {
    if boundaries.len() < 2 || start_paragraph > end_paragraph {
        return None;
    }
    let total = *boundaries.last().expect("non-empty boundaries");
    if start_paragraph >= total {
        return None;
    }
    let end_paragraph = end_paragraph.min(total.saturating_sub(1));

    let page_count = boundaries.len() - 1;
    let mut first_page = None;
    let mut last_page = None;

    for page in 0..page_count {
        // Page `page` owns paragraphs [boundaries[page], boundaries[page + 1]).
        let page_start = boundaries[page];
        let page_end = boundaries[page + 1];
        if page_start == page_end {
            continue;
        }
        if page_end > start_paragraph && page_start <= end_paragraph {
            first_page.get_or_insert(page);
            last_page = Some(page);
        }
    }

    match (first_page, last_page) {
        (Some(first), Some(last)) => Some((first, last)),
        _ => None,
    }
}
