//! String similarity primitives
//!
//! All scores are integers in 0..=100. Inputs are normalized first:
//! lower-cased, every non-alphanumeric character turned into a space,
//! whitespace collapsed.

use std::collections::HashSet;

pub fn normalize(s: &str) -> String {
    let spaced: String = s
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokens of an already-normalized string, sorted and re-joined
pub fn sort_tokens(normalized: &str) -> String {
    let mut tokens: Vec<&str> = normalized.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Edit similarity of two normalized strings
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// Edit similarity after both sides are normalized and token-sorted.
/// "AC Wailea" and "wailea ac" score 100.
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sort_tokens(&normalize(a)), &sort_tokens(&normalize(b)))
}

/// Contiguous token windows of length 1..=max_n, shortest first, left to right.
/// Repeated windows are kept once.
pub fn ngrams(tokens: &[&str], max_n: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut grams = Vec::new();
    for n in 1..=max_n.min(tokens.len()) {
        for window in tokens.windows(n) {
            let gram = window.join(" ");
            if seen.insert(gram.clone()) {
                grams.push(gram);
            }
        }
    }
    grams
}
