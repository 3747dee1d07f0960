//! Entity resolver
//!
//! Grounds fragments of a question onto exact members of a table's
//! controlled vocabularies. Only values that appear in a column's
//! `distinct_values` are ever returned.

pub mod similarity;

use crate::catalog::TableDefinition;
use crate::models::EntityMatch;
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum score (inclusive) for a match to be retained
    pub threshold: u8,
    /// Lower bound on the largest fragment window. Raised to the token count
    /// of the longest vocabulary value so multi-word values can match whole.
    pub max_ngram: usize,
    /// Columns that fall back to their best match when nothing clears the threshold
    pub key_columns: Vec<String>,
    /// Fallback matches must score strictly above this
    pub key_column_floor: u8,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            threshold: 90,
            max_ngram: 3,
            key_columns: vec!["SQL_Property".to_string(), "Operator".to_string()],
            key_column_floor: 20,
        }
    }
}

struct Fragment {
    text: String,
    sorted: String,
}

struct VocabularyEntry<'a> {
    column: &'a str,
    value: &'a str,
    normalized: String,
    sorted: String,
}

pub struct EntityResolver {
    config: ResolverConfig,
}

impl EntityResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Matches above the threshold, plus fallback matches for key columns,
    /// sorted by descending score.
    pub fn find_entities(&self, text: &str, table: &TableDefinition) -> Vec<EntityMatch> {
        let scored = self.score_vocabulary(text, table);

        let mut matches: Vec<EntityMatch> = scored
            .iter()
            .filter(|m| m.score >= self.config.threshold)
            .cloned()
            .collect();

        for key in &self.config.key_columns {
            if matches.iter().any(|m| &m.column == key) {
                continue;
            }

            let fallback = scored
                .iter()
                .filter(|m| &m.column == key)
                .min_by(|a, b| compare_matches(a, b));

            if let Some(best) = fallback {
                if best.score > self.config.key_column_floor {
                    debug!(
                        column = %key,
                        value = %best.matched_value,
                        score = best.score,
                        "Key column grounded by fallback"
                    );
                    matches.push(best.clone());
                }
            }
        }

        matches.sort_by(compare_matches);
        matches
    }

    /// Best-scoring fragment for every (column, value) pair of the table
    fn score_vocabulary(&self, text: &str, table: &TableDefinition) -> Vec<EntityMatch> {
        let normalized_text = similarity::normalize(text);
        if normalized_text.is_empty() {
            return Vec::new();
        }

        let vocabulary = vocabulary_entries(table);
        if vocabulary.is_empty() {
            return Vec::new();
        }

        let longest_value = vocabulary
            .iter()
            .map(|entry| entry.normalized.split_whitespace().count())
            .max()
            .unwrap_or(0);
        let window = self.config.max_ngram.max(longest_value);

        let fragments = build_fragments(&normalized_text, window);

        debug!(
            fragment_count = fragments.len(),
            vocabulary_size = vocabulary.len(),
            window,
            "Scoring vocabulary"
        );

        vocabulary
            .iter()
            .map(|entry| {
                let mut best_term = normalized_text.as_str();
                let mut best_score = similarity::ratio(&normalized_text, &entry.normalized);

                for fragment in &fragments {
                    let score = similarity::ratio(&fragment.sorted, &entry.sorted);
                    if fragment_outranks(score, &fragment.text, best_score, best_term) {
                        best_score = score;
                        best_term = &fragment.text;
                    }
                }

                EntityMatch {
                    search_term: best_term.to_string(),
                    column: entry.column.to_string(),
                    matched_value: entry.value.to_string(),
                    score: best_score,
                }
            })
            .collect()
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

/// Vocabulary values in column order, one entry per distinct (column, value).
/// Values that normalize to nothing (e.g. "-") can never be grounded.
fn vocabulary_entries(table: &TableDefinition) -> Vec<VocabularyEntry<'_>> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for (column, definition) in table.vocabulary_columns() {
        for value in &definition.distinct_values {
            if !seen.insert((column, value.as_str())) {
                continue;
            }
            let normalized = similarity::normalize(value);
            if normalized.is_empty() {
                continue;
            }
            let sorted = similarity::sort_tokens(&normalized);
            entries.push(VocabularyEntry {
                column,
                value,
                normalized,
                sorted,
            });
        }
    }

    entries
}

fn build_fragments(normalized_text: &str, window: usize) -> Vec<Fragment> {
    let tokens: Vec<&str> = normalized_text.split_whitespace().collect();
    let mut grams = similarity::ngrams(&tokens, window);
    if !grams.iter().any(|g| g == normalized_text) {
        grams.push(normalized_text.to_string());
    }

    grams
        .into_iter()
        .map(|text| {
            let sorted = similarity::sort_tokens(&text);
            Fragment { text, sorted }
        })
        .collect()
}

/// Higher score wins, then the shorter fragment, then lexical order
fn fragment_outranks(score: u8, term: &str, best_score: u8, best_term: &str) -> bool {
    (Reverse(score), term.len(), term) < (Reverse(best_score), best_term.len(), best_term)
}

fn compare_matches(a: &EntityMatch, b: &EntityMatch) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.search_term.len().cmp(&b.search_term.len()))
        .then_with(|| a.matched_value.cmp(&b.matched_value))
        .then_with(|| a.column.cmp(&b.column))
        .then_with(|| a.search_term.cmp(&b.search_term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{financial_catalog, ColumnDefinition};
    use indexmap::IndexMap;

    fn table(columns: Vec<(&str, Vec<&str>)>) -> TableDefinition {
        let mut defs = IndexMap::new();
        for (name, values) in columns {
            defs.insert(
                name.to_string(),
                ColumnDefinition::with_values("test column", None, &values),
            );
        }
        defs.insert("Amount".to_string(), ColumnDefinition::free("amount"));
        TableDefinition {
            description: "test".to_string(),
            key_purposes: vec![],
            common_queries: vec![],
            relationships: IndexMap::new(),
            columns: defs,
        }
    }

    fn strict_resolver() -> EntityResolver {
        EntityResolver::new(ResolverConfig {
            key_columns: vec![],
            ..ResolverConfig::default()
        })
    }

    #[test]
    fn test_permuted_value_in_sentence_scores_100() {
        let t = table(vec![(
            "SQL_Property",
            vec!["AC Wailea", "Residence Inn Westshore Tampa"],
        )]);
        let resolver = strict_resolver();

        let matches = resolver.find_entities("room revenue for Wailea AC in dec 2024", &t);
        assert!(matches
            .iter()
            .any(|m| m.matched_value == "AC Wailea" && m.score == 100));

        let matches =
            resolver.find_entities("show westshore tampa residence inn occupancy", &t);
        let hit = matches
            .iter()
            .find(|m| m.matched_value == "Residence Inn Westshore Tampa")
            .expect("four-token value should match whole");
        assert_eq!(hit.score, 100);
        assert_eq!(hit.column, "SQL_Property");
    }

    #[test]
    fn test_repeated_calls_are_identical() {
        let catalog = financial_catalog();
        let t = catalog.table(catalog.first_table()).unwrap();
        let resolver = EntityResolver::default();
        let text = "What is the Room Revenue for AC Wailea for Dec 2024?";

        let first = resolver.find_entities(text, t);
        for _ in 0..5 {
            assert_eq!(resolver.find_entities(text, t), first);
        }
    }

    #[test]
    fn test_duplicate_fragments_collapse_to_one_match() {
        let t = table(vec![("company", vec!["Apple Inc."])]);
        let resolver = strict_resolver();

        let matches = resolver.find_entities("apple results versus Apple Inc. guidance", &t);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_value, "Apple Inc.");
        assert_eq!(matches[0].search_term, "apple inc");
        assert_eq!(matches[0].score, 100);
    }

    #[test]
    fn test_weak_matches_stay_silent_for_ordinary_columns() {
        let t = table(vec![("Segment", vec!["Retail Banking"])]);
        let matches = strict_resolver().find_entities("retail numbers please", &t);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_key_column_falls_back_to_best_match() {
        let t = table(vec![(
            "SQL_Property",
            vec!["AC Wailea", "Residence Inn Pasadena", "Residence Inn Westshore Tampa"],
        )]);
        let resolver = EntityResolver::default();

        let matches = resolver.find_entities("Room Revenue for Residence Inn Tampa", &t);
        let property: Vec<_> = matches.iter().filter(|m| m.column == "SQL_Property").collect();
        assert_eq!(property.len(), 1);
        assert_eq!(property[0].matched_value, "Residence Inn Westshore Tampa");
        assert!(property[0].score < resolver.config().threshold);
        assert!(property[0].score > resolver.config().key_column_floor);
    }

    #[test]
    fn test_key_column_fallback_respects_floor() {
        let t = table(vec![("SQL_Property", vec!["AC Wailea"])]);
        let matches = EntityResolver::default().find_entities("qqqq zzzz", &t);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_no_vocabulary_yields_nothing() {
        let t = table(vec![]);
        assert!(EntityResolver::default()
            .find_entities("anything at all", &t)
            .is_empty());
        assert!(EntityResolver::default().find_entities("   ", &t).is_empty());
    }

    #[test]
    fn test_results_sorted_by_descending_score() {
        let catalog = financial_catalog();
        let t = catalog.table(catalog.first_table()).unwrap();
        let matches = EntityResolver::default()
            .find_entities("What is the Room Revenue for Residence Inn Tampa for Dec 2024?", t);

        assert!(!matches.is_empty());
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(matches
            .iter()
            .any(|m| m.column == "SQL_Account_Category_Order" && m.matched_value == "Room Revenue"));

        let vocabulary: Vec<&String> = t
            .vocabulary_columns()
            .flat_map(|(_, c)| c.distinct_values.iter())
            .collect();
        assert!(matches.iter().all(|m| vocabulary.contains(&&m.matched_value)));
    }
}
