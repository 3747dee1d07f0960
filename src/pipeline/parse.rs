//! Best-effort decoding of collaborator responses
//!
//! Nothing here evaluates the response. Structured answers are tried as
//! strict JSON first, then as Python-style literals converted to JSON.

use crate::catalog::Catalog;
use crate::error::PipelineError;
use crate::models::{Analysis, EntityMatch};
use crate::Result;
use serde::Deserialize;
use serde_json::Value;

/// Drops a surrounding markdown code fence, if any
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// One sub-question per non-empty line. List brackets, trailing commas and
/// wrapping quotes left over from list formatting are removed.
pub fn parse_sub_queries(response: &str) -> Vec<String> {
    strip_code_fence(response)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('[') && !line.starts_with(']'))
        .map(|line| {
            let line = line.trim_end_matches(',').trim();
            line.strip_prefix('"')
                .and_then(|l| l.strip_suffix('"'))
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// The answer names a table only if it matches a catalog table exactly,
/// ignoring surrounding quotes and backticks.
pub fn parse_table_choice(response: &str, catalog: &Catalog) -> Option<String> {
    let answer = response
        .trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'')
        .trim_end_matches('.')
        .trim();
    catalog.contains_table(answer).then(|| answer.to_string())
}

#[derive(Debug, Deserialize)]
struct FilterRecord {
    search_term: String,
    column: String,
    matched_value: String,
    score: f64,
}

impl From<FilterRecord> for EntityMatch {
    fn from(record: FilterRecord) -> Self {
        EntityMatch {
            search_term: record.search_term,
            column: record.column,
            matched_value: record.matched_value,
            score: record.score.round().clamp(0.0, 100.0) as u8,
        }
    }
}

/// A list of fully-populated entity records, or `None`
pub fn parse_entity_filter(response: &str) -> Option<Vec<EntityMatch>> {
    let body = strip_code_fence(response);
    if !(body.starts_with('[') && body.ends_with(']')) {
        return None;
    }

    let records: Vec<FilterRecord> = serde_json::from_str(body)
        .or_else(|_| serde_json::from_str(&python_literal_to_json(body)))
        .ok()?;

    Some(records.into_iter().map(EntityMatch::from).collect())
}

/// Accepts the response only when it is a single read statement
pub fn accept_sql(response: &str) -> Result<String> {
    let sql = strip_code_fence(response);
    if sql.to_lowercase().starts_with("select") {
        Ok(sql.to_string())
    } else {
        Err(PipelineError::GenerationRejected(format!(
            "Generated query must start with SELECT: {}",
            response.trim()
        )))
    }
}

/// Strict JSON, then the outermost `{...}` span as JSON, then that span as a
/// Python-style literal. Objects without a `summary` do not count.
pub fn parse_analysis(response: &str) -> Option<Analysis> {
    let body = strip_code_fence(response);

    if let Some(analysis) = analysis_from_json(body) {
        return Some(analysis);
    }

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    let span = &body[start..=end];

    analysis_from_json(span).or_else(|| analysis_from_json(&python_literal_to_json(span)))
}

fn analysis_from_json(text: &str) -> Option<Analysis> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) if map.get("summary").is_some_and(|s| !s.is_null()) => {
            serde_json::from_value(Value::Object(map)).ok()
        }
        _ => None,
    }
}

/// Rewrites Python literal syntax into JSON: single-quoted strings become
/// double-quoted, `True`/`False`/`None` become `true`/`false`/`null`, and
/// trailing commas before a closing bracket are dropped.
pub fn python_literal_to_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut word = String::new();

    fn flush_word(word: &mut String, out: &mut String) {
        match word.as_str() {
            "True" => out.push_str("true"),
            "False" => out.push_str("false"),
            "None" => out.push_str("null"),
            _ => out.push_str(word),
        }
        word.clear();
    }

    while let Some(c) = chars.next() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        flush_word(&mut word, &mut out);

        match c {
            '\'' | '"' => {
                let quote = c;
                out.push('"');
                while let Some(s) = chars.next() {
                    match s {
                        '\\' => match chars.next() {
                            Some('\'') => out.push('\''),
                            Some(escaped) => {
                                out.push('\\');
                                out.push(escaped);
                            }
                            None => out.push_str("\\\\"),
                        },
                        s if s == quote => break,
                        '"' => out.push_str("\\\""),
                        '\n' => out.push_str("\\n"),
                        s => out.push(s),
                    }
                }
                out.push('"');
            }
            ']' | '}' => {
                let kept = out.trim_end().len();
                if out[..kept].ends_with(',') {
                    out.truncate(kept - 1);
                }
                out.push(c);
            }
            c => out.push(c),
        }
    }
    flush_word(&mut word, &mut out);

    out
}
