//! Read-only contract for generated SQL
//!
//! Every statement passes through here before it reaches the store.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref BLOCKED_KEYWORDS: Regex = Regex::new(
        r"\b(delete|drop|truncate|update|insert|replace|alter|create|rename|modify|grant|revoke)\b"
    )
    .unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    #[error("only read statements are allowed")]
    NotReadOnly,

    #[error("operation '{0}' is not allowed")]
    BlockedKeyword(String),

    #[error("multiple statements are not allowed")]
    MultipleStatements,
}

/// Accepts a statement only if it starts with SELECT, contains no blocked
/// keyword as a whole word, and holds no statement separator other than
/// trailing ones.
pub fn check_read_only(sql: &str) -> Result<(), SafetyViolation> {
    let folded = sql.trim().to_lowercase();

    if !folded.starts_with("select") {
        return Err(SafetyViolation::NotReadOnly);
    }

    if let Some(found) = BLOCKED_KEYWORDS.find(&folded) {
        return Err(SafetyViolation::BlockedKeyword(found.as_str().to_string()));
    }

    if folded.trim_end_matches(|c: char| c == ';' || c.is_whitespace()).contains(';') {
        return Err(SafetyViolation::MultipleStatements);
    }

    Ok(())
}

pub fn is_safe(sql: &str) -> bool {
    check_read_only(sql).is_ok()
}
