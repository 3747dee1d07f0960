//! Core data models for the query pipeline

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// One result row: field name → value, in result-set column order
pub type Row = IndexMap<String, Value>;

//
// ================= Grounding =================
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMatch {
    /// Fragment of the question that produced the match
    pub search_term: String,
    pub column: String,
    /// Always a member of the column's controlled vocabulary
    pub matched_value: String,
    pub score: u8,
}

//
// ================= Sub-queries =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubQueryKind {
    Direct,
    Decomposed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuery {
    /// 1-based position among the question's sub-questions
    pub index: usize,
    pub kind: SubQueryKind,
    pub original_query: String,
    pub sub_query: String,
    pub table: String,
    pub entities: Vec<EntityMatch>,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub index: usize,
    pub sub_query: String,
    pub table: String,
    pub sql: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQueryResult {
    pub index: usize,
    pub sub_query: String,
    pub sql: String,
    pub rows: Vec<Row>,
}

//
// ================= Stage log =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Decompose,
    SelectTable,
    ResolveEntities,
    GenerateSql,
    ValidateExecute,
    Analyze,
}

impl StageName {
    /// Heading used in rendered transcripts
    pub fn title(&self) -> &'static str {
        match self {
            StageName::Decompose => "Query Decomposition",
            StageName::SelectTable => "Table Selection",
            StageName::ResolveEntities => "Entity Resolution",
            StageName::GenerateSql => "SQL Generation",
            StageName::ValidateExecute => "Query Execution",
            StageName::Analyze => "Analysis",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageName::Decompose => "decompose",
            StageName::SelectTable => "select_table",
            StageName::ResolveEntities => "resolve_entities",
            StageName::GenerateSql => "generate_sql",
            StageName::ValidateExecute => "validate_execute",
            StageName::Analyze => "analyze",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: StageName,
    pub status: StageStatus,
    /// Sub-question index for per-sub-question stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_query: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl StageRecord {
    pub fn completed(stage: StageName, sub_query: Option<usize>, payload: Value) -> Self {
        Self {
            stage,
            status: StageStatus::Completed,
            sub_query,
            payload: Some(payload),
            error: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn failed(stage: StageName, sub_query: Option<usize>, error: impl fmt::Display) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            sub_query,
            payload: None,
            error: Some(error.to_string()),
            recorded_at: Utc::now(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }

    /// `generate_sql (sub-query 2): <error>`
    pub fn describe_failure(&self) -> Option<String> {
        let error = self.error.as_deref()?;
        Some(match self.sub_query {
            Some(index) => format!("{} (sub-query {}): {}", self.stage, index, error),
            None => format!("{}: {}", self.stage, error),
        })
    }
}

//
// ================= Analysis =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub summary: Value,
    pub insights: Value,
    pub trends: Value,
    pub implications: Value,
    pub relationships: Value,
}

impl Analysis {
    /// Stand-in used when the collaborator's answer cannot be decoded
    pub fn unparsed() -> Self {
        Self {
            summary: Value::String("Unable to parse analysis response".to_string()),
            insights: Value::Array(vec![]),
            trends: Value::Array(vec![]),
            implications: Value::Array(vec![]),
            relationships: Value::Array(vec![]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub parsed: bool,
    pub analysis: Analysis,
    pub sub_query_count: usize,
    pub total_result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

//
// ================= Run state =================
//

/// Explicit per-session context handed to each pipeline call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
        }
    }

    pub fn with_id(session_id: Uuid) -> Self {
        Self { session_id }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulated state of one pipeline invocation. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub original_query: String,
    pub sub_queries: Vec<SubQuery>,
    pub generated_sql: Vec<GeneratedSql>,
    pub results: Vec<SubQueryResult>,
    pub analysis: Option<AnalysisReport>,
    pub steps: Vec<StageRecord>,
}

impl PipelineState {
    pub fn new(original_query: &str) -> Self {
        Self {
            original_query: original_query.to_string(),
            sub_queries: Vec::new(),
            generated_sql: Vec::new(),
            results: Vec::new(),
            analysis: None,
            steps: Vec::new(),
        }
    }

    pub fn record(&mut self, record: StageRecord) {
        self.steps.push(record);
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageRecord> {
        self.steps.iter().filter(|s| s.is_failed())
    }
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub session_id: Uuid,
    pub question: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<StageRecord>,
    pub sub_queries: Vec<SubQuery>,
    pub generated_sql: Vec<GeneratedSql>,
    pub results: Vec<SubQueryResult>,
    pub analysis: Option<AnalysisReport>,
    pub created_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}

impl PipelineReport {
    /// `fatal` is the error that halted the run, if any. Otherwise the run
    /// succeeded only when no stage failed.
    pub fn from_state(
        session: &SessionContext,
        state: PipelineState,
        fatal: Option<String>,
        execution_time_ms: u64,
    ) -> Self {
        let stage_errors: Vec<String> = state
            .failures()
            .filter_map(StageRecord::describe_failure)
            .collect();

        let error = match fatal {
            Some(message) => Some(message),
            None if !stage_errors.is_empty() => Some(stage_errors.join("; ")),
            None => None,
        };

        Self {
            run_id: Uuid::new_v4(),
            session_id: session.session_id,
            question: state.original_query,
            success: error.is_none(),
            error,
            steps: state.steps,
            sub_queries: state.sub_queries,
            generated_sql: state.generated_sql,
            results: state.results,
            analysis: state.analysis,
            created_at: Utc::now(),
            execution_time_ms,
        }
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StageRecord> {
        self.steps.iter().filter(|s| s.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stage_record_serialization() {
        let record = StageRecord::failed(StageName::GenerateSql, Some(2), "not a SELECT");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["stage"], "generate_sql");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["sub_query"], 2);
        assert!(value.get("payload").is_none());
        assert_eq!(
            record.describe_failure().unwrap(),
            "generate_sql (sub-query 2): not a SELECT"
        );
    }

    #[test]
    fn test_report_success_reflects_stage_failures() {
        let session = SessionContext::new();

        let mut state = PipelineState::new("q");
        state.record(StageRecord::completed(StageName::Decompose, None, json!({})));
        let report = PipelineReport::from_state(&session, state, None, 3);
        assert!(report.success);
        assert!(report.error.is_none());

        let mut state = PipelineState::new("q");
        state.record(StageRecord::completed(StageName::Decompose, None, json!({})));
        state.record(StageRecord::failed(StageName::ValidateExecute, Some(1), "no such table: t"));
        let report = PipelineReport::from_state(&session, state, None, 3);
        assert!(!report.success);
        assert_eq!(report.steps.len(), 2);
        assert!(report.error.unwrap().contains("no such table"));
        assert_eq!(report.session_id, session.session_id);
    }

    #[test]
    fn test_row_preserves_column_order() {
        let mut row = Row::new();
        row.insert("b".to_string(), json!(1));
        row.insert("a".to_string(), json!(2));
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"b":1,"a":2}"#);
    }
}
