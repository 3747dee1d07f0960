//! Query pipeline - turns one question into grounded, executed reads
//!
//! DECOMPOSE → SELECT TABLE + RESOLVE ENTITIES → GENERATE SQL → VALIDATE/EXECUTE → ANALYZE
//!
//! Each stage appends a record to the run's stage log whether it succeeds or
//! fails. Per-sub-question failures are isolated; only errors for which
//! `PipelineError::is_fatal` holds halt the run.

pub mod parse;
pub mod prompts;

use crate::catalog::Catalog;
use crate::error::PipelineError;
use crate::execution::SqlExecutor;
use crate::llm::TextGenerator;
use crate::models::{
    Analysis, AnalysisReport, EntityMatch, GeneratedSql, PipelineReport, PipelineState,
    SessionContext, StageName, StageRecord, SubQuery, SubQueryKind, SubQueryResult,
};
use crate::resolver::EntityResolver;
use crate::transcript::TranscriptStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Ask the collaborator to prune resolver candidates per sub-question
    pub entity_filter: bool,
    /// Rows per sub-question shown to the analysis prompt
    pub analysis_preview_rows: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            entity_filter: true,
            analysis_preview_rows: 10,
        }
    }
}

pub struct QueryPipeline {
    catalog: Arc<Catalog>,
    resolver: EntityResolver,
    generator: Arc<dyn TextGenerator>,
    executor: SqlExecutor,
    settings: PipelineSettings,
    transcripts: Option<TranscriptStore>,
}

impl QueryPipeline {
    pub fn new(
        catalog: Arc<Catalog>,
        resolver: EntityResolver,
        generator: Arc<dyn TextGenerator>,
        executor: SqlExecutor,
    ) -> Self {
        Self {
            catalog,
            resolver,
            generator,
            executor,
            settings: PipelineSettings::default(),
            transcripts: None,
        }
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Keep every finished report in `store`
    pub fn with_transcripts(mut self, store: TranscriptStore) -> Self {
        self.transcripts = Some(store);
        self
    }

    pub fn transcripts(&self) -> Option<&TranscriptStore> {
        self.transcripts.as_ref()
    }

    /// Runs one question in a fresh session
    pub async fn process(&self, question: &str) -> PipelineReport {
        self.process_in_session(question, &SessionContext::new()).await
    }

    /// Runs one question. Never fails: errors end up in the report's stage
    /// log, `success` and `error` fields.
    pub async fn process_in_session(&self, question: &str, session: &SessionContext) -> PipelineReport {
        let start_time = Instant::now();

        info!(
            session_id = %session.session_id,
            question = %question,
            "Pipeline: starting run"
        );

        let mut state = PipelineState::new(question);

        let fatal = match self.run(&mut state).await {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "Pipeline halted");
                Some(e.to_string())
            }
        };

        let report = PipelineReport::from_state(
            session,
            state,
            fatal,
            start_time.elapsed().as_millis() as u64,
        );

        info!(
            run_id = %report.run_id,
            success = report.success,
            steps = report.steps.len(),
            execution_time_ms = report.execution_time_ms,
            "Pipeline: run finished"
        );

        if let Some(store) = &self.transcripts {
            if let Err(e) = store.record(report.clone()).await {
                warn!(error = %e, "Failed to retain transcript");
            }
        }

        report
    }

    async fn run(&self, state: &mut PipelineState) -> Result<()> {
        // === DECOMPOSE ===
        let questions = self.decompose(state).await;
        let kind = if questions.len() == 1 {
            SubQueryKind::Direct
        } else {
            SubQueryKind::Decomposed
        };

        // === SELECT TABLE + RESOLVE ENTITIES ===
        for (i, question) in questions.iter().enumerate() {
            let index = i + 1;

            let Some(table) = self.select_table(state, index, question).await else {
                continue;
            };
            let entities = match self.resolve_entities(state, index, question, &table).await {
                Ok(entities) => entities,
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => continue,
            };

            state.sub_queries.push(SubQuery {
                index,
                kind,
                original_query: state.original_query.clone(),
                sub_query: question.clone(),
                explanation: format!("Query processed using {} table", table),
                table,
                entities,
            });
        }

        // === GENERATE SQL ===
        let sub_queries = state.sub_queries.clone();
        for sub_query in &sub_queries {
            if let Err(e) = self.generate_sql(state, sub_query).await {
                if e.is_fatal() {
                    return Err(e);
                }
            }
        }

        // === VALIDATE + EXECUTE ===
        let statements = state.generated_sql.clone();
        for generated in &statements {
            self.validate_execute(state, generated).await;
        }

        // === ANALYZE ===
        if state.results.is_empty() {
            debug!("No result sets collected, skipping analysis");
            state.record(StageRecord::completed(
                StageName::Analyze,
                None,
                json!({ "skipped": "no results" }),
            ));
        } else {
            self.analyze(state).await;
        }

        Ok(())
    }

    /// Never fails. A collaborator error or an empty answer leaves the
    /// original question as the only sub-question.
    async fn decompose(&self, state: &mut PipelineState) -> Vec<String> {
        let original = state.original_query.clone();
        let prompt = prompts::decompose_prompt(&original);

        let (questions, fallback_reason) = match self.generator.generate(&prompt).await {
            Ok(response) => {
                let questions = parse::parse_sub_queries(&response);
                if questions.is_empty() {
                    (vec![original.clone()], Some("empty decomposition".to_string()))
                } else {
                    (questions, None)
                }
            }
            Err(e) => (vec![original.clone()], Some(e.to_string())),
        };

        if let Some(reason) = &fallback_reason {
            warn!(reason = %reason, "Decomposition degraded to the original question");
        }

        debug!(count = questions.len(), "Sub-questions decided");

        state.record(StageRecord::completed(
            StageName::Decompose,
            None,
            json!({
                "sub_queries": questions,
                "fallback": fallback_reason.is_some(),
                "fallback_reason": fallback_reason,
            }),
        ));

        questions
    }

    /// `None` when the collaborator could not be reached; the sub-question
    /// is then dropped from the run.
    async fn select_table(&self, state: &mut PipelineState, index: usize, question: &str) -> Option<String> {
        let prompt = prompts::table_selection_prompt(question, &self.catalog);

        let response = match self.generator.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(sub_query = index, error = %e, "Table selection failed");
                state.record(StageRecord::failed(StageName::SelectTable, Some(index), &e));
                return None;
            }
        };

        let (table, fallback) = match parse::parse_table_choice(&response, &self.catalog) {
            Some(table) => (table, false),
            None => {
                let table = self.catalog.first_table().to_string();
                warn!(
                    sub_query = index,
                    answer = %response.trim(),
                    fallback = %table,
                    "Unknown table in answer, using first catalog table"
                );
                (table, true)
            }
        };

        state.record(StageRecord::completed(
            StageName::SelectTable,
            Some(index),
            json!({ "table": table, "fallback": fallback }),
        ));

        Some(table)
    }

    async fn resolve_entities(
        &self,
        state: &mut PipelineState,
        index: usize,
        question: &str,
        table_name: &str,
    ) -> Result<Vec<EntityMatch>> {
        let table = match self.catalog.table(table_name) {
            Ok(table) => table,
            Err(e) => return Err(fail_stage(state, StageName::ResolveEntities, index, e)),
        };

        let candidates = self.resolver.find_entities(question, table);
        debug!(sub_query = index, candidates = candidates.len(), "Entities resolved");

        let (entities, filtered) = self.filter_entities(index, question, &candidates).await;

        state.record(StageRecord::completed(
            StageName::ResolveEntities,
            Some(index),
            json!({
                "table": table_name,
                "extracted_entities": candidates,
                "filtered_entities": entities,
                "filtered": filtered,
            }),
        ));

        Ok(entities)
    }

    /// Collaborator pass that may only remove candidates. Any failure keeps
    /// the resolver output unchanged.
    async fn filter_entities(
        &self,
        index: usize,
        question: &str,
        candidates: &[EntityMatch],
    ) -> (Vec<EntityMatch>, bool) {
        if !self.settings.entity_filter || candidates.is_empty() {
            return (candidates.to_vec(), false);
        }

        let prompt = prompts::entity_filter_prompt(question, candidates);
        let kept = match self.generator.generate(&prompt).await {
            Ok(response) => parse::parse_entity_filter(&response),
            Err(e) => {
                warn!(sub_query = index, error = %e, "Entity filter call failed");
                return (candidates.to_vec(), false);
            }
        };

        let Some(kept) = kept else {
            warn!(sub_query = index, "Entity filter response unparseable, keeping all candidates");
            return (candidates.to_vec(), false);
        };

        let keep: HashSet<(&str, &str)> = kept
            .iter()
            .map(|m| (m.column.as_str(), m.matched_value.as_str()))
            .collect();

        let entities: Vec<EntityMatch> = candidates
            .iter()
            .filter(|m| keep.contains(&(m.column.as_str(), m.matched_value.as_str())))
            .cloned()
            .collect();

        debug!(
            sub_query = index,
            before = candidates.len(),
            after = entities.len(),
            "Entities filtered"
        );

        (entities, true)
    }

    async fn generate_sql(&self, state: &mut PipelineState, sub_query: &SubQuery) -> Result<()> {
        let index = sub_query.index;
        let table = match self.catalog.table(&sub_query.table) {
            Ok(table) => table,
            Err(e) => return Err(fail_stage(state, StageName::GenerateSql, index, e)),
        };

        let prompt = prompts::sql_generation_prompt(
            &sub_query.sub_query,
            &sub_query.table,
            table,
            &sub_query.entities,
        );

        let outcome = match self.generator.generate(&prompt).await {
            Ok(response) => parse::accept_sql(&response),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(sql) => {
                debug!(sub_query = index, sql = %sql, "SQL generated");
                state.record(StageRecord::completed(
                    StageName::GenerateSql,
                    Some(index),
                    json!({ "sub_query": sub_query.sub_query, "sql": sql }),
                ));
                state.generated_sql.push(GeneratedSql {
                    index,
                    sub_query: sub_query.sub_query.clone(),
                    table: sub_query.table.clone(),
                    sql,
                });
            }
            Err(e) => {
                warn!(sub_query = index, error = %e, "SQL generation failed");
                state.record(StageRecord::failed(StageName::GenerateSql, Some(index), &e));
            }
        }

        Ok(())
    }

    async fn validate_execute(&self, state: &mut PipelineState, generated: &GeneratedSql) {
        let index = generated.index;

        let outcome = match self.executor.validate(&generated.sql).await {
            Ok(()) => self.executor.execute(&generated.sql).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(rows) => {
                debug!(sub_query = index, rows = rows.len(), "Statement executed");
                state.record(StageRecord::completed(
                    StageName::ValidateExecute,
                    Some(index),
                    json!({ "sql": generated.sql, "row_count": rows.len() }),
                ));
                state.results.push(SubQueryResult {
                    index,
                    sub_query: generated.sub_query.clone(),
                    sql: generated.sql.clone(),
                    rows,
                });
            }
            Err(e) => {
                warn!(sub_query = index, error = %e, "Statement failed");
                state.record(StageRecord::failed(StageName::ValidateExecute, Some(index), &e));
            }
        }
    }

    /// A collaborator error fails the stage. An unparseable answer does not:
    /// the fixed stand-in is recorded instead. Rows are kept either way.
    async fn analyze(&self, state: &mut PipelineState) {
        let prompt = prompts::analysis_prompt(
            &state.original_query,
            &state.results,
            self.settings.analysis_preview_rows,
        );

        let response = match self.generator.generate(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Analysis call failed");
                state.record(StageRecord::failed(StageName::Analyze, None, &e));
                return;
            }
        };

        let (analysis, parsed) = match parse::parse_analysis(&response) {
            Some(analysis) => (analysis, true),
            None => {
                warn!("Analysis response unparseable, using stand-in");
                (Analysis::unparsed(), false)
            }
        };

        let report = AnalysisReport {
            parsed,
            analysis,
            sub_query_count: state.results.len(),
            total_result_count: state.results.iter().map(|r| r.rows.len()).sum(),
            raw_response: (!parsed).then_some(response),
        };

        state.record(StageRecord::completed(
            StageName::Analyze,
            None,
            json!({
                "parsed": report.parsed,
                "sub_query_count": report.sub_query_count,
                "total_result_count": report.total_result_count,
                "summary": report.analysis.summary,
            }),
        ));
        state.analysis = Some(report);
    }
}

/// Records the failing stage and hands the error back; `run` decides
/// whether it halts
fn fail_stage(state: &mut PipelineState, stage: StageName, index: usize, e: PipelineError) -> PipelineError {
    state.record(StageRecord::failed(stage, Some(index), &e));
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::financial_catalog;
    use crate::models::StageStatus;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;

    struct Unreachable;

    #[async_trait]
    impl TextGenerator for Unreachable {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(PipelineError::CollaboratorError("offline".to_string()))
        }
    }

    async fn pipeline() -> QueryPipeline {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        QueryPipeline::new(
            Arc::new(financial_catalog()),
            EntityResolver::default(),
            Arc::new(Unreachable),
            SqlExecutor::from_pool(pool),
        )
    }

    fn sub_query(table: &str) -> SubQuery {
        SubQuery {
            index: 1,
            kind: SubQueryKind::Direct,
            original_query: "Room Revenue for AC Wailea".to_string(),
            sub_query: "Room Revenue for AC Wailea".to_string(),
            table: table.to_string(),
            entities: vec![],
            explanation: String::new(),
        }
    }

    #[tokio::test]
    async fn test_unknown_table_halts_and_keeps_partial_log() {
        let pipeline = pipeline().await;
        let mut state = PipelineState::new("Room Revenue for AC Wailea");
        state.record(StageRecord::completed(
            StageName::Decompose,
            None,
            json!({ "sub_queries": ["Room Revenue for AC Wailea"] }),
        ));

        let err = pipeline
            .generate_sql(&mut state, &sub_query("balance_sheet"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::CatalogLookupError(_)));
        assert!(err.is_fatal());

        let failed = state.steps.last().unwrap();
        assert_eq!(failed.stage, StageName::GenerateSql);
        assert_eq!(failed.status, StageStatus::Failed);
        assert!(failed.error.as_deref().unwrap().contains("balance_sheet"));
        assert!(state.generated_sql.is_empty());

        let report = PipelineReport::from_state(
            &SessionContext::new(),
            state,
            Some(err.to_string()),
            0,
        );
        assert!(!report.success);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[0].stage, StageName::Decompose);
        assert!(report.error.as_deref().unwrap().contains("balance_sheet"));
    }

    #[tokio::test]
    async fn test_unknown_table_fails_entity_resolution() {
        let pipeline = pipeline().await;
        let mut state = PipelineState::new("q");

        let err = pipeline
            .resolve_entities(&mut state, 1, "q", "balance_sheet")
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(
            (state.steps[0].stage, state.steps[0].status, state.steps[0].sub_query),
            (StageName::ResolveEntities, StageStatus::Failed, Some(1))
        );
    }

    #[tokio::test]
    async fn test_offline_run_records_skipped_analysis() {
        let report = pipeline().await.process("Room Revenue for AC Wailea").await;

        assert!(!report.success);
        assert!(report.analysis.is_none());
        let last = report.steps.last().unwrap();
        assert_eq!((last.stage, last.status), (StageName::Analyze, StageStatus::Completed));
        assert_eq!(last.payload.as_ref().unwrap()["skipped"], json!("no results"));
    }
}
