//! Plain-text rendering of a run's transcript

use crate::models::{PipelineReport, Row, StageName, StageRecord};
use serde_json::Value;

const PREVIEW_ROWS: usize = 3;

/// Step-by-step transcript, one section per stage record. Renders partial
/// runs the same way as complete ones.
pub fn format_report(report: &PipelineReport) -> String {
    let mut out = Vec::new();
    out.push(format!("Question: {}", report.question));

    for step in &report.steps {
        match step.sub_query {
            Some(index) => out.push(format!("\n=== {} (sub-query {}) ===", step.stage.title(), index)),
            None => out.push(format!("\n=== {} ===", step.stage.title())),
        }

        if step.is_failed() {
            out.push(format!(
                "Error: {}",
                step.error.as_deref().unwrap_or("unknown error")
            ));
            continue;
        }

        match step.stage {
            StageName::Decompose => render_decompose(step, &mut out),
            StageName::SelectTable => render_table(step, &mut out),
            StageName::ResolveEntities => render_entities(report, step, &mut out),
            StageName::GenerateSql => {
                out.push(format!("Generated SQL: {}", payload_str(step, "sql")));
            }
            StageName::ValidateExecute => render_rows(report, step, &mut out),
            StageName::Analyze => render_analysis(report, step, &mut out),
        }
    }

    if !report.success {
        out.push(format!(
            "\nRun failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        ));
    }

    out.join("\n")
}

fn payload_str<'a>(step: &'a StageRecord, key: &str) -> &'a str {
    step.payload
        .as_ref()
        .and_then(|p| p.get(key))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn render_decompose(step: &StageRecord, out: &mut Vec<String>) {
    let questions: Vec<&str> = step
        .payload
        .as_ref()
        .and_then(|p| p.get("sub_queries"))
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    out.push(format!("Decomposed into {} sub-queries:", questions.len()));
    for (i, question) in questions.iter().enumerate() {
        out.push(format!("{}. {}", i + 1, question));
    }
}

fn render_table(step: &StageRecord, out: &mut Vec<String>) {
    let fallback = step
        .payload
        .as_ref()
        .and_then(|p| p.get("fallback"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if fallback {
        out.push(format!("Using table: {} (default)", payload_str(step, "table")));
    } else {
        out.push(format!("Using table: {}", payload_str(step, "table")));
    }
}

fn render_entities(report: &PipelineReport, step: &StageRecord, out: &mut Vec<String>) {
    let Some(sub_query) = report
        .sub_queries
        .iter()
        .find(|s| Some(s.index) == step.sub_query)
    else {
        return;
    };

    out.push(format!("- Type: {:?}", sub_query.kind));
    out.push(format!("- Query: {}", sub_query.sub_query));
    out.push("Identified Entities:".to_string());
    for entity in &sub_query.entities {
        out.push(format!(
            "- Found '{}' in column '{}'\n  Matched Value: '{}' (Score: {})",
            entity.search_term, entity.column, entity.matched_value, entity.score
        ));
    }
    out.push(format!("- Total Entities: {}", sub_query.entities.len()));
    out.push(format!("- Explanation: {}", sub_query.explanation));
}

fn render_rows(report: &PipelineReport, step: &StageRecord, out: &mut Vec<String>) {
    let Some(result) = report
        .results
        .iter()
        .find(|r| Some(r.index) == step.sub_query)
    else {
        return;
    };

    out.push(format!("Execution successful: {} rows returned", result.rows.len()));
    if let Some(first) = result.rows.first() {
        out.push("Results Preview:".to_string());
        let headers: Vec<&String> = first.keys().collect();
        out.push(
            headers
                .iter()
                .map(|h| h.as_str())
                .collect::<Vec<_>>()
                .join(" | "),
        );
        out.push("-".repeat(50));
        for row in result.rows.iter().take(PREVIEW_ROWS) {
            out.push(row_line(row, &headers));
        }
    }
}

fn row_line(row: &Row, headers: &[&String]) -> String {
    headers
        .iter()
        .map(|h| row.get(h.as_str()).map(display_value).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn render_analysis(report: &PipelineReport, step: &StageRecord, out: &mut Vec<String>) {
    let Some(analysis) = &report.analysis else {
        out.push(format!("Skipped: {}", payload_str(step, "skipped")));
        return;
    };

    out.push(format!("Parsed: {}", analysis.parsed));
    out.push(format!("Sub-query count: {}", analysis.sub_query_count));
    out.push(format!("Total result count: {}", analysis.total_result_count));
    out.push(format!("Summary: {}", display_value(&analysis.analysis.summary)));
    out.push(format!("Insights: {}", display_value(&analysis.analysis.insights)));
    out.push(format!("Trends: {}", display_value(&analysis.analysis.trends)));
    out.push(format!("Implications: {}", display_value(&analysis.analysis.implications)));
    out.push(format!("Relationships: {}", display_value(&analysis.analysis.relationships)));
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join("; "),
        other => other.to_string(),
    }
}
