//! Prompt builders for every collaborator call

use crate::catalog::{Catalog, TableDefinition};
use crate::models::{EntityMatch, SubQueryResult};
use serde_json::json;

pub fn decompose_prompt(question: &str) -> String {
    format!(
        r#"Break down this query ONLY if it compares multiple entities or asks for multiple pieces of information.
If the query is about a single entity or metric, return it unchanged.

Examples:
1. Input: "What is the Room Revenue for AC Wailea for Dec 2024?"
   Output: ["What is the Room Revenue for AC Wailea for Dec 2024?"]

2. Input: "Compare the Room Revenue for AC Wailea and Residence Inn Tampa for Dec 2024"
   Output: [
       "What is the Room Revenue for AC Wailea for Dec 2024?",
       "What is the Room Revenue for Residence Inn Tampa for Dec 2024?"
   ]

Current Query: {}

Return the sub-queries as a simple list, one per line. For single queries, return just the original query."#,
        question
    )
}

pub fn table_selection_prompt(sub_query: &str, catalog: &Catalog) -> String {
    format!(
        "Given the following query and available tables, select the most appropriate table name.\n\
         Only return the table name, nothing else.\n\n\
         Query: {}\n\n\
         Available Tables:\n{}\n\n\
         Table name:",
        sub_query,
        catalog.table_selection_section()
    )
}

pub fn entity_filter_prompt(sub_query: &str, entities: &[EntityMatch]) -> String {
    let listed = serde_json::to_string_pretty(entities).unwrap_or_else(|_| "[]".to_string());
    let example = json!([
        {"search_term": "term1", "column": "col1", "matched_value": "val1", "score": 100},
        {"search_term": "term2", "column": "col2", "matched_value": "val2", "score": 95}
    ]);

    format!(
        r#"Given the sub-query and the extracted entities, return only the relevant entities that should be used for processing the query.

Sub-query: {}

Extracted Entities:
{}

Instructions:
1. Return ONLY a valid JSON list of objects
2. Each object MUST have these exact keys: "search_term", "column", "matched_value", "score"
3. Copy the entities you keep exactly as given; do not invent new ones
4. Use the exact format below:

{}

Return only the list, no additional text or explanation:"#,
        sub_query, listed, example
    )
}

pub fn entity_lines(entities: &[EntityMatch]) -> String {
    if entities.is_empty() {
        return "No specific entity matches found".to_string();
    }
    entities
        .iter()
        .map(|m| {
            format!(
                "- Found '{}' in column '{}' matching value '{}'",
                m.search_term, m.column, m.matched_value
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn sql_generation_prompt(
    sub_query: &str,
    table_name: &str,
    table: &TableDefinition,
    entities: &[EntityMatch],
) -> String {
    format!(
        r#"Given the following information, generate a SQL query:

Natural Language Query: {}
Table: {}

Available Columns (ONLY use these columns in your query):
{}

Matched Values:
{}

Requirements:
1. ONLY use columns from the "Available Columns" list above
2. Return a valid SQLite query
3. In WHERE clauses, use ONLY the exact matched values shown above (not the user's input terms)
4. Use proper SQL syntax and formatting
5. Return ONLY the SQL query without any explanation
6. The query must start with SELECT

For example, if there is a match "Found 'apple' in column 'company' matching value 'Apple Inc.'",
use "WHERE company = 'Apple Inc.'" NOT "WHERE company = 'apple'"

SQL Query:"#,
        sub_query,
        table_name,
        table.schema_lines(),
        entity_lines(entities)
    )
}

fn preview_rows(result: &SubQueryResult, limit: usize) -> String {
    if result.rows.is_empty() {
        return "No results found".to_string();
    }
    result
        .rows
        .iter()
        .take(limit)
        .map(|row| serde_json::to_string(row).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn analysis_prompt(original_query: &str, results: &[SubQueryResult], preview_limit: usize) -> String {
    let sections = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            format!(
                "\nSub-query {}:\nQuestion: {}\nSQL Query: {}\nResults:\n{}\n",
                i + 1,
                result.sub_query,
                result.sql,
                preview_rows(result, preview_limit)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Analyze the following set of query results and provide comprehensive insights:

Original User Question: {}

Sub-queries and their results:
{}

Format the response as JSON with these keys:
- summary: Overall summary of all results
- insights: Key patterns and findings
- trends: Notable trends and anomalies
- implications: Business implications
- relationships: Connections between sub-query results

Return only the JSON object."#,
        original_query, sections
    )
}
