//! Shared fixtures: an in-memory income sheet and a scripted collaborator

#![allow(dead_code)]

use async_trait::async_trait;
use financial_query_pipeline::catalog::financial_catalog;
use financial_query_pipeline::error::PipelineError;
use financial_query_pipeline::{
    EntityResolver, QueryPipeline, Result, SqlExecutor, TextGenerator,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::{Arc, Mutex};

pub const TABLE: &str = "final_income_sheet_new_seq";
pub const COMPARE_QUESTION: &str =
    "Compare the Room Revenue for AC Wailea and Residence Inn Tampa for Dec 2024";

pub async fn income_sheet_executor() -> SqlExecutor {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query(
        "CREATE TABLE final_income_sheet_new_seq (
            Operator TEXT,
            SQL_Property TEXT,
            SQL_Account_Name TEXT,
            SQL_Account_Category_Order TEXT,
            Sub_Account_Category_Order TEXT,
            SQL_Account_Group_Name TEXT,
            Current_Actual_Month REAL,
            YoY_Change REAL,
            Month TEXT
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO final_income_sheet_new_seq VALUES
            ('Remington', 'AC Wailea', 'REVENUE', 'Room Revenue', 'ROOMS', 'Rooms', 125000.0, 4.2, '2024-12-01'),
            ('Remington', 'AC Wailea', 'REVENUE', 'Room Revenue', 'ROOMS', 'Rooms', 119000.0, 1.1, '2024-11-01'),
            ('HHM', 'Residence Inn Westshore Tampa', 'REVENUE', 'Room Revenue', 'ROOMS', 'Rooms', 98000.5, -2.5, '2024-12-01'),
            ('HHM', 'Residence Inn Pasadena', 'REVENUE', 'Room Revenue', 'ROOMS', 'Rooms', 87000.0, 0.4, '2024-12-01')",
    )
    .execute(&pool)
    .await
    .unwrap();

    SqlExecutor::from_pool(pool)
}

pub type Reply = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

pub fn reply<F>(f: F) -> Reply
where
    F: Fn(&str) -> Result<String> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Answers each kind of prompt with its own scripted reply and records
/// every prompt it receives.
pub struct ScriptedGenerator {
    pub decompose: Reply,
    pub select_table: Reply,
    pub filter: Reply,
    pub sql: Reply,
    pub analyze: Reply,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            decompose: reply(|prompt| Ok(split_compare(&line_after(prompt, "Current Query:")))),
            select_table: reply(|_| Ok(TABLE.to_string())),
            filter: reply(|_| Err(offline())),
            sql: reply(|prompt| Ok(property_sql(prompt))),
            analyze: reply(|_| {
                Ok(r#"{"summary": "AC Wailea earned more room revenue", "insights": ["gap of 27k"], "trends": [], "implications": [], "relationships": []}"#.to_string())
            }),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn prompts_containing(&self, marker: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| p.contains(marker))
            .collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        if prompt.contains("Analyze the following set of query results") {
            (self.analyze)(prompt)
        } else if prompt.contains("Break down this query") {
            (self.decompose)(prompt)
        } else if prompt.contains("select the most appropriate table") {
            (self.select_table)(prompt)
        } else if prompt.contains("return only the relevant entities") {
            (self.filter)(prompt)
        } else if prompt.contains("Natural Language Query:") {
            (self.sql)(prompt)
        } else {
            Err(PipelineError::CollaboratorError("unexpected prompt".to_string()))
        }
    }
}

pub fn offline() -> PipelineError {
    PipelineError::CollaboratorError("service unavailable".to_string())
}

/// Text following `marker` up to the end of its line
pub fn line_after(prompt: &str, marker: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.trim().strip_prefix(marker))
        .unwrap_or("")
        .trim()
        .to_string()
}

/// "Compare the M for A and B for P" becomes one question per entity;
/// anything else is returned unchanged.
pub fn split_compare(question: &str) -> String {
    let split = question.strip_prefix("Compare the ").and_then(|body| {
        let (metric, rest) = body.split_once(" for ")?;
        let (entities, period) = rest.rsplit_once(" for ")?;
        Some(
            entities
                .split(" and ")
                .map(|entity| format!("What is the {} for {} for {}?", metric, entity, period))
                .collect::<Vec<_>>(),
        )
    });

    match split {
        Some(lines) => format!("[\n{}\n]", lines.join("\n")),
        None => question.to_string(),
    }
}

/// First SQL_Property value offered by the prompt's matched-values section
pub fn matched_property(prompt: &str) -> Option<String> {
    let marker = "in column 'SQL_Property' matching value '";
    let start = prompt.find(marker)? + marker.len();
    let end = prompt[start..].find('\'')? + start;
    Some(prompt[start..end].to_string())
}

pub fn property_sql(prompt: &str) -> String {
    match matched_property(prompt) {
        Some(property) => format!(
            "SELECT SQL_Property, Current_Actual_Month FROM {} WHERE SQL_Property = '{}' AND SQL_Account_Category_Order = 'Room Revenue' AND Month = '2024-12-01'",
            TABLE, property
        ),
        None => format!("SELECT SQL_Property, Current_Actual_Month FROM {}", TABLE),
    }
}

pub async fn pipeline_with(generator: Arc<ScriptedGenerator>) -> QueryPipeline {
    QueryPipeline::new(
        Arc::new(financial_catalog()),
        EntityResolver::default(),
        generator,
        income_sheet_executor().await,
    )
}
