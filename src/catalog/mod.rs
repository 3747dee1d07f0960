//! Static catalog of queryable tables
//!
//! Describes every table, its columns and, for low-cardinality columns, the
//! full controlled vocabulary used for grounding. Built once at startup and
//! shared read-only by every pipeline run.

use crate::error::PipelineError;
use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod financial;

pub use financial::financial_catalog;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub description: String,
    #[serde(default)]
    pub hierarchy_level: Option<u32>,
    /// Exhaustive vocabulary. Empty for unconstrained columns.
    #[serde(default)]
    pub distinct_values: Vec<String>,
}

impl ColumnDefinition {
    /// Column with no controlled vocabulary
    pub fn free(description: &str) -> Self {
        Self {
            description: description.to_string(),
            hierarchy_level: None,
            distinct_values: Vec::new(),
        }
    }

    pub fn with_values(description: &str, hierarchy_level: Option<u32>, values: &[&str]) -> Self {
        Self {
            description: description.to_string(),
            hierarchy_level,
            distinct_values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn has_vocabulary(&self) -> bool {
        !self.distinct_values.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    pub description: String,
    #[serde(default)]
    pub key_purposes: Vec<String>,
    /// Example questions, used only as prompt context
    #[serde(default)]
    pub common_queries: Vec<String>,
    #[serde(default)]
    pub relationships: IndexMap<String, String>,
    /// Insertion order is display order
    pub columns: IndexMap<String, ColumnDefinition>,
}

impl TableDefinition {
    /// Columns that carry a controlled vocabulary, in display order
    pub fn vocabulary_columns(&self) -> impl Iterator<Item = (&str, &ColumnDefinition)> {
        self.columns
            .iter()
            .filter(|(_, col)| col.has_vocabulary())
            .map(|(name, col)| (name.as_str(), col))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.get(name)
    }

    /// `- column: description` lines for SQL generation prompts
    pub fn schema_lines(&self) -> String {
        self.columns
            .iter()
            .map(|(name, col)| format!("- {}: {}", name, col.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub tables: IndexMap<String, TableDefinition>,
}

impl Catalog {
    pub fn new(tables: IndexMap<String, TableDefinition>) -> Result<Self> {
        if tables.is_empty() {
            return Err(PipelineError::ConfigError(
                "Catalog must define at least one table".to_string(),
            ));
        }
        Ok(Self { tables })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        Self::new(catalog.tables)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn table(&self, name: &str) -> Result<&TableDefinition> {
        self.tables.get(name).ok_or_else(|| {
            PipelineError::CatalogLookupError(format!("Table '{}' not found in catalog", name))
        })
    }

    pub fn column(&self, table: &str, column: &str) -> Result<&ColumnDefinition> {
        self.table(table)?.column(column).ok_or_else(|| {
            PipelineError::CatalogLookupError(format!(
                "Column '{}' not found in table '{}'",
                column, table
            ))
        })
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// First table in catalog order. `new` guarantees there is one.
    pub fn first_table(&self) -> &str {
        self.tables
            .keys()
            .next()
            .map(|s| s.as_str())
            .unwrap_or_default()
    }

    /// Per-table digest used when asking the collaborator to pick a table
    pub fn table_selection_section(&self) -> String {
        self.tables
            .iter()
            .map(|(name, table)| {
                let columns = table
                    .columns
                    .iter()
                    .map(|(col, info)| format!("{} ({})", col, info.description))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "Table: {}\nDescription: {}\nCommon Queries: {}\nColumns: {}\n",
                    name,
                    table.description,
                    table.common_queries.join(", "),
                    columns
                )
            })
            .collect()
    }
}
