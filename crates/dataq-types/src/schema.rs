//! Schema description for the active dataset
//!
//! A derived, read-only view of the dataset's columns. Regenerated from the
//! engine on every question so it can never be stale relative to the last
//! completed upload.

use serde::{Deserialize, Serialize};

/// Semantic type tag for a column, as presented to the translation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    #[serde(rename = "string")]
    Text,
    Timestamp,
    Boolean,
}

impl ColumnType {
    /// Prompt-facing spelling of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Text => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub column_type: ColumnType,
}

/// Ordered column list for the active dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDescription {
    pub columns: Vec<ColumnInfo>,
}

impl SchemaDescription {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// One `name: type` line per column, the exact shape injected into the
    /// translation prompt.
    pub fn render(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("{}: {}", c.name, c.column_type))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SchemaDescription {
        SchemaDescription::new(vec![
            ColumnInfo {
                name: "id".to_string(),
                column_type: ColumnType::Integer,
            },
            ColumnInfo {
                name: "amount".to_string(),
                column_type: ColumnType::Float,
            },
            ColumnInfo {
                name: "ts".to_string(),
                column_type: ColumnType::Timestamp,
            },
        ])
    }

    #[test]
    fn render_lists_columns_in_order() {
        assert_eq!(sample().render(), "id: integer\namount: float\nts: timestamp");
    }

    #[test]
    fn column_lookup_by_name() {
        let schema = sample();
        assert_eq!(schema.column("amount").unwrap().column_type, ColumnType::Float);
        assert!(schema.column("revenue").is_none());
    }

    #[test]
    fn type_tags_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&ColumnType::Text).unwrap(), "\"string\"");
        assert_eq!(serde_json::to_string(&ColumnType::Timestamp).unwrap(), "\"timestamp\"");
    }
}
