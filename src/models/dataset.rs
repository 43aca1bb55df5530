use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic value type of a dataset column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Time,
    Binary,
    /// Nested objects and maps
    Json,
    /// Element type is not tracked
    Array,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Binary => "binary",
            ColumnType::Json => "json",
            ColumnType::Array => "array",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: ColumnType,
}

/// Ordered mapping from column name to semantic type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    pub fn push(&mut self, name: impl Into<String>, column_type: ColumnType) {
        self.columns.push(ColumnSchema {
            name: name.into(),
            column_type,
        });
    }

    pub fn get(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Renders as `{title: string, totalScore: float}`; this text is what prompts and
/// response metadata carry.
impl fmt::Display for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, column) in self.columns.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", column.name, column.column_type)?;
        }
        f.write_str("}")
    }
}

/// A dataset registered as a queryable table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetHandle {
    pub id: String,
    pub table_name: String,
    pub schema: TableSchema,
    /// Incremented every time the table is dropped and reloaded
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
}

impl DatasetHandle {
    pub fn new(id: String, schema: TableSchema, version: u64) -> Self {
        Self {
            table_name: id.clone(),
            id,
            schema,
            version,
            loaded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_renders_in_column_order() {
        let mut schema = TableSchema::default();
        schema.push("title", ColumnType::String);
        schema.push("totalScore", ColumnType::Float);
        schema.push("categories", ColumnType::Array);

        assert_eq!(
            schema.to_string(),
            "{title: string, totalScore: float, categories: array}"
        );
        assert_eq!(schema.get("totalScore"), Some(ColumnType::Float));
        assert_eq!(schema.get("missing"), None);
    }

    #[test]
    fn test_empty_schema_renders_braces() {
        assert_eq!(TableSchema::default().to_string(), "{}");
    }

    #[test]
    fn test_handle_table_name_defaults_to_id() {
        let handle = DatasetHandle::new("nLlhc8Fz9S5dCTQab".to_string(), TableSchema::default(), 1);
        assert_eq!(handle.table_name, "nLlhc8Fz9S5dCTQab");
        assert_eq!(handle.version, 1);
    }

    #[test]
    fn test_column_type_serialization() {
        let json = serde_json::to_string(&ColumnType::DateTime).unwrap();
        assert_eq!(json, "\"datetime\"");
    }
}
