//! Capability interface to the external tabular engine.
//!
//! The engine is a black box that loads a staged database image and answers
//! schema-introspection queries. Anything that can open a session and return
//! rows for a [`SchemaQuery`] qualifies: an in-process library, a subprocess
//! bridge ([`StdioEngine`]), or a network client.

mod stdio;

use std::fmt;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

pub use stdio::StdioEngine;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("engine unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("engine rejected the database image: {message}")]
    Rejected { message: String },
    #[error("engine connection dropped before a response was read")]
    Disconnected,
    #[error("engine rejected the statement: {message}")]
    Statement { message: String },
    #[error("unexpected engine response: {message}")]
    Protocol { message: String },
    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait TabularEngine {
    /// Opens a session against the database image at `image`. The engine may
    /// hold a lock on the file until the session is closed.
    fn open(&self, image: &Path) -> Result<Box<dyn EngineSession>, EngineError>;
}

pub trait EngineSession {
    fn query(&mut self, query: &SchemaQuery) -> Result<Vec<SchemaRow>, EngineError>;

    fn close(self: Box<Self>) -> Result<(), EngineError>;
}

/// Engine used when none is configured; every `open` fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableEngine;

impl TabularEngine for UnavailableEngine {
    fn open(&self, _image: &Path) -> Result<Box<dyn EngineSession>, EngineError> {
        Err(EngineError::Unavailable {
            reason: "no tabular engine configured".to_string(),
        })
    }
}

/// The four schema rowsets the model is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaQuery {
    Tables,
    Columns { table: String },
    Relationships,
    VisibleMeasures,
}

impl SchemaQuery {
    /// Statement text in the engine's DMV dialect.
    ///
    /// The table name is interpolated as-is; a name containing `'` yields a
    /// malformed statement that the engine rejects.
    pub fn statement(&self) -> String {
        match self {
            SchemaQuery::Tables => "SELECT [TABLE_NAME], [DESCRIPTION], [TABLE_TYPE] \
                 FROM $SYSTEM.DBSCHEMA_TABLES \
                 WHERE [TABLE_TYPE] = 'TABLE'"
                .to_string(),
            SchemaQuery::Columns { table } => format!(
                "SELECT [COLUMN_NAME], [DATA_TYPE], [DESCRIPTION] \
                 FROM $SYSTEM.DBSCHEMA_COLUMNS \
                 WHERE [TABLE_NAME] = '{table}'"
            ),
            SchemaQuery::Relationships => {
                "SELECT [FK_TABLE_NAME], [FK_COLUMN_NAME], [PK_TABLE_NAME], [PK_COLUMN_NAME] \
                 FROM $SYSTEM.DBSCHEMA_RELATIONSHIPS"
                    .to_string()
            }
            SchemaQuery::VisibleMeasures => {
                "SELECT [MEASURE_NAME], [MEASURE_CAPTION], [EXPRESSION], [MEASURE_IS_VISIBLE] \
                 FROM $SYSTEM.MDSCHEMA_MEASURES \
                 WHERE [MEASURE_IS_VISIBLE]"
                    .to_string()
            }
        }
    }
}

impl fmt::Display for SchemaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaQuery::Tables => write!(f, "tables"),
            SchemaQuery::Columns { table } => write!(f, "columns of '{table}'"),
            SchemaQuery::Relationships => write!(f, "relationships"),
            SchemaQuery::VisibleMeasures => write!(f, "measures"),
        }
    }
}

/// One row of a schema rowset, keyed by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaRow {
    fields: Map<String, Value>,
}

impl From<Map<String, Value>> for SchemaRow {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl SchemaRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Looks a field up by name, ignoring ASCII case and `[...]` brackets.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if let Some(v) = self.fields.get(field) {
            return Some(v);
        }
        self.fields
            .iter()
            .find(|(k, _)| strip_brackets(k).eq_ignore_ascii_case(field))
            .map(|(_, v)| v)
    }

    pub fn str_field(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn bool_field(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Column data type as a readable name. OLE DB type codes are translated;
    /// strings pass through.
    pub fn data_type_field(&self, field: &str) -> Option<String> {
        match self.get(field)? {
            Value::Number(n) => Some(match n.as_u64() {
                Some(code) => ole_db_type_name(code)
                    .map(str::to_string)
                    .unwrap_or_else(|| code.to_string()),
                None => n.to_string(),
            }),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

fn strip_brackets(key: &str) -> &str {
    key.strip_prefix('[')
        .and_then(|k| k.strip_suffix(']'))
        .unwrap_or(key)
}

fn ole_db_type_name(code: u64) -> Option<&'static str> {
    let name = match code {
        2 => "smallint",
        3 => "int",
        4 => "real",
        5 => "double",
        6 => "currency",
        7 => "date",
        11 => "boolean",
        16 => "tinyint",
        17 => "unsigned tinyint",
        20 => "bigint",
        72 => "guid",
        128 => "binary",
        130 => "string",
        131 => "decimal",
        133 => "dbdate",
        135 => "datetime",
        _ => return None,
    };
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_query_filters_on_table_type() {
        let stmt = SchemaQuery::Tables.statement();
        assert!(stmt.contains("$SYSTEM.DBSCHEMA_TABLES"));
        assert!(stmt.contains("[TABLE_TYPE] = 'TABLE'"));
    }

    #[test]
    fn column_query_is_keyed_by_table_name() {
        let stmt = SchemaQuery::Columns {
            table: "Sales".to_string(),
        }
        .statement();
        assert!(stmt.contains("$SYSTEM.DBSCHEMA_COLUMNS"));
        assert!(stmt.ends_with("WHERE [TABLE_NAME] = 'Sales'"));
    }

    #[test]
    fn quoted_table_name_is_not_escaped() {
        let stmt = SchemaQuery::Columns {
            table: "Bob's Sales".to_string(),
        }
        .statement();
        assert!(stmt.ends_with("= 'Bob's Sales'"));
    }

    #[test]
    fn measure_query_selects_visible_only() {
        let stmt = SchemaQuery::VisibleMeasures.statement();
        assert!(stmt.contains("$SYSTEM.MDSCHEMA_MEASURES"));
        assert!(stmt.ends_with("WHERE [MEASURE_IS_VISIBLE]"));
    }

    #[test]
    fn relationship_query_has_no_filter() {
        let stmt = SchemaQuery::Relationships.statement();
        assert!(stmt.contains("$SYSTEM.DBSCHEMA_RELATIONSHIPS"));
        assert!(!stmt.contains("WHERE"));
    }

    #[test]
    fn row_lookup_ignores_case_and_brackets() {
        let row = SchemaRow::new()
            .with("[TABLE_NAME]", "Sales")
            .with("description", Value::Null);
        assert_eq!(row.str_field("TABLE_NAME").as_deref(), Some("Sales"));
        assert_eq!(row.str_field("DESCRIPTION"), None);
        assert!(row.get("TABLE_TYPE").is_none());
    }

    #[test]
    fn bool_field_accepts_common_encodings() {
        let row = SchemaRow::from(
            json!({ "a": true, "b": 0, "c": "TRUE", "d": "maybe" })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        );
        assert_eq!(row.bool_field("a"), Some(true));
        assert_eq!(row.bool_field("b"), Some(false));
        assert_eq!(row.bool_field("c"), Some(true));
        assert_eq!(row.bool_field("d"), None);
    }

    #[test]
    fn data_type_codes_map_to_names() {
        let row = SchemaRow::new()
            .with("int_col", 3)
            .with("dec_col", 131)
            .with("odd_col", 9999)
            .with("named", "decimal");
        assert_eq!(row.data_type_field("int_col").as_deref(), Some("int"));
        assert_eq!(row.data_type_field("dec_col").as_deref(), Some("decimal"));
        assert_eq!(row.data_type_field("odd_col").as_deref(), Some("9999"));
        assert_eq!(row.data_type_field("named").as_deref(), Some("decimal"));
    }

    #[test]
    fn unavailable_engine_never_connects() {
        let err = UnavailableEngine
            .open(Path::new("DataModel"))
            .err()
            .expect("open should fail");
        assert!(matches!(err, EngineError::Unavailable { .. }));
    }
}
