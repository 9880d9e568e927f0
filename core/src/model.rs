use serde::Serialize;

/// Schema of the embedded tabular database, as reported by the engine.
///
/// Built once per run by the assembler and never mutated afterwards. Names are
/// kept exactly as the engine returns them; relationships are not checked
/// against the table list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub measures: Vec<Measure>,
}

impl Model {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub table_type: String,
    /// In the order the per-table column query returned them.
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub description: Option<String>,
}

/// Directed reference from the foreign-key side (source) to the primary-key
/// side (target).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    pub name: String,
    pub caption: String,
    /// DAX source, opaque to this crate.
    pub expression: String,
    pub is_visible: bool,
}
