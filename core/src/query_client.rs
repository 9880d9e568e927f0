//! Schema queries against one engine session.
//!
//! A `ModelQueryClient` owns its session exclusively. The session is closed by
//! [`ModelQueryClient::close`], or on drop, so it never outlives the client and
//! the engine's lock on the staged image is gone before scratch cleanup.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::assembler::ModelError;
use crate::engine::{EngineError, EngineSession, SchemaQuery, SchemaRow, TabularEngine};
use crate::model::{Column, Measure, Relationship, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStage {
    Tables,
    Columns { table: String },
    Relationships,
    Measures,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStage::Tables => write!(f, "tables"),
            QueryStage::Columns { table } => write!(f, "columns of table '{table}'"),
            QueryStage::Relationships => write!(f, "relationships"),
            QueryStage::Measures => write!(f, "measures"),
        }
    }
}

pub struct ModelQueryClient {
    session: Option<Box<dyn EngineSession>>,
}

impl ModelQueryClient {
    pub fn open(engine: &dyn TabularEngine, image: &Path) -> Result<Self, ModelError> {
        let session = engine
            .open(image)
            .map_err(|source| ModelError::EngineConnect { source })?;
        debug!(image = %image.display(), "opened engine session");
        Ok(Self {
            session: Some(session),
        })
    }

    /// Tables of type `TABLE`, with `columns` left empty.
    pub fn query_tables(&mut self) -> Result<Vec<Table>, ModelError> {
        let stage = QueryStage::Tables;
        let rows = self.run(&SchemaQuery::Tables, &stage)?;
        rows.iter()
            .map(|row| -> Result<Table, ModelError> {
                Ok(Table {
                    name: required(row, "TABLE_NAME", &stage)?,
                    description: non_empty(row.str_field("DESCRIPTION")),
                    table_type: row
                        .str_field("TABLE_TYPE")
                        .unwrap_or_else(|| "TABLE".to_string()),
                    columns: Vec::new(),
                })
            })
            .collect()
    }

    /// Columns of `table`, in the order the engine returns them.
    pub fn query_columns(&mut self, table: &str) -> Result<Vec<Column>, ModelError> {
        let stage = QueryStage::Columns {
            table: table.to_string(),
        };
        let query = SchemaQuery::Columns {
            table: table.to_string(),
        };
        let rows = self.run(&query, &stage)?;
        rows.iter()
            .map(|row| -> Result<Column, ModelError> {
                Ok(Column {
                    name: required(row, "COLUMN_NAME", &stage)?,
                    data_type: row
                        .data_type_field("DATA_TYPE")
                        .unwrap_or_else(|| "unknown".to_string()),
                    description: non_empty(row.str_field("DESCRIPTION")),
                })
            })
            .collect()
    }

    pub fn query_relationships(&mut self) -> Result<Vec<Relationship>, ModelError> {
        let stage = QueryStage::Relationships;
        let rows = self.run(&SchemaQuery::Relationships, &stage)?;
        rows.iter()
            .map(|row| -> Result<Relationship, ModelError> {
                Ok(Relationship {
                    source_table: required(row, "FK_TABLE_NAME", &stage)?,
                    source_column: required(row, "FK_COLUMN_NAME", &stage)?,
                    target_table: required(row, "PK_TABLE_NAME", &stage)?,
                    target_column: required(row, "PK_COLUMN_NAME", &stage)?,
                })
            })
            .collect()
    }

    /// Visible measures only. The filter is part of the statement; rows the
    /// engine still flags invisible are dropped.
    pub fn query_measures(&mut self) -> Result<Vec<Measure>, ModelError> {
        let stage = QueryStage::Measures;
        let rows = self.run(&SchemaQuery::VisibleMeasures, &stage)?;
        let mut measures = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = required(row, "MEASURE_NAME", &stage)?;
            if row.bool_field("MEASURE_IS_VISIBLE") == Some(false) {
                warn!(measure = %name, "engine returned a hidden measure; skipping");
                continue;
            }
            measures.push(Measure {
                caption: row.str_field("MEASURE_CAPTION").unwrap_or_else(|| name.clone()),
                expression: row.str_field("EXPRESSION").unwrap_or_default(),
                is_visible: true,
                name,
            });
        }
        Ok(measures)
    }

    pub fn close(mut self) {
        self.close_session();
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            match session.close() {
                Ok(()) => debug!("closed engine session"),
                Err(e) => warn!(error = %e, "engine session did not close cleanly"),
            }
        }
    }

    fn run(
        &mut self,
        query: &SchemaQuery,
        stage: &QueryStage,
    ) -> Result<Vec<SchemaRow>, ModelError> {
        let session = self.session.as_mut().ok_or_else(|| ModelError::Query {
            stage: stage.clone(),
            source: EngineError::Disconnected,
        })?;
        let rows = session.query(query).map_err(|source| ModelError::Query {
            stage: stage.clone(),
            source,
        })?;
        debug!(query = %query, rows = rows.len(), "schema query returned");
        Ok(rows)
    }
}

impl Drop for ModelQueryClient {
    fn drop(&mut self) {
        self.close_session();
    }
}

fn required(row: &SchemaRow, field: &str, stage: &QueryStage) -> Result<String, ModelError> {
    row.str_field(field).ok_or_else(|| ModelError::Query {
        stage: stage.clone(),
        source: EngineError::Protocol {
            message: format!("row is missing {field}"),
        },
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
