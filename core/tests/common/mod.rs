//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use pbix_inspect::{EngineError, EngineSession, SchemaQuery, SchemaRow, TabularEngine};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let cursor = Cursor::new(Vec::new());
    let mut writer = ZipWriter::new(cursor);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in entries {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(bytes).expect("write zip entry");
    }

    writer.finish().expect("finish zip").into_inner()
}

pub fn write_pbix(dir: &Path, file_name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(file_name);
    std::fs::write(&path, build_zip(entries)).expect("write pbix fixture");
    path
}

#[derive(Default)]
struct FakeState {
    tables: Vec<SchemaRow>,
    columns: HashMap<String, Vec<SchemaRow>>,
    relationships: Vec<SchemaRow>,
    measures: Vec<SchemaRow>,
    ignore_visibility_filter: bool,
    reject_open: Option<String>,
    fail_on: Option<SchemaQuery>,
    queries: Vec<SchemaQuery>,
    opened_images: Vec<PathBuf>,
    sessions_closed: usize,
    image_missing_during_query: bool,
    image_present_at_close: Vec<bool>,
}

/// Scripted engine answering schema queries from in-memory rows.
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<FakeState>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(self, f: impl FnOnce(&mut FakeState)) -> Self {
        f(&mut self.state.lock().expect("fake engine state"));
        self
    }

    pub fn table(self, name: &str, columns: &[(&str, &str)]) -> Self {
        let cols: Vec<SchemaRow> = columns
            .iter()
            .map(|(col, ty)| {
                SchemaRow::new()
                    .with("COLUMN_NAME", *col)
                    .with("DATA_TYPE", *ty)
                    .with("DESCRIPTION", serde_json::Value::Null)
            })
            .collect();
        self.with_state(|s| {
            s.tables.push(
                SchemaRow::new()
                    .with("TABLE_NAME", name)
                    .with("DESCRIPTION", "")
                    .with("TABLE_TYPE", "TABLE"),
            );
            s.columns.insert(name.to_string(), cols);
        })
    }

    pub fn relationship(self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.with_state(|s| {
            s.relationships.push(
                SchemaRow::new()
                    .with("FK_TABLE_NAME", from.0)
                    .with("FK_COLUMN_NAME", from.1)
                    .with("PK_TABLE_NAME", to.0)
                    .with("PK_COLUMN_NAME", to.1),
            )
        })
    }

    pub fn measure(self, name: &str, caption: &str, expression: &str, visible: bool) -> Self {
        self.with_state(|s| {
            s.measures.push(
                SchemaRow::new()
                    .with("MEASURE_NAME", name)
                    .with("MEASURE_CAPTION", caption)
                    .with("EXPRESSION", expression)
                    .with("MEASURE_IS_VISIBLE", visible),
            )
        })
    }

    pub fn ignore_visibility_filter(self) -> Self {
        self.with_state(|s| s.ignore_visibility_filter = true)
    }

    pub fn reject_open(self, message: &str) -> Self {
        let message = message.to_string();
        self.with_state(|s| s.reject_open = Some(message))
    }

    pub fn fail_on(self, query: SchemaQuery) -> Self {
        self.with_state(|s| s.fail_on = Some(query))
    }

    pub fn queries(&self) -> Vec<SchemaQuery> {
        self.state.lock().expect("fake engine state").queries.clone()
    }

    pub fn opened_images(&self) -> Vec<PathBuf> {
        self.state
            .lock()
            .expect("fake engine state")
            .opened_images
            .clone()
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.lock().expect("fake engine state").sessions_closed
    }

    /// One flag per closed session: whether the staged image still existed.
    pub fn image_present_at_close(&self) -> Vec<bool> {
        self.state
            .lock()
            .expect("fake engine state")
            .image_present_at_close
            .clone()
    }

    pub fn image_missing_during_query(&self) -> bool {
        self.state
            .lock()
            .expect("fake engine state")
            .image_missing_during_query
    }
}

impl TabularEngine for FakeEngine {
    fn open(&self, image: &Path) -> Result<Box<dyn EngineSession>, EngineError> {
        let mut state = self.state.lock().expect("fake engine state");
        state.opened_images.push(image.to_path_buf());
        if let Some(message) = &state.reject_open {
            return Err(EngineError::Rejected {
                message: message.clone(),
            });
        }
        Ok(Box::new(FakeSession {
            state: Arc::clone(&self.state),
            image: image.to_path_buf(),
        }))
    }
}

struct FakeSession {
    state: Arc<Mutex<FakeState>>,
    image: PathBuf,
}

impl EngineSession for FakeSession {
    fn query(&mut self, query: &SchemaQuery) -> Result<Vec<SchemaRow>, EngineError> {
        let mut state = self.state.lock().expect("fake engine state");
        state.queries.push(query.clone());
        if !self.image.exists() {
            state.image_missing_during_query = true;
        }
        if state.fail_on.as_ref() == Some(query) {
            return Err(EngineError::Statement {
                message: format!("cannot execute: {}", query.statement()),
            });
        }

        let rows = match query {
            SchemaQuery::Tables => state.tables.clone(),
            SchemaQuery::Columns { table } => {
                state.columns.get(table).cloned().unwrap_or_default()
            }
            SchemaQuery::Relationships => state.relationships.clone(),
            SchemaQuery::VisibleMeasures => {
                let honor_filter = !state.ignore_visibility_filter;
                state
                    .measures
                    .iter()
                    .filter(|row| {
                        !honor_filter || row.bool_field("MEASURE_IS_VISIBLE") == Some(true)
                    })
                    .cloned()
                    .collect()
            }
        };
        Ok(rows)
    }

    fn close(self: Box<Self>) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("fake engine state");
        state.sessions_closed += 1;
        state.image_present_at_close.push(self.image.exists());
        Ok(())
    }
}
