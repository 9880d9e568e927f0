//! Model extraction pipeline.
//!
//! locate entry -> stage to scratch -> open session -> tables, columns per
//! table, relationships, measures -> [`Model`].
//!
//! Each stage runs once, with no retries. Any failure after the entry is found
//! discards the partial model and yields [`ModelOutcome::Failed`]; the session
//! is closed and the scratch directory released on every path.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::InspectConfig;
use crate::container::{ContainerError, PbixContainer};
use crate::engine::{EngineError, TabularEngine};
use crate::error_codes;
use crate::model::Model;
use crate::query_client::{ModelQueryClient, QueryStage};
use crate::scratch::{ScratchDir, StagingError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    #[error("cannot read container: {0}")]
    Archive(#[from] ContainerError),
    #[error("staging failed: {0}")]
    Staging(#[from] StagingError),
    #[error("cannot connect to tabular engine: {source}")]
    EngineConnect {
        #[source]
        source: EngineError,
    },
    #[error("query for {stage} failed: {source}")]
    Query {
        stage: QueryStage,
        #[source]
        source: EngineError,
    },
}

impl ModelError {
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::Archive(e) => e.code(),
            ModelError::Staging(e) => e.code(),
            ModelError::EngineConnect { .. } => error_codes::ENGINE_CONNECT,
            ModelError::Query { .. } => error_codes::ENGINE_QUERY,
        }
    }
}

/// Result of one extraction attempt. Never a partial model.
#[derive(Debug)]
pub enum ModelOutcome {
    Loaded(Model),
    /// The container has no embedded model entry.
    NotEmbedded,
    Failed(ModelError),
}

impl ModelOutcome {
    pub fn model(&self) -> Option<&Model> {
        match self {
            ModelOutcome::Loaded(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            ModelOutcome::Loaded(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelOutcome::Loaded(_))
    }
}

pub struct ModelAssembler<'a> {
    config: &'a InspectConfig,
    engine: &'a dyn TabularEngine,
}

impl<'a> ModelAssembler<'a> {
    pub fn new(config: &'a InspectConfig, engine: &'a dyn TabularEngine) -> Self {
        Self { config, engine }
    }

    pub fn assemble(&self, path: &Path) -> ModelOutcome {
        match self.try_assemble(path) {
            Ok(Some(model)) => {
                info!(
                    tables = model.tables.len(),
                    columns = model.column_count(),
                    relationships = model.relationships.len(),
                    measures = model.measures.len(),
                    "data model loaded"
                );
                ModelOutcome::Loaded(model)
            }
            Ok(None) => {
                debug!(
                    entry = %self.config.model_entry_name,
                    "container has no embedded data model"
                );
                ModelOutcome::NotEmbedded
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "data model extraction failed");
                ModelOutcome::Failed(e)
            }
        }
    }

    fn try_assemble(&self, path: &Path) -> Result<Option<Model>, ModelError> {
        let mut container =
            PbixContainer::open_from_path_with_limits(path, self.config.container_limits())?;

        let scratch = {
            let Some(mut entry) = container.locate(&self.config.model_entry_name)? else {
                return Ok(None);
            };
            debug!(entry = entry.name(), bytes = entry.size(), "located data model entry");
            let file_name = staged_file_name(&self.config.model_entry_name);
            match &self.config.scratch_root {
                Some(root) => ScratchDir::stage_in(root, &mut entry, file_name)?,
                None => ScratchDir::stage(&mut entry, file_name)?,
            }
        };

        let result = query_model(self.engine, scratch.image_path());

        if let Err(e) = scratch.release() {
            warn!(error = %e, code = e.code(), "scratch directory was not removed");
        }

        result.map(Some)
    }
}

fn query_model(engine: &dyn TabularEngine, image: &Path) -> Result<Model, ModelError> {
    let mut client = ModelQueryClient::open(engine, image)?;
    let result = load_model(&mut client);
    client.close();
    result
}

fn load_model(client: &mut ModelQueryClient) -> Result<Model, ModelError> {
    let mut tables = client.query_tables()?;
    for table in &mut tables {
        table.columns = client.query_columns(&table.name)?;
    }
    let relationships = client.query_relationships()?;
    let measures = client.query_measures()?;

    Ok(Model {
        tables,
        relationships,
        measures,
    })
}

fn staged_file_name(entry_name: &str) -> &str {
    entry_name
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("DataModel")
}
