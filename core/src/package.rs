use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::assembler::{ModelAssembler, ModelOutcome};
use crate::config::InspectConfig;
use crate::container::{ArchiveEntry, ContainerError, PbixContainer};
use crate::engine::TabularEngine;
use crate::input::{InputError, validate_input_path};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackageError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to open {} as a ZIP file: {source}", path.display())]
    Container {
        path: PathBuf,
        #[source]
        source: ContainerError,
    },
}

impl PackageError {
    pub fn code(&self) -> &'static str {
        match self {
            PackageError::Input(e) => e.code(),
            PackageError::Container { source, .. } => source.code(),
        }
    }
}

/// A validated `.pbix` file and its raw member listing.
///
/// Opening never touches the embedded model; call [`PbixPackage::load_model`]
/// for that. A listing is always available once `open` succeeds.
#[derive(Debug, Clone)]
pub struct PbixPackage {
    path: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl PbixPackage {
    pub fn open(path: impl AsRef<Path>, config: &InspectConfig) -> Result<Self, PackageError> {
        let path = validate_input_path(path, &config.container_extension)?;

        let entries = PbixContainer::open_from_path_with_limits(&path, config.container_limits())
            .and_then(|mut container| container.entries())
            .map_err(|source| PackageError::Container {
                path: path.clone(),
                source,
            })?;

        Ok(Self { path, entries })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn total_files(&self) -> usize {
        self.entries.len()
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn load_model(&self, config: &InspectConfig, engine: &dyn TabularEngine) -> ModelOutcome {
        ModelAssembler::new(config, engine).assemble(&self.path)
    }
}
