//! PBIX Inspect: a library for looking inside Power BI `.pbix` files.
//!
//! This crate provides functionality for:
//! - Validating and listing the raw members of a `.pbix` container
//! - Staging the embedded tabular database image into an isolated scratch directory
//! - Querying that image through an external tabular engine for tables, columns,
//!   relationships and visible measures
//! - Assembling the results into a [`Model`], or a classified reason why none exists
//!
//! # Quick Start
//!
//! ```ignore
//! use pbix_inspect::{InspectConfig, PbixPackage};
//!
//! let config = InspectConfig::default();
//! let pkg = PbixPackage::open("report.pbix", &config)?;
//! for entry in pkg.entries() {
//!     println!("{} {}", entry.name, entry.size_bytes);
//! }
//!
//! let engine = config.engine.build();
//! if let Some(model) = pkg.load_model(&config, engine.as_ref()).model() {
//!     println!("{} tables", model.tables.len());
//! }
//! ```

mod assembler;
mod config;
mod container;
mod engine;
pub mod error_codes;
mod input;
mod model;
mod package;
mod query_client;
mod scratch;

pub use assembler::{ModelAssembler, ModelError, ModelOutcome};
pub use config::{
    ConfigError, DEFAULT_CONTAINER_EXTENSION, DEFAULT_MODEL_ENTRY_NAME, EngineConfig,
    InspectConfig,
};
pub use container::{
    ArchiveEntry, ContainerError, ContainerLimits, EntryReader, PbixContainer, list_entries,
};
pub use engine::{
    EngineError, EngineSession, SchemaQuery, SchemaRow, StdioEngine, TabularEngine,
    UnavailableEngine,
};
pub use input::{InputError, validate_input_path};
pub use model::{Column, Measure, Model, Relationship, Table};
pub use package::{PackageError, PbixPackage};
pub use query_client::{ModelQueryClient, QueryStage};
pub use scratch::{ScratchDir, StagingError};
