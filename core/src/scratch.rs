//! Isolated scratch workspace for the extracted database image.
//!
//! Each `ScratchDir` is a uniquely named directory (collision-free across
//! concurrent runs on one host) holding a single staged file. The directory is
//! removed by `release`, or on drop if `release` was never reached.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error_codes;

const SCRATCH_PREFIX: &str = "pbix-inspect-";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StagingError {
    #[error("failed to create scratch directory: {source}")]
    CreateDir {
        #[source]
        source: io::Error,
    },
    #[error("failed to write staged image {}: {source}", path.display())]
    WriteImage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove scratch directory {}: {source}", path.display())]
    Release {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StagingError {
    pub fn code(&self) -> &'static str {
        match self {
            StagingError::CreateDir { .. } => error_codes::STAGING_CREATE_DIR,
            StagingError::WriteImage { .. } => error_codes::STAGING_WRITE_IMAGE,
            StagingError::Release { .. } => error_codes::STAGING_RELEASE,
        }
    }
}

#[derive(Debug)]
pub struct ScratchDir {
    dir: Option<TempDir>,
    root: PathBuf,
    image_path: PathBuf,
    bytes_written: u64,
}

impl ScratchDir {
    /// Creates a scratch directory under the system temp dir and copies
    /// `reader` into `file_name` inside it.
    pub fn stage<R: Read>(reader: &mut R, file_name: &str) -> Result<Self, StagingError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(|source| StagingError::CreateDir { source })?;
        Self::stage_into(dir, reader, file_name)
    }

    /// Same as [`ScratchDir::stage`], placing the scratch directory under `parent`.
    pub fn stage_in<R: Read>(
        parent: &Path,
        reader: &mut R,
        file_name: &str,
    ) -> Result<Self, StagingError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)
            .map_err(|source| StagingError::CreateDir { source })?;
        Self::stage_into(dir, reader, file_name)
    }

    fn stage_into<R: Read>(
        dir: TempDir,
        reader: &mut R,
        file_name: &str,
    ) -> Result<Self, StagingError> {
        let root = dir.path().to_path_buf();
        let image_path = root.join(file_name);
        debug!(scratch = %root.display(), "created scratch directory");

        // On any error below `dir` is dropped, which removes the directory.
        let bytes_written = write_image(&image_path, reader).map_err(|source| {
            StagingError::WriteImage {
                path: image_path.clone(),
                source,
            }
        })?;
        debug!(
            image = %image_path.display(),
            bytes = bytes_written,
            "staged database image"
        );

        Ok(Self {
            dir: Some(dir),
            root,
            image_path,
            bytes_written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Recursively deletes the scratch directory. Runs at most once; a dropped
    /// `ScratchDir` that was never released is cleaned up the same way.
    pub fn release(mut self) -> Result<(), StagingError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), StagingError> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        dir.close().map_err(|source| StagingError::Release {
            path: self.root.clone(),
            source,
        })?;
        debug!(scratch = %self.root.display(), "released scratch directory");
        Ok(())
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = self.release_inner() {
            warn!(error = %e, code = e.code(), "scratch cleanup failed");
        }
    }
}

fn write_image<R: Read>(path: &Path, reader: &mut R) -> io::Result<u64> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = io::copy(reader, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(written)
}
