//! PBIX container handling.
//!
//! A `.pbix` file is a plain ZIP archive. This module lists its members in
//! physical order and hands out a reader for a single named member, which is
//! how the embedded tabular database image gets located.

use std::io::{Read, Seek};

use serde::Serialize;
use thiserror::Error;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error_codes;

#[derive(Debug, Clone, Copy)]
pub struct ContainerLimits {
    pub max_entries: usize,
    pub max_entry_uncompressed_bytes: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_entry_uncompressed_bytes: 4 * 1024 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContainerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a ZIP container (file may be corrupted)")]
    NotZipContainer,
    #[error("archive has too many entries: {entries} (limit: {max_entries})")]
    TooManyEntries { entries: usize, max_entries: usize },
    #[error("entry '{name}' is too large: {size} bytes (limit: {limit} bytes)")]
    EntryTooLarge { name: String, size: u64, limit: u64 },
    #[error("failed to read ZIP entry '{name}': {reason}")]
    EntryRead { name: String, reason: String },
}

impl ContainerError {
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::Io(_) => error_codes::CONTAINER_IO,
            ContainerError::NotZipContainer => error_codes::CONTAINER_NOT_ZIP,
            ContainerError::TooManyEntries { .. } => error_codes::CONTAINER_TOO_MANY_ENTRIES,
            ContainerError::EntryTooLarge { .. } => error_codes::CONTAINER_ENTRY_TOO_LARGE,
            ContainerError::EntryRead { .. } => error_codes::CONTAINER_ENTRY_READ,
        }
    }
}

/// One archive member as listed by the central directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub name: String,
    pub size_bytes: u64,
}

pub(crate) trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

pub struct PbixContainer {
    archive: ZipArchive<Box<dyn ReadSeek>>,
    limits: ContainerLimits,
}

impl PbixContainer {
    pub fn open_from_reader<R: Read + Seek + 'static>(
        reader: R,
    ) -> Result<PbixContainer, ContainerError> {
        Self::open_from_reader_with_limits(reader, ContainerLimits::default())
    }

    pub fn open_from_reader_with_limits<R: Read + Seek + 'static>(
        reader: R,
        limits: ContainerLimits,
    ) -> Result<PbixContainer, ContainerError> {
        let reader: Box<dyn ReadSeek> = Box::new(reader);
        let archive = ZipArchive::new(reader).map_err(|err| match err {
            ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => {
                ContainerError::NotZipContainer
            }
            ZipError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                ContainerError::NotZipContainer
            }
            ZipError::Io(e) => ContainerError::Io(e),
            other => ContainerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                other.to_string(),
            )),
        })?;

        Ok(PbixContainer { archive, limits })
    }

    pub fn open_from_path_with_limits(
        path: impl AsRef<std::path::Path>,
        limits: ContainerLimits,
    ) -> Result<PbixContainer, ContainerError> {
        let file = std::fs::File::open(path)?;
        Self::open_from_reader_with_limits(file, limits)
    }

    /// Lists every member in central-directory order.
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>, ContainerError> {
        let mut out = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(i)
                .map_err(|e| ContainerError::EntryRead {
                    name: format!("#{i}"),
                    reason: e.to_string(),
                })?;
            out.push(ArchiveEntry {
                name: file.name().to_string(),
                size_bytes: file.size(),
            });
        }
        Ok(out)
    }

    /// Returns a decompressing reader over `name`, or `None` when the archive has
    /// no such member. Absence is not an error.
    ///
    /// Both limits apply here and not to [`entries`](Self::entries), so an
    /// oversized archive still lists in full.
    pub fn locate(&mut self, name: &str) -> Result<Option<EntryReader<'_>>, ContainerError> {
        if self.archive.len() > self.limits.max_entries {
            return Err(ContainerError::TooManyEntries {
                entries: self.archive.len(),
                max_entries: self.limits.max_entries,
            });
        }
        let limit = self.limits.max_entry_uncompressed_bytes;
        match self.archive.by_name(name) {
            Ok(file) => {
                let size = file.size();
                if size > limit {
                    return Err(ContainerError::EntryTooLarge {
                        name: name.to_string(),
                        size,
                        limit,
                    });
                }
                Ok(Some(EntryReader { file }))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(ZipError::Io(e)) => Err(ContainerError::EntryRead {
                name: name.to_string(),
                reason: e.to_string(),
            }),
            Err(other) => Err(ContainerError::EntryRead {
                name: name.to_string(),
                reason: other.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Streaming view of a single archive member.
pub struct EntryReader<'a> {
    file: ZipFile<'a>,
}

impl EntryReader<'_> {
    pub fn name(&self) -> &str {
        self.file.name()
    }

    pub fn size(&self) -> u64 {
        self.file.size()
    }
}

impl Read for EntryReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

/// Opens the container at `path` and lists its members.
pub fn list_entries(
    path: impl AsRef<std::path::Path>,
    limits: ContainerLimits,
) -> Result<Vec<ArchiveEntry>, ContainerError> {
    let mut container = PbixContainer::open_from_path_with_limits(path, limits)?;
    container.entries()
}
