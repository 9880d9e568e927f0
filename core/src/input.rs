//! Fail-fast validation of the container path, before any archive I/O.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error_codes;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InputError {
    #[error("PBIX file not found: {}", path.display())]
    NotFound { path: PathBuf },
    #[error("File must have .{expected} extension, got: {found}")]
    WrongExtension { expected: String, found: String },
}

impl InputError {
    pub fn code(&self) -> &'static str {
        match self {
            InputError::NotFound { .. } => error_codes::INPUT_NOT_FOUND,
            InputError::WrongExtension { .. } => error_codes::INPUT_WRONG_EXTENSION,
        }
    }
}

/// Checks that `path` exists and carries `expected_extension` (case-insensitive,
/// with or without a leading dot).
pub fn validate_input_path(
    path: impl AsRef<Path>,
    expected_extension: &str,
) -> Result<PathBuf, InputError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(InputError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let expected = expected_extension.trim_start_matches('.');
    let ext = path
        .extension()
        .map(|v| v.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !ext.eq_ignore_ascii_case(expected) {
        let found = if ext.is_empty() {
            "(none)".to_string()
        } else {
            format!(".{ext}")
        };
        return Err(InputError::WrongExtension {
            expected: expected.to_ascii_lowercase(),
            found,
        });
    }

    Ok(path.to_path_buf())
}
