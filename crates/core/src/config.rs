//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::DEFAULT_DATA_FILE;
use crate::{ClassificationError, ClassificationResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_file: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns a `ClassificationError::InvalidInput` if `data_file` is empty.
    pub fn new(data_file: PathBuf) -> ClassificationResult<Self> {
        if data_file.as_os_str().is_empty() {
            return Err(ClassificationError::InvalidInput(
                "data_file cannot be empty".into(),
            ));
        }
        Ok(Self { data_file })
    }

    pub fn data_file(&self) -> &Path {
        &self.data_file
    }
}

/// Resolve the taxonomy dataset path without reading environment variables.
///
/// If `override_file` is provided it is used as-is; otherwise the default
/// filename is resolved relative to the current working directory. Callers
/// (binaries) are responsible for translating environment variables or CLI
/// flags into the override before invoking this.
pub fn resolve_data_file(override_file: Option<PathBuf>) -> PathBuf {
    override_file.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_FILE))
}
