//! Taxonomy dataset loading and persistence.
//!
//! The taxonomy is populated by an external one-time ETL step that produces
//! a JSON array of classification entries. This module reads that file into
//! a store at process start and writes a corrected dataset back after an
//! offline repair run. Duplicate codes are rejected at load time so the
//! uniqueness invariant holds for the store's whole lifetime.

use crate::entry::ClassificationEntry;
use crate::store::ClassificationStore;
use crate::{ClassificationError, ClassificationResult};
use std::fs;
use std::path::Path;

/// Reads a JSON array of classification entries from `path`.
///
/// # Errors
///
/// Returns `FileRead` if the file cannot be read and `Deserialization` if
/// the contents are not a valid entry array.
pub fn load_entries(path: &Path) -> ClassificationResult<Vec<ClassificationEntry>> {
    let contents = fs::read_to_string(path).map_err(ClassificationError::FileRead)?;
    serde_json::from_str(&contents).map_err(ClassificationError::Deserialization)
}

/// Loads the dataset at `path` into a new store.
///
/// # Errors
///
/// In addition to [`load_entries`] failures, returns `DuplicateCode` when
/// two entries share a code.
pub fn load_store(path: &Path) -> ClassificationResult<ClassificationStore> {
    let entries = load_entries(path)?;
    tracing::info!(count = entries.len(), path = %path.display(), "loaded taxonomy dataset");
    ClassificationStore::from_entries(entries)
}

/// Writes entries back to `path` as a pretty-printed JSON array.
///
/// Used by the offline repair batch to persist corrected codes.
pub fn save_entries(path: &Path, entries: &[ClassificationEntry]) -> ClassificationResult<()> {
    let contents =
        serde_json::to_string_pretty(entries).map_err(ClassificationError::Serialization)?;
    fs::write(path, contents).map_err(ClassificationError::FileWrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ClassKind;

    fn entry(code: &str, title: &str) -> ClassificationEntry {
        ClassificationEntry {
            code: code.to_string(),
            title: title.to_string(),
            block_id: "B1".to_string(),
            kind: ClassKind::Target,
            depth_in_kind: 1,
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("taxonomy.json");

        let entries = vec![
            entry("IAA.BA.BC", "- - Drainage of abscess"),
            entry("KBO.JB.AE", "Removal of appendix"),
        ];
        save_entries(&path, &entries).expect("save");

        let loaded = load_entries(&path).expect("load");
        assert_eq!(loaded, entries);

        let store = load_store(&path).expect("store");
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn load_rejects_duplicate_codes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("taxonomy.json");

        save_entries(&path, &[entry("IAA", "One"), entry("IAA", "Two")]).expect("save");
        let err = load_store(&path).expect_err("duplicate codes");
        assert!(matches!(err, ClassificationError::DuplicateCode(_)));
    }

    #[test]
    fn load_surfaces_io_and_parse_failures_distinctly() {
        let dir = tempfile::tempdir().expect("tempdir");

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            load_entries(&missing),
            Err(ClassificationError::FileRead(_))
        ));

        let garbled = dir.path().join("garbled.json");
        fs::write(&garbled, "{not json").expect("write");
        assert!(matches!(
            load_entries(&garbled),
            Err(ClassificationError::Deserialization(_))
        ));
    }
}
