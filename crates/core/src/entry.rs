//! Classification entry data model.
//!
//! This module defines the unit of the intervention taxonomy and the code
//! helpers shared by the store and the repair engine.
//!
//! Responsibilities:
//! - Define the `ClassificationEntry` row shape as produced by the bulk ETL
//! - Derive display titles by stripping the structural depth padding
//! - Classify codes as hierarchical (dot-segmented) or flat legacy tokens

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role of an entry within the taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    /// Top-level grouping of interventions.
    Category,
    /// A coded block within a category.
    Block,
    /// An intervention target within a block.
    Target,
}

/// One row of the intervention taxonomy.
///
/// Entries are created by an external bulk-load process and afterwards mutated
/// only by the hierarchy repair engine (code correction). The `title` field is
/// stored exactly as extracted, including any leading dash/space padding that
/// encodes visual depth; use [`ClassificationEntry::display_title`] for the
/// caller-facing label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassificationEntry {
    /// Unique classification code, hierarchical (`"IAA.BA.BC"`) or flat
    /// legacy (`"HFA1"`). Case-sensitive.
    pub code: String,
    /// Raw human-readable label, possibly left-padded with depth markers
    /// (e.g. `"- - Drainage of abscess"`).
    pub title: String,
    /// Grouping key identifying the broader classification block.
    pub block_id: String,
    /// Categorical role of this entry.
    pub kind: ClassKind,
    /// Nesting depth within `kind`; depth 1 is the searchable leaf level.
    pub depth_in_kind: u32,
}

impl ClassificationEntry {
    /// Returns the title with the structural depth padding stripped.
    ///
    /// The raw store left-pads titles with `-` and space characters to encode
    /// visual depth. Callers must never see that padding.
    pub fn display_title(&self) -> &str {
        self.title.trim_start_matches(['-', ' '])
    }
}

/// Returns `true` when `code` matches the flat legacy pattern.
///
/// A flat code is one or more ASCII uppercase letters, optionally followed by
/// ASCII digits, with no dot segments (e.g. `"HFA"`, `"HFA1"`). These are the
/// repair candidates: codes produced by upstream extraction that lost their
/// hierarchical segments.
pub fn is_flat_code(code: &str) -> bool {
    let mut chars = code.chars().peekable();

    let mut letters = 0;
    while chars.next_if(|c| c.is_ascii_uppercase()).is_some() {
        letters += 1;
    }
    if letters == 0 {
        return false;
    }

    chars.all(|c| c.is_ascii_digit())
}

/// Truncates a hierarchical code to its first two dot segments.
///
/// `"HFA.BA.01"` becomes `"HFA.BA"`; a code with fewer than two segments is
/// returned unchanged. This is the block-root derivation used when repairing
/// a flat code from a matched ancestor.
pub fn block_code(code: &str) -> &str {
    let mut dots = code.match_indices('.');
    dots.next();
    match dots.next() {
        Some((second_dot, _)) => &code[..second_dot],
        None => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn display_title_strips_depth_padding() {
        assert_eq!(
            entry("IAA.BA.BC", "- - Drainage of abscess").display_title(),
            "Drainage of abscess"
        );
        assert_eq!(entry("IAA", "Drainage").display_title(), "Drainage");
    }

    #[test]
    fn display_title_keeps_interior_dashes() {
        assert_eq!(
            entry("IAA", "- X-ray of chest").display_title(),
            "X-ray of chest"
        );
    }

    #[test]
    fn flat_codes_are_detected() {
        assert!(is_flat_code("HFA"));
        assert!(is_flat_code("HFA1"));
        assert!(is_flat_code("K9"));
    }

    #[test]
    fn hierarchical_and_malformed_tokens_are_not_flat() {
        assert!(!is_flat_code("HFA.BA"));
        assert!(!is_flat_code("hfa"));
        assert!(!is_flat_code("1HF"));
        assert!(!is_flat_code("HF A"));
        assert!(!is_flat_code("HFA1X"));
        assert!(!is_flat_code(""));
    }

    #[test]
    fn block_code_truncates_to_two_segments() {
        assert_eq!(block_code("HFA.BA.01"), "HFA.BA");
        assert_eq!(block_code("HFA.BA"), "HFA.BA");
        assert_eq!(block_code("HFA"), "HFA");
        assert_eq!(block_code("IAA.BA.BC.01"), "IAA.BA");
    }

    #[test]
    fn serde_round_trips_kind_as_lowercase() {
        let json = serde_json::to_string(&entry("IAA", "Drainage")).expect("serialize entry");
        assert!(json.contains("\"kind\":\"target\""));
        let back: ClassificationEntry = serde_json::from_str(&json).expect("deserialize entry");
        assert_eq!(back.code, "IAA");
    }
}
