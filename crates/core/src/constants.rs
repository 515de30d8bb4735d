//! Constants used throughout the ICHI core crate.
//!
//! This module contains limit and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default filename for the taxonomy dataset when no explicit file is configured.
pub const DEFAULT_DATA_FILE: &str = "taxonomy.json";

/// Default page size for search and list operations.
pub const DEFAULT_LIMIT: usize = 100;

/// Hard cap on page size; larger requests are clamped, not rejected.
pub const MAX_LIMIT: usize = 1000;

/// The `depth_in_kind` level of directly searchable leaf entries.
pub const LEAF_DEPTH: u32 = 1;
