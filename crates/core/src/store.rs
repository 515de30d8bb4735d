//! Classification store.
//!
//! An ordered, read-mostly collection of classification entries keyed by
//! their unique code. Reads are side-effect-free and fully concurrent; the
//! hierarchy repair engine is the only writer and each of its code updates
//! is a single exclusive critical section, so no reader ever observes a
//! half-rewritten code.
//!
//! Title search keeps the SQL-LIKE semantics of the upstream dataset tooling:
//! patterns are matched case-insensitively, `%` matches any run of
//! characters, `_` matches exactly one, and a backslash escapes the next
//! pattern character so caller-supplied `%`/`_` can be matched literally.

use crate::entry::ClassificationEntry;
use crate::{ClassificationError, ClassificationResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use utoipa::ToSchema;

/// Whitelisted sort columns for list queries.
///
/// This enum is deliberately *closed*: caller-supplied sort values outside
/// the whitelist are coerced to [`SortField::Code`] rather than rejected,
/// so an unconstrained sort-column string can never reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Code,
    Title,
}

impl SortField {
    /// Coerces a caller-supplied sort parameter to a whitelisted field.
    ///
    /// Matching is case-insensitive; anything unrecognised falls back to
    /// `Code`.
    pub fn from_param(param: &str) -> Self {
        match param.to_ascii_lowercase().as_str() {
            "title" => SortField::Title,
            "code" => SortField::Code,
            _ => SortField::Code,
        }
    }
}

/// One free-text search result: the display title and the entry's code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct SearchHit {
    pub title: String,
    pub code: String,
}

/// Escapes LIKE wildcard characters in a literal search term.
///
/// Backslash, `%` and `_` are prefixed with a backslash so the term matches
/// itself rather than acting as a pattern.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive LIKE match of `pattern` against `text`.
fn like_match(pattern: &str, text: &str) -> bool {
    fn matches(p: &[char], t: &[char]) -> bool {
        match p.first() {
            None => t.is_empty(),
            Some('%') => (0..=t.len()).any(|skip| matches(&p[1..], &t[skip..])),
            Some('_') => !t.is_empty() && matches(&p[1..], &t[1..]),
            Some('\\') => match p.get(1) {
                Some(escaped) => t.first() == Some(escaped) && matches(&p[2..], &t[1..]),
                None => false,
            },
            Some(literal) => t.first() == Some(literal) && matches(&p[1..], &t[1..]),
        }
    }

    let p: Vec<char> = pattern.to_lowercase().chars().collect();
    let t: Vec<char> = text.to_lowercase().chars().collect();
    matches(&p, &t)
}

/// Ordered, read-mostly collection of classification entries keyed by code.
///
/// Cloning is cheap; all clones share the same underlying table. The
/// `BTreeMap` keeps entries in code order, which is both the default list
/// order and the guaranteed order of search results.
#[derive(Clone, Debug, Default)]
pub struct ClassificationStore {
    entries: Arc<RwLock<BTreeMap<String, ClassificationEntry>>>,
}

impl ClassificationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a loaded dataset.
    ///
    /// # Errors
    ///
    /// Returns `ClassificationError::DuplicateCode` if two entries share a
    /// code; the taxonomy requires codes to be unique.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ClassificationEntry>,
    ) -> ClassificationResult<Self> {
        let mut table = BTreeMap::new();
        for entry in entries {
            let code = entry.code.clone();
            if table.insert(code.clone(), entry).is_some() {
                return Err(ClassificationError::DuplicateCode(code));
            }
        }
        Ok(Self {
            entries: Arc::new(RwLock::new(table)),
        })
    }

    fn read(
        &self,
    ) -> ClassificationResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, ClassificationEntry>>>
    {
        self.entries
            .read()
            .map_err(|_| ClassificationError::LockPoisoned)
    }

    fn write(
        &self,
    ) -> ClassificationResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, ClassificationEntry>>>
    {
        self.entries
            .write()
            .map_err(|_| ClassificationError::LockPoisoned)
    }

    /// Number of entries in the store.
    pub fn len(&self) -> ClassificationResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> ClassificationResult<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Exact, case-sensitive lookup by code.
    ///
    /// An absent code is `Ok(None)`, not an error; only a storage failure
    /// (poisoned lock) is an `Err`.
    pub fn get_by_code(&self, code: &str) -> ClassificationResult<Option<ClassificationEntry>> {
        Ok(self.read()?.get(code).cloned())
    }

    /// Returns a page of entries ordered by the whitelisted sort field.
    ///
    /// `limit` is clamped to [`crate::constants::MAX_LIMIT`] to protect
    /// against unbounded scans. Title order uses the display title so the
    /// padding characters never influence caller-visible ordering.
    pub fn list(
        &self,
        limit: usize,
        offset: usize,
        sort: SortField,
    ) -> ClassificationResult<Vec<ClassificationEntry>> {
        let limit = limit.min(crate::constants::MAX_LIMIT);
        let table = self.read()?;

        let page = match sort {
            SortField::Code => table.values().skip(offset).take(limit).cloned().collect(),
            SortField::Title => {
                let mut all: Vec<&ClassificationEntry> = table.values().collect();
                all.sort_by(|a, b| {
                    a.display_title()
                        .cmp(b.display_title())
                        .then_with(|| a.code.cmp(&b.code))
                });
                all.into_iter().skip(offset).take(limit).cloned().collect()
            }
        };

        Ok(page)
    }

    /// LIKE-style substring search over display titles, ordered by code.
    ///
    /// # Arguments
    ///
    /// * `pattern` - A LIKE pattern as built by the query layer (escaped term
    ///   wrapped in `%` markers).
    /// * `limit` - Maximum number of hits; clamped to the store cap.
    /// * `depth_filter` - When set, only entries at that `depth_in_kind`
    ///   qualify. This is how free-text search is scoped to leaf-level
    ///   interventions rather than every ancestor category.
    pub fn search_title(
        &self,
        pattern: &str,
        limit: usize,
        depth_filter: Option<u32>,
    ) -> ClassificationResult<Vec<SearchHit>> {
        let limit = limit.min(crate::constants::MAX_LIMIT);
        let table = self.read()?;

        let hits = table
            .values()
            .filter(|e| depth_filter.map_or(true, |d| e.depth_in_kind == d))
            .filter(|e| like_match(pattern, e.display_title()))
            .take(limit)
            .map(|e| SearchHit {
                title: e.display_title().to_string(),
                code: e.code.clone(),
            })
            .collect();

        Ok(hits)
    }

    /// Atomically replaces an entry's code.
    ///
    /// Used only by the repair engine. The whole replacement happens under
    /// one write guard: concurrent readers see either the old or the new
    /// code, never a torn state, and on any error the store is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CodeNotFound` if `old` is absent and `CodeTaken` if `new`
    /// already identifies a different entry.
    pub fn update_code(&self, old: &str, new: &str) -> ClassificationResult<()> {
        if old == new {
            return Ok(());
        }

        let mut table = self.write()?;
        if !table.contains_key(old) {
            return Err(ClassificationError::CodeNotFound(old.to_string()));
        }
        if table.contains_key(new) {
            return Err(ClassificationError::CodeTaken(new.to_string()));
        }

        let mut entry = table.remove(old).ok_or_else(|| {
            // contains_key above makes this unreachable short of a logic bug
            ClassificationError::CodeNotFound(old.to_string())
        })?;
        entry.code = new.to_string();
        table.insert(new.to_string(), entry);
        Ok(())
    }

    /// Clones the current contents in code order.
    ///
    /// Used by the repair engine to scan a stable snapshot and by the CLI to
    /// persist a corrected dataset.
    pub fn snapshot(&self) -> ClassificationResult<Vec<ClassificationEntry>> {
        Ok(self.read()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ClassKind;

    fn entry(code: &str, title: &str, depth: u32) -> ClassificationEntry {
        ClassificationEntry {
            code: code.to_string(),
            title: title.to_string(),
            block_id: "B1".to_string(),
            kind: ClassKind::Target,
            depth_in_kind: depth,
        }
    }

    fn store(entries: Vec<ClassificationEntry>) -> ClassificationStore {
        ClassificationStore::from_entries(entries).expect("unique codes")
    }

    #[test]
    fn from_entries_rejects_duplicate_codes() {
        let err = ClassificationStore::from_entries(vec![
            entry("IAA", "One", 1),
            entry("IAA", "Two", 1),
        ])
        .expect_err("duplicate code must fail");
        assert!(matches!(err, ClassificationError::DuplicateCode(code) if code == "IAA"));
    }

    #[test]
    fn lookup_is_case_sensitive_and_absence_is_none() {
        let s = store(vec![entry("KBO.JB.AE", "Removal of appendix", 1)]);
        assert!(s.get_by_code("KBO.JB.AE").unwrap().is_some());
        assert!(s.get_by_code("kbo.jb.ae").unwrap().is_none());
        assert!(s.get_by_code("ZZZ").unwrap().is_none());
    }

    #[test]
    fn list_defaults_to_code_order() {
        let s = store(vec![
            entry("C", "Alpha", 1),
            entry("A", "Charlie", 1),
            entry("B", "Bravo", 1),
        ]);
        let codes: Vec<String> = s
            .list(10, 0, SortField::Code)
            .unwrap()
            .into_iter()
            .map(|e| e.code)
            .collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
    }

    #[test]
    fn list_by_title_uses_display_title() {
        let s = store(vec![
            entry("A", "- - Zygoma repair", 1),
            entry("B", "Appendectomy", 1),
        ]);
        let codes: Vec<String> = s
            .list(10, 0, SortField::Title)
            .unwrap()
            .into_iter()
            .map(|e| e.code)
            .collect();
        // "Appendectomy" < "Zygoma repair" once padding is stripped
        assert_eq!(codes, vec!["B", "A"]);
    }

    #[test]
    fn list_clamps_limit_to_cap() {
        let entries: Vec<_> = (0..1200)
            .map(|i| entry(&format!("C{i:04}"), "Title", 1))
            .collect();
        let s = store(entries);
        assert_eq!(s.list(5000, 0, SortField::Code).unwrap().len(), 1000);
    }

    #[test]
    fn sort_param_whitelist_coerces_unknown_to_code() {
        assert_eq!(SortField::from_param("Title"), SortField::Title);
        assert_eq!(SortField::from_param("code"), SortField::Code);
        assert_eq!(
            SortField::from_param("code; DROP TABLE entries"),
            SortField::Code
        );
        assert_eq!(SortField::from_param(""), SortField::Code);
    }

    #[test]
    fn search_matches_substring_case_insensitively_in_code_order() {
        let s = store(vec![
            entry("ZBO", "Grand appendix review", 1),
            entry("KBO.JB.AE", "Removal of appendix", 1),
        ]);
        let hits = s.search_title("%append%", 10, None).unwrap();
        let codes: Vec<&str> = hits.iter().map(|h| h.code.as_str()).collect();
        assert_eq!(codes, vec!["KBO.JB.AE", "ZBO"]);
    }

    #[test]
    fn search_never_returns_padded_titles() {
        let s = store(vec![entry("IAA.BA.BC", "- - Drainage of abscess", 1)]);
        let hits = s.search_title("%drainage%", 10, None).unwrap();
        assert_eq!(hits[0].title, "Drainage of abscess");
    }

    #[test]
    fn escaped_wildcards_match_literally() {
        let s = store(vec![
            entry("A", "Reduction 100% manual", 1),
            entry("B", "Reduction 100 of manual", 1),
            entry("C", "under_score title", 1),
            entry("D", "underscore title", 1),
        ]);

        let pattern = format!("%{}%", escape_like("100%"));
        let hits = s.search_title(&pattern, 10, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "A");

        let pattern = format!("%{}%", escape_like("under_score"));
        let hits = s.search_title(&pattern, 10, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "C");
    }

    #[test]
    fn unescaped_wildcards_still_act_as_wildcards() {
        let s = store(vec![entry("A", "Reduction 100 of manual", 1)]);
        assert_eq!(s.search_title("%100%manual%", 10, None).unwrap().len(), 1);
        assert_eq!(s.search_title("%10_ of%", 10, None).unwrap().len(), 1);
    }

    #[test]
    fn depth_filter_is_applied_and_stable() {
        let s = store(vec![
            entry("A", "Drainage", 2),
            entry("B", "Drainage of abscess", 1),
        ]);
        let first = s.search_title("%drainage%", 10, Some(1)).unwrap();
        let second = s.search_title("%drainage%", 10, Some(1)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].code, "B");
    }

    #[test]
    fn update_code_is_atomic_and_checked() {
        let s = store(vec![entry("HFA", "Drainage", 2), entry("HFA.BA", "X", 1)]);

        let err = s.update_code("HFA", "HFA.BA").expect_err("target taken");
        assert!(matches!(err, ClassificationError::CodeTaken(_)));
        // failed update must leave the store untouched
        assert!(s.get_by_code("HFA").unwrap().is_some());

        let err = s.update_code("NOPE", "NOPE.X").expect_err("missing source");
        assert!(matches!(err, ClassificationError::CodeNotFound(_)));

        s.update_code("HFA", "HFA.BB").expect("valid update");
        assert!(s.get_by_code("HFA").unwrap().is_none());
        assert_eq!(s.get_by_code("HFA.BB").unwrap().unwrap().code, "HFA.BB");
    }
}
