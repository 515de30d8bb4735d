//! Query engine: parameter validation and result shaping on top of the
//! classification store.
//!
//! All caller-supplied parameters are normalised here, before they reach the
//! store: search terms are trimmed and rejected when empty, wildcard
//! characters are escaped so a term can never act as a pattern, pagination is
//! clamped rather than rejected, and sort fields are coerced onto the
//! whitelist. Result envelopes echo the effective parameters back so callers
//! can tell how their input was normalised, not just what was matched.

use crate::constants::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::entry::ClassificationEntry;
use crate::store::{escape_like, ClassificationStore, SearchHit, SortField};
use crate::{ClassificationError, ClassificationResult};
use serde::Serialize;
use utoipa::ToSchema;

/// A caller-supplied free-text term after normalisation.
///
/// Holds the trimmed term and is the single point where raw query input
/// becomes a store pattern: [`SearchTerm::like_pattern`] escapes every
/// `%`, `_` and `\` and wraps the result in `%` markers, so whatever the
/// caller typed is matched as a literal substring of display titles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Normalises a raw term: surrounding whitespace is dropped, interior
    /// whitespace is kept (multi-word intervention titles are common).
    ///
    /// # Errors
    ///
    /// Returns `ClassificationError::EmptyTerm` when nothing remains after
    /// trimming; an empty term is a caller error, never a match-all.
    pub fn parse(raw: &str) -> ClassificationResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ClassificationError::EmptyTerm);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The normalised term, as echoed back in the search envelope.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the store pattern for this term: escaped and `%`-wrapped.
    pub fn like_pattern(&self) -> String {
        format!("%{}%", escape_like(&self.0))
    }

    fn into_string(self) -> String {
        self.0
    }
}

/// Envelope for free-text search results.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    /// The normalised (trimmed) term that was actually searched.
    pub query: String,
    /// Number of results returned.
    pub count: usize,
    pub results: Vec<SearchHit>,
}

/// Envelope for paginated browse results.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListResponse {
    /// Number of results returned in this page.
    pub count: usize,
    /// Effective (clamped) page size.
    pub limit: usize,
    /// Effective (clamped) page offset.
    pub offset: usize,
    pub results: Vec<ClassificationEntry>,
}

/// Read-side service over the classification store.
///
/// All operations are side-effect-free; clones share the same store and may
/// be used concurrently from any number of request handlers.
#[derive(Clone)]
pub struct ClassificationService {
    store: ClassificationStore,
}

impl ClassificationService {
    pub fn new(store: ClassificationStore) -> Self {
        Self { store }
    }

    /// The underlying store, for offline tooling such as the repair batch.
    pub fn store(&self) -> &ClassificationStore {
        &self.store
    }

    /// Exact, case-sensitive lookup by code.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when no entry carries the code; this is a not-found
    /// outcome, distinct from a storage failure.
    pub fn lookup(&self, code: &str) -> ClassificationResult<Option<ClassificationEntry>> {
        self.store.get_by_code(code)
    }

    /// Free-text search over display titles.
    ///
    /// The raw term is trimmed and must be non-empty; its `%`/`_`/`\`
    /// characters are escaped and the result wrapped in `%` wildcards, so the
    /// term always matches as a literal substring. Results are ordered by
    /// code ascending.
    ///
    /// # Arguments
    ///
    /// * `raw_term` - Caller-supplied term, untrimmed.
    /// * `limit` - Requested page size; clamped to `[1, 1000]`, default 100.
    /// * `depth_filter` - Restrict to one `depth_in_kind` level when set.
    ///   The REST surface always passes `Some(1)` to scope matches to
    ///   leaf-level interventions.
    ///
    /// # Errors
    ///
    /// Returns `ClassificationError::EmptyTerm` for an empty or
    /// whitespace-only term, or a storage failure from the store.
    pub fn search(
        &self,
        raw_term: &str,
        limit: Option<i64>,
        depth_filter: Option<u32>,
    ) -> ClassificationResult<SearchResponse> {
        let term = SearchTerm::parse(raw_term)?;
        let limit = clamp_limit(limit);
        let pattern = term.like_pattern();

        tracing::debug!(term = term.as_str(), limit, ?depth_filter, "classification search");
        let results = self.store.search_title(&pattern, limit, depth_filter)?;

        Ok(SearchResponse {
            query: term.into_string(),
            count: results.len(),
            results,
        })
    }

    /// Paginated browse over the whole taxonomy.
    ///
    /// `sort` is coerced onto the `{code, title}` whitelist; `limit` and
    /// `offset` are clamped, never rejected. The envelope reports the
    /// effective values used, and every emitted title has its structural
    /// depth padding stripped.
    pub fn list(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
        sort: Option<&str>,
    ) -> ClassificationResult<ListResponse> {
        let limit = clamp_limit(limit);
        let offset = clamp_offset(offset);
        let sort = sort.map(SortField::from_param).unwrap_or_default();

        let results = self
            .store
            .list(limit, offset, sort)?
            .into_iter()
            .map(|mut entry| {
                entry.title = entry.display_title().to_string();
                entry
            })
            .collect::<Vec<_>>();

        Ok(ListResponse {
            count: results.len(),
            limit,
            offset,
            results,
        })
    }
}

/// Clamps a requested page size into `[1, MAX_LIMIT]`, defaulting to
/// [`DEFAULT_LIMIT`] when absent or non-positive.
fn clamp_limit(limit: Option<i64>) -> usize {
    match limit {
        None => DEFAULT_LIMIT,
        Some(n) if n < 1 => DEFAULT_LIMIT,
        Some(n) => (n as usize).min(MAX_LIMIT),
    }
}

/// Clamps a requested offset to `>= 0`, defaulting to 0.
fn clamp_offset(offset: Option<i64>) -> usize {
    offset.map_or(0, |n| n.max(0) as usize)
}
