//! Hierarchy repair engine.
//!
//! A batch process, run independently of the query path, that scans the
//! store for malformed flat-style codes and corrects them in place by
//! inferring the proper hierarchical code from context. The heuristic links
//! a flattened entry to an ancestor whose title contains the entry's title
//! and whose code extends the entry's code, then truncates that ancestor's
//! code to its block root (first two dot segments).
//!
//! Parent selection is deterministic: when several entries qualify, the one
//! with the shortest code wins, then the lexicographically smallest. The
//! upstream implementation took whichever row the storage layer iterated
//! first, which made repair outcomes depend on iteration order; two runs of
//! this engine over the same dataset always produce identical corrections.
//!
//! Per-entry failures (for example a corrected code that is already taken)
//! are recorded in the run summary and never abort the pass.

use crate::entry::{block_code, is_flat_code, ClassificationEntry};
use crate::store::ClassificationStore;
use crate::ClassificationResult;

/// One applied code correction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrectedCode {
    pub old_code: String,
    pub new_code: String,
    /// Code of the ancestor entry the correction was derived from.
    pub parent_code: String,
}

/// One candidate whose code update failed.
#[derive(Clone, Debug)]
pub struct FailedRepair {
    pub code: String,
    pub reason: String,
}

/// Outcome of one repair run.
///
/// Partitions every repair candidate into corrected, unresolved (no
/// inferable parent) and failed (parent found but the write failed).
#[derive(Debug, Default)]
pub struct RepairSummary {
    /// Total entries scanned.
    pub scanned: usize,
    /// Entries whose code matched the flat legacy pattern.
    pub candidates: usize,
    pub corrected: Vec<CorrectedCode>,
    pub unresolved: Vec<String>,
    pub failed: Vec<FailedRepair>,
}

/// Batch repairer for malformed classification codes.
///
/// The engine must be the sole writer while it runs; each code update is a
/// single atomic store operation, so even a concurrent reader would only
/// ever observe the old or the new code.
pub struct RepairEngine {
    store: ClassificationStore,
}

impl RepairEngine {
    pub fn new(store: ClassificationStore) -> Self {
        Self { store }
    }

    /// Runs one repair pass over the whole store.
    ///
    /// Scans a snapshot taken at the start of the pass; corrections applied
    /// during the pass do not create new candidates within the same run.
    ///
    /// # Errors
    ///
    /// Only a storage failure while taking the snapshot aborts the run.
    /// Per-entry apply failures are recorded in the summary instead.
    pub fn run(&self) -> ClassificationResult<RepairSummary> {
        let entries = self.store.snapshot()?;

        let mut summary = RepairSummary {
            scanned: entries.len(),
            ..RepairSummary::default()
        };

        for candidate in entries.iter().filter(|e| is_flat_code(&e.code)) {
            summary.candidates += 1;

            match find_parent(candidate, &entries) {
                None => {
                    tracing::warn!(code = %candidate.code, "no parent inferable for flat code");
                    summary.unresolved.push(candidate.code.clone());
                }
                Some(parent) => {
                    let new_code = block_code(&parent.code).to_string();
                    if new_code == candidate.code {
                        // Parent's block root is the candidate itself; there
                        // is no corrected code to derive.
                        tracing::warn!(code = %candidate.code, parent = %parent.code, "parent block root equals candidate code");
                        summary.unresolved.push(candidate.code.clone());
                        continue;
                    }

                    match self.store.update_code(&candidate.code, &new_code) {
                        Ok(()) => {
                            tracing::info!(old = %candidate.code, new = %new_code, parent = %parent.code, "repaired classification code");
                            summary.corrected.push(CorrectedCode {
                                old_code: candidate.code.clone(),
                                new_code,
                                parent_code: parent.code.clone(),
                            });
                        }
                        Err(e) => {
                            tracing::warn!(code = %candidate.code, error = %e, "failed to apply code correction");
                            summary.failed.push(FailedRepair {
                                code: candidate.code.clone(),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        tracing::info!(
            scanned = summary.scanned,
            candidates = summary.candidates,
            corrected = summary.corrected.len(),
            unresolved = summary.unresolved.len(),
            failed = summary.failed.len(),
            "repair pass complete"
        );

        Ok(summary)
    }
}

/// Finds the best parent for a flat-coded candidate.
///
/// A parent is any other entry whose display title contains the candidate's
/// display title and whose code starts with the candidate's code. Among
/// several qualifying parents the closest ancestor wins: shortest code
/// first, then lexicographically smallest.
fn find_parent<'a>(
    candidate: &ClassificationEntry,
    entries: &'a [ClassificationEntry],
) -> Option<&'a ClassificationEntry> {
    let title = candidate.display_title();

    entries
        .iter()
        .filter(|p| p.code != candidate.code)
        .filter(|p| p.code.starts_with(&candidate.code))
        .filter(|p| p.display_title().contains(title))
        .min_by(|a, b| {
            a.code
                .len()
                .cmp(&b.code.len())
                .then_with(|| a.code.cmp(&b.code))
        })
}
