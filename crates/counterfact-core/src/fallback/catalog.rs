//! Pre-generated branches keyed by fork point.

use std::collections::BTreeMap;

use counterfact_types::{CatalogBranch, CatalogEntry, ForkProposal, branch_content_key};
use tracing::debug;

/// Keyword hits a description needs before a catalog branch qualifies.
pub const MIN_KEYWORD_MATCHES: usize = 2;

/// Catalog branches grouped by the mainline index of their fork point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchCatalog {
    entries: BTreeMap<usize, Vec<CatalogBranch>>,
}

impl BranchCatalog {
    /// Group catalog entries by event index. Entries repeating an index
    /// append to the branches already listed for it.
    pub fn new(entries: &[CatalogEntry]) -> Self {
        let mut grouped: BTreeMap<usize, Vec<CatalogBranch>> = BTreeMap::new();
        for entry in entries {
            grouped
                .entry(entry.event_index)
                .or_default()
                .extend(entry.branches.iter().cloned());
        }
        Self { entries: grouped }
    }

    /// Iterate `(event index, branches)` in index order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, &[CatalogBranch])> {
        self.entries.iter().map(|(i, b)| (*i, b.as_slice()))
    }

    /// Whether the catalog has no branches at all.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// The branch at `event_index` whose keywords best match `description`.
    ///
    /// Keywords match as case-insensitive substrings. A branch needs at least
    /// [`MIN_KEYWORD_MATCHES`] hits; among qualifying branches the highest
    /// count wins and ties go to the branch listed first.
    pub fn best_match(
        &self,
        event_index: usize,
        description: &str,
    ) -> Option<(usize, &CatalogBranch)> {
        let text = description.to_lowercase();
        let mut best: Option<(usize, usize, &CatalogBranch)> = None;

        for (branch_index, branch) in self.entries.get(&event_index)?.iter().enumerate() {
            let hits = branch
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty() && text.contains(k.as_str()))
                .count();
            if hits >= MIN_KEYWORD_MATCHES && best.is_none_or(|(_, top, _)| hits > top) {
                best = Some((branch_index, hits, branch));
            }
        }

        best.map(|(branch_index, hits, branch)| {
            debug!(event_index, branch_index, hits, "catalog branch matched");
            (branch_index, branch)
        })
    }

    /// A fork proposal built from the best matching branch, if any.
    pub fn propose(&self, event_index: usize, description: &str) -> Option<ForkProposal> {
        let (branch_index, branch) = self.best_match(event_index, description)?;
        Some(ForkProposal {
            delta: branch.delta.clone(),
            continuation_events: branch.continuation_events.clone(),
            branch_scores: branch.branch_scores,
            content_key: Some(branch_content_key(event_index, branch_index)),
        })
    }
}
