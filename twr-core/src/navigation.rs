//! Navigation orderings and the search/filter predicate.
//!
//! Both are pure functions over the fix list so the store can recompute them
//! from scratch on every change. Every ordering is a stable sort with the fix
//! index as the final tiebreak, which makes repeated computation over the same
//! input return the same permutation.

use std::collections::BTreeMap;

use crate::types::{Decision, Filters, Fix, NavigationMode, Status};

/// Direction of a traversal step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Computes the full navigation permutation for `mode`.
pub fn compute_order(fixes: &[Fix], mode: NavigationMode) -> Vec<usize> {
    let mut order: Vec<usize> = (0..fixes.len()).collect();
    match mode {
        NavigationMode::Sequential => {}
        NavigationMode::Severity => {
            order.sort_by_key(|&i| (fixes[i].severity.rank(), i));
        }
        NavigationMode::Category => {
            // Lowercase once per fix rather than once per comparison.
            let keys: Vec<String> = fixes.iter().map(|f| f.category.to_lowercase()).collect();
            order.sort_by(|&a, &b| keys[a].cmp(&keys[b]).then(a.cmp(&b)));
        }
        NavigationMode::Page => {
            order.sort_by_key(|&i| (fixes[i].page, i));
        }
    }
    order
}

/// Finds the next index after `current` in `order`, walking in `direction`
/// and skipping every index for which `skip` returns `true`.
///
/// When `current` is not in `order` the walk starts from the matching end.
/// Returns `None` when no eligible index remains in that direction.
pub fn step<F>(order: &[usize], current: usize, direction: Direction, skip: F) -> Option<usize>
where
    F: Fn(usize) -> bool,
{
    let pos = order.iter().position(|&i| i == current);
    match direction {
        Direction::Forward => {
            let start = pos.map_or(0, |p| p + 1);
            order.iter().skip(start).copied().find(|&i| !skip(i))
        }
        Direction::Backward => {
            let end = pos.unwrap_or(order.len());
            order[..end].iter().rev().copied().find(|&i| !skip(i))
        }
    }
}

/// Review status of `index` derived from the decision map.
pub fn status_of(decisions: &BTreeMap<usize, Decision>, index: usize) -> Status {
    decisions
        .get(&index)
        .map_or(Status::Pending, |d| d.decision.status())
}

/// Returns `true` when `fix` satisfies every active filter and the search query.
///
/// `query_lower` must already be trimmed and lowercased; an empty query
/// matches everything. Category comparison lowercases both sides, the same
/// way the category ordering does.
pub fn matches(fix: &Fix, status: Status, query_lower: &str, filters: &Filters) -> bool {
    if let Some(category) = &filters.category {
        if fix.category.to_lowercase() != category.to_lowercase() {
            return false;
        }
    }
    if filters.severity.is_some_and(|s| s != fix.severity) {
        return false;
    }
    if filters.status.is_some_and(|s| s != status) {
        return false;
    }
    if filters.tier.is_some_and(|t| t != fix.confidence_tier) {
        return false;
    }
    query_lower.is_empty() || fix.search_text().contains(query_lower)
}

/// Indices (ascending) of fixes that pass the current search and filters.
pub fn filtered_indices(
    fixes: &[Fix],
    decisions: &BTreeMap<usize, Decision>,
    query: &str,
    filters: &Filters,
) -> Vec<usize> {
    let query_lower = query.trim().to_lowercase();
    fixes
        .iter()
        .enumerate()
        .filter(|(i, fix)| matches(fix, status_of(decisions, *i), &query_lower, filters))
        .map(|(i, _)| i)
        .collect()
}
