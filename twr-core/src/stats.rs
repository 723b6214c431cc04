//! Review statistics and export projections.
//!
//! Nothing here is cached: every call walks the fix list and decision map
//! again, so the numbers always reflect the latest mutation.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::Serialize;

use crate::types::{Decision, Fix, Severity, Status, Tier, Verdict};

/// Seconds per fix assumed before the reviewer has decided anything.
pub const DEFAULT_SECONDS_PER_FIX: f64 = 4.0;
/// Clamp range for the observed seconds-per-fix rate.
pub const MIN_SECONDS_PER_FIX: f64 = 1.0;
pub const MAX_SECONDS_PER_FIX: f64 = 30.0;

/// Decision counts for one slice of the fix list.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Breakdown {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub pending: usize,
}

impl Breakdown {
    fn count(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Pending => self.pending += 1,
            Status::Accepted => self.accepted += 1,
            Status::Rejected => self.rejected += 1,
        }
    }

    pub fn decided(&self) -> usize {
        self.accepted + self.rejected
    }
}

/// Snapshot of review progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub pending: usize,
    /// Fixes with no suggested replacement.
    pub flagged_only: usize,
    pub by_category: BTreeMap<String, Breakdown>,
    pub by_severity: BTreeMap<Severity, Breakdown>,
    pub by_tier: BTreeMap<Tier, Breakdown>,
    /// `(accepted + rejected) / total * 100`, one decimal; `0.0` with no fixes.
    pub progress_percent: f64,
}

/// Counts decisions across the whole fix list and its category, severity, and
/// tier slices.
pub fn compute(fixes: &[Fix], decisions: &BTreeMap<usize, Decision>) -> Statistics {
    let mut overall = Breakdown::default();
    let mut by_category: BTreeMap<String, Breakdown> = BTreeMap::new();
    let mut by_severity: BTreeMap<Severity, Breakdown> = BTreeMap::new();
    let mut by_tier: BTreeMap<Tier, Breakdown> = BTreeMap::new();
    let mut flagged_only = 0;

    for (index, fix) in fixes.iter().enumerate() {
        let status = crate::navigation::status_of(decisions, index);
        overall.count(status);
        by_category.entry(fix.category.clone()).or_default().count(status);
        by_severity.entry(fix.severity).or_default().count(status);
        by_tier.entry(fix.confidence_tier).or_default().count(status);
        if fix.is_flagged_only() {
            flagged_only += 1;
        }
    }

    Statistics {
        total: overall.total,
        accepted: overall.accepted,
        rejected: overall.rejected,
        pending: overall.pending,
        flagged_only,
        by_category,
        by_severity,
        by_tier,
        progress_percent: progress_percent(overall.decided(), overall.total),
    }
}

/// Percentage of `decided` out of `total`, rounded to one decimal place.
pub fn progress_percent(decided: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = decided as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Estimates how long the remaining `pending` fixes will take.
///
/// With nothing decided yet the default rate applies. Otherwise the observed
/// average since `session_start` is used, clamped to the min/max rate.
pub fn estimate_remaining(decided: usize, pending: usize, session_start: i64, now: i64) -> Duration {
    let per_fix = if decided == 0 {
        DEFAULT_SECONDS_PER_FIX
    } else {
        let elapsed_secs = (now - session_start).max(0) as f64 / 1000.0;
        (elapsed_secs / decided as f64).clamp(MIN_SECONDS_PER_FIX, MAX_SECONDS_PER_FIX)
    };
    Duration::from_secs_f64(per_fix * pending as f64)
}

/// One fix in an export bucket, enriched with its decision (if any).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportedFix {
    pub index: usize,
    #[serde(flatten)]
    pub fix: Fix,
    pub group_id: Option<String>,
    pub decision: Option<Verdict>,
    pub note: String,
    pub decided_at: Option<i64>,
}

/// A non-empty reviewer note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewerNote {
    pub index: usize,
    pub decision: Verdict,
    pub category: String,
    pub flagged_text: String,
    pub note: String,
    pub timestamp: i64,
}

/// Fixes partitioned by status, plus every reviewer note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportData {
    pub accepted: Vec<ExportedFix>,
    pub rejected: Vec<ExportedFix>,
    pub pending: Vec<ExportedFix>,
    pub notes: Vec<ReviewerNote>,
}

/// Builds the export projection in fix-index order.
pub fn export(
    fixes: &[Fix],
    decisions: &BTreeMap<usize, Decision>,
    group_of: &HashMap<usize, String>,
) -> ExportData {
    let mut data = ExportData {
        accepted: Vec::new(),
        rejected: Vec::new(),
        pending: Vec::new(),
        notes: Vec::new(),
    };

    for (index, fix) in fixes.iter().enumerate() {
        let decision = decisions.get(&index);
        let entry = ExportedFix {
            index,
            fix: fix.clone(),
            group_id: group_of.get(&index).cloned(),
            decision: decision.map(|d| d.decision),
            note: decision.map(|d| d.note.clone()).unwrap_or_default(),
            decided_at: decision.map(|d| d.timestamp),
        };
        match decision {
            None => data.pending.push(entry),
            Some(d) => {
                if !d.note.trim().is_empty() {
                    data.notes.push(ReviewerNote {
                        index,
                        decision: d.decision,
                        category: fix.category.clone(),
                        flagged_text: fix.flagged_text.clone(),
                        note: d.note.clone(),
                        timestamp: d.timestamp,
                    });
                }
                match d.decision {
                    Verdict::Accepted => data.accepted.push(entry),
                    Verdict::Rejected => data.rejected.push(entry),
                }
            }
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decided(verdict: Verdict, note: &str) -> Decision {
        Decision {
            decision: verdict,
            note: note.into(),
            timestamp: 1_000,
        }
    }

    #[test]
    fn progress_rounds_to_one_decimal() {
        assert_eq!(progress_percent(1, 3), 33.3);
        assert_eq!(progress_percent(2, 3), 66.7);
        assert_eq!(progress_percent(0, 0), 0.0);
        assert_eq!(progress_percent(4, 4), 100.0);
    }

    #[test]
    fn breakdowns_count_each_slice() {
        let fixes = vec![
            Fix { category: "Grammar".into(), severity: Severity::High, ..Fix::default() },
            Fix { category: "Grammar".into(), confidence_tier: Tier::Safe, ..Fix::default() },
            Fix {
                category: "Style".into(),
                suggestion: Some("use active voice".into()),
                ..Fix::default()
            },
        ];
        let mut decisions = BTreeMap::new();
        decisions.insert(0, decided(Verdict::Accepted, ""));
        decisions.insert(2, decided(Verdict::Rejected, ""));

        let stats = compute(&fixes, &decisions);
        assert_eq!((stats.accepted, stats.rejected, stats.pending), (1, 1, 1));
        assert_eq!(stats.flagged_only, 2);
        assert_eq!(
            stats.by_category["Grammar"],
            Breakdown { total: 2, accepted: 1, rejected: 0, pending: 1 }
        );
        assert_eq!(stats.by_severity[&Severity::Medium].total, 2);
        assert_eq!(stats.by_tier[&Tier::Safe].pending, 1);
        assert_eq!(stats.progress_percent, 66.7);
    }

    #[test]
    fn estimate_uses_default_rate_before_first_decision() {
        assert_eq!(estimate_remaining(0, 10, 0, 999_999), Duration::from_secs(40));
    }

    #[test]
    fn estimate_clamps_observed_rate() {
        // 2 decided in 2 seconds -> 1 s/fix, inside the clamp.
        assert_eq!(estimate_remaining(2, 5, 0, 2_000), Duration::from_secs(5));
        // 1 decided in 0.1 s -> clamped up to 1 s/fix.
        assert_eq!(estimate_remaining(1, 3, 0, 100), Duration::from_secs(3));
        // 1 decided in 10 minutes -> clamped down to 30 s/fix.
        assert_eq!(estimate_remaining(1, 2, 0, 600_000), Duration::from_secs(60));
    }

    #[test]
    fn export_partitions_and_collects_notes() {
        let fixes = vec![Fix::default(), Fix::default(), Fix::default()];
        let mut decisions = BTreeMap::new();
        decisions.insert(0, decided(Verdict::Accepted, "ok by style guide"));
        decisions.insert(1, decided(Verdict::Rejected, "   "));
        let mut groups = HashMap::new();
        groups.insert(0, "G1".to_string());

        let data = export(&fixes, &decisions, &groups);
        assert_eq!(data.accepted.len(), 1);
        assert_eq!(data.accepted[0].group_id.as_deref(), Some("G1"));
        assert_eq!(data.rejected.len(), 1);
        assert_eq!(data.pending[0].index, 2);
        assert_eq!(data.notes.len(), 1);
        assert_eq!(data.notes[0].note, "ok by style guide");
    }
}
