//! Plain-text formatting for the review shell.

use std::time::Duration;

use twr_core::{Decision, ExportData, Fix, Statistics, Status};

/// One-screen summary of a fix and its current decision.
pub fn fix_card(index: usize, position: usize, total: usize, fix: &Fix, decision: Option<&Decision>) -> String {
    let status = decision.map_or(Status::Pending, |d| d.decision.status());
    let mut out = format!(
        "[{position}/{total}] #{index} {severity} {category} (page {page}, {tier}) - {status}\n",
        severity = fix.severity,
        category = fix.category,
        page = fix.page,
        tier = fix.confidence_tier,
        status = status.as_str(),
    );
    out.push_str(&format!("  flagged:    {}\n", fix.flagged_text));
    match fix.suggestion.as_deref().filter(|s| !s.is_empty()) {
        Some(suggestion) => out.push_str(&format!("  suggestion: {suggestion}\n")),
        None => out.push_str("  suggestion: (flagged only)\n"),
    }
    if !fix.message.is_empty() {
        out.push_str(&format!("  message:    {}\n", fix.message));
    }
    if let Some(note) = decision.map(|d| d.note.as_str()).filter(|n| !n.is_empty()) {
        out.push_str(&format!("  note:       {note}\n"));
    }
    out.trim_end().to_owned()
}

/// Formats a duration as `~Ns`, `~Nm`, or `~Nh Mm`.
pub fn eta(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("~{secs}s")
    } else if secs < 3600 {
        format!("~{}m", (secs + 30) / 60)
    } else {
        format!("~{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

pub fn statistics(stats: &Statistics, remaining: Duration) -> String {
    let mut out = format!(
        "{accepted} accepted, {rejected} rejected, {pending} pending of {total} ({pct:.1}%), {eta} left\n",
        accepted = stats.accepted,
        rejected = stats.rejected,
        pending = stats.pending,
        total = stats.total,
        pct = stats.progress_percent,
        eta = eta(remaining),
    );
    for (category, b) in &stats.by_category {
        out.push_str(&format!(
            "  {category:<20} {}/{} decided\n",
            b.decided(),
            b.total
        ));
    }
    out.trim_end().to_owned()
}

pub fn export_summary(data: &ExportData) -> String {
    format!(
        "export: {} accepted, {} rejected, {} pending, {} notes",
        data.accepted.len(),
        data.rejected.len(),
        data.pending.len(),
        data.notes.len()
    )
}

/// Command reference printed by `help`.
pub const HELP: &str = "\
Decisions:   accept [note] | reject [note] | clear | note <text>
Bulk:        group-accept <id> [note] | group-reject <id> [note]
             tier <safe|review|manual> | accept-all | reject-all
History:     undo | redo
Navigation:  next | next-all | prev | prev-pending | goto <index> | show
             mode <sequential|severity|category|page>
Search:      search <text> | filter <category|severity|status|tier> <value> | unfilter | list
Session:     stats | export | save | help | quit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_picks_units() {
        assert_eq!(eta(Duration::from_secs(42)), "~42s");
        assert_eq!(eta(Duration::from_secs(150)), "~3m");
        assert_eq!(eta(Duration::from_secs(7_260)), "~2h 1m");
    }

    #[test]
    fn flagged_only_fix_says_so() {
        let card = fix_card(0, 1, 1, &Fix::default(), None);
        assert!(card.contains("(flagged only)"));
        assert!(card.contains("pending"));
    }
}
