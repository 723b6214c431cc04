use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A single detected issue with an optional suggested correction.
///
/// Fixes are identified by their 0-based position in the sequence handed to
/// `DecisionHistoryStore::init`; that position is stable for the whole session.
/// A fix without a `suggestion` is "flagged only": the reviewer can still
/// accept or reject it, but there is no replacement text to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fix {
    pub category: String,
    pub severity: Severity,
    pub confidence_tier: Tier,
    pub page: u32,            // 1-based
    pub flagged_text: String,
    pub suggestion: Option<String>,
    pub message: String,
    pub context: String,
    pub paragraph_index: Option<u32>,
}

impl Default for Fix {
    fn default() -> Self {
        Self {
            category: String::new(),
            severity: Severity::default(),
            confidence_tier: Tier::default(),
            page: 1,
            flagged_text: String::new(),
            suggestion: None,
            message: String::new(),
            context: String::new(),
            paragraph_index: None,
        }
    }
}

impl Fix {
    /// Returns `true` when the fix carries no suggested replacement.
    pub fn is_flagged_only(&self) -> bool {
        self.suggestion.as_deref().map_or(true, str::is_empty)
    }

    /// Lowercased haystack used by free-text search.
    ///
    /// Fields are joined with single spaces in this order: flagged text,
    /// suggestion, message, context, category.
    pub(crate) fn search_text(&self) -> String {
        [
            self.flagged_text.as_str(),
            self.suggestion.as_deref().unwrap_or(""),
            self.message.as_str(),
            self.context.as_str(),
            self.category.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

/// Issue severity, ordered from most to least urgent.
///
/// Text that is not one of the five known levels deserialises to `Unknown`,
/// which sorts after `Info`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
    Info,
    #[serde(other)]
    Unknown,
}

impl Severity {
    /// Sort rank used by severity navigation: `Critical` = 0 … `Unknown` = 5.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
            Severity::Info => 4,
            Severity::Unknown => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
            Severity::Info => "Info",
            Severity::Unknown => "Unknown",
        }
    }
}

impl FromStr for Severity {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            _ => Err(StoreError::UnknownValue { kind: "severity", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence classification of a fix's suggested correction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Mechanical correction, safe to apply in bulk.
    Safe,
    /// Plausible correction that a reviewer should glance at.
    #[default]
    Review,
    /// Needs a human rewrite; the suggestion is advisory only.
    Manual,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Safe => "safe",
            Tier::Review => "review",
            Tier::Manual => "manual",
        }
    }
}

impl FromStr for Tier {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "safe" => Ok(Tier::Safe),
            "review" => Ok(Tier::Review),
            "manual" => Ok(Tier::Manual),
            _ => Err(StoreError::UnknownValue { kind: "tier", value: s.to_owned() }),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reviewer's verdict on one fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accepted,
    Rejected,
}

impl Verdict {
    pub fn status(self) -> Status {
        match self {
            Verdict::Accepted => Status::Accepted,
            Verdict::Rejected => Status::Rejected,
        }
    }
}

/// One entry of the decision map.
///
/// `timestamp` is Unix milliseconds taken from the store's clock at the moment
/// the decision (or its latest note edit) was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub decision: Verdict,
    pub note: String,
    pub timestamp: i64,
}

/// Review status derived from the decision map. A fix with no entry is `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Accepted,
    Rejected,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
        }
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Status::Pending),
            "accepted" => Ok(Status::Accepted),
            "rejected" => Ok(Status::Rejected),
            _ => Err(StoreError::UnknownValue { kind: "status", value: s.to_owned() }),
        }
    }
}

/// A set of fixes intended to be decided together (e.g. same root cause).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: String,
    pub fix_indices: Vec<usize>,
    #[serde(default)]
    pub label: Option<String>,
}

/// Ordering used by next/previous traversal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationMode {
    /// Original document order.
    #[default]
    Sequential,
    /// Most severe first.
    Severity,
    /// Case-insensitive category name.
    Category,
    /// Ascending page number.
    Page,
}

impl NavigationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NavigationMode::Sequential => "sequential",
            NavigationMode::Severity => "severity",
            NavigationMode::Category => "category",
            NavigationMode::Page => "page",
        }
    }
}

impl FromStr for NavigationMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential" => Ok(NavigationMode::Sequential),
            "severity" => Ok(NavigationMode::Severity),
            "category" => Ok(NavigationMode::Category),
            "page" => Ok(NavigationMode::Page),
            other => Err(StoreError::UnknownMode(other.to_owned())),
        }
    }
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field constraints for the filtered list view. `None` means "no constraint".
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub category: Option<String>,
    pub severity: Option<Severity>,
    pub status: Option<Status>,
    pub tier: Option<Tier>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.severity.is_none()
            && self.status.is_none()
            && self.tier.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_defaults_fill_missing_fields() {
        let fix: Fix = serde_json::from_str(r#"{"category": "Grammar"}"#).unwrap();
        assert_eq!(fix.severity, Severity::Medium);
        assert_eq!(fix.confidence_tier, Tier::Review);
        assert_eq!(fix.page, 1);
        assert!(fix.is_flagged_only());
    }

    #[test]
    fn unrecognised_severity_is_unknown() {
        let fix: Fix = serde_json::from_str(r#"{"severity": "Blocker"}"#).unwrap();
        assert_eq!(fix.severity, Severity::Unknown);
        assert!(Severity::Info.rank() < Severity::Unknown.rank());
    }

    #[test]
    fn navigation_mode_rejects_unknown_text() {
        assert_eq!("page".parse::<NavigationMode>().unwrap(), NavigationMode::Page);
        assert!(matches!(
            "random".parse::<NavigationMode>(),
            Err(StoreError::UnknownMode(m)) if m == "random"
        ));
    }

    #[test]
    fn search_text_joins_fields_lowercased() {
        let fix = Fix {
            category: "Passive".into(),
            flagged_text: "Was Done".into(),
            suggestion: Some("did".into()),
            ..Fix::default()
        };
        assert_eq!(fix.search_text(), "was done did   passive");
    }
}
