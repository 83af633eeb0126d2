//! Issue records: the structured artifact assembled across turns.
//!
//! An [`IssueDraft`] accumulates field values over several user replies. The
//! merge is a field-wise coalesce on presence: an incoming value wins only if
//! it is present and, for strings, non-blank after trimming; a prior value is
//! never cleared by an absent or blank update. Completeness is evaluated over
//! the three mandatory fields only.

use chrono::Local;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed category set for an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum IssueType {
    Infrastructure,
    Education,
    Health,
    Agriculture,
    Environment,
    Transport,
    Finance,
    #[serde(rename = "Social Welfare")]
    SocialWelfare,
    Other,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Infrastructure => "Infrastructure",
            IssueType::Education => "Education",
            IssueType::Health => "Health",
            IssueType::Agriculture => "Agriculture",
            IssueType::Environment => "Environment",
            IssueType::Transport => "Transport",
            IssueType::Finance => "Finance",
            IssueType::SocialWelfare => "Social Welfare",
            IssueType::Other => "Other",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Infrastructure" => Ok(IssueType::Infrastructure),
            "Education" => Ok(IssueType::Education),
            "Health" => Ok(IssueType::Health),
            "Agriculture" => Ok(IssueType::Agriculture),
            "Environment" => Ok(IssueType::Environment),
            "Transport" => Ok(IssueType::Transport),
            "Finance" => Ok(IssueType::Finance),
            "Social Welfare" => Ok(IssueType::SocialWelfare),
            "Other" => Ok(IssueType::Other),
            other => Err(format!("unknown issue type: {other}")),
        }
    }
}

/// Ordinal severity, inferred from context rather than asked for directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Persistence-facing lifecycle status. Not part of the collection record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueStatus {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "saved")]
    Saved,
    #[serde(rename = "not-saved")]
    NotSaved,
}

impl IssueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Completed => "completed",
            IssueStatus::Saved => "saved",
            IssueStatus::NotSaved => "not-saved",
        }
    }
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-progress" => Ok(IssueStatus::InProgress),
            "completed" => Ok(IssueStatus::Completed),
            "saved" => Ok(IssueStatus::Saved),
            "not-saved" => Ok(IssueStatus::NotSaved),
            other => Err(format!("unknown issue status: {other}")),
        }
    }
}

/// The names of the three mandatory fields, in reporting order.
pub const MANDATORY_FIELDS: [&str; 3] = ["issue_type", "issue_description", "issue_location"];

/// A partially collected issue record.
///
/// Every field is optional; the collection workflow fills them in over
/// multiple turns. `issue_date`/`issue_time` default to the current date and
/// time when a reply arrives without them (see [`IssueDraft::default_timestamps`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct IssueDraft {
    /// The category of the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,

    /// Free-text description of the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_description: Option<String>,

    /// Free-text location (street, area, landmarks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_location: Option<String>,

    /// Date of the issue, `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,

    /// Time of the issue, `HH:MM` (24-hour).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_time: Option<String>,

    /// Severity, inferred from context; never required for completeness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_severity: Option<Severity>,
}

/// Take `incoming` when it carries a usable value, otherwise keep `existing`.
fn coalesce_text(incoming: &Option<String>, existing: &Option<String>) -> Option<String> {
    match incoming {
        Some(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => existing.clone(),
    }
}

impl IssueDraft {
    /// Merges a partial update into an accumulating record.
    ///
    /// Field-wise coalesce on presence: the incoming value wins if present
    /// (and non-blank after trimming, for strings); otherwise the existing
    /// value is retained. A field absent in both stays `None`. No field is
    /// ever cleared by an explicit null when a prior value existed.
    pub fn merge(existing: Option<&IssueDraft>, incoming: &IssueDraft) -> IssueDraft {
        let empty = IssueDraft::default();
        let existing = existing.unwrap_or(&empty);
        IssueDraft {
            issue_type: incoming.issue_type.or(existing.issue_type),
            issue_description: coalesce_text(&incoming.issue_description, &existing.issue_description),
            issue_location: coalesce_text(&incoming.issue_location, &existing.issue_location),
            issue_date: coalesce_text(&incoming.issue_date, &existing.issue_date),
            issue_time: coalesce_text(&incoming.issue_time, &existing.issue_time),
            issue_severity: incoming.issue_severity.or(existing.issue_severity),
        }
    }

    /// Fills `issue_date`/`issue_time` with the current local date and time
    /// when unset. Applied to incoming replies before merging.
    pub fn default_timestamps(&mut self) {
        let now = Local::now();
        if self.issue_date.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.issue_date = Some(now.format("%Y-%m-%d").to_string());
        }
        if self.issue_time.as_deref().map_or(true, |s| s.trim().is_empty()) {
            self.issue_time = Some(now.format("%H:%M").to_string());
        }
    }

    /// True iff all three mandatory fields are present and, for strings,
    /// non-blank after trimming.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names of the mandatory fields still missing, in reporting order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.issue_type.is_none() {
            missing.push("issue_type");
        }
        if self.issue_description.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("issue_description");
        }
        if self.issue_location.as_deref().map_or(true, |s| s.trim().is_empty()) {
            missing.push("issue_location");
        }
        missing
    }
}

/// Outcome of validating a batch of drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftValidation {
    /// True iff at least one draft was provided and every draft is complete.
    pub all_complete: bool,
    /// Missing mandatory fields per incomplete draft, as `(index, fields)`.
    pub missing_by_draft: Vec<(usize, Vec<&'static str>)>,
    /// True iff the input was empty: never silently "complete".
    pub no_drafts: bool,
}

impl DraftValidation {
    /// Human-readable summary lines, one per incomplete draft (1-based), or
    /// the sentinel line when no drafts were provided.
    pub fn summary(&self) -> Vec<String> {
        if self.no_drafts {
            return vec!["No issues provided".to_string()];
        }
        self.missing_by_draft
            .iter()
            .map(|(idx, fields)| format!("Issue {}: {}", idx + 1, fields.join(", ")))
            .collect()
    }
}

/// Validates every draft in a batch.
///
/// Empty input is incomplete with the "No issues provided" sentinel. Absent
/// or blank fields degrade to "missing"; validation never fails.
pub fn validate_drafts(drafts: &[IssueDraft]) -> DraftValidation {
    if drafts.is_empty() {
        return DraftValidation {
            all_complete: false,
            missing_by_draft: Vec::new(),
            no_drafts: true,
        };
    }

    let mut missing_by_draft = Vec::new();
    for (idx, draft) in drafts.iter().enumerate() {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            missing_by_draft.push((idx, missing));
        }
    }

    DraftValidation {
        all_complete: missing_by_draft.is_empty(),
        missing_by_draft,
        no_drafts: false,
    }
}
