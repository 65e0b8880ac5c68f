//! Domain types for the review pipeline
//!
//! Submissions move through a small status state machine:
//! `pending` → `in_progress` (claimed by the dispatcher) → `completed` or
//! `failed`. Terminal states are written exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer name recorded when a submission omits one
pub const DEFAULT_CUSTOMER_NAME: &str = "Anonymous";

/// Rating recorded when a submission omits one
pub const DEFAULT_RATING: f64 = 0.0;

/// Maximum characters included in event previews and analytics examples
pub const PREVIEW_MAX_CHARS: usize = 100;

/// Sentiment label attached to a whole review or a single aspect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }

    /// Parse a stored label. Unknown or empty labels read back as neutral,
    /// matching how unlabeled rows are treated everywhere downstream.
    pub fn from_label(label: &str) -> Self {
        match label {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw submission status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Waiting for the dispatcher
    Pending,
    /// Claimed by a dispatcher cycle, analysis running
    InProgress,
    /// Analysis finished, finalized review written
    Completed,
    /// Analysis or persistence failed
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::InProgress => "in_progress",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SubmissionStatus::Pending),
            "in_progress" => Some(SubmissionStatus::InProgress),
            "completed" => Some(SubmissionStatus::Completed),
            "failed" => Some(SubmissionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Completed | SubmissionStatus::Failed)
    }
}

/// A queued review awaiting (or having finished) analysis
#[derive(Debug, Clone, Serialize)]
pub struct RawSubmission {
    pub id: i64,
    pub tenant_id: String,
    pub text: String,
    pub customer_name: String,
    pub rating: f64,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    pub model_type: String,
    pub created_at: DateTime<Utc>,
}

/// A finalized, analyzed review
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: Uuid,
    pub tenant_id: String,
    pub text: String,
    pub customer_name: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
    pub overall_sentiment: Sentiment,
}

/// One aspect-level sentiment fact belonging to a finalized review
#[derive(Debug, Clone, Serialize)]
pub struct AspectFact {
    pub review_id: Uuid,
    pub term: String,
    pub category: String,
    pub sentiment: Sentiment,
}

/// One (term, category, sentiment) triple as returned by a sentiment engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aspect {
    pub term: String,
    pub category: String,
    pub sentiment: Sentiment,
}

/// Trailing time window for analytics queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPeriod {
    Daily,
    Weekly,
    Monthly,
    #[default]
    All,
}

impl ReviewPeriod {
    /// Length of the trailing window in days, or None for unbounded
    pub fn window_days(&self) -> Option<i64> {
        match self {
            ReviewPeriod::Daily => Some(1),
            ReviewPeriod::Weekly => Some(7),
            ReviewPeriod::Monthly => Some(30),
            ReviewPeriod::All => None,
        }
    }

    /// Cutoff timestamp for the window, relative to `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.window_days().map(|days| now - chrono::Duration::days(days))
    }
}

/// Truncate text for event payloads and analytics examples.
///
/// Counts characters, not bytes, so multibyte input never splits a
/// codepoint. Appends an ellipsis only when something was dropped.
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            SubmissionStatus::Pending,
            SubmissionStatus::InProgress,
            SubmissionStatus::Completed,
            SubmissionStatus::Failed,
        ] {
            assert_eq!(SubmissionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SubmissionStatus::from_str("bogus"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(!SubmissionStatus::InProgress.is_terminal());
        assert!(SubmissionStatus::Completed.is_terminal());
        assert!(SubmissionStatus::Failed.is_terminal());
    }

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("Great stay"), "Great stay");
    }

    #[test]
    fn test_preview_truncates_at_100_chars() {
        let long = "x".repeat(250);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_MAX_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn test_preview_exactly_100_chars_no_ellipsis() {
        let exact = "y".repeat(PREVIEW_MAX_CHARS);
        assert_eq!(preview(&exact), exact);
    }

    #[test]
    fn test_period_windows() {
        assert_eq!(ReviewPeriod::Daily.window_days(), Some(1));
        assert_eq!(ReviewPeriod::Weekly.window_days(), Some(7));
        assert_eq!(ReviewPeriod::Monthly.window_days(), Some(30));
        assert_eq!(ReviewPeriod::All.window_days(), None);
    }

    #[test]
    fn test_unknown_sentiment_label_reads_as_neutral() {
        assert_eq!(Sentiment::from_label("positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label(""), Sentiment::Neutral);
        assert_eq!(Sentiment::from_label("mixed"), Sentiment::Neutral);
    }
}
