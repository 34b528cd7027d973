use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Processing state of a backend review record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Other,
}

impl ReviewStatus {
    /// Completed and failed reviews never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReviewStatus::Completed | ReviewStatus::Failed)
    }
}

/// One observation of a review: its parsed status plus the backend's JSON,
/// kept whole so callers see score and feedback unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSnapshot {
    pub status: ReviewStatus,
    pub body: Value,
}

impl ReviewSnapshot {
    /// `None` when the payload has no string `status` field.
    pub fn from_value(body: Value) -> Option<Self> {
        let status = body
            .get("status")
            .filter(|s| s.is_string())
            .cloned()
            .and_then(|s| serde_json::from_value(s).ok())?;
        Some(Self { status, body })
    }
}
