//! Review session state
//!
//! One session tracks one uploaded receipt from parse through review to
//! submission. Sessions live in memory only; restarting the service discards
//! them. "Idle" is not a phase here, it is the absence of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::{DraftItem, SubmissionSummary};

/// Workflow phase of a review session.
///
/// PARSING and SUBMITTING are busy phases with a remote call in flight;
/// mutating requests against a busy session are refused with a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionPhase {
    /// Receipt handed to the extraction service, waiting on the response
    Parsing,
    /// Items available for editing and inclusion toggling
    Review,
    /// Included items being written to the record store
    Submitting,
}

impl SessionPhase {
    /// True while a remote call is in flight for this session
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionPhase::Parsing | SessionPhase::Submitting)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Parsing => "PARSING",
            SessionPhase::Review => "REVIEW",
            SessionPhase::Submitting => "SUBMITTING",
        };
        write!(f, "{}", name)
    }
}

/// One receipt import in progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSession {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    /// Who is filing this receipt (one of the configured submitters)
    pub submitter: String,
    /// Draft items in receipt order; indices are stable for the session
    pub items: Vec<DraftItem>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Outcome of the most recent submit pass, kept after partial failure
    pub last_submission: Option<SubmissionSummary>,
}

impl ReviewSession {
    /// Create a new session in the PARSING phase
    pub fn new(submitter: String) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            phase: SessionPhase::Parsing,
            submitter,
            items: Vec::new(),
            started_at: now,
            updated_at: now,
            last_submission: None,
        }
    }

    pub fn transition_to(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.updated_at = Utc::now();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Number of items currently marked for submission
    pub fn included_count(&self) -> usize {
        self.items.iter().filter(|item| item.include).count()
    }

    /// Snapshot of the included items with their stable indices
    pub fn included_items(&self) -> Vec<(usize, DraftItem)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.include)
            .map(|(index, item)| (index, item.clone()))
            .collect()
    }

    /// Clear the inclusion flag on the given indices (out-of-range ignored)
    pub fn deselect(&mut self, indices: &[usize]) {
        for &index in indices {
            if let Some(item) = self.items.get_mut(index) {
                item.include = false;
            }
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft(food: &str, include: bool) -> DraftItem {
        DraftItem {
            food: food.to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
            cost: 1.0,
            notes: String::new(),
            include,
        }
    }

    #[test]
    fn test_new_session_is_parsing() {
        let session = ReviewSession::new("You".to_string());
        assert_eq!(session.phase, SessionPhase::Parsing);
        assert!(session.phase.is_busy());
        assert!(session.items.is_empty());
        assert!(session.last_submission.is_none());
    }

    #[test]
    fn test_transition_updates_phase() {
        let mut session = ReviewSession::new("You".to_string());
        session.transition_to(SessionPhase::Review);
        assert_eq!(session.phase, SessionPhase::Review);
        assert!(!session.phase.is_busy());
    }

    #[test]
    fn test_included_count_and_snapshot() {
        let mut session = ReviewSession::new("You".to_string());
        session.items = vec![draft("a", true), draft("b", false), draft("c", true)];
        assert_eq!(session.included_count(), 2);

        let included = session.included_items();
        assert_eq!(included.len(), 2);
        assert_eq!(included[0].0, 0);
        assert_eq!(included[1].0, 2);
        assert_eq!(included[1].1.food, "c");
    }

    #[test]
    fn test_deselect_clears_flags() {
        let mut session = ReviewSession::new("You".to_string());
        session.items = vec![draft("a", true), draft("b", true)];
        session.deselect(&[0, 7]);
        assert!(!session.items[0].include);
        assert!(session.items[1].include);
    }

    #[test]
    fn test_phase_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&SessionPhase::Parsing).unwrap(),
            "\"PARSING\""
        );
        assert_eq!(
            serde_json::to_string(&SessionPhase::Submitting).unwrap(),
            "\"SUBMITTING\""
        );
    }
}
