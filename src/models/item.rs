//! Receipt item types
//!
//! `ExtractedItem` is the strict decode target for the extraction service
//! response. `DraftItem` is the editable review-stage form of the same item,
//! carrying the inclusion flag that decides whether it is written to the
//! record store on submit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One perishable item as returned by the extraction service.
///
/// Decoding is strict: unknown fields are rejected, `food` and `expiry_date`
/// are mandatory. A response that does not match this shape fails the parse
/// rather than being repaired.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedItem {
    /// Item name as printed on the receipt, cleaned up
    pub food: String,
    /// Estimated expiry date (ISO 8601 calendar date)
    pub expiry_date: NaiveDate,
    /// Purchase price, 0.0 when the receipt line had no readable price
    #[serde(default)]
    pub cost: f64,
    /// Free-form note (storage hint etc.), may be empty
    #[serde(default)]
    pub notes: String,
}

/// One item on the review screen.
///
/// Every field is user-editable; `include` starts true and gates whether the
/// item is sent to the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftItem {
    pub food: String,
    pub expiry_date: NaiveDate,
    pub cost: f64,
    pub notes: String,
    pub include: bool,
}

impl From<ExtractedItem> for DraftItem {
    fn from(extracted: ExtractedItem) -> Self {
        Self {
            food: extracted.food,
            expiry_date: extracted.expiry_date,
            cost: extracted.cost,
            notes: extracted.notes,
            include: true,
        }
    }
}

/// Partial update for one draft item (PATCH body).
///
/// Absent fields are left untouched. Unknown fields are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemEdit {
    pub food: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub cost: Option<f64>,
    pub notes: Option<String>,
    pub include: Option<bool>,
}

impl DraftItem {
    /// Apply an edit in place. Validation happens before this is called.
    pub fn apply(&mut self, edit: ItemEdit) {
        if let Some(food) = edit.food {
            self.food = food;
        }
        if let Some(expiry_date) = edit.expiry_date {
            self.expiry_date = expiry_date;
        }
        if let Some(cost) = edit.cost {
            self.cost = cost;
        }
        if let Some(notes) = edit.notes {
            self.notes = notes;
        }
        if let Some(include) = edit.include {
            self.include = include;
        }
    }
}

/// Why one item failed to submit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionFailure {
    pub food: String,
    pub reason: String,
}

/// Outcome of one submit pass over the included items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionSummary {
    /// How many items were attempted (the included count at submit time)
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Per-item failure details, empty on full success
    pub failures: Vec<SubmissionFailure>,
    /// True when the whole batch succeeded and the session was discarded
    pub session_cleared: bool,
}
