//! Data models for receipt import

pub mod item;
pub mod review_session;

pub use item::{DraftItem, ExtractedItem, ItemEdit, SubmissionFailure, SubmissionSummary};
pub use review_session::{ReviewSession, SessionPhase};
