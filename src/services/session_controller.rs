//! Session controller
//!
//! Owns the in-memory session store and drives the import workflow:
//! upload -> parse -> review/edit -> submit. The store lock is never held
//! across a remote call; handlers snapshot what they need, release, do the
//! network I/O, then reacquire to apply the outcome. The phase field doubles
//! as the busy flag: mutating operations against a PARSING or SUBMITTING
//! session are refused.

use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    DraftItem, ItemEdit, ReviewSession, SessionPhase, SubmissionFailure, SubmissionSummary,
};
use crate::services::extraction_client::{ExtractionError, ReceiptExtractor};
use crate::services::record_store_client::RecordWriter;

/// Upper bound on concurrently held sessions; the oldest REVIEW-phase
/// session is evicted when a new upload would exceed it
const MAX_SESSIONS: usize = 32;

/// Session workflow errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("No item at index {0}")]
    ItemNotFound(usize),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Cannot {operation} while session is {phase}")]
    Busy {
        operation: &'static str,
        phase: SessionPhase,
    },

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Drives review sessions over the extraction and record store clients
pub struct SessionController {
    extractor: Arc<dyn ReceiptExtractor>,
    writer: Arc<dyn RecordWriter>,
    sessions: RwLock<HashMap<Uuid, ReviewSession>>,
}

impl SessionController {
    pub fn new(extractor: Arc<dyn ReceiptExtractor>, writer: Arc<dyn RecordWriter>) -> Self {
        Self {
            extractor,
            writer,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a new session: store it in PARSING, run extraction, then land
    /// in REVIEW. A failed parse discards the session entirely, so the
    /// caller is back where they started. The upload is dropped once
    /// extraction returns; it is never retained.
    pub async fn start_session(
        &self,
        pdf: Vec<u8>,
        submitter: String,
    ) -> Result<ReviewSession, SessionError> {
        let session = ReviewSession::new(submitter);
        let session_id = session.session_id;

        {
            let mut sessions = self.sessions.write().await;
            evict_if_full(&mut sessions)?;
            sessions.insert(session_id, session);
        }

        tracing::info!(session_id = %session_id, "Receipt uploaded, parsing");

        let outcome = self.extractor.extract(&pdf, Local::now().date_naive()).await;

        let mut sessions = self.sessions.write().await;
        match outcome {
            Ok(items) => {
                let session = sessions
                    .get_mut(&session_id)
                    .ok_or_else(|| vanished(session_id))?;
                session.items = items.into_iter().map(DraftItem::from).collect();
                session.transition_to(SessionPhase::Review);
                tracing::info!(
                    session_id = %session_id,
                    item_count = session.items.len(),
                    "Receipt parsed, session ready for review"
                );
                Ok(session.clone())
            }
            Err(e) => {
                sessions.remove(&session_id);
                tracing::warn!(session_id = %session_id, error = %e, "Receipt parse failed, session discarded");
                Err(SessionError::Extraction(e))
            }
        }
    }

    /// Re-run extraction for an existing session with a freshly supplied
    /// receipt, replacing the draft items. On failure the previous items
    /// and phase are kept.
    pub async fn reparse(
        &self,
        session_id: Uuid,
        pdf: Vec<u8>,
    ) -> Result<ReviewSession, SessionError> {
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            require_review(session, "re-parse")?;
            session.transition_to(SessionPhase::Parsing);
        }

        tracing::info!(session_id = %session_id, "Re-parsing receipt");

        let outcome = self.extractor.extract(&pdf, Local::now().date_naive()).await;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| vanished(session_id))?;
        match outcome {
            Ok(items) => {
                session.items = items.into_iter().map(DraftItem::from).collect();
                session.last_submission = None;
                session.transition_to(SessionPhase::Review);
                tracing::info!(
                    session_id = %session_id,
                    item_count = session.items.len(),
                    "Receipt re-parsed"
                );
                Ok(session.clone())
            }
            Err(e) => {
                session.transition_to(SessionPhase::Review);
                tracing::warn!(session_id = %session_id, error = %e, "Re-parse failed, keeping previous items");
                Err(SessionError::Extraction(e))
            }
        }
    }

    pub async fn get_session(&self, session_id: Uuid) -> Result<ReviewSession, SessionError> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session_id)
            .cloned()
            .ok_or(SessionError::NotFound(session_id))
    }

    /// Apply a partial edit to one draft item
    pub async fn edit_item(
        &self,
        session_id: Uuid,
        index: usize,
        edit: ItemEdit,
    ) -> Result<ReviewSession, SessionError> {
        validate_edit(&edit)?;

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        require_review(session, "edit items")?;

        let item = session
            .items
            .get_mut(index)
            .ok_or(SessionError::ItemNotFound(index))?;
        item.apply(edit);
        session.touch();

        Ok(session.clone())
    }

    /// Write the included items to the record store, one record per item.
    ///
    /// Full success discards the session. Partial failure keeps it in
    /// REVIEW with the succeeded items deselected, so a retry resubmits
    /// only the failures. No included items is a no-op.
    pub async fn submit(&self, session_id: Uuid) -> Result<SubmissionSummary, SessionError> {
        let (submitter, included) = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&session_id)
                .ok_or(SessionError::NotFound(session_id))?;
            require_review(session, "submit")?;

            let included = session.included_items();
            if included.is_empty() {
                tracing::info!(session_id = %session_id, "Submit with no included items, nothing to do");
                return Ok(SubmissionSummary {
                    submitted: 0,
                    succeeded: 0,
                    failed: 0,
                    failures: Vec::new(),
                    session_cleared: false,
                });
            }

            session.transition_to(SessionPhase::Submitting);
            (session.submitter.clone(), included)
        };

        let mut succeeded_indices = Vec::new();
        let mut failures = Vec::new();
        for (index, item) in &included {
            match self.writer.create_record(item, &submitter).await {
                Ok(()) => succeeded_indices.push(*index),
                Err(e) => {
                    tracing::warn!(
                        session_id = %session_id,
                        food = %item.food,
                        error = %e,
                        "Record store write failed"
                    );
                    failures.push(SubmissionFailure {
                        food: item.food.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let summary = SubmissionSummary {
            submitted: included.len(),
            succeeded: succeeded_indices.len(),
            failed: failures.len(),
            failures,
            session_cleared: summary_clears(included.len(), succeeded_indices.len()),
        };

        let mut sessions = self.sessions.write().await;
        if summary.session_cleared {
            sessions.remove(&session_id);
        } else {
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| vanished(session_id))?;
            session.deselect(&succeeded_indices);
            session.last_submission = Some(summary.clone());
            session.transition_to(SessionPhase::Review);
        }

        tracing::info!(
            session_id = %session_id,
            submitted = summary.submitted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            session_cleared = summary.session_cleared,
            "Submission pass complete"
        );

        Ok(summary)
    }

    /// Discard a session. Busy sessions cannot be discarded.
    pub async fn delete_session(&self, session_id: Uuid) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get(&session_id)
            .ok_or(SessionError::NotFound(session_id))?;
        if session.phase.is_busy() {
            return Err(SessionError::Busy {
                operation: "discard",
                phase: session.phase,
            });
        }
        sessions.remove(&session_id);
        tracing::info!(session_id = %session_id, "Session discarded");
        Ok(())
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

fn require_review(session: &ReviewSession, operation: &'static str) -> Result<(), SessionError> {
    if session.phase != SessionPhase::Review {
        return Err(SessionError::Busy {
            operation,
            phase: session.phase,
        });
    }
    Ok(())
}

fn validate_edit(edit: &ItemEdit) -> Result<(), SessionError> {
    if let Some(cost) = edit.cost {
        if !cost.is_finite() || cost < 0.0 {
            return Err(SessionError::InvalidInput(format!(
                "cost must be a non-negative number, got {}",
                cost
            )));
        }
    }
    Ok(())
}

fn summary_clears(submitted: usize, succeeded: usize) -> bool {
    submitted > 0 && succeeded == submitted
}

/// Busy sessions cannot be evicted or deleted, so a session disappearing
/// mid-operation indicates a bookkeeping bug
fn vanished(session_id: Uuid) -> SessionError {
    SessionError::Internal(format!("session {} vanished during operation", session_id))
}

fn evict_if_full(sessions: &mut HashMap<Uuid, ReviewSession>) -> Result<(), SessionError> {
    if sessions.len() < MAX_SESSIONS {
        return Ok(());
    }
    let oldest = sessions
        .values()
        .filter(|session| !session.phase.is_busy())
        .min_by_key(|session| session.started_at)
        .map(|session| session.session_id);
    match oldest {
        Some(session_id) => {
            sessions.remove(&session_id);
            tracing::info!(session_id = %session_id, "Evicted oldest review session to make room");
            Ok(())
        }
        None => Err(SessionError::Internal(
            "session store is full and every session is busy".to_string(),
        )),
    }
}
