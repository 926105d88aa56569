//! Review session API handlers
//!
//! POST /api/sessions, GET/DELETE /api/sessions/:session_id,
//! POST .../parse, PATCH .../items/:index, POST .../submit

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{DraftItem, ItemEdit, ReviewSession, SessionPhase, SubmissionSummary},
    AppState,
};

/// Largest accepted receipt upload
const MAX_RECEIPT_BYTES: usize = 10 * 1024 * 1024;

/// Body limit for the multipart request as a whole, upload plus overhead
const MAX_REQUEST_BYTES: usize = MAX_RECEIPT_BYTES + 64 * 1024;

/// Session state as returned to the review UI
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub submitter: String,
    pub items: Vec<DraftItem>,
    pub included_count: usize,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_submission: Option<SubmissionSummary>,
}

impl From<ReviewSession> for SessionView {
    fn from(session: ReviewSession) -> Self {
        let included_count = session.included_count();
        Self {
            session_id: session.session_id,
            phase: session.phase,
            submitter: session.submitter,
            items: session.items,
            included_count,
            started_at: session.started_at,
            updated_at: session.updated_at,
            last_submission: session.last_submission,
        }
    }
}

/// GET /api/config response, the subset of configuration the UI needs
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub submitters: Vec<String>,
    pub extraction_model: String,
}

/// DELETE /api/sessions/:session_id response
#[derive(Debug, Serialize)]
pub struct DiscardResponse {
    pub session_id: Uuid,
    pub status: String,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        submitters: state.config.submitters.clone(),
        extraction_model: state.config.extraction_model.clone(),
    })
}

/// Fields pulled out of a multipart upload body
struct UploadFields {
    submitter: Option<String>,
    receipt: Option<Vec<u8>>,
}

async fn collect_upload(mut multipart: Multipart) -> Result<UploadFields, ApiError> {
    let mut fields = UploadFields {
        submitter: None,
        receipt: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "submitter" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable submitter field: {}", e)))?;
                fields.submitter = Some(value);
            }
            "receipt" => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Unreadable receipt field: {}", e)))?;
                fields.receipt = Some(data.to_vec());
            }
            _ => {}
        }
    }

    Ok(fields)
}

/// POST /api/sessions
///
/// Multipart upload with a `receipt` PDF and a `submitter` name. Parses the
/// receipt synchronously and returns the session ready for review. A failed
/// parse returns the error and leaves no session behind.
pub async fn create_session(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<SessionView>> {
    let UploadFields { submitter, receipt } = collect_upload(multipart).await?;

    let submitter = submitter
        .ok_or_else(|| ApiError::BadRequest("Missing form field: submitter".to_string()))?;
    if !state.config.is_known_submitter(&submitter) {
        return Err(ApiError::BadRequest(format!(
            "Unknown submitter: {}",
            submitter
        )));
    }

    let receipt = receipt
        .ok_or_else(|| ApiError::BadRequest("Missing form field: receipt".to_string()))?;
    validate_receipt(&receipt)?;

    match state.controller.start_session(receipt, submitter).await {
        Ok(session) => Ok(Json(session.into())),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

/// GET /api/sessions/:session_id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionView>> {
    let session = state.controller.get_session(session_id).await?;
    Ok(Json(session.into()))
}

/// POST /api/sessions/:session_id/parse
///
/// Re-run extraction with a freshly uploaded copy of the receipt, replacing
/// the draft items. On failure the session keeps its previous items.
pub async fn reparse_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<SessionView>> {
    let receipt = collect_upload(multipart)
        .await?
        .receipt
        .ok_or_else(|| ApiError::BadRequest("Missing form field: receipt".to_string()))?;
    validate_receipt(&receipt)?;

    match state.controller.reparse(session_id, receipt).await {
        Ok(session) => Ok(Json(session.into())),
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

/// PATCH /api/sessions/:session_id/items/:index
pub async fn edit_item(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(Uuid, usize)>,
    Json(edit): Json<ItemEdit>,
) -> ApiResult<Json<SessionView>> {
    let session = state.controller.edit_item(session_id, index, edit).await?;
    Ok(Json(session.into()))
}

/// POST /api/sessions/:session_id/submit
///
/// Write the included items to the record store. Always returns a summary;
/// per-item failures are reported in it rather than failing the request.
pub async fn submit_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SubmissionSummary>> {
    match state.controller.submit(session_id).await {
        Ok(summary) => {
            if summary.failed > 0 {
                state
                    .record_error(format!(
                        "{} of {} record store writes failed",
                        summary.failed, summary.submitted
                    ))
                    .await;
            }
            Ok(Json(summary))
        }
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

/// DELETE /api/sessions/:session_id
pub async fn discard_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<DiscardResponse>> {
    state.controller.delete_session(session_id).await?;
    Ok(Json(DiscardResponse {
        session_id,
        status: "discarded".to_string(),
    }))
}

fn validate_receipt(receipt: &[u8]) -> Result<(), ApiError> {
    if receipt.is_empty() {
        return Err(ApiError::BadRequest("Receipt file is empty".to_string()));
    }
    if receipt.len() > MAX_RECEIPT_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Receipt too large: {} bytes (limit {})",
            receipt.len(),
            MAX_RECEIPT_BYTES
        )));
    }
    if !receipt.starts_with(b"%PDF-") {
        return Err(ApiError::BadRequest(
            "Receipt must be a PDF file".to_string(),
        ));
    }
    Ok(())
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/:session_id",
            get(get_session).delete(discard_session),
        )
        .route("/api/sessions/:session_id/parse", post(reparse_session))
        .route("/api/sessions/:session_id/items/:index", patch(edit_item))
        .route("/api/sessions/:session_id/submit", post(submit_session))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
}
