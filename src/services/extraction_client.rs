//! Receipt extraction client
//!
//! Sends the uploaded receipt PDF to the Anthropic Messages API and decodes
//! the reply into `ExtractedItem`s. The reply must be exactly the requested
//! JSON array (markdown fences are tolerated and stripped); anything else
//! fails the parse rather than being repaired.

use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::ExtractedItem;

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2000;
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Typical fridge lifespans quoted in the extraction prompt
const FRIDGE_LIFE_GUIDE: &[(&str, &str)] = &[
    ("Chicken/ground meat", "2 days"),
    ("Whole cuts of meat (steak, roast)", "3-5 days"),
    ("Fresh fish/seafood", "1-2 days"),
    ("Eggs", "35 days"),
    ("Milk/cream", "7-10 days"),
    ("Hard cheese", "21 days"),
    ("Soft cheese/deli items", "5-7 days"),
    ("Fresh herbs", "7-10 days"),
    ("Leafy greens/sprouts", "5-7 days"),
    ("Berries/soft fruit", "5-7 days"),
    ("Hardy produce (carrots, cabbage, onions)", "14-21 days"),
    ("Tomatoes", "5-7 days"),
    ("Pre-packaged deli items", "5 days"),
];

/// Extraction client errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Extraction service returned no content")]
    EmptyResponse,

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Extraction seam. The HTTP client below is the production implementation;
/// tests substitute their own.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    /// Extract perishable items from a receipt PDF. `reference_date` anchors
    /// the expiry estimates ("today" from the service's point of view).
    async fn extract(
        &self,
        pdf: &[u8],
        reference_date: NaiveDate,
    ) -> Result<Vec<ExtractedItem>, ExtractionError>;
}

// Messages API request/response structures
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Document { source: DocumentSource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct DocumentSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text { text: String },
}

/// Messages API client
pub struct ExtractionClient {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ExtractionClient {
    pub fn new(api_key: String, model: String) -> Result<Self, ExtractionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ExtractionError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl ReceiptExtractor for ExtractionClient {
    async fn extract(
        &self,
        pdf: &[u8],
        reference_date: NaiveDate,
    ) -> Result<Vec<ExtractedItem>, ExtractionError> {
        let pdf_b64 = base64::engine::general_purpose::STANDARD.encode(pdf);

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Document {
                        source: DocumentSource {
                            source_type: "base64".to_string(),
                            media_type: "application/pdf".to_string(),
                            data: pdf_b64,
                        },
                    },
                    ContentBlock::Text {
                        text: build_prompt(reference_date),
                    },
                ],
            }],
        };

        tracing::debug!(
            model = %self.model,
            pdf_bytes = pdf.len(),
            "Sending receipt to extraction service"
        );

        let response = self
            .http_client
            .post(format!("{}/messages", API_BASE))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::ApiError(status.as_u16(), error_text));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::ParseError(e.to_string()))?;

        let text = parsed
            .content
            .into_iter()
            .map(|block| match block {
                ResponseBlock::Text { text } => text,
            })
            .next()
            .ok_or(ExtractionError::EmptyResponse)?;

        let items = decode_items(&text)?;

        tracing::info!(
            item_count = items.len(),
            model = %self.model,
            "Extracted perishable items from receipt"
        );

        Ok(items)
    }
}

/// Build the extraction prompt anchored at `reference_date`
fn build_prompt(reference_date: NaiveDate) -> String {
    let guide = FRIDGE_LIFE_GUIDE
        .iter()
        .map(|(food, life)| format!("- {}: {}", food, life))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are analyzing a grocery store receipt. Today's date is {reference_date}.\n\
         \n\
         Your job is to:\n\
         1. Identify ONLY perishable food items that belong in a refrigerator (produce, meat, dairy, deli, fresh items)\n\
         2. IGNORE non-perishables like canned goods, dry goods, beverages, cleaning products, spices, oils, etc.\n\
         3. For each perishable item, estimate a realistic expiry date based on typical fridge life\n\
         \n\
         Return ONLY a JSON array with no other text, like this:\n\
         [\n  \
         {{\"food\": \"Chicken Thighs\", \"expiry_date\": \"2026-02-21\", \"cost\": 8.22, \"notes\": \"6.37lb\"}},\n  \
         ...\n\
         ]\n\
         \n\
         Use these typical fridge lifespans as a guide:\n\
         {guide}\n\
         \n\
         Be conservative: it is better to flag something as expiring sooner than later.\n\
         Only return the JSON array, nothing else."
    )
}

/// Strip markdown code fences some replies wrap around the array
fn strip_fences(raw: &str) -> &str {
    if raw.contains("```json") {
        raw.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(raw)
            .trim()
    } else if raw.contains("```") {
        raw.split("```")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(raw)
            .trim()
    } else {
        raw.trim()
    }
}

/// Decode the reply text into items, strictly.
///
/// Shape errors, unknown fields, invalid dates, empty food names and
/// negative costs all fail the whole parse.
fn decode_items(raw: &str) -> Result<Vec<ExtractedItem>, ExtractionError> {
    let json_text = strip_fences(raw);

    let items: Vec<ExtractedItem> = serde_json::from_str(json_text).map_err(|e| {
        ExtractionError::ParseError(format!("response is not the expected item array: {}", e))
    })?;

    for (index, item) in items.iter().enumerate() {
        if item.food.trim().is_empty() {
            return Err(ExtractionError::ParseError(format!(
                "item {} has an empty food name",
                index
            )));
        }
        if !item.cost.is_finite() || item.cost < 0.0 {
            return Err(ExtractionError::ParseError(format!(
                "item {} ({}) has invalid cost {}",
                index, item.food, item.cost
            )));
        }
    }

    Ok(items)
}
