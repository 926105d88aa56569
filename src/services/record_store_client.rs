//! Record store client
//!
//! Writes reviewed items into the fridge tracker, a Notion database. One
//! item becomes one page; submission calls this once per included item so a
//! single failure never aborts the rest of the batch.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::DraftItem;

const NOTION_API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Filled into the Notes column when the reviewer left it blank
const DEFAULT_NOTES: &str = "Via receipt import";

/// Record store client errors
#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Record store rejected the integration token")]
    InvalidToken,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

/// Record store seam. The HTTP client below is the production
/// implementation; tests substitute their own.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    /// Create one tracker record for an item the reviewer kept included
    async fn create_record(&self, item: &DraftItem, submitter: &str)
        -> Result<(), RecordStoreError>;
}

// Page creation request structures, shaped for the Notion pages endpoint
#[derive(Debug, Serialize)]
struct CreatePageRequest {
    parent: Parent,
    properties: PageProperties,
}

#[derive(Debug, Serialize)]
struct Parent {
    database_id: String,
}

#[derive(Debug, Serialize)]
struct PageProperties {
    #[serde(rename = "Food")]
    food: TitleProperty,
    #[serde(rename = "Date Added")]
    date_added: DateProperty,
    #[serde(rename = "Expires")]
    expires: DateProperty,
    #[serde(rename = "Meal Cost")]
    meal_cost: NumberProperty,
    #[serde(rename = "Added By")]
    added_by: SelectProperty,
    #[serde(rename = "Notes")]
    notes: RichTextProperty,
    #[serde(rename = "Archived")]
    archived: CheckboxProperty,
}

#[derive(Debug, Serialize)]
struct TitleProperty {
    title: Vec<TextFragment>,
}

#[derive(Debug, Serialize)]
struct RichTextProperty {
    rich_text: Vec<TextFragment>,
}

#[derive(Debug, Serialize)]
struct TextFragment {
    text: TextContent,
}

#[derive(Debug, Serialize)]
struct TextContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct DateProperty {
    date: DateValue,
}

#[derive(Debug, Serialize)]
struct DateValue {
    start: NaiveDate,
}

#[derive(Debug, Serialize)]
struct NumberProperty {
    number: f64,
}

#[derive(Debug, Serialize)]
struct SelectProperty {
    select: SelectValue,
}

#[derive(Debug, Serialize)]
struct SelectValue {
    name: String,
}

#[derive(Debug, Serialize)]
struct CheckboxProperty {
    checkbox: bool,
}

/// Error body returned by the record store API
#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Notion pages API client
pub struct RecordStoreClient {
    http_client: reqwest::Client,
    token: String,
    database_id: String,
}

impl RecordStoreClient {
    pub fn new(token: String, database_id: String) -> Result<Self, RecordStoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RecordStoreError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            token,
            database_id,
        })
    }

    fn build_request(
        &self,
        item: &DraftItem,
        submitter: &str,
        added_on: NaiveDate,
    ) -> CreatePageRequest {
        let notes = if item.notes.trim().is_empty() {
            DEFAULT_NOTES.to_string()
        } else {
            item.notes.clone()
        };

        CreatePageRequest {
            parent: Parent {
                database_id: self.database_id.clone(),
            },
            properties: PageProperties {
                food: TitleProperty {
                    title: vec![TextFragment {
                        text: TextContent {
                            content: item.food.clone(),
                        },
                    }],
                },
                date_added: DateProperty {
                    date: DateValue { start: added_on },
                },
                expires: DateProperty {
                    date: DateValue {
                        start: item.expiry_date,
                    },
                },
                meal_cost: NumberProperty { number: item.cost },
                added_by: SelectProperty {
                    select: SelectValue {
                        name: submitter.to_string(),
                    },
                },
                notes: RichTextProperty {
                    rich_text: vec![TextFragment {
                        text: TextContent { content: notes },
                    }],
                },
                archived: CheckboxProperty { checkbox: false },
            },
        }
    }
}

#[async_trait]
impl RecordWriter for RecordStoreClient {
    async fn create_record(
        &self,
        item: &DraftItem,
        submitter: &str,
    ) -> Result<(), RecordStoreError> {
        let body = self.build_request(item, submitter, Local::now().date_naive());

        tracing::debug!(food = %item.food, "Writing item to record store");

        let response = self
            .http_client
            .post(format!("{}/pages", NOTION_API_BASE))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", NOTION_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RecordStoreError::NetworkError(e.to_string()))?;

        let status = response.status();

        if status == 401 {
            return Err(RecordStoreError::InvalidToken);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StoreErrorBody>(&error_text)
                .ok()
                .and_then(|body| match (body.code, body.message) {
                    (Some(code), Some(message)) => Some(format!("{}: {}", code, message)),
                    (None, Some(message)) => Some(message),
                    _ => None,
                })
                .unwrap_or(error_text);
            return Err(RecordStoreError::ApiError(status.as_u16(), message));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item(notes: &str) -> DraftItem {
        DraftItem {
            food: "Chicken Thighs".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2025, 3, 17).unwrap(),
            cost: 8.22,
            notes: notes.to_string(),
            include: true,
        }
    }

    fn client() -> RecordStoreClient {
        RecordStoreClient::new("secret-token".to_string(), "db-123".to_string()).unwrap()
    }

    #[test]
    fn test_build_request_payload_shape() {
        let item = sample_item("6.37lb");
        let added_on = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let body = client().build_request(&item, "You", added_on);

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["parent"]["database_id"], "db-123");

        let props = &value["properties"];
        assert_eq!(
            props["Food"]["title"][0]["text"]["content"],
            "Chicken Thighs"
        );
        assert_eq!(props["Date Added"]["date"]["start"], "2025-03-15");
        assert_eq!(props["Expires"]["date"]["start"], "2025-03-17");
        assert_eq!(props["Meal Cost"]["number"], 8.22);
        assert_eq!(props["Added By"]["select"]["name"], "You");
        assert_eq!(props["Notes"]["rich_text"][0]["text"]["content"], "6.37lb");
        assert_eq!(props["Archived"]["checkbox"], false);
    }

    #[test]
    fn test_build_request_defaults_blank_notes() {
        let item = sample_item("   ");
        let added_on = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let body = client().build_request(&item, "Partner", added_on);

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value["properties"]["Notes"]["rich_text"][0]["text"]["content"],
            DEFAULT_NOTES
        );
    }

    #[test]
    fn test_error_body_message_extraction() {
        let raw = r#"{"object": "error", "status": 400, "code": "validation_error", "message": "Expires is expected to be date."}"#;
        let body: StoreErrorBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.code.as_deref(), Some("validation_error"));
        assert!(body.message.unwrap().contains("Expires"));
    }

    #[test]
    fn test_client_creation() {
        assert!(RecordStoreClient::new("t".to_string(), "db".to_string()).is_ok());
    }
}
