//! Service layer: external clients and the session controller

pub mod extraction_client;
pub mod record_store_client;
pub mod session_controller;

pub use extraction_client::{ExtractionClient, ExtractionError, ReceiptExtractor};
pub use record_store_client::{RecordStoreClient, RecordStoreError, RecordWriter};
pub use session_controller::{SessionController, SessionError};
