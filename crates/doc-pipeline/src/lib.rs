//! doc-pipeline: event-driven document analysis
//!
//! Each object-created notification is turned into one stored record: the
//! object's text is fetched, sent to a hosted model with a fixed analysis
//! prompt, and the model's full response is written to a key-value table
//! keyed by document id and write time.
//!
//! The three collaborators sit behind traits in [`providers`], with an AWS
//! implementation (S3, Bedrock runtime, DynamoDB) and a local one
//! (filesystem, Ollama, JSON-lines file).

pub mod config;
pub mod error;
pub mod processing;
pub mod providers;
pub mod types;

pub use config::{BackendProvider, PipelineConfig};
pub use error::{Error, Result};
pub use processing::{BatchOutcome, DocumentDispatcher, WrittenRecord};
pub use types::{NotificationBatch, NotificationRecord, ProcessedRecord, RecordStatus};
