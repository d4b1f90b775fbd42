//! Core types for the document pipeline

pub mod notification;
pub mod record;

pub use notification::{decode_object_key, NotificationBatch, NotificationRecord};
pub use record::{ProcessedRecord, RecordStatus, KEY_SCHEMA};
