//! Provider abstractions for object storage, inference, and record storage
//!
//! This module provides trait-based abstractions that allow switching between
//! AWS and local backends, and substituting fakes in tests.

pub mod aws;
pub mod inference;
pub mod local;
pub mod object_store;
pub mod ollama;
pub mod record_store;

pub use inference::{InferenceInvoker, InferenceRequest};
pub use object_store::ObjectFetcher;
pub use record_store::RecordStore;
