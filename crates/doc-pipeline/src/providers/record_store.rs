//! Record store trait for persisting processed documents

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ProcessedRecord;

/// Trait for writing processed records
///
/// Writes are unconditional puts: a record with an existing
/// `(documentId, timestamp)` key replaces it, anything else is a new row.
///
/// Implementations:
/// - `DynamoRecordStore`: Amazon DynamoDB
/// - `InMemoryRecordStore`: Process-local map, for tests
/// - `JsonLinesRecordStore`: Append-only local file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write one record to `table`
    async fn put(&self, table: &str, record: &ProcessedRecord) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
