//! Processed record types written to the record store

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Partition key attribute
pub const DOCUMENT_ID_ATTR: &str = "documentId";
/// Sort key attribute
pub const TIMESTAMP_ATTR: &str = "timestamp";
/// Serialized response envelope attribute
pub const CONTENT_ATTR: &str = "content";
/// Processing status attribute
pub const STATUS_ATTR: &str = "status";

/// Composite key of the record table: `(documentId, timestamp)`, both strings
pub const KEY_SCHEMA: KeySchema = KeySchema {
    partition_key: DOCUMENT_ID_ATTR,
    sort_key: TIMESTAMP_ATTR,
};

/// Key schema the record table is provisioned with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySchema {
    pub partition_key: &'static str,
    pub sort_key: &'static str,
}

/// Status of a processed record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    /// Fetch, inference and write all completed
    Processed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Processed => "PROCESSED",
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successfully processed document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedRecord {
    /// Decoded object key
    pub document_id: String,
    /// ISO-8601 write time, e.g. `2024-05-01T12:00:00.123Z`
    pub timestamp: String,
    /// Serialized inference response envelope
    pub content: String,
    pub status: RecordStatus,
}

impl ProcessedRecord {
    /// Build a successful record stamped with `written_at`
    pub fn processed(
        document_id: impl Into<String>,
        written_at: DateTime<Utc>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            timestamp: format_timestamp(written_at),
            content: content.into(),
            status: RecordStatus::Processed,
        }
    }

    /// Flat attribute map as written to the store; every value is a string
    pub fn attributes(&self) -> [(&'static str, &str); 4] {
        [
            (DOCUMENT_ID_ATTR, self.document_id.as_str()),
            (TIMESTAMP_ATTR, self.timestamp.as_str()),
            (CONTENT_ATTR, self.content.as_str()),
            (STATUS_ATTR, self.status.as_str()),
        ]
    }

    /// `(documentId, timestamp)` composite key
    pub fn key(&self) -> (String, String) {
        (self.document_id.clone(), self.timestamp.clone())
    }
}

/// Render a timestamp as UTC ISO-8601 with millisecond precision and `Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + chrono::Duration::milliseconds(7);
        assert_eq!(format_timestamp(at), "2024-05-01T12:00:00.007Z");
    }

    #[test]
    fn test_processed_record_attributes() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = ProcessedRecord::processed("report+1.pdf", at, r#"{"completion":"summary"}"#);

        let attrs = record.attributes();
        assert_eq!(attrs[0], ("documentId", "report+1.pdf"));
        assert_eq!(attrs[1], ("timestamp", "2024-05-01T12:00:00.000Z"));
        assert_eq!(attrs[2], ("content", r#"{"completion":"summary"}"#));
        assert_eq!(attrs[3], ("status", "PROCESSED"));
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = ProcessedRecord::processed("a.txt", at, "{}");
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["documentId"], "a.txt");
        assert_eq!(value["status"], "PROCESSED");
    }

    #[test]
    fn test_key_schema() {
        assert_eq!(KEY_SCHEMA.partition_key, "documentId");
        assert_eq!(KEY_SCHEMA.sort_key, "timestamp");
    }
}
