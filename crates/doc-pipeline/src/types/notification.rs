//! Storage "object created" notifications
//!
//! Mirrors the S3 event document delivered to the handler. Only the bucket
//! name and object key drive processing; `eventName` and `size` are kept for
//! logging and everything else is ignored.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One invocation's set of "object created" events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

impl NotificationBatch {
    /// Build a batch from `(bucket, raw key)` pairs
    pub fn from_objects<I, B, K>(objects: I) -> Self
    where
        I: IntoIterator<Item = (B, K)>,
        B: Into<String>,
        K: Into<String>,
    {
        Self {
            records: objects
                .into_iter()
                .map(|(bucket, key)| NotificationRecord::new(bucket, key))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A single notification entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: StorageEntity,
}

impl NotificationRecord {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            event_name: None,
            s3: StorageEntity {
                bucket: BucketRef { name: bucket.into() },
                object: ObjectRef {
                    key: key.into(),
                    size: None,
                },
            },
        }
    }

    /// Source bucket name
    pub fn bucket(&self) -> &str {
        &self.s3.bucket.name
    }

    /// Object key as delivered (still URL-encoded)
    pub fn raw_key(&self) -> &str {
        &self.s3.object.key
    }

    /// Object key with `+` mapped to space and percent-escapes decoded
    pub fn decoded_key(&self) -> Result<String> {
        decode_object_key(self.raw_key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEntity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Decode an object key from a storage notification.
///
/// Keys arrive form-encoded: a literal space is sent as `+` and a literal
/// `+` as `%2B`. The `+` substitution has to happen before percent-decoding
/// or encoded plus signs would turn into spaces.
pub fn decode_object_key(raw: &str) -> Result<String> {
    if let Some(at) = malformed_escape(raw) {
        return Err(Error::key_decode(
            raw,
            format!("malformed percent escape at byte {}", at),
        ));
    }

    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::key_decode(raw, e.to_string()))
}

/// Position of the first `%` not followed by two hex digits
fn malformed_escape(raw: &str) -> Option<usize> {
    let bytes = raw.as_bytes();
    bytes.iter().enumerate().find_map(|(i, &b)| {
        if b != b'%' {
            return None;
        }
        match bytes.get(i + 1..i + 3) {
            Some([h, l]) if h.is_ascii_hexdigit() && l.is_ascii_hexdigit() => None,
            _ => Some(i),
        }
    })
}
