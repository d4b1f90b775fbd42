//! Local provider implementations using the filesystem and process memory
//!
//! Used for the replay CLI and for tests; none of these talk to a network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::types::ProcessedRecord;

use super::object_store::ObjectFetcher;
use super::record_store::RecordStore;

/// Local object fetcher reading `<root>/<bucket>/<key>`
pub struct LocalObjectFetcher {
    /// Directory holding one sub-directory per bucket
    root_dir: PathBuf,
}

impl LocalObjectFetcher {
    /// Create a new local object fetcher
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Resolve an object to a path, refusing anything that escapes the bucket directory
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if bucket.is_empty() || bucket.contains(['/', '\\']) || key.is_empty() || escapes {
            return Err(Error::object_store(format!(
                "Invalid object location: bucket '{}', key '{}'",
                bucket, key
            )));
        }
        Ok(self.root_dir.join(bucket).join(relative))
    }
}

#[async_trait]
impl ObjectFetcher for LocalObjectFetcher {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Option<String>> {
        let path = self.object_path(bucket, key)?;
        let data = tokio::fs::read(&path).await.map_err(Error::object_store)?;
        Ok(Some(String::from_utf8_lossy(&data).into_owned()))
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}

type RecordKey = (String, String, String);

/// In-memory record store keyed like the real table
///
/// Rows are keyed by `(table, documentId, timestamp)`, so a write with an
/// existing key replaces the old row.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<BTreeMap<RecordKey, ProcessedRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in `table`, ordered by document id then timestamp
    pub fn records(&self, table: &str) -> Vec<ProcessedRecord> {
        self.records
            .lock()
            .iter()
            .filter(|((t, _, _), _)| t == table)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Records for one document in `table`, oldest first
    pub fn records_for(&self, table: &str, document_id: &str) -> Vec<ProcessedRecord> {
        self.records(table)
            .into_iter()
            .filter(|r| r.document_id == document_id)
            .collect()
    }

    /// Total rows across all tables
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put(&self, table: &str, record: &ProcessedRecord) -> Result<()> {
        let (document_id, timestamp) = record.key();
        self.records
            .lock()
            .insert((table.to_string(), document_id, timestamp), record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct RecordLine {
    table: String,
    #[serde(flatten)]
    record: ProcessedRecord,
}

/// Append-only JSON-lines record store
pub struct JsonLinesRecordStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesRecordStore {
    /// Create a store appending to `path`; parent directories are created on demand
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record written so far
    pub async fn read_all(&self) -> Result<Vec<(String, ProcessedRecord)>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| -> Result<(String, ProcessedRecord)> {
                let parsed: RecordLine = serde_json::from_str(line)?;
                Ok((parsed.table, parsed.record))
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for JsonLinesRecordStore {
    async fn put(&self, table: &str, record: &ProcessedRecord) -> Result<()> {
        let mut line = serde_json::to_string(&RecordLine {
            table: table.to_string(),
            record: record.clone(),
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Error::record_store)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(Error::record_store)?;
        file.write_all(line.as_bytes())
            .await
            .map_err(Error::record_store)?;
        file.flush().await.map_err(Error::record_store)?;

        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl-file"
    }
}
