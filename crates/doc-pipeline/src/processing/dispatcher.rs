//! Event dispatcher: runs each notification through fetch, inference and store

use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{self, BackendProvider, InferenceConfig, PipelineConfig};
use crate::error::{Error, Result};
use crate::providers::aws::{AwsClients, BedrockInvoker, DynamoRecordStore, S3ObjectFetcher};
use crate::providers::local::{JsonLinesRecordStore, LocalObjectFetcher};
use crate::providers::ollama::OllamaInvoker;
use crate::providers::{InferenceInvoker, InferenceRequest, ObjectFetcher, RecordStore};
use crate::types::{NotificationBatch, NotificationRecord, ProcessedRecord};

use super::clock::{Clock, SystemClock};
use super::prompt::PromptTemplate;

/// Key of a record written during a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenRecord {
    pub document_id: String,
    pub timestamp: String,
}

/// Result of a fully processed batch
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub batch_id: Uuid,
    pub written: Vec<WrittenRecord>,
}

/// Processes notification batches one record at a time
///
/// The collaborators are shared handles so a process can build them once and
/// reuse them for every invocation.
pub struct DocumentDispatcher {
    fetcher: Arc<dyn ObjectFetcher>,
    invoker: Arc<dyn InferenceInvoker>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    prompt: PromptTemplate,
    max_tokens: u32,
}

impl DocumentDispatcher {
    /// Create a dispatcher with the default prompt, token limit and wall clock
    pub fn new(
        fetcher: Arc<dyn ObjectFetcher>,
        invoker: Arc<dyn InferenceInvoker>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self::with_inference_config(fetcher, invoker, store, &InferenceConfig::default())
    }

    /// Create a dispatcher using the prompt and token limit from `inference`
    pub fn with_inference_config(
        fetcher: Arc<dyn ObjectFetcher>,
        invoker: Arc<dyn InferenceInvoker>,
        store: Arc<dyn RecordStore>,
        inference: &InferenceConfig,
    ) -> Self {
        Self {
            fetcher,
            invoker,
            store,
            clock: Arc::new(SystemClock),
            prompt: PromptTemplate::new(inference.prompt_template.clone()),
            max_tokens: inference.max_tokens,
        }
    }

    /// Replace the time source used for record timestamps
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build the dispatcher and its collaborators for the configured backend
    pub async fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let (fetcher, invoker, store): (
            Arc<dyn ObjectFetcher>,
            Arc<dyn InferenceInvoker>,
            Arc<dyn RecordStore>,
        ) = match config.backend {
            BackendProvider::Aws => {
                let clients = AwsClients::load(&config.aws).await;
                (
                    Arc::new(S3ObjectFetcher::new(clients.s3)),
                    Arc::new(BedrockInvoker::new(
                        clients.bedrock,
                        config.inference.model_id.clone(),
                    )),
                    Arc::new(DynamoRecordStore::new(clients.dynamodb)),
                )
            }
            BackendProvider::Local => (
                Arc::new(LocalObjectFetcher::new(config.local.root_dir.clone())),
                Arc::new(OllamaInvoker::new(&config.local)?),
                Arc::new(JsonLinesRecordStore::new(config.local.records_path.clone())),
            ),
        };

        tracing::info!(
            backend = ?config.backend,
            fetcher = fetcher.name(),
            invoker = invoker.name(),
            model = invoker.model(),
            store = store.name(),
            max_tokens = config.inference.max_tokens,
            "Dispatcher configured"
        );

        Ok(Self::with_inference_config(
            fetcher,
            invoker,
            store,
            &config.inference,
        ))
    }

    /// Handle one invocation, reading the table name from the process environment
    pub async fn handle(&self, batch: &NotificationBatch) -> Result<BatchOutcome> {
        self.handle_with_env(batch, |name| std::env::var(name).ok())
            .await
    }

    /// Handle one invocation, reading the table name through `lookup`
    pub async fn handle_with_env<F>(
        &self,
        batch: &NotificationBatch,
        lookup: F,
    ) -> Result<BatchOutcome>
    where
        F: Fn(&str) -> Option<String>,
    {
        let table = config::table_name_from(lookup).inspect_err(|e| {
            tracing::error!(error = %e, "Error processing document");
        })?;
        self.process_batch(&table, batch).await
    }

    /// Process every record in order, stopping at the first failure.
    ///
    /// Records written before the failure stay written; records after it are
    /// never attempted. The failing record's error is returned as-is.
    pub async fn process_batch(&self, table: &str, batch: &NotificationBatch) -> Result<BatchOutcome> {
        let batch_id = Uuid::new_v4();
        let span = tracing::info_span!("batch", %batch_id, records = batch.len(), table);

        async move {
            if tracing::enabled!(tracing::Level::DEBUG) {
                match serde_json::to_string_pretty(batch) {
                    Ok(json) => tracing::debug!("Handler triggered with event: {}", json),
                    Err(e) => tracing::debug!(error = %e, "Could not render event"),
                }
            }

            let mut written = Vec::with_capacity(batch.len());
            for (index, record) in batch.records.iter().enumerate() {
                match self.process_record(table, record).await {
                    Ok(processed) => written.push(WrittenRecord {
                        document_id: processed.document_id,
                        timestamp: processed.timestamp,
                    }),
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            stage = e.stage(),
                            position = index + 1,
                            written = written.len(),
                            "Error processing document"
                        );
                        return Err(e);
                    }
                }
            }

            tracing::info!(written = written.len(), "Batch complete");
            Ok(BatchOutcome { batch_id, written })
        }
        .instrument(span)
        .await
    }

    /// Decode, fetch, invoke and store a single notification
    async fn process_record(
        &self,
        table: &str,
        record: &NotificationRecord,
    ) -> Result<ProcessedRecord> {
        let bucket = record.bucket();
        let key = record.decoded_key()?;
        let span = tracing::info_span!("document", bucket, key = %key);

        tracing::info!(
            parent: &span,
            event = record.event_name.as_deref().unwrap_or("unknown"),
            size = record.s3.object.size,
            "Processing document"
        );

        self.run_stages(table, bucket, key).instrument(span).await
    }

    async fn run_stages(&self, table: &str, bucket: &str, key: String) -> Result<ProcessedRecord> {
        let fetched = self.fetcher.fetch(bucket, &key).await?;
        let content = match fetched {
            Some(content) if !content.is_empty() => content,
            _ => return Err(Error::empty_content(bucket, key)),
        };
        tracing::info!(bytes = content.len(), "Fetched document");
        tracing::trace!(content = %content, "Document content");

        let request = InferenceRequest::new(self.prompt.render(&content), self.max_tokens);
        drop(content);

        tracing::info!("Invoking model");
        let envelope = self.invoker.invoke(&request).await?;
        let serialized = envelope.get().to_owned();

        let processed = ProcessedRecord::processed(key, self.clock.now(), serialized);
        tracing::info!(timestamp = %processed.timestamp, "Storing result");
        self.store.put(table, &processed).await?;
        tracing::info!("Stored result");

        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::clock::SteppingClock;
    use crate::providers::inference::MockInferenceInvoker;
    use crate::providers::local::InMemoryRecordStore;
    use crate::providers::object_store::MockObjectFetcher;
    use crate::providers::record_store::MockRecordStore;
    use chrono::{Duration, TimeZone, Utc};
    use parking_lot::Mutex;
    use serde_json::value::RawValue;

    const TABLE: &str = "DocumentTable";

    fn clock() -> Arc<SteppingClock> {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Arc::new(SteppingClock::new(start, Duration::milliseconds(1)))
    }

    fn fetcher_returning(content: Option<&'static str>, times: usize) -> MockObjectFetcher {
        let mut fetcher = MockObjectFetcher::new();
        fetcher
            .expect_fetch()
            .times(times)
            .returning(move |_, _| Ok(content.map(str::to_string)));
        fetcher
    }

    fn raw(json: &str) -> Box<RawValue> {
        RawValue::from_string(json.to_string()).unwrap()
    }

    fn invoker_returning(envelope: &'static str, times: usize) -> MockInferenceInvoker {
        let mut invoker = MockInferenceInvoker::new();
        invoker
            .expect_invoke()
            .times(times)
            .returning(move |_| Ok(raw(envelope)));
        invoker
    }

    fn dispatcher(
        fetcher: MockObjectFetcher,
        invoker: MockInferenceInvoker,
        store: Arc<dyn RecordStore>,
    ) -> DocumentDispatcher {
        DocumentDispatcher::new(Arc::new(fetcher), Arc::new(invoker), store).with_clock(clock())
    }

    #[tokio::test]
    async fn test_every_record_is_written() {
        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = dispatcher(
            fetcher_returning(Some("text"), 3),
            invoker_returning(r#"{"completion":"ok"}"#, 3),
            store.clone(),
        );
        let batch =
            NotificationBatch::from_objects([("docs", "a.txt"), ("docs", "b+c.txt"), ("docs", "d.txt")]);

        let outcome = dispatcher.process_batch(TABLE, &batch).await.unwrap();

        assert_eq!(outcome.written.len(), 3);
        assert_eq!(outcome.written[1].document_id, "b c.txt");
        let records = store.records(TABLE);
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| r.status.as_str() == "PROCESSED" && r.content == r#"{"completion":"ok"}"#));
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_records() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();

        let mut fetcher = MockObjectFetcher::new();
        fetcher.expect_fetch().times(2).returning(move |_, key| {
            seen.lock().push(key.to_string());
            if key == "second.txt" {
                Err(Error::object_store("AccessDenied: Access Denied"))
            } else {
                Ok(Some("text".to_string()))
            }
        });

        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = dispatcher(
            fetcher,
            invoker_returning(r#"{"completion":"ok"}"#, 1),
            store.clone(),
        );
        let batch = NotificationBatch::from_objects([
            ("docs", "first.txt"),
            ("docs", "second.txt"),
            ("docs", "third.txt"),
        ]);

        let err = dispatcher.process_batch(TABLE, &batch).await.unwrap_err();

        assert!(matches!(err, Error::ObjectStore(_)));
        assert_eq!(err.to_string(), "AccessDenied: Access Denied");
        assert_eq!(*calls.lock(), vec!["first.txt", "second.txt"]);
        let records = store.records(TABLE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document_id, "first.txt");
    }

    #[tokio::test]
    async fn test_empty_content_skips_inference() {
        let mut store = MockRecordStore::new();
        store.expect_put().times(0);

        let dispatcher = dispatcher(
            fetcher_returning(Some(""), 1),
            invoker_returning("{}", 0),
            Arc::new(store),
        );
        let batch = NotificationBatch::from_objects([("docs", "empty.txt"), ("docs", "next.txt")]);

        let err = dispatcher.process_batch(TABLE, &batch).await.unwrap_err();
        assert!(
            matches!(err, Error::EmptyContent { ref bucket, ref key } if bucket == "docs" && key == "empty.txt")
        );
    }

    #[tokio::test]
    async fn test_absent_body_is_empty_content() {
        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = dispatcher(
            fetcher_returning(None, 1),
            invoker_returning("{}", 0),
            store.clone(),
        );
        let batch = NotificationBatch::from_objects([("docs", "a.txt")]);

        let err = dispatcher.process_batch(TABLE, &batch).await.unwrap_err();
        assert!(matches!(err, Error::EmptyContent { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_inference_failure_is_passed_through() {
        let mut invoker = MockInferenceInvoker::new();
        invoker
            .expect_invoke()
            .times(1)
            .returning(|_| Err(Error::inference("ThrottlingException: Too many requests")));

        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = dispatcher(fetcher_returning(Some("text"), 1), invoker, store.clone());
        let batch = NotificationBatch::from_objects([("docs", "a.txt"), ("docs", "b.txt")]);

        let err = dispatcher.process_batch(TABLE, &batch).await.unwrap_err();
        assert_eq!(err.to_string(), "ThrottlingException: Too many requests");
        assert_eq!(err.stage(), "inference");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_aborts_batch() {
        let mut store = MockRecordStore::new();
        store
            .expect_put()
            .times(1)
            .returning(|_, _| Err(Error::record_store("ResourceNotFoundException: table missing")));

        let dispatcher = dispatcher(
            fetcher_returning(Some("text"), 1),
            invoker_returning(r#"{"completion":"ok"}"#, 1),
            Arc::new(store),
        );
        let batch = NotificationBatch::from_objects([("docs", "a.txt"), ("docs", "b.txt")]);

        let err = dispatcher.process_batch(TABLE, &batch).await.unwrap_err();
        assert!(matches!(err, Error::RecordStore(_)));
    }

    #[tokio::test]
    async fn test_request_uses_template_and_token_limit() {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();

        let mut invoker = MockInferenceInvoker::new();
        invoker.expect_invoke().times(1).returning(move |request| {
            seen.lock().push(request.clone());
            Ok(raw(r#"{"completion":"summary"}"#))
        });

        let inference = InferenceConfig {
            max_tokens: 256,
            prompt_template: "Extract entities from: {content}".to_string(),
            ..InferenceConfig::default()
        };
        let dispatcher = DocumentDispatcher::with_inference_config(
            Arc::new(fetcher_returning(Some("hello world"), 1)),
            Arc::new(invoker),
            Arc::new(InMemoryRecordStore::new()),
            &inference,
        );

        dispatcher
            .process_batch(TABLE, &NotificationBatch::from_objects([("docs", "a.txt")]))
            .await
            .unwrap();

        let requests = requests.lock();
        assert_eq!(
            requests[0],
            InferenceRequest::new("Extract entities from: hello world", 256)
        );
    }

    #[tokio::test]
    async fn test_fetch_uses_decoded_key() {
        let mut fetcher = MockObjectFetcher::new();
        fetcher.expect_fetch().times(1).returning(|bucket, key| {
            assert_eq!(bucket, "docs");
            assert_eq!(key, "report+1.pdf");
            Ok(Some("hello world".to_string()))
        });

        let dispatcher = dispatcher(
            fetcher,
            invoker_returning(r#"{"completion":"summary"}"#, 1),
            Arc::new(InMemoryRecordStore::new()),
        );
        let batch = NotificationBatch::from_objects([("docs", "report%2B1.pdf")]);

        let outcome = dispatcher.process_batch(TABLE, &batch).await.unwrap();
        assert_eq!(outcome.written[0].document_id, "report+1.pdf");
        assert_eq!(outcome.written[0].timestamp, "2024-05-01T12:00:00.000Z");
    }

    #[tokio::test]
    async fn test_undecodable_key_aborts_before_fetch() {
        let dispatcher = dispatcher(
            fetcher_returning(Some("text"), 0),
            invoker_returning("{}", 0),
            Arc::new(InMemoryRecordStore::new()),
        );
        let batch = NotificationBatch::from_objects([("docs", "bad%FF.txt")]);

        let err = dispatcher.process_batch(TABLE, &batch).await.unwrap_err();
        assert!(matches!(err, Error::KeyDecode { .. }));
    }

    #[tokio::test]
    async fn test_missing_table_name_fails_before_fetch() {
        let dispatcher = dispatcher(
            fetcher_returning(Some("text"), 0),
            invoker_returning("{}", 0),
            Arc::new(InMemoryRecordStore::new()),
        );
        let batch = NotificationBatch::from_objects([("docs", "a.txt")]);

        let err = dispatcher.handle_with_env(&batch, |_| None).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_table_name_read_from_environment() {
        let store = Arc::new(InMemoryRecordStore::new());
        let dispatcher = dispatcher(
            fetcher_returning(Some("text"), 1),
            invoker_returning(r#"{"completion":"ok"}"#, 1),
            store.clone(),
        );
        let batch = NotificationBatch::from_objects([("docs", "a.txt")]);

        dispatcher
            .handle_with_env(&batch, |name| (name == "TABLE_NAME").then(|| "Docs-1".to_string()))
            .await
            .unwrap();

        assert_eq!(store.records("Docs-1").len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let dispatcher = dispatcher(
            fetcher_returning(None, 0),
            invoker_returning("{}", 0),
            Arc::new(InMemoryRecordStore::new()),
        );

        let outcome = dispatcher
            .process_batch(TABLE, &NotificationBatch::default())
            .await
            .unwrap();
        assert!(outcome.written.is_empty());
    }
}
