//! DynamoDB record store

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::error::{Error, Result};
use crate::providers::record_store::RecordStore;
use crate::types::ProcessedRecord;

/// Writes processed records with a plain `PutItem`
pub struct DynamoRecordStore {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoRecordStore {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStore for DynamoRecordStore {
    #[tracing::instrument(skip(self, record), fields(document_id = %record.document_id))]
    async fn put(&self, table: &str, record: &ProcessedRecord) -> Result<()> {
        let mut request = self.client.put_item().table_name(table);
        for (name, value) in record.attributes() {
            request = request.item(name, AttributeValue::S(value.to_string()));
        }

        request.send().await.map_err(Error::record_store)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "dynamodb"
    }
}
