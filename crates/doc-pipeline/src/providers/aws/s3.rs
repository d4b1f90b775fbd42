//! S3 object fetcher

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::providers::object_store::ObjectFetcher;

/// Reads uploaded documents from S3
pub struct S3ObjectFetcher {
    client: aws_sdk_s3::Client,
}

impl S3ObjectFetcher {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectFetcher for S3ObjectFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(Error::object_store)?;

        tracing::debug!(
            content_type = response.content_type().unwrap_or("unknown"),
            content_length = response.content_length().unwrap_or_default(),
            "S3 GetObject response"
        );

        let data = response
            .body
            .collect()
            .await
            .map_err(Error::object_store)?
            .into_bytes();

        Ok(Some(String::from_utf8_lossy(&data).into_owned()))
    }

    fn name(&self) -> &str {
        "s3"
    }
}
