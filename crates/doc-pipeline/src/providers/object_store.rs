//! Object fetcher trait for reading uploaded documents

use async_trait::async_trait;

use crate::error::Result;

/// Trait for fetching stored objects as text
///
/// Implementations:
/// - `S3ObjectFetcher`: Amazon S3
/// - `LocalObjectFetcher`: Local filesystem, one directory per bucket
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectFetcher: Send + Sync {
    /// Fetch the full object and decode it as text
    ///
    /// Returns `None` when the store answered without a body.
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Option<String>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
