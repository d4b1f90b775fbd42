//! Amazon Web Services provider implementations
//!
//! - S3 for reading uploaded documents
//! - Bedrock runtime for model invocation
//! - DynamoDB for processed records
//!
//! All three clients are built from one shared SDK config and are cheap to
//! clone, so a process builds them once and reuses them across invocations.

mod bedrock;
mod clients;
mod dynamodb;
mod s3;

pub use bedrock::{envelope_from_parts, BedrockInvoker};
pub use clients::AwsClients;
pub use dynamodb::DynamoRecordStore;
pub use s3::S3ObjectFetcher;
