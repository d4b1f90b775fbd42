//! Shared SDK configuration and service clients

use aws_config::{BehaviorVersion, Region, SdkConfig};

use crate::config::AwsConfig;

/// The three service clients, built once per process
#[derive(Clone, Debug)]
pub struct AwsClients {
    pub s3: aws_sdk_s3::Client,
    pub bedrock: aws_sdk_bedrockruntime::Client,
    pub dynamodb: aws_sdk_dynamodb::Client,
}

impl AwsClients {
    /// Load the SDK config (region, credentials) and build every client from it
    pub async fn load(config: &AwsConfig) -> Self {
        let sdk_config = Self::sdk_config(config).await;
        Self::from_sdk_config(&sdk_config)
    }

    /// Build clients from an already-loaded SDK config
    pub fn from_sdk_config(sdk_config: &SdkConfig) -> Self {
        Self {
            s3: aws_sdk_s3::Client::new(sdk_config),
            bedrock: aws_sdk_bedrockruntime::Client::new(sdk_config),
            dynamodb: aws_sdk_dynamodb::Client::new(sdk_config),
        }
    }

    async fn sdk_config(config: &AwsConfig) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            tracing::info!(endpoint = %endpoint, "Using custom AWS endpoint");
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }
}
