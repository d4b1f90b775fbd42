//! Inference invoker trait for the generative-model endpoint

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::Result;

/// Request body sent to the model endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens,
        }
    }
}

/// Trait for invoking a generative model
///
/// Implementations:
/// - `BedrockInvoker`: Amazon Bedrock runtime `InvokeModel`
/// - `OllamaInvoker`: Local Ollama server
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceInvoker: Send + Sync {
    /// Invoke the model and return the whole response envelope.
    ///
    /// The envelope is kept as raw JSON text so the response body is stored
    /// exactly as the endpoint produced it.
    async fn invoke(&self, request: &InferenceRequest) -> Result<Box<RawValue>>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
