//! Ollama-based inference invoker for the local backend

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::value::RawValue;
use std::time::Duration;

use crate::config::LocalConfig;
use crate::error::{Error, Result};

use super::inference::{InferenceInvoker, InferenceRequest};

/// Ollama `/api/generate` client returning the raw response object
pub struct OllamaInvoker {
    client: Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

impl OllamaInvoker {
    /// Create a new Ollama invoker
    pub fn new(config: &LocalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl InferenceInvoker for OllamaInvoker {
    #[tracing::instrument(skip(self, request), fields(model = %self.model))]
    async fn invoke(&self, request: &InferenceRequest) -> Result<Box<RawValue>> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&body)
            .send()
            .await
            .map_err(Error::inference)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::inference(format!(
                "Ollama generation failed ({}): {}",
                status, text
            )));
        }

        let text = response.text().await.map_err(Error::inference)?;
        RawValue::from_string(text).map_err(Error::inference)
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
