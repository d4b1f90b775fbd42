//! Bedrock runtime model invoker

use async_trait::async_trait;
use aws_sdk_bedrockruntime::operation::RequestId;
use aws_sdk_bedrockruntime::primitives::Blob;
use serde::Serialize;
use serde_json::value::{to_raw_value, RawValue};

use crate::error::{Error, Result};
use crate::providers::inference::{InferenceInvoker, InferenceRequest};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Invokes a Bedrock-hosted model and returns the full response envelope
pub struct BedrockInvoker {
    client: aws_sdk_bedrockruntime::Client,
    model_id: String,
}

impl BedrockInvoker {
    pub fn new(client: aws_sdk_bedrockruntime::Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }
}

#[async_trait]
impl InferenceInvoker for BedrockInvoker {
    #[tracing::instrument(skip(self, request), fields(model = %self.model_id))]
    async fn invoke(&self, request: &InferenceRequest) -> Result<Box<RawValue>> {
        let body = serde_json::to_vec(request)?;

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type(JSON_CONTENT_TYPE)
            .accept(JSON_CONTENT_TYPE)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(Error::inference)?;

        let envelope = envelope_from_parts(
            output.request_id(),
            output.content_type(),
            output.body().as_ref(),
        )?;

        tracing::debug!(envelope = %envelope, "Bedrock response");
        Ok(envelope)
    }

    fn name(&self) -> &str {
        "bedrock"
    }

    fn model(&self) -> &str {
        &self.model_id
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "$metadata")]
    metadata: Metadata<'a>,
    #[serde(rename = "contentType")]
    content_type: &'a str,
    body: Box<RawValue>,
}

#[derive(Serialize)]
struct Metadata<'a> {
    #[serde(rename = "requestId")]
    request_id: Option<&'a str>,
}

/// Render an `InvokeModel` response as a JSON envelope.
///
/// A body that is valid JSON is embedded byte for byte, so key order and
/// number text are exactly what the model returned. Anything else is
/// embedded as a JSON string.
pub fn envelope_from_parts(
    request_id: Option<&str>,
    content_type: &str,
    body: &[u8],
) -> Result<Box<RawValue>> {
    let verbatim = std::str::from_utf8(body)
        .ok()
        .and_then(|text| RawValue::from_string(text.to_owned()).ok());
    let body = match verbatim {
        Some(raw) => raw,
        None => to_raw_value(&String::from_utf8_lossy(body))?,
    };

    let envelope = Envelope {
        metadata: Metadata { request_id },
        content_type,
        body,
    };
    Ok(to_raw_value(&envelope)?)
}
