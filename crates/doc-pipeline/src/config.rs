//! Configuration for the document pipeline

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming the record-store table
pub const TABLE_NAME_ENV: &str = "TABLE_NAME";

/// Placeholder replaced by the document text in the prompt template
pub const CONTENT_PLACEHOLDER: &str = "{content}";

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Backend provider (aws or local)
    #[serde(default)]
    pub backend: BackendProvider,
    /// Inference configuration
    #[serde(default)]
    pub inference: InferenceConfig,
    /// AWS SDK overrides
    #[serde(default)]
    pub aws: AwsConfig,
    /// Local backend configuration (required when backend = local)
    #[serde(default)]
    pub local: LocalConfig,
}

impl PipelineConfig {
    /// Load configuration: defaults, then an optional TOML file, then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Read a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw)
            .map_err(|e| Error::config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("PIPELINE_BACKEND") {
            self.backend = match backend.to_ascii_lowercase().as_str() {
                "aws" => BackendProvider::Aws,
                "local" => BackendProvider::Local,
                other => {
                    return Err(Error::config(format!("Unknown PIPELINE_BACKEND '{}'", other)))
                }
            };
        }
        if let Some(model_id) = lookup("MODEL_ID") {
            self.inference.model_id = model_id;
        }
        if let Some(max_tokens) = lookup("MAX_TOKENS") {
            self.inference.max_tokens = max_tokens
                .parse()
                .map_err(|e| Error::config(format!("Invalid MAX_TOKENS '{}': {}", max_tokens, e)))?;
        }
        if let Some(region) = lookup("AWS_REGION") {
            self.aws.region = Some(region);
        }
        if let Some(endpoint) = lookup("AWS_ENDPOINT_URL") {
            self.aws.endpoint_url = Some(endpoint);
        }
        if let Some(root) = lookup("PIPELINE_LOCAL_ROOT") {
            self.local.root_dir = PathBuf::from(root);
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.local.ollama_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.local.ollama_model = model;
        }
        if let Some(path) = lookup("PIPELINE_RECORDS_PATH") {
            self.local.records_path = PathBuf::from(path);
        }
        self.validate()
    }

    /// Check settings that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.inference.max_tokens == 0 {
            return Err(Error::config("max_tokens must be greater than zero"));
        }
        if !self.inference.prompt_template.contains(CONTENT_PLACEHOLDER) {
            return Err(Error::config(format!(
                "prompt_template must contain {}",
                CONTENT_PLACEHOLDER
            )));
        }
        Ok(())
    }
}

/// Read the record-store table name.
///
/// Looked up on every invocation; there is no default.
pub fn table_name() -> Result<String> {
    table_name_from(|name| std::env::var(name).ok())
}

/// Table name lookup against an arbitrary environment source
pub fn table_name_from<F>(lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(TABLE_NAME_ENV).ok_or_else(|| Error::config(format!("{} is not set", TABLE_NAME_ENV)))
}

/// Backend provider selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// S3 + Bedrock runtime + DynamoDB
    #[default]
    Aws,
    /// Filesystem + Ollama + JSON-lines file
    Local,
}

/// Inference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Model identifier passed to the endpoint
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Token limit sent with every request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Prompt template; `{content}` is replaced with the document text
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

fn default_model_id() -> String {
    "anthropic.claude-3-5-sonnet-20241022-v2:0".to_string()
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_prompt_template() -> String {
    "Analyze this document and extract key information: {content}".to_string()
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            max_tokens: default_max_tokens(),
            prompt_template: default_prompt_template(),
        }
    }
}

/// AWS SDK overrides; unset fields fall back to the SDK's default chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: Option<String>,
    /// Custom endpoint (e.g. LocalStack)
    pub endpoint_url: Option<String>,
}

/// Local backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory holding one sub-directory per bucket
    pub root_dir: PathBuf,
    /// Ollama base URL
    pub ollama_url: String,
    /// Ollama generation model
    pub ollama_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// JSON-lines file receiving processed records
    pub records_path: PathBuf,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./buckets"),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.2:3b".to_string(),
            timeout_secs: 120,
            records_path: PathBuf::from("./processed-records.jsonl"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.backend, BackendProvider::Aws);
        assert_eq!(config.inference.max_tokens, 1000);
        assert_eq!(
            config.inference.model_id,
            "anthropic.claude-3-5-sonnet-20241022-v2:0"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = PipelineConfig::default();
        config
            .apply_env(env(&[
                ("PIPELINE_BACKEND", "Local"),
                ("MAX_TOKENS", "250"),
                ("OLLAMA_MODEL", "phi3"),
            ]))
            .unwrap();

        assert_eq!(config.backend, BackendProvider::Local);
        assert_eq!(config.inference.max_tokens, 250);
        assert_eq!(config.local.ollama_model, "phi3");
    }

    #[test]
    fn test_invalid_max_tokens() {
        let mut config = PipelineConfig::default();
        let err = config.apply_env(env(&[("MAX_TOKENS", "lots")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_unknown_backend() {
        let mut config = PipelineConfig::default();
        assert!(config.apply_env(env(&[("PIPELINE_BACKEND", "gcp")])).is_err());
    }

    #[test]
    fn test_template_requires_placeholder() {
        let mut config = PipelineConfig::default();
        config.inference.prompt_template = "Summarize this".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_table_name_required() {
        let err = table_name_from(env(&[])).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: TABLE_NAME is not set");

        let name = table_name_from(env(&[("TABLE_NAME", "DocumentTable")])).unwrap();
        assert_eq!(name, "DocumentTable");
    }

    #[test]
    fn test_partial_toml() {
        let config: PipelineConfig = toml::from_str(
            r#"
            backend = "local"

            [inference]
            max_tokens = 512
            "#,
        )
        .unwrap();

        assert_eq!(config.backend, BackendProvider::Local);
        assert_eq!(config.inference.max_tokens, 512);
        assert!(config.inference.prompt_template.contains(CONTENT_PLACEHOLDER));
    }
}
