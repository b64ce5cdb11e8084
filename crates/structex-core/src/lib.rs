use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod schema;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend, load_document_text};
pub use llm::{ChatCompletionsClient, ChatModel, LlmError, MockChatModel, StructuredOutputMethod};
pub use pipeline::{extract_from_pdf, run_extraction_chain};
pub use prompt::{ChatMessage, Role, SYSTEM_TEMPLATE};
pub use schema::{ExtractionRecord, FieldSchema, FieldSpec, SchemaError, normalize_field_key};

use config_file::ConfigFile;
use llm::openai_compat::{DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Anything that can go wrong between receiving a PDF and returning its fields.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(#[from] BackendError),
    #[error("model call failed: {0}")]
    Llm(#[from] LlmError),
    #[error("schema mismatch: {0}")]
    Schema(#[from] SchemaError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("task join error: {0}")]
    Task(String),
}

/// Resolved model settings.
#[derive(Clone, PartialEq)]
pub struct Config {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    /// Per-request timeout for the model call. `0` disables it.
    pub timeout_secs: u64,
    pub structured_output: StructuredOutputMethod,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("structured_output", &self.structured_output)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: 120,
            structured_output: StructuredOutputMethod::default(),
        }
    }
}

impl Config {
    /// Apply the `[llm]` section of a config file over the defaults.
    pub fn from_file(file: &ConfigFile) -> Self {
        let defaults = Self::default();
        let Some(llm) = file.llm.as_ref() else {
            return defaults;
        };
        Self {
            api_base: llm.api_base.clone().unwrap_or(defaults.api_base),
            api_key: llm.api_key.clone().filter(|k| !k.is_empty()),
            model: llm.model.clone().unwrap_or(defaults.model),
            temperature: llm.temperature.unwrap_or(defaults.temperature),
            timeout_secs: llm.timeout_secs.unwrap_or(defaults.timeout_secs),
            structured_output: llm.structured_output.unwrap_or(defaults.structured_output),
        }
    }

    /// Use `key` (typically from `GROQ_API_KEY`) when no key was configured.
    pub fn with_api_key_fallback(mut self, key: Option<String>) -> Self {
        if self.api_key.is_none() {
            self.api_key = key.filter(|k| !k.is_empty());
        }
        self
    }
}
