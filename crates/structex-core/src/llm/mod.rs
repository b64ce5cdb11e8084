//! Chat model seam and implementations for schema-constrained completions.

pub mod mock;
pub mod openai_compat;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prompt::ChatMessage;
use crate::schema::FieldSchema;

pub use mock::MockChatModel;
pub use openai_compat::ChatCompletionsClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("model response did not contain structured output")]
    MissingOutput,
    #[error("model output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

/// How the schema is handed to the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredOutputMethod {
    /// Send the schema as a single forced tool; read the tool call arguments.
    #[default]
    FunctionCalling,
    /// Send the schema as `response_format`; read the message content.
    JsonSchema,
}

impl fmt::Display for StructuredOutputMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuredOutputMethod::FunctionCalling => f.write_str("function_calling"),
            StructuredOutputMethod::JsonSchema => f.write_str("json_schema"),
        }
    }
}

/// A chat model that can be bound to a [`FieldSchema`] for structured output.
pub trait ChatModel: Send + Sync {
    /// The model identifier sent to the provider (e.g. "llama-3.3-70b-versatile").
    fn name(&self) -> &str;

    /// Run `messages` with output constrained to `schema`, returning the
    /// model's raw JSON object.
    fn invoke_structured<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        schema: &'a FieldSchema,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, LlmError>> + Send + 'a>>;
}
