//! Client for OpenAI-compatible `/chat/completions` endpoints (Groq by default).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::{Value, json};

use super::{ChatModel, LlmError, StructuredOutputMethod};
use crate::Config;
use crate::prompt::ChatMessage;
use crate::schema::FieldSchema;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f64 = 0.5;

/// Chat-completions client bound to one model and temperature.
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    temperature: f64,
    method: StructuredOutputMethod,
    timeout: Option<Duration>,
}

impl fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("method", &self.method)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ChatCompletionsClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            method: StructuredOutputMethod::default(),
            timeout: None,
        }
    }

    /// Build a client from resolved configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut llm = Self::new(config.model.clone())
            .with_api_base(config.api_base.clone())
            .with_temperature(config.temperature)
            .with_method(config.structured_output);
        llm.api_key = config.api_key.clone();
        if config.timeout_secs > 0 {
            llm = llm.with_timeout(Duration::from_secs(config.timeout_secs));
        }
        llm
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_method(mut self, method: StructuredOutputMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }

    /// JSON body for a structured-output completion request.
    pub fn request_body(&self, messages: &[ChatMessage], schema: &FieldSchema) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
        });

        match self.method {
            StructuredOutputMethod::FunctionCalling => {
                body["tools"] = json!([{
                    "type": "function",
                    "function": {
                        "name": schema.name(),
                        "description": schema.description(),
                        "parameters": schema.to_json_schema(),
                    }
                }]);
                body["tool_choice"] = json!({
                    "type": "function",
                    "function": { "name": schema.name() }
                });
            }
            StructuredOutputMethod::JsonSchema => {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": schema.name(),
                        "description": schema.description(),
                        "schema": schema.to_json_schema(),
                        "strict": false,
                    }
                });
            }
        }

        body
    }
}

impl ChatModel for ChatCompletionsClient {
    fn name(&self) -> &str {
        &self.model
    }

    fn invoke_structured<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        schema: &'a FieldSchema,
    ) -> Pin<Box<dyn Future<Output = Result<Value, LlmError>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.request_body(messages, schema);

            let mut request = self.client.post(self.endpoint()).json(&body);
            if let Some(ref key) = self.api_key {
                request = request.bearer_auth(key);
            }
            if let Some(timeout) = self.timeout {
                request = request.timeout(timeout);
            }

            tracing::debug!(model = %self.model, method = %self.method, "sending chat completion");
            let resp = request.send().await?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&text),
                });
            }

            let data: Value = resp.json().await?;
            parse_structured_output(self.method, &data)
        })
    }
}

/// Pull the structured JSON object out of a chat-completions response.
pub fn parse_structured_output(
    method: StructuredOutputMethod,
    response: &Value,
) -> Result<Value, LlmError> {
    let message = &response["choices"][0]["message"];

    let raw = match method {
        StructuredOutputMethod::FunctionCalling => {
            &message["tool_calls"][0]["function"]["arguments"]
        }
        StructuredOutputMethod::JsonSchema => &message["content"],
    };

    match raw {
        Value::String(s) => Ok(serde_json::from_str(s)?),
        // Some providers return already-decoded tool arguments.
        Value::Object(_) => Ok(raw.clone()),
        _ => Err(LlmError::MissingOutput),
    }
}

/// Best-effort human-readable message from an error response body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}
