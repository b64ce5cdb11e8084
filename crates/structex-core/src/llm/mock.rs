//! Mock chat model for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;

use super::{ChatModel, LlmError};
use crate::prompt::ChatMessage;
use crate::schema::FieldSchema;

/// What [`MockChatModel`] answers with.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Return this JSON as the structured output.
    Output(Value),
    /// Fail the call with [`LlmError::Other`].
    Error(String),
}

/// A hand-rolled [`ChatModel`] returning a fixed reply.
///
/// Records how often it was called and the last prompt and schema keys it saw.
pub struct MockChatModel {
    reply: MockReply,
    call_count: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
    last_schema_keys: Mutex<Vec<String>>,
}

impl MockChatModel {
    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            call_count: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
            last_schema_keys: Mutex::new(Vec::new()),
        }
    }

    /// A model that always returns `output`.
    pub fn returning(output: Value) -> Self {
        Self::new(MockReply::Output(output))
    }

    /// A model whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(MockReply::Error(message.into()))
    }

    /// How many times `invoke_structured()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn last_schema_keys(&self) -> Vec<String> {
        self.last_schema_keys
            .lock()
            .map(|k| k.clone())
            .unwrap_or_default()
    }
}

impl ChatModel for MockChatModel {
    fn name(&self) -> &str {
        "mock"
    }

    fn invoke_structured<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        schema: &'a FieldSchema,
    ) -> Pin<Box<dyn Future<Output = Result<Value, LlmError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }
        if let Ok(mut keys) = self.last_schema_keys.lock() {
            *keys = schema.keys().map(String::from).collect();
        }
        let reply = self.reply.clone();

        Box::pin(async move {
            match reply {
                MockReply::Output(value) => Ok(value),
                MockReply::Error(msg) => Err(LlmError::Other(msg)),
            }
        })
    }
}
