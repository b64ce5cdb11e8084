use serde::Serialize;

/// Fixed instruction sent as the system turn of every extraction call.
pub const SYSTEM_TEMPLATE: &str = "You are an expert document data extraction specialist. \
Your task is to extract specific data points from the provided document text and return it as a JSON object that strictly adheres to the given schema. \
CRITICAL RULE: If a requested data point is NOT found in the document, you MUST set its value to null. DO NOT MAKE UP DATA.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Wrap the document text as the human turn.
pub fn document_turn(document_text: &str) -> String {
    format!("DOCUMENT TEXT: \n---\n{document_text}\n---\n")
}

/// Build the two-message extraction prompt for a document.
pub fn build_messages(document_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_TEMPLATE),
        ChatMessage::user(document_turn(document_text)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_has_system_then_document() {
        let messages = build_messages("Invoice INV-7");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("MUST set its value to null"));
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(
            messages[1].content,
            "DOCUMENT TEXT: \n---\nInvoice INV-7\n---\n"
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("x")).unwrap();
        assert_eq!(json["role"], "system");
        let json = serde_json::to_value(ChatMessage::user("x")).unwrap();
        assert_eq!(json["role"], "user");
    }
}
