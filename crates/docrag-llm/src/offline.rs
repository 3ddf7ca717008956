//! Offline chat model for local development.

use async_trait::async_trait;

use docrag_core::{ChatMessage, ChatModel, ChatOptions, Result, Role};

/// Longest excerpt returned from a context block.
const MAX_EXCERPT_CHARS: usize = 300;

/// Chat model that never leaves the process.
///
/// Replies are extractive: when the prompt carries a `Context:` block the
/// first passage of it is returned, validator prompts are accepted, and
/// anything else is echoed back.
#[derive(Debug, Clone, Default)]
pub struct OfflineChat;

impl OfflineChat {
    pub fn new() -> Self {
        Self
    }

    fn reply(prompt: &str) -> String {
        if let Some(context) = context_block(prompt) {
            let passage = context
                .split("\n\n")
                .map(str::trim)
                .find(|p| !p.is_empty())
                .unwrap_or_default();
            let excerpt: String = passage.chars().take(MAX_EXCERPT_CHARS).collect();
            return format!("According to the documents: {excerpt}");
        }

        if prompt.contains("\"VALID\"") {
            return "VALID".to_string();
        }

        format!("[offline] {}", prompt.trim())
    }
}

/// Text between a `Context:` line and the following `Question:` line.
fn context_block(prompt: &str) -> Option<&str> {
    let start = prompt.find("Context:\n")? + "Context:\n".len();
    let rest = &prompt[start..];
    let end = rest.find("\n\nQuestion:").unwrap_or(rest.len());
    Some(&rest[..end])
}

#[async_trait]
impl ChatModel for OfflineChat {
    async fn complete(&self, messages: &[ChatMessage], _options: &ChatOptions) -> Result<String> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(Self::reply(prompt))
    }

    fn model(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extracts_context() {
        let chat = OfflineChat::new();
        let prompt = "Based on the following context, answer.\n\nContext:\nVacation is 25 days.\n\nOther passage\n\nQuestion: How much vacation?\n\nAnswer:";
        let reply = chat
            .complete(&[ChatMessage::user(prompt)], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "According to the documents: Vacation is 25 days.");
    }

    #[tokio::test]
    async fn test_accepts_validation() {
        let chat = OfflineChat::new();
        let reply = chat
            .complete(
                &[ChatMessage::user("Respond with ONLY one of these:\n- \"VALID\" if the response is good")],
                &ChatOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(reply, "VALID");
    }

    #[tokio::test]
    async fn test_echoes_last_user_message() {
        let chat = OfflineChat::new();
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("ok"),
            ChatMessage::user("  second  "),
        ];
        let reply = chat.complete(&messages, &ChatOptions::default()).await.unwrap();
        assert_eq!(reply, "[offline] second");
    }
}
