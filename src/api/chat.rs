//! Non-streaming chat completion. The streaming variant lives in
//! [`crate::core::chat_stream`].

use chrono::Utc;

use crate::api::conversations::{Message, MessageContent};
use crate::api::{ChatCompletionResponse, ChatMessage, ChatRequest, ROLE_ASSISTANT, ROLE_USER};
use crate::core::gateway::{ApiGateway, GatewayError};

/// Send one user turn and return the assistant's reply as a message record.
pub async fn send_chat(
    gateway: &ApiGateway,
    model: &str,
    content: &str,
    conversation_id: Option<&str>,
) -> Result<Message, GatewayError> {
    let payload = ChatRequest::new(
        model.to_string(),
        vec![ChatMessage {
            role: ROLE_USER.to_string(),
            content: content.to_string(),
        }],
        conversation_id.map(str::to_string),
    );

    let response: ChatCompletionResponse = gateway.post("/v1/chat/completions", &payload).await?;

    let reply = response
        .choices
        .first()
        .map(|choice| choice.message.content.clone())
        .unwrap_or_default();

    Ok(Message {
        id: response.id,
        conversation_id: response.conversation_id,
        role: ROLE_ASSISTANT.to_string(),
        content: MessageContent::Text(reply),
        media_files: Vec::new(),
        tokens_used: None,
        cost: None,
        generation_time_ms: None,
        created_at: Utc::now(),
    })
}
