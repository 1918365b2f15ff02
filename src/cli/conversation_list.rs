use std::error::Error;

use crate::api::conversations::{self, ListParams};
use crate::core::gateway::ApiGateway;

pub async fn list_conversations(
    gateway: &ApiGateway,
    params: ListParams,
) -> Result<(), Box<dyn Error>> {
    let conversations = conversations::list(gateway, params).await?;
    if conversations.is_empty() {
        println!("No conversations.");
        return Ok(());
    }

    for conversation in conversations {
        let models = if conversation.model_ids.is_empty() {
            "-".to_string()
        } else {
            conversation.model_ids.join(", ")
        };
        println!(
            "{}  {}  [{}]  {}",
            conversation.id,
            conversation.title,
            models,
            conversation.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

pub async fn show_messages(
    gateway: &ApiGateway,
    conversation_id: &str,
    limit: u32,
) -> Result<(), Box<dyn Error>> {
    let messages = conversations::messages(gateway, conversation_id, limit, 0).await?;
    if messages.is_empty() {
        println!("No messages in conversation {conversation_id}.");
        return Ok(());
    }

    for message in messages {
        println!(
            "[{}] {}:",
            message.created_at.format("%Y-%m-%d %H:%M"),
            message.role
        );
        println!("{}", message.content.text());
        println!();
    }

    Ok(())
}
