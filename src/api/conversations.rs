//! Conversation management operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::gateway::{ApiGateway, ApiRequest, GatewayError};

/// The backend sends `model_id` as either a single id or a list, depending
/// on how the conversation was created.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(match value {
        Some(OneOrMany::One(id)) => vec![id],
        Some(OneOrMany::Many(ids)) => ids,
        None => Vec::new(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub title: String,
    #[serde(default, rename = "model_id", deserialize_with = "one_or_many")]
    pub model_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Payload {
        #[serde(rename = "type")]
        kind: String,
        text: String,
    },
}

impl MessageContent {
    pub fn text(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Payload { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: MessageContent,
    #[serde(default)]
    pub media_files: Vec<String>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub generation_time_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct ListParams {
    pub limit: u32,
    pub offset: u32,
    pub archived: bool,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            archived: false,
        }
    }
}

#[derive(Serialize)]
struct NewConversation<'a> {
    title: &'a str,
    model_id: &'a [String],
}

#[derive(Serialize)]
struct RenameConversation<'a> {
    title: &'a str,
}

pub async fn list(
    gateway: &ApiGateway,
    params: ListParams,
) -> Result<Vec<Conversation>, GatewayError> {
    let request = ApiRequest::get("/v1/conversations")
        .query("limit", params.limit)
        .query("offset", params.offset)
        .query("archived", params.archived);
    gateway.execute(request).await
}

pub async fn create(
    gateway: &ApiGateway,
    title: &str,
    model_ids: &[String],
) -> Result<Conversation, GatewayError> {
    gateway
        .post(
            "/v1/conversations",
            &NewConversation {
                title,
                model_id: model_ids,
            },
        )
        .await
}

pub async fn delete(gateway: &ApiGateway, conversation_id: &str) -> Result<(), GatewayError> {
    gateway
        .delete_unit(&format!("/v1/conversations/{conversation_id}"))
        .await
}

pub async fn rename(
    gateway: &ApiGateway,
    conversation_id: &str,
    title: &str,
) -> Result<(), GatewayError> {
    gateway
        .put_unit(
            &format!("/v1/conversations/{conversation_id}/title"),
            &RenameConversation { title },
        )
        .await
}

/// Fetch a conversation's messages, oldest first.
pub async fn messages(
    gateway: &ApiGateway,
    conversation_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<Message>, GatewayError> {
    let request = ApiRequest::get(format!("/v1/conversations/{conversation_id}/messages"))
        .query("limit", limit)
        .query("offset", offset);
    let mut messages: Vec<Message> = gateway.execute(request).await?;
    sort_messages(&mut messages);
    Ok(messages)
}

fn sort_messages(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}
