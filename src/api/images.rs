//! Image generation through the chat backend.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::conversations::{Message, MessageContent};
use crate::api::ROLE_ASSISTANT;
use crate::core::gateway::ApiGateway;

#[derive(Debug, Serialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: u32,
    pub size: String,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl ImageRequest {
    pub fn new(model: String, prompt: String) -> Self {
        Self {
            model,
            prompt,
            n: 1,
            size: "2K".to_string(),
            aspect_ratio: "1:1".to_string(),
            reference_images: Vec::new(),
            conversation_id: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<GeneratedImage>,
}

/// Generate an image and wrap the first returned URL as an image message.
pub async fn generate_image(
    gateway: &ApiGateway,
    request: &ImageRequest,
) -> Result<Message, Box<dyn std::error::Error>> {
    let response: ImageResponse = gateway.post("/v1/images/generations", request).await?;

    let image = response
        .data
        .into_iter()
        .next()
        .ok_or("no image URL received from backend")?;

    let now = Utc::now();
    Ok(Message {
        id: format!("img-{}", now.timestamp_millis()),
        conversation_id: request.conversation_id.clone().unwrap_or_default(),
        role: ROLE_ASSISTANT.to_string(),
        content: MessageContent::Payload {
            kind: "image".to_string(),
            text: image.url,
        },
        media_files: Vec::new(),
        tokens_used: None,
        cost: None,
        generation_time_ms: None,
        created_at: now,
    })
}
