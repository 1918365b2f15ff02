use serde::Deserialize;

use crate::core::gateway::{ApiGateway, GatewayError};

/// A model offered by the backend. Costs are per million tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct AiModel {
    pub id: String,
    pub provider: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub input_cost: f64,
    #[serde(default)]
    pub output_cost: f64,
    #[serde(default)]
    pub max_tokens: u64,
    #[serde(default)]
    pub supports_images: bool,
    #[serde(default)]
    pub supports_video: bool,
    #[serde(default)]
    pub max_video_duration: Option<u64>,
    #[serde(default)]
    pub max_video_resolution: Option<String>,
}

pub async fn fetch_models(gateway: &ApiGateway) -> Result<Vec<AiModel>, GatewayError> {
    gateway.get("/v1/models").await
}

/// Sort models for consistent display: grouped by provider, then by id.
pub fn sort_models(models: &mut [AiModel]) {
    models.sort_by(|a, b| a.provider.cmp(&b.provider).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str, provider: &str) -> AiModel {
        serde_json::from_str(&format!(
            r#"{{"id":"{id}","provider":"{provider}","name":"{id}","type":"text"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn model_record_deserializes_capability_fields() {
        let model: AiModel = serde_json::from_str(
            r#"{"id":"gpt-4o","provider":"openai","name":"GPT-4o","type":"text",
                "input_cost":2.5,"output_cost":10.0,"max_tokens":128000,
                "supports_images":true,"supports_video":false,
                "max_video_duration":null,"max_video_resolution":null}"#,
        )
        .unwrap();
        assert_eq!(model.kind, "text");
        assert!(model.supports_images);
        assert_eq!(model.max_tokens, 128_000);
    }

    #[test]
    fn sort_groups_by_provider_then_id() {
        let mut models = vec![
            model("z-model", "openai"),
            model("sonnet", "anthropic"),
            model("a-model", "openai"),
        ];
        sort_models(&mut models);
        let order: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(order, vec!["sonnet", "a-model", "z-model"]);
    }
}
