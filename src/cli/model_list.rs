use std::error::Error;

use crate::api::models::{fetch_models, sort_models};
use crate::core::gateway::ApiGateway;

/// Print the backend's model catalog, grouped by provider.
pub async fn list_models(gateway: &ApiGateway) -> Result<(), Box<dyn Error>> {
    let mut models = fetch_models(gateway).await?;
    if models.is_empty() {
        println!("No models available.");
        return Ok(());
    }
    sort_models(&mut models);

    let mut current_provider = String::new();
    for model in &models {
        if model.provider != current_provider {
            if !current_provider.is_empty() {
                println!();
            }
            println!("{}:", model.provider);
            current_provider = model.provider.clone();
        }

        let mut capabilities = Vec::new();
        if model.supports_images {
            capabilities.push("images");
        }
        if model.supports_video {
            capabilities.push("video");
        }
        let capabilities = if capabilities.is_empty() {
            String::new()
        } else {
            format!("  [{}]", capabilities.join(", "))
        };

        println!(
            "  {:<40} {:<8} ${:.2}/${:.2} per 1M tokens{}",
            model.id, model.kind, model.input_cost, model.output_cost, capabilities
        );
    }

    Ok(())
}
