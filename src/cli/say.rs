//! TUI-less "say" command: one prompt in, the streamed reply out.

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use crate::api::{ChatMessage, ROLE_USER};
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::gateway::ApiGateway;

pub async fn run_say(
    gateway: Arc<ApiGateway>,
    prompt: Vec<String>,
    model: Option<String>,
    conversation_id: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.is_empty() {
        eprintln!("Usage: chathub say <prompt>");
        std::process::exit(1);
    }
    let Some(model) = model else {
        eprintln!("❌ No model specified. Pass -m or set default-model.");
        std::process::exit(1);
    };

    let (stream_service, mut rx) = ChatStreamService::new();
    stream_service.spawn_stream(StreamParams {
        gateway,
        model,
        messages: vec![ChatMessage {
            role: ROLE_USER.to_string(),
            content: prompt,
        }],
        conversation_id,
        cancel_token: tokio_util::sync::CancellationToken::new(),
        stream_id: 1,
    });

    loop {
        match rx.recv().await {
            Some((StreamMessage::Chunk(content), _)) => {
                print!("{content}");
                io::stdout().flush()?;
            }
            Some((StreamMessage::Error(err), _)) => {
                eprintln!("\n\n❌ Error: {err}");
                std::process::exit(1);
            }
            Some((StreamMessage::End, _)) => {
                println!();
                break;
            }
            None => break,
        }
    }

    Ok(())
}
