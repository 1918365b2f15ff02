//! Streaming chat completions.
//!
//! [`ChatStreamService`] spawns a task that posts a streaming chat request
//! through the gateway, parses the SSE response line by line, and forwards
//! chunks over an unbounded channel tagged with a stream id so stale streams
//! can be ignored after a retry.

use std::sync::Arc;

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;

use crate::api::{ChatMessage, ChatRequest, ChatStreamResponse};
use crate::core::gateway::{ApiGateway, ApiRequest};

const CHAT_COMPLETIONS_ENDPOINT: &str = "v1/chat/completions";

#[derive(Clone, Debug)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

pub struct StreamParams {
    pub gateway: Arc<ApiGateway>,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub conversation_id: Option<String>,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                gateway,
                model,
                messages,
                conversation_id,
                cancel_token,
                stream_id,
            } = params;

            let payload = ChatRequest::new(model, messages, conversation_id).streaming();

            tokio::select! {
                _ = run_stream(gateway, payload, tx, stream_id, cancel_token.clone()) => {}
                _ = cancel_token.cancelled() => {}
            }
        });
    }
}

async fn run_stream(
    gateway: Arc<ApiGateway>,
    payload: ChatRequest,
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
    cancel_token: tokio_util::sync::CancellationToken,
) {
    let request = match ApiRequest::post(CHAT_COMPLETIONS_ENDPOINT).json(&payload) {
        Ok(request) => request,
        Err(err) => {
            let _ = tx.send((StreamMessage::Error(err.to_string()), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            return;
        }
    };

    let response = match gateway.send(request).await {
        Ok(response) => response,
        Err(err) => {
            let _ = tx.send((StreamMessage::Error(err.to_string()), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            return;
        }
    };

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let _ = tx.send((StreamMessage::Error(format_api_error(&error_text)), stream_id));
        let _ = tx.send((StreamMessage::End, stream_id));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        if cancel_token.is_cancelled() {
            return;
        }

        let Ok(chunk_bytes) = chunk else {
            continue;
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let line = match std::str::from_utf8(&buffer[..newline_pos]) {
                Ok(text) => text.trim().to_string(),
                Err(_) => {
                    buffer.drain(..=newline_pos);
                    continue;
                }
            };
            buffer.drain(..=newline_pos);

            if process_sse_line(&line, &tx, stream_id) {
                return;
            }
        }
    }

    let _ = tx.send((StreamMessage::End, stream_id));
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Returns true when the stream is finished.
fn process_sse_line(
    line: &str,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    let Some(payload) = extract_data_payload(line) else {
        return false;
    };

    if payload == "[DONE]" {
        let _ = tx.send((StreamMessage::End, stream_id));
        return true;
    }

    match serde_json::from_str::<ChatStreamResponse>(payload) {
        Ok(response) => {
            if let Some(content) = response
                .choices
                .first()
                .and_then(|choice| choice.delta.content.as_ref())
            {
                let _ = tx.send((StreamMessage::Chunk(content.clone()), stream_id));
            }
            false
        }
        Err(_) => {
            if payload.trim().is_empty() {
                return false;
            }
            let _ = tx.send((StreamMessage::Error(format_api_error(payload)), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            true
        }
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .or_else(|| value.pointer("/error"))
        .or_else(|| value.pointer("/message"))
        .and_then(|v| v.as_str())
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                return format!("API Error: {summary}\n```json\n{pretty_json}\n```");
            }
            return format!("API Error:\n```json\n{pretty_json}\n```");
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{trimmed}\n```")
    } else {
        format!("API Error:\n```\n{trimmed}\n```")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_line_spacing_variants_both_parse() {
        let (service, mut rx) = ChatStreamService::new();
        for (line, expected) in [
            (r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#, "Hello"),
            (r#"data:{"choices":[{"delta":{"content":"World"}}]}"#, "World"),
        ] {
            assert!(!process_sse_line(line, &service.tx, 1));
            match rx.try_recv() {
                Ok((StreamMessage::Chunk(content), 1)) => assert_eq!(content, expected),
                other => panic!("expected chunk, got {other:?}"),
            }
        }
    }

    #[test]
    fn done_marker_ends_the_stream() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(process_sse_line("data: [DONE]", &service.tx, 7));
        assert!(matches!(rx.try_recv(), Ok((StreamMessage::End, 7))));
    }

    #[test]
    fn non_data_lines_are_ignored() {
        let (service, mut rx) = ChatStreamService::new();
        assert!(!process_sse_line("event: ping", &service.tx, 1));
        assert!(!process_sse_line("", &service.tx, 1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn undecodable_payload_becomes_error_then_end() {
        let (service, mut rx) = ChatStreamService::new();
        let line = r#"data: {"error":{"message":"model overloaded"}}"#;
        assert!(process_sse_line(line, &service.tx, 3));

        match rx.try_recv() {
            Ok((StreamMessage::Error(text), 3)) => {
                assert!(text.starts_with("API Error: model overloaded"));
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert!(matches!(rx.try_recv(), Ok((StreamMessage::End, 3))));
    }

    #[test]
    fn format_api_error_prettifies_json_with_summary() {
        let formatted =
            format_api_error(r#"{"error":{"message":"  model   overloaded "}}"#);
        assert!(formatted.starts_with("API Error: model overloaded\n```json\n"));
    }

    #[test]
    fn format_api_error_handles_xml_and_plaintext() {
        assert_eq!(
            format_api_error("<error>bad</error>"),
            "API Error:\n```xml\n<error>bad</error>\n```"
        );
        assert_eq!(format_api_error("api failure"), "API Error:\n```\napi failure\n```");
        assert_eq!(format_api_error("  "), "API Error:\n```\n<empty>\n```");
    }
}
