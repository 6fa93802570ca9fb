//! Concrete [`LlmClient`] hitting an OpenAI-compatible chat completions
//! endpoint (the default `MODEL_ENDPOINT`, Azure's AI model inference
//! gateway for GitHub Models, speaks this wire format).
//!
//! Built directly on `reqwest` rather than an `openai`-specific client
//! crate: those are pinned to OpenAI's own base URL assumptions, and the
//! gateway only ever needs a handful of fields from the response.

use super::http_pool::{client_for, ClientKind};
use super::llm_client::{ChatTurn, LlmClient, MessageChunk, MessageChunkStream, Role};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use std::error::Error;

/// Talks to the configured model endpoint using whatever bearer token the
/// caller hands to each call — it holds no credential of its own, so a
/// single instance is shared across requests from different callers.
pub struct AzureInferenceClient {
    endpoint: String,
    model: String,
}

impl AzureInferenceClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    fn role_str(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    fn request_body(&self, turns: &[ChatTurn], stream: bool) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|t| json!({ "role": Self::role_str(t.role), "content": t.content }))
            .collect();
        json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
        })
    }
}

#[async_trait]
impl LlmClient for AzureInferenceClient {
    async fn send_message(&self, turns: &[ChatTurn], token: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        let client = client_for(&self.endpoint, ClientKind::LlmInference);
        let response = client
            .post(self.chat_url())
            .bearer_auth(token)
            .json(&self.request_body(turns, false))
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or("completion response missing choices[0].message.content")?
            .to_string();
        Ok(content)
    }

    async fn send_message_stream(
        &self,
        turns: &[ChatTurn],
        token: &str,
    ) -> Result<Option<MessageChunkStream>, Box<dyn Error + Send + Sync>> {
        let client = client_for(&self.endpoint, ClientKind::LlmInference);
        let response = client
            .post(self.chat_url())
            .bearer_auth(token)
            .json(&self.request_body(turns, true))
            .send()
            .await?
            .error_for_status()?;

        let byte_stream = response.bytes_stream();
        let chunk_stream = byte_stream.flat_map(|chunk| {
            let events = match chunk {
                Ok(bytes) => parse_sse_chunk(&bytes),
                Err(e) => vec![Err(Box::new(e) as Box<dyn Error + Send + Sync>)],
            };
            futures_util::stream::iter(events)
        });

        Ok(Some(Box::pin(chunk_stream)))
    }
}

/// Parse one `text/event-stream` frame of an OpenAI-style streaming
/// response (`data: {json}` lines, terminated by `data: [DONE]`).
fn parse_sse_chunk(bytes: &[u8]) -> Vec<Result<MessageChunk, Box<dyn Error + Send + Sync>>> {
    let text = String::from_utf8_lossy(bytes);
    let mut out = Vec::new();
    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data: ") else {
            continue;
        };
        if payload == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(payload) {
            Ok(value) => {
                let delta = &value["choices"][0]["delta"]["content"];
                let content = delta.as_str().unwrap_or("").to_string();
                let finish_reason = value["choices"][0]["finish_reason"]
                    .as_str()
                    .map(|s| s.to_string());
                out.push(Ok(MessageChunk { content, finish_reason }));
            }
            Err(e) => out.push(Err(Box::new(e) as Box<dyn Error + Send + Sync>)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_chat_completions_url_without_double_slash() {
        let client = AzureInferenceClient::new("https://models.inference.ai.azure.com/", "gpt-4.1-mini");
        assert_eq!(client.chat_url(), "https://models.inference.ai.azure.com/chat/completions");
    }

    #[test]
    fn parses_a_single_sse_content_delta() {
        let frame = b"data: {\"choices\":[{\"delta\":{\"content\":\"hi\"},\"finish_reason\":null}]}\n\n";
        let events = parse_sse_chunk(frame);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().content, "hi");
    }

    #[test]
    fn ignores_the_done_sentinel() {
        let frame = b"data: [DONE]\n\n";
        assert!(parse_sse_chunk(frame).is_empty());
    }
}
