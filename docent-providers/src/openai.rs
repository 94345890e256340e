//! OpenAI-compatible HTTP client implementation
//!
//! Implements both chat completions (with SSE streaming) and text embeddings
//! against any endpoint speaking the OpenAI API shape.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::base::{
    EmbeddingProvider, LLMProvider, LLMResponse, LLMStreamEvent, Message, ProviderError,
    ProviderEventStream, ProviderResult,
};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Chat completion request format
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    max_tokens: i32,
    temperature: f64,
}

/// Chat completion response format
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Embeddings request format
#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

/// Embeddings response format
#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI-compatible provider client
pub struct OpenAIClient {
    client: Client,
    api_base: String,
    api_key: Option<String>,
    default_model: String,
    embed_model: String,
    embedding_dimension: usize,
}

impl OpenAIClient {
    /// Create a new client
    pub fn new(
        api_key: Option<String>,
        api_base: Option<String>,
        default_model: String,
        embed_model: String,
    ) -> Self {
        let api_base = api_base
            .and_then(|base| {
                let trimmed = base.trim().trim_end_matches('/').to_string();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            })
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let embedding_dimension = match embed_model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            _ => 1536,
        };

        Self {
            client: Client::new(),
            api_base,
            api_key,
            default_model,
            embed_model,
            embedding_dimension,
        }
    }

    fn apply_headers(&self, mut req_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        req_builder
    }

    /// Parse a chat completion response into our standard format
    fn parse_response(&self, response: ChatCompletionResponse) -> ProviderResult<LLMResponse> {
        let choice = response
            .choices
            .first()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".to_string()))?;

        Ok(LLMResponse {
            content: choice.message.content.clone(),
            finish_reason: choice
                .finish_reason
                .clone()
                .unwrap_or_else(|| "stop".to_string()),
            usage: usage_map(&response.usage),
        })
    }

    fn finalize_partial_response(
        content: String,
        finish_reason: Option<String>,
        usage: Option<Usage>,
    ) -> LLMResponse {
        LLMResponse {
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            finish_reason: finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage: usage.as_ref().map(usage_map).unwrap_or_default(),
        }
    }

    fn parse_sse_events(buffer: &mut String) -> Vec<String> {
        let mut events = Vec::new();
        while let Some(pos) = buffer.find("\n\n") {
            let raw = buffer[..pos].to_string();
            buffer.drain(..pos + 2);

            let mut data_lines = Vec::new();
            for line in raw.lines() {
                if let Some(rest) = line.strip_prefix("data:") {
                    data_lines.push(rest.trim().to_string());
                }
            }

            if !data_lines.is_empty() {
                events.push(data_lines.join("\n"));
            }
        }
        events
    }
}

fn usage_map(usage: &Usage) -> HashMap<String, i64> {
    let mut map = HashMap::new();
    map.insert("prompt_tokens".to_string(), usage.prompt_tokens);
    map.insert("completion_tokens".to_string(), usage.completion_tokens);
    map.insert("total_tokens".to_string(), usage.total_tokens);
    map
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: i32,
        temperature: f64,
    ) -> ProviderResult<LLMResponse> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatCompletionRequest {
            model: model.clone(),
            messages,
            stream: None,
            max_tokens,
            temperature,
        };

        debug!(
            "Sending chat request to {} with model {}",
            self.api_base, model
        );

        let url = format!("{}/chat/completions", self.api_base);
        let req_builder = self.apply_headers(self.client.post(&url).json(&request));

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let response_data: ChatCompletionResponse = response.json().await?;
        self.parse_response(response_data)
    }

    async fn chat_stream(
        &self,
        messages: Vec<Message>,
        model: Option<String>,
        max_tokens: i32,
        temperature: f64,
    ) -> ProviderResult<ProviderEventStream> {
        let model = model.unwrap_or_else(|| self.default_model.clone());
        let request = ChatCompletionRequest {
            model: model.clone(),
            messages,
            stream: Some(true),
            max_tokens,
            temperature,
        };

        debug!(
            "Sending streaming chat request to {} with model {}",
            self.api_base, model
        );

        let url = format!("{}/chat/completions", self.api_base);
        let req_builder = self.apply_headers(self.client.post(&url).json(&request));
        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut response = response;
            let mut buffer = String::new();
            let mut content = String::new();
            let mut finish_reason: Option<String> = None;
            let mut usage: Option<Usage> = None;

            loop {
                let chunk = match response.chunk().await {
                    Ok(Some(bytes)) => bytes,
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.send(Err(ProviderError::HttpError(err)));
                        return;
                    }
                };

                let text = String::from_utf8_lossy(&chunk);
                buffer.push_str(&text);

                for payload in Self::parse_sse_events(&mut buffer) {
                    if payload == "[DONE]" {
                        let final_response = Self::finalize_partial_response(
                            content.clone(),
                            finish_reason.clone(),
                            usage.take(),
                        );
                        let _ = tx.send(Ok(LLMStreamEvent::Completed(final_response)));
                        return;
                    }

                    let parsed = match serde_json::from_str::<StreamChunk>(&payload) {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            let _ = tx.send(Err(ProviderError::JsonError(err)));
                            return;
                        }
                    };

                    if parsed.choices.is_empty() {
                        usage = parsed.usage;
                        continue;
                    }

                    if let Some(choice) = parsed.choices.first() {
                        if let Some(reason) = &choice.finish_reason {
                            finish_reason = Some(reason.clone());
                        }
                        if let Some(delta_text) = &choice.delta.content {
                            content.push_str(delta_text);
                            let _ = tx.send(Ok(LLMStreamEvent::TextDelta(delta_text.clone())));
                        }
                    }
                }
            }

            let final_response =
                Self::finalize_partial_response(content, finish_reason, usage);
            let _ = tx.send(Ok(LLMStreamEvent::Completed(final_response)));
        });

        Ok(Box::pin(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })))
    }

    fn get_default_model(&self) -> String {
        self.default_model.clone()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIClient {
    async fn embed(&self, text: &str) -> ProviderResult<Vec<f32>> {
        let mut embeddings = self.embed_batch(&[text]).await?;
        embeddings
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse("No embedding in response".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> ProviderResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingsRequest {
            model: self.embed_model.clone(),
            input: texts.iter().map(|t| t.to_string()).collect(),
        };

        debug!(
            "Sending embeddings request to {} for {} inputs",
            self.api_base,
            texts.len()
        );

        let url = format!("{}/embeddings", self.api_base);
        let req_builder = self.apply_headers(self.client.post(&url).json(&request));
        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let response_data: EmbeddingsResponse = response.json().await?;
        if response_data.data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response_data.data.len()
            )));
        }

        let mut data = response_data.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.embed_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn test_client(api_base: &str) -> OpenAIClient {
        OpenAIClient::new(
            Some("test-key".to_string()),
            Some(api_base.to_string()),
            "gpt-4o".to_string(),
            "text-embedding-3-small".to_string(),
        )
    }

    #[test]
    fn test_api_base_normalization() {
        let client = OpenAIClient::new(
            None,
            Some("https://example.com/v1/".to_string()),
            "gpt-4o".to_string(),
            "text-embedding-3-small".to_string(),
        );
        assert_eq!(client.api_base, "https://example.com/v1");

        let client = OpenAIClient::new(
            None,
            Some("   ".to_string()),
            "gpt-4o".to_string(),
            "text-embedding-3-small".to_string(),
        );
        assert_eq!(client.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_embedding_dimension_by_model() {
        let small = OpenAIClient::new(
            None,
            None,
            "gpt-4o".to_string(),
            "text-embedding-3-small".to_string(),
        );
        assert_eq!(small.dimension(), 1536);

        let large = OpenAIClient::new(
            None,
            None,
            "gpt-4o".to_string(),
            "text-embedding-3-large".to_string(),
        );
        assert_eq!(large.dimension(), 3072);
    }

    #[test]
    fn test_parse_sse_events() {
        let mut buffer =
            "data: {\"a\":1}\n\ndata: {\"b\":2}\n\ndata: [DONE]\n\ntrailing".to_string();
        let events = OpenAIClient::parse_sse_events(&mut buffer);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], "{\"a\":1}");
        assert_eq!(events[1], "{\"b\":2}");
        assert_eq!(events[2], "[DONE]");
        assert_eq!(buffer, "trailing");
    }

    #[tokio::test]
    async fn test_chat_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"choices":[{"message":{"content":"Hello, world"},"finish_reason":"stop"}],
                    "usage":{"prompt_tokens":5,"completion_tokens":3,"total_tokens":8}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let response = client
            .chat(vec![Message::user("hi")], None, 64, 0.1)
            .await
            .unwrap();

        assert_eq!(response.content.as_deref(), Some("Hello, world"));
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.usage.get("total_tokens"), Some(&8));
    }

    #[tokio::test]
    async fn test_chat_stream_emits_deltas_in_order() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\", world\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let mut stream = client
            .chat_stream(vec![Message::user("hi")], None, 64, 0.1)
            .await
            .unwrap();

        let mut deltas = Vec::new();
        let mut completed = None;
        while let Some(event) = stream.next().await {
            match event.unwrap() {
                LLMStreamEvent::TextDelta(text) => deltas.push(text),
                LLMStreamEvent::Completed(response) => completed = Some(response),
            }
        }

        assert_eq!(deltas, vec!["Hel", "lo", ", world"]);
        let completed = completed.unwrap();
        assert_eq!(completed.content.as_deref(), Some("Hello, world"));
    }

    #[tokio::test]
    async fn test_chat_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("unauthorized")
            .create_async()
            .await;

        let client = test_client(&server.url());
        let err = client
            .chat(vec![Message::user("hi")], None, 64, 0.1)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::ApiError(_)));
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order() {
        let mut server = mockito::Server::new_async().await;
        // Out-of-order indices must be re-sorted
        let _mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[
                    {"index":1,"embedding":[0.0,1.0]},
                    {"index":0,"embedding":[1.0,0.0]}
                ]}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let embeddings = client.embed_batch(&["first", "second"]).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0], vec![1.0, 0.0]);
        assert_eq!(embeddings[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn test_embed_batch_empty_input() {
        let client = test_client("http://localhost:0");
        let embeddings = client.embed_batch(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
