use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::{CompletionService, LlmError};
use super::types::{ChatMessage, ChatRequest, Completion};
use crate::rag::Embedder;

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiOptions {
    pub base_url: String,
    pub api_key: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub timeout: Duration,
}

/// Client for `/v1/chat/completions` and `/v1/embeddings`.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl OpenAiClient {
    pub fn new(options: OpenAiOptions) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(LlmError::unreachable)?;

        Ok(Self {
            base_url: options.base_url.trim_end_matches('/').to_string(),
            api_key: options.api_key,
            chat_model: options.chat_model,
            embedding_model: options.embedding_model,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            client,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Response, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await.map_err(LlmError::unreachable)?;
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let text = res.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(LlmError::Rejected {
                status: status.as_u16(),
                message: text,
            })
        } else {
            Err(LlmError::Unreachable(format!("status {}: {}", status, text)))
        }
    }

    fn chat_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        body
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

fn parse_chat_payload(payload: Value) -> Result<Completion, LlmError> {
    let response: ChatCompletionResponse =
        serde_json::from_value(payload).map_err(LlmError::malformed)?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(LlmError::EmptyResponse)?;

    let completion = Completion::new(content);
    if completion.is_blank() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(completion)
}

fn parse_embedding_payload(payload: Value, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    let mut response: EmbeddingResponse =
        serde_json::from_value(payload).map_err(LlmError::malformed)?;

    if response.data.len() != expected {
        return Err(LlmError::Malformed(format!(
            "expected {} embeddings, got {}",
            expected,
            response.data.len()
        )));
    }

    response.data.sort_by_key(|item| item.index);
    Ok(response.data.into_iter().map(|item| item.embedding).collect())
}

#[async_trait]
impl CompletionService for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<Completion, LlmError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let res = self
            .post_json("/v1/chat/completions", &self.chat_body(&request))
            .await?;
        let payload: Value = res.json().await.map_err(LlmError::malformed)?;

        parse_chat_payload(payload)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    fn model_id(&self) -> &str {
        &self.embedding_model
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });

        let res = self.post_json("/v1/embeddings", &body).await?;
        let payload: Value = res.json().await.map_err(LlmError::malformed)?;

        parse_embedding_payload(payload, inputs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> OpenAiClient {
        OpenAiClient::new(OpenAiOptions {
            base_url: "http://localhost:9999/".to_string(),
            api_key: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: Some(0.3),
            max_tokens: None,
            timeout: Duration::from_secs(5),
        })
        .expect("client should build")
    }

    #[test]
    fn chat_payload_extracts_first_choice() {
        let payload = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Solar and wind cut emissions." } }
            ]
        });

        let completion = parse_chat_payload(payload).unwrap();
        assert_eq!(completion.text, "Solar and wind cut emissions.");
    }

    #[test]
    fn chat_payload_without_content_is_empty_response() {
        let no_choices = json!({ "choices": [] });
        assert!(matches!(
            parse_chat_payload(no_choices),
            Err(LlmError::EmptyResponse)
        ));

        let blank = json!({ "choices": [ { "message": { "content": "   " } } ] });
        assert!(matches!(parse_chat_payload(blank), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn chat_payload_with_wrong_shape_is_malformed() {
        let payload = json!({ "error": "nope" });
        assert!(matches!(
            parse_chat_payload(payload),
            Err(LlmError::Malformed(_))
        ));
    }

    #[test]
    fn embedding_payload_is_reordered_by_index() {
        let payload = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });

        let vectors = parse_embedding_payload(payload, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn embedding_payload_count_mismatch_is_malformed() {
        let payload = json!({ "data": [ { "index": 0, "embedding": [1.0] } ] });
        assert!(matches!(
            parse_embedding_payload(payload, 3),
            Err(LlmError::Malformed(_))
        ));
    }

    #[test]
    fn chat_body_carries_model_and_sampling_options() {
        let client = test_client();
        assert_eq!(client.base_url, "http://localhost:9999");

        let request = ChatRequest::new(vec![ChatMessage::user("hello")])
            .with_temperature(Some(0.3))
            .with_max_tokens(Some(64));
        let body = client.chat_body(&request);

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 64);
        assert!(body.get("temperature").is_some());
    }
}
