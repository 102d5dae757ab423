//! AI replies from an OpenAI-compatible chat completions API.
//!
//! Works with any server that implements `POST /chat/completions` in the
//! OpenAI shape (OpenAI, Ollama, vLLM, LM Studio, ...). The API key is a
//! [`SecretString`], exposed only for the `Authorization` header.

use funnel_core::delivery::{AiProvider, AiReply, AiRequest, BoxFuture, DeliveryError};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{endpoint, ensure_success, transport_error};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    url: String,
    api_key: Option<SecretString>,
    default_model: String,
}

impl OpenAiCompatProvider {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<SecretString>, default_model: String) -> Self {
        Self {
            client,
            url: endpoint(base_url, "chat/completions"),
            api_key,
            default_model,
        }
    }

    fn build_request<'a>(&'a self, request: &'a AiRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: &request.prompt });

        ChatRequest {
            model: request.model.as_deref().unwrap_or(&self.default_model),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    async fn complete(&self, request: &AiRequest) -> Result<AiReply, DeliveryError> {
        let body = self.build_request(request);
        tracing::debug!(url = self.url.as_str(), model = body.model, "chat completion request");

        let mut http = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key.expose_secret());
        }
        let response = ensure_success(http.send().await.map_err(transport_error)?).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(format!("failed to parse completion: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DeliveryError::InvalidResponse("completion has no content".into()))?;

        Ok(AiReply {
            content,
            model: parsed.model.unwrap_or_else(|| body.model.to_string()),
            usage: parsed.usage,
        })
    }
}

impl AiProvider for OpenAiCompatProvider {
    fn generate<'a>(&'a self, request: &'a AiRequest) -> BoxFuture<'a, Result<AiReply, DeliveryError>> {
        Box::pin(self.complete(request))
    }
}
