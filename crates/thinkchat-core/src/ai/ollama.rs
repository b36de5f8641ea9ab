use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use tokio_util::sync::CancellationToken;

use crate::ai::ndjson::drive_stream;
use crate::config::Config;
use crate::error::StreamError;
use crate::state::{ChatMessage, StreamFragment};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

#[derive(Deserialize)]
struct OllamaModelsResponse {
    models: Vec<OllamaModel>,
}

/// Client for the Ollama chat endpoint. Holds no conversation state.
#[derive(Clone, Debug)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: crate::config::DEFAULT_TEMPERATURE,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.base_url, &config.model).with_temperature(config.temperature)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: &str) {
        self.model = model.to_string();
    }

    /// Stream a chat completion for `history`.
    ///
    /// `on_update` is called after every decoded line with the full text
    /// accumulated so far, then once more with the terminal fragment, which
    /// is also returned. Cancelling `cancel` aborts the request and resolves
    /// to [`StreamError::Cancelled`] without further updates.
    pub async fn stream_chat<F>(
        &self,
        history: &[ChatMessage],
        on_update: F,
        cancel: &CancellationToken,
    ) -> Result<StreamFragment, StreamError>
    where
        F: FnMut(StreamFragment),
    {
        if history.is_empty() {
            return Err(StreamError::EmptyHistory);
        }

        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: history,
            stream: true,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, messages = history.len(), "starting chat stream");

        let send = self.client.post(&url).json(&request).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::Cancelled),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StreamError::Cancelled),
                body = response.text() => body.unwrap_or_default(),
            };
            tracing::warn!(%status, "chat request rejected");
            return Err(StreamError::Status { status, body });
        }

        drive_stream(response.bytes_stream(), on_update, cancel).await
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to list models: {}. Make sure Ollama is running with: ollama serve",
                response.status()
            ));
        }

        let models_response: OllamaModelsResponse = response.json().await?;
        let model_names: Vec<String> = models_response
            .models
            .into_iter()
            .map(|model| model.name)
            .collect();

        Ok(model_names)
    }
}
