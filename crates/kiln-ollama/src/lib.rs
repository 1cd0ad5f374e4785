// SPDX-FileCopyrightText: 2026 Kiln Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ollama-backed [`CodeGenerator`] for the Kiln runtime.
//!
//! Sends the rendered code prompt as a system + user chat exchange to a
//! local Ollama server and returns the assistant text unmodified; code
//! extraction happens in the sandbox.

pub mod client;
pub mod types;

use async_trait::async_trait;
use kiln_config::model::{GeneratorConfig, RuntimeConfig};
use kiln_core::{CodeGenerator, CodePrompt, KilnError};
use tracing::{debug, info};

use crate::client::OllamaClient;
use crate::types::{ChatMessage, ChatOptions, ChatRequest};

/// Code generator talking to an Ollama chat endpoint.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
    config: GeneratorConfig,
}

impl OllamaGenerator {
    /// Creates a generator from configuration.
    ///
    /// The HTTP timeout matches the runtime's generate timeout so a hung
    /// server surfaces as an HTTP error before the sandbox gives up.
    pub fn new(config: &GeneratorConfig, runtime: &RuntimeConfig) -> Result<Self, KilnError> {
        let client = OllamaClient::new(config.endpoint.clone(), runtime.generate_timeout())?;
        info!(endpoint = %config.endpoint, model = %config.model, "ollama generator initialized");
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn to_request(&self, prompt: &CodePrompt) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(prompt.system.clone()),
                ChatMessage::user(prompt.user.clone()),
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
            keep_alive: self.config.keep_alive.clone(),
        }
    }
}

#[async_trait]
impl CodeGenerator for OllamaGenerator {
    async fn complete(&self, prompt: &CodePrompt) -> Result<String, KilnError> {
        let response = self.client.chat(&self.to_request(prompt)).await?;
        debug!(
            model = %response.model,
            eval_count = response.eval_count,
            chars = response.message.content.len(),
            "generation complete"
        );
        if response.message.content.trim().is_empty() {
            return Err(KilnError::Generation {
                message: "model returned an empty response".into(),
                source: None,
            });
        }
        Ok(response.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(endpoint: &str) -> OllamaGenerator {
        let config = GeneratorConfig {
            endpoint: endpoint.to_string(),
            model: "coder-test".into(),
            temperature: 0.0,
            keep_alive: "1m".into(),
        };
        OllamaGenerator::new(&config, &RuntimeConfig::default()).unwrap()
    }

    fn prompt() -> CodePrompt {
        CodePrompt {
            system: "You write code.".into(),
            user: "Task:\nprint hi\n".into(),
        }
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({
                "model": "coder-test",
                "stream": false,
                "keep_alive": "1m",
                "messages": [
                    {"role": "system", "content": "You write code."},
                    {"role": "user", "content": "Task:\nprint hi\n"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "coder-test",
                "message": {"role": "assistant", "content": "```python\nprint('hi')\n```"},
                "done": true,
                "eval_count": 12
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = generator(&server.uri()).complete(&prompt()).await.unwrap();
        assert_eq!(text, "```python\nprint('hi')\n```");
    }

    #[tokio::test]
    async fn empty_reply_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "  "},
                "done": true
            })))
            .mount(&server)
            .await;

        let err = generator(&server.uri()).complete(&prompt()).await.unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_generation_error() {
        let err = generator("http://127.0.0.1:1").complete(&prompt()).await.unwrap_err();
        assert!(matches!(err, KilnError::Generation { .. }));
    }
}
