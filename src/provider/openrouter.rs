use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::config::{mask_key, Config};
use crate::errors::{Result, WebgenError};
use crate::wire::{ChatMessage, CompletionOptions, Role};

use super::sse::{parse_line, LineBuffer, SseLine};
use super::{ChatClient, TokenObserver};

const REFERER: &str = "https://instaweb.example.com";
const TITLE: &str = "InstaWeb - WebApp Generator";

/// Streaming client for an OpenAI-compatible `/chat/completions` endpoint
/// (OpenRouter by default).
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    plain_model: String,
    search_model: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

impl OpenRouterClient {
    pub fn new(api_key: &str, base_url: &str, timeout_secs: u64) -> Result<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(WebgenError::Authentication(
                "API key is required; provide one or set it in the config file".into(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(WebgenError::upstream)?;
        tracing::info!(key = %mask_key(api_key), base_url, "using API key");

        let defaults = Config::default();
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            plain_model: defaults.models.plain,
            search_model: defaults.models.search,
            client,
        })
    }

    pub fn from_config(cfg: &Config, api_key: &str) -> Result<Self> {
        Ok(Self::new(api_key, &cfg.api.base_url, cfg.timeout_secs)?
            .with_models(&cfg.models.plain, &cfg.models.search))
    }

    pub fn with_models(mut self, plain: &str, search: &str) -> Self {
        self.plain_model = plain.to_string();
        self.search_model = search.to_string();
        self
    }

    pub fn model_for<'a>(&'a self, options: &'a CompletionOptions) -> &'a str {
        match (&options.model, options.search) {
            (Some(m), _) => m.as_str(),
            (None, true) => self.search_model.as_str(),
            (None, false) => self.plain_model.as_str(),
        }
    }
}

/// System prompt first, then the history verbatim.
pub fn build_messages(system_prompt: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage { role: Role::System, content: system_prompt.to_string() });
    messages.extend(history.iter().cloned());
    messages
}

#[async_trait]
impl ChatClient for OpenRouterClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
        observer: TokenObserver<'_>,
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: self.model_for(options),
            messages: build_messages(system_prompt, history),
            max_tokens: options.max_tokens,
            stream: true,
        };
        tracing::debug!(
            url = %url,
            model = body.model,
            messages = body.messages.len(),
            search = options.search,
            "POST chat completion"
        );

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", TITLE)
            .json(&body)
            .send()
            .await
            .map_err(|e| WebgenError::Upstream(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(WebgenError::Upstream(format!("API error ({status}): {text}")));
        }

        let mut result = String::new();
        let mut lines = LineBuffer::new();
        let mut stream = Box::pin(resp.bytes_stream());
        'read: while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| WebgenError::Upstream(format!("stream interrupted: {e}")))?;
            for line in lines.push(&chunk) {
                if handle_line(&line, &mut result, observer)? {
                    break 'read;
                }
            }
        }
        if let Some(line) = lines.finish() {
            handle_line(&line, &mut result, observer)?;
        }

        tracing::debug!(chars = result.chars().count(), "completion finished");
        Ok(result)
    }
}

/// Returns true once the terminating `[DONE]` line is seen.
fn handle_line(line: &str, result: &mut String, observer: TokenObserver<'_>) -> Result<bool> {
    match parse_line(line)? {
        SseLine::Delta(text) if !text.is_empty() => {
            result.push_str(&text);
            observer(&text);
            Ok(false)
        }
        SseLine::Done => Ok(true),
        _ => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_rejected() {
        for key in ["", "   ", "\n\t"] {
            let err = OpenRouterClient::new(key, "https://example.invalid", 5).err();
            assert!(matches!(err, Some(WebgenError::Authentication(_))));
        }
    }

    #[test]
    fn model_follows_completion_mode() {
        let client = OpenRouterClient::new("sk-test-0123456789abcdef", "https://example.invalid/", 5)
            .unwrap()
            .with_models("plain-model", "plain-model:online");
        assert_eq!(client.model_for(&CompletionOptions::plain()), "plain-model");
        assert_eq!(client.model_for(&CompletionOptions::search()), "plain-model:online");

        let explicit = CompletionOptions { model: Some("other".into()), ..CompletionOptions::search() };
        assert_eq!(client.model_for(&explicit), "other");

        // A model borrowed from short-lived options outlives neither side.
        let chosen = {
            let scoped = CompletionOptions::plain();
            client.model_for(&scoped).to_string()
        };
        assert_eq!(chosen, "plain-model");
        assert_eq!(client.base_url, "https://example.invalid");
    }

    #[test]
    fn system_prompt_leads_the_message_list() {
        let history = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let msgs = build_messages("sys", &history);
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0], ChatMessage::system("sys"));
        assert_eq!(msgs[1..], history[..]);
    }

    #[test]
    fn fragments_reach_observer_in_order_and_concatenate() {
        let lines = [
            ": OPENROUTER PROCESSING",
            r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#,
            "data: [DONE]",
        ];
        let mut seen = Vec::new();
        let mut result = String::new();
        let mut observer = |t: &str| seen.push(t.to_string());
        let mut done = false;
        for line in lines {
            done = handle_line(line, &mut result, &mut observer).unwrap();
        }
        assert!(done);
        assert_eq!(seen, vec!["Hel", "lo"]);
        assert_eq!(result, seen.concat());
    }
}
