//! Shared fixtures: a scripted in-memory chat client and canned responses.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use webgen::errors::{Result, WebgenError};
use webgen::provider::{ChatClient, TokenObserver};
use webgen::wire::{ChatMessage, CompletionOptions, ProgressEvent};

pub enum Reply {
    Text(String),
    Fail(String),
}

/// One recorded `complete` call.
#[derive(Debug, Clone)]
pub struct Call {
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub options: CompletionOptions,
}

/// Replays queued replies in order, streaming each text in small chunks.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self { replies: Mutex::new(replies.into()), calls: Mutex::new(Vec::new()) }
    }

    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Reply::Text(t.to_string())).collect())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
        observer: TokenObserver<'_>,
    ) -> Result<String> {
        self.calls.lock().push(Call {
            system_prompt: system_prompt.to_string(),
            history: history.to_vec(),
            options: options.clone(),
        });

        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Text(text)) => {
                let chars: Vec<char> = text.chars().collect();
                for chunk in chars.chunks(7) {
                    let piece: String = chunk.iter().collect();
                    observer(&piece);
                }
                Ok(text)
            }
            Some(Reply::Fail(msg)) => Err(WebgenError::Upstream(msg)),
            None => Err(WebgenError::Upstream("script exhausted".into())),
        }
    }
}

pub const ANALYSIS: &str = "Requirements Analysis: a simple todo list.\n关键问题:\n1. Need persistence?\n2. Need categories?";

pub const PLAN: &str = "1. Requirements Summary: todos stored locally.\n4. File Structure: index.html, styles.css, script.js";

pub const HTML: &str = "<!DOCTYPE html>\n<html>\n<head><link rel=\"stylesheet\" href=\"styles.css\"></head>\n<body><ul id=\"list\"></ul><script src=\"script.js\"></script></body>\n</html>";

pub const CSS: &str = "body {\n    font-family: sans-serif;\n    margin: 0 auto;\n    max-width: 40rem;\n}";

pub const JS: &str = "document.addEventListener('DOMContentLoaded', () => {\n    const list = document.getElementById('list');\n    list.textContent = localStorage.getItem('todos') || '';\n});";

pub fn fenced_response() -> String {
    format!("Here is your app.\n\n```html\n{HTML}\n```\n\n```css\n{CSS}\n```\n\n```javascript\n{JS}\n```\n")
}

/// Collects every event the pipeline emits.
#[derive(Default)]
pub struct Events(pub Vec<ProgressEvent>);

impl Events {
    pub fn data_between(&self, from: usize, to: usize) -> String {
        self.0[from..to]
            .iter()
            .filter_map(|e| match e {
                ProgressEvent::Data { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn position(&self, pred: impl Fn(&ProgressEvent) -> bool) -> Option<usize> {
        self.0.iter().position(pred)
    }

    pub fn terminal_count(&self) -> usize {
        self.0.iter().filter(|e| e.is_terminal()).count()
    }
}
