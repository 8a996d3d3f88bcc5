use bytes::BytesMut;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::{Result, WebgenError};

/// One decoded server-sent-event line from a streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Text delta (possibly empty).
    Delta(String),
    Done,
    /// Blank lines, comments (`: keep-alive`), and non-data fields.
    Ignored,
}

/// Splits a byte stream into complete lines. Bytes are buffered until a
/// newline arrives so multi-byte characters split across chunks decode intact.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw = self.pending.split_to(pos + 1);
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            lines.push(line.trim_end_matches('\r').to_string());
        }
        lines
    }

    /// Whatever is left once the stream closes without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = self.pending.split();
        let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
        Some(line)
    }
}

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

pub fn parse_line(line: &str) -> Result<SseLine> {
    let line = line.trim_end();
    if line.is_empty() || line.starts_with(':') {
        return Ok(SseLine::Ignored);
    }
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(SseLine::Ignored);
    };
    let payload = payload.trim_start();
    if payload == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: Chunk = serde_json::from_str(payload)
        .map_err(|e| WebgenError::Upstream(format!("malformed stream chunk: {e}: {payload}")))?;
    if let Some(err) = chunk.error {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(WebgenError::Upstream(message));
    }

    let text = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .unwrap_or_default();
    Ok(SseLine::Delta(text))
}
