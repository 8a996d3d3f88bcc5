use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs_err as fs;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Level;
use uuid::Uuid;

use crate::errors::{Result, WebgenError};
use crate::provider::{ChatClient, TokenObserver};
use crate::wire::{ChatMessage, CompletionOptions};

/// Installs the stderr fmt subscriber. Safe to call more than once.
pub fn init_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join(".webgen").join("tx").join(tx.to_string())
}

#[derive(Serialize)]
struct Transcript<'a> {
    tx: Uuid,
    seq: usize,
    stage: &'a str,
    timestamp: DateTime<Utc>,
    system_prompt: &'a str,
    history: &'a [ChatMessage],
    options: &'a CompletionOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// File-name stage for calls that carry no stage.
const UNSTAGED: &str = "completion";

/// Wraps a client and saves every exchange as
/// `<root>/.webgen/tx/<uuid>/<seq>-<stage>.json`.
pub struct RecordingClient<C> {
    inner: C,
    dir: PathBuf,
    tx: Uuid,
    seq: AtomicUsize,
}

impl<C: ChatClient> RecordingClient<C> {
    pub fn new(inner: C, root: &Path) -> Self {
        let tx = Uuid::new_v4();
        Self { inner, dir: tx_dir(root, tx), tx, seq: AtomicUsize::new(0) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn save(&self, transcript: &Transcript<'_>) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{:02}-{}.json", transcript.seq, transcript.stage));
        let json = to_string_pretty(transcript).map_err(|e| WebgenError::Config(e.to_string()))?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

#[async_trait]
impl<C: ChatClient> ChatClient for RecordingClient<C> {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
        observer: TokenObserver<'_>,
    ) -> Result<String> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.inner.complete(system_prompt, history, options, observer).await;

        let transcript = Transcript {
            tx: self.tx,
            seq,
            stage: options.stage.as_deref().unwrap_or(UNSTAGED),
            timestamp: Utc::now(),
            system_prompt,
            history,
            options,
            response: result.as_ref().ok().map(String::as_str),
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        // A failed save must not fail the generation.
        match self.save(&transcript) {
            Ok(path) => tracing::debug!(path = %path.display(), "transcript saved"),
            Err(e) => tracing::warn!(error = %e, "could not save transcript"),
        }

        result
    }
}
