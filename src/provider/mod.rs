use async_trait::async_trait;

use crate::errors::Result;
use crate::wire::{ChatMessage, CompletionOptions};

pub mod openrouter;
pub mod sse;

pub use openrouter::OpenRouterClient;

/// Receives each non-empty text increment, in arrival order, while a
/// completion is in flight.
pub type TokenObserver<'a> = &'a mut (dyn FnMut(&str) + Send);

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// The system prompt is sent first, followed by `history` verbatim.
    /// Returns the concatenation of every fragment handed to `observer`.
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
        observer: TokenObserver<'_>,
    ) -> Result<String>;
}

pub type DynClient = Box<dyn ChatClient>;

#[async_trait]
impl<C: ChatClient + ?Sized> ChatClient for Box<C> {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        options: &CompletionOptions,
        observer: TokenObserver<'_>,
    ) -> Result<String> {
        (**self).complete(system_prompt, history, options, observer).await
    }
}

/// Observer that drops every fragment.
pub fn ignore_tokens(_: &str) {}
