use crate::errors::{Result, WebgenError};
use crate::extract::{self, Extraction};
use crate::prompt;
use crate::provider::{ChatClient, TokenObserver};
use crate::wire::{ChatMessage, CompletionOptions, PlanResult};

/// How the plan is handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActStyle {
    /// The whole PlanResult as pretty JSON.
    #[default]
    PlanJson,
    /// ANALYSIS / PLAN / ANSWERS text sections, with the "not a todo app" guard.
    Sections,
}

#[derive(Debug, Clone, Default)]
pub struct ActOptions {
    pub style: ActStyle,
    pub search: bool,
    pub max_tokens: Option<u32>,
}

impl ActOptions {
    fn completion(&self) -> CompletionOptions {
        let base = if self.search { CompletionOptions::search() } else { CompletionOptions::plain() };
        base.with_max_tokens(self.max_tokens).with_stage("act")
    }
}

/// One completion, then extraction. Zero extracted files is an error.
pub async fn run_act_phase(
    client: &dyn ChatClient,
    plan: &PlanResult,
    options: &ActOptions,
    observer: TokenObserver<'_>,
) -> Result<Extraction> {
    let (system, user) = match options.style {
        ActStyle::PlanJson => (prompt::system_prompt_act(), prompt::user_prompt_act_json(plan)),
        ActStyle::Sections => (prompt::system_prompt_act_sections(), prompt::user_prompt_act_sections(plan)),
    };

    tracing::info!(style = ?options.style, search = options.search, "generating code");
    let response = client
        .complete(&system, &[ChatMessage::user(user)], &options.completion(), observer)
        .await?;

    let extraction = extract::extract(&response);
    if extraction.files.is_empty() {
        tracing::warn!(chars = response.chars().count(), "no code blocks found in the response");
        return Err(WebgenError::EmptyResult("no files produced; retry".into()));
    }
    if !extraction.replaced.is_empty() {
        tracing::warn!(files = ?extraction.replaced, "model output replaced by templates");
    }
    Ok(extraction)
}
