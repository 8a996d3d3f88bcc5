//! Plan→Act orchestration for one generation request.
//!
//! Emits zero or more `data`/`status` events, `plan-complete` once the plan
//! is settled, then exactly one terminal event: `generation-complete` or
//! `error`.

use std::path::Path;

use crate::act::{self, ActOptions, ActStyle};
use crate::apply::{self, WriteSummary};
use crate::errors::{Result, WebgenError};
use crate::extract::templates::{complete_shell, fallback_files};
use crate::extract::Strategy;
use crate::plan::{self, FailurePolicy};
use crate::provider::ChatClient;
use crate::wire::{GeneratedFile, PlanResult, ProgressEvent};

pub type EventSink<'a> = &'a mut (dyn FnMut(ProgressEvent) + Send);

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub plan_failure: FailurePolicy,
    pub act: ActOptions,
    /// Substitute `fallback_files` when the Act stage fails.
    pub degrade_on_act_error: bool,
    /// Add any missing `index.html` / `styles.css` / `script.js` from templates.
    /// A structural extraction is always completed.
    pub complete_shell: bool,
}

impl PipelineOptions {
    /// Errors surface to the caller; nothing is substituted.
    pub fn cli() -> Self {
        Self {
            plan_failure: FailurePolicy::Propagate,
            act: ActOptions { style: ActStyle::PlanJson, search: false, max_tokens: None },
            degrade_on_act_error: false,
            complete_shell: false,
        }
    }

    /// Keeps a UI responsive: fallback plan, fallback files, completed shell.
    pub fn server() -> Self {
        Self {
            plan_failure: FailurePolicy::Fallback,
            act: ActOptions { style: ActStyle::Sections, search: true, max_tokens: None },
            degrade_on_act_error: true,
            complete_shell: true,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.act.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub plan: PlanResult,
    /// The files found under the output directory after writing.
    pub files: Vec<GeneratedFile>,
    pub summary: WriteSummary,
    pub warnings: Vec<String>,
}

fn fail(sink: EventSink<'_>, e: WebgenError) -> WebgenError {
    tracing::error!(error = %e, "generation failed");
    sink(ProgressEvent::Error { message: e.to_string() });
    e
}

pub async fn run(
    client: &dyn ChatClient,
    description: &str,
    out_dir: &Path,
    options: &PipelineOptions,
    sink: EventSink<'_>,
) -> Result<PipelineOutput> {
    sink(ProgressEvent::status("Planning phase started"));
    let planned = {
        let mut forward = |t: &str| sink(ProgressEvent::Data { text: t.to_string() });
        plan::run_plan_phase_with_policy(
            client,
            description,
            options.act.max_tokens,
            options.plan_failure,
            &mut forward,
        )
        .await
    };
    let plan = match planned {
        Ok(plan) => plan,
        Err(e) => return Err(fail(sink, e)),
    };
    sink(ProgressEvent::PlanComplete {
        analysis: plan.initial_analysis.clone(),
        answers: plan.answers.clone(),
        plan: plan.plan.clone(),
    });

    sink(ProgressEvent::status("Generation phase started"));
    let generated = {
        let mut forward = |t: &str| sink(ProgressEvent::Data { text: t.to_string() });
        act::run_act_phase(client, &plan, &options.act, &mut forward).await
    };
    let (strategy, mut files) = match generated {
        Ok(extraction) => (extraction.strategy, extraction.files),
        Err(e) if options.degrade_on_act_error => {
            tracing::warn!(error = %e, "generation failed; writing fallback files");
            sink(ProgressEvent::status("Generation failed, using fallback files"));
            (None, fallback_files(&e.to_string()))
        }
        Err(e) => return Err(fail(sink, e)),
    };
    // A bare HTML document links styles.css and script.js, so those must exist.
    if options.complete_shell || strategy == Some(Strategy::Structural) {
        files = complete_shell(files);
    }

    let (files, warnings) = apply::sanitize(files);
    for w in &warnings {
        tracing::warn!("{w}");
        sink(ProgressEvent::status(w.clone()));
    }
    if files.is_empty() {
        return Err(fail(sink, WebgenError::EmptyResult("no writable files produced; retry".into())));
    }

    sink(ProgressEvent::status(format!("Writing {} files", files.len())));
    let summary = match apply::write_files(&files, out_dir) {
        Ok(summary) => summary,
        Err(e) => return Err(fail(sink, e)),
    };
    let written = match apply::read_tree(out_dir) {
        Ok(written) => written,
        Err(e) => return Err(fail(sink, e)),
    };
    tracing::info!(dir = %out_dir.display(), files = written.len(), "webapp written");

    sink(ProgressEvent::GenerationComplete { files: written.clone() });
    Ok(PipelineOutput { plan, files: written, summary, warnings })
}
