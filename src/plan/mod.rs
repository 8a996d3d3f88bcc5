use regex::Regex;
use std::sync::OnceLock;

use crate::errors::Result;
use crate::prompt::{self, QUESTIONS_MARKER};
use crate::provider::{ChatClient, TokenObserver};
use crate::wire::{AnswerSet, ChatMessage, CompletionOptions, PlanResult, Question};

pub const NO_QUESTIONS_PLAN: &str = "No plan was generated because no questions were found";

/// What to do when a completion call fails during planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Return the error to the caller.
    #[default]
    Propagate,
    /// Substitute `fallback_plan(description)`.
    Fallback,
}

/// Numbered-item markers: `N.` at the start of a line, or surrounded by
/// whitespace mid-line (so `2.5` is never a marker).
fn item_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:^[ \t]*\d+\.[ \t]*|[ \t]\d+\.[ \t]+)").expect("valid regex"))
}

/// Questions after the first `关键问题:`; ids are positional.
pub fn extract_questions(analysis: &str) -> Vec<Question> {
    let Some((_, section)) = analysis.split_once(QUESTIONS_MARKER) else {
        return Vec::new();
    };

    let markers: Vec<_> = item_marker_re().find_iter(section).collect();
    markers
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = markers.get(i + 1).map(|next| next.start()).unwrap_or(section.len());
            section[m.end()..end].trim()
        })
        .filter(|text| !text.is_empty())
        .enumerate()
        .map(|(i, text)| Question { id: format!("question_{}", i + 1), text: text.to_string() })
        .collect()
}

/// Keyword rules checked in order; the first hit wins.
pub fn default_answer(question: &str) -> &'static str {
    let q = question.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| q.contains(w));

    if has(&["persistence", "storage", "数据持久化"]) {
        "Yes, use localStorage"
    } else if has(&["categories", "分类"]) {
        "No, keep it simple"
    } else if has(&["responsive", "mobile", "响应式"]) {
        "Yes, make it responsive"
    } else {
        "Yes"
    }
}

pub fn default_answers(questions: &[Question]) -> AnswerSet {
    let mut answers = AnswerSet::new();
    for q in questions {
        answers.insert(q.id.clone(), default_answer(&q.text));
    }
    answers
}

/// Deterministic plan built from the description alone.
pub fn fallback_plan(description: &str) -> PlanResult {
    let app_name = format!(
        "{}...",
        description.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
    );

    let initial_analysis = format!(
"# WebApp Requirements Analysis: {app_name}

## Overview
The user needs a web application with the following description: \"{description}\"

## Functional Requirements
1. Implement functionality based on user description
2. Provide an intuitive user interface
3. Ensure good user experience

## Technical Stack
- HTML5
- CSS3
- JavaScript (vanilla)

## UI/UX Design
A clean single-page application including:
- UI elements appropriate for the application functionality
- Responsive design for different devices

{QUESTIONS_MARKER}
1. Is data persistence functionality needed?
2. Is responsive design needed for mobile devices?
3. Are any special interaction features needed?
");

    let mut answers = AnswerSet::new();
    answers.insert("question_1", "Yes, use localStorage");
    answers.insert("question_2", "Yes, make it responsive");
    answers.insert("question_3", "Yes, implement as needed");

    let plan = format!(
"# WebApp Implementation Plan: {app_name}

## File Structure
- index.html - Main HTML file
- styles.css - Stylesheet
- script.js - JavaScript logic

## Implementation Steps
1. Create basic HTML structure
2. Add CSS styles
3. Implement JavaScript functionality
4. Test functionality and responsive design

## Responsive Design
Will use media queries to ensure good experience on mobile devices.

## Local Storage
Will use localStorage API for data persistence.

## Testing Plan
- Test all functionality
- Test compatibility in different browsers
- Test responsive layout
");

    PlanResult {
        description: description.to_string(),
        initial_analysis,
        answers,
        plan,
    }
}

/// ANALYZING → FINALIZING → DONE. Completion errors propagate unchanged.
pub async fn run_plan_phase(
    client: &dyn ChatClient,
    description: &str,
    max_tokens: Option<u32>,
    observer: TokenObserver<'_>,
) -> Result<PlanResult> {
    let options = CompletionOptions::search().with_max_tokens(max_tokens);
    let request = ChatMessage::user(prompt::user_prompt_request(description));

    tracing::info!("analyzing requirements");
    let analysis = client
        .complete(
            &prompt::system_prompt_analysis(description),
            std::slice::from_ref(&request),
            &options.clone().with_stage("analysis"),
            &mut *observer,
        )
        .await?;

    let questions = extract_questions(&analysis);
    if questions.is_empty() {
        tracing::warn!("no questions found in the analysis; skipping plan finalization");
        return Ok(PlanResult {
            description: description.to_string(),
            initial_analysis: analysis,
            answers: AnswerSet::new(),
            plan: NO_QUESTIONS_PLAN.to_string(),
        });
    }

    let answers = default_answers(&questions);
    for q in &questions {
        tracing::debug!(id = %q.id, question = %q.text, answer = answers.get(&q.id).unwrap_or(""), "default answer");
    }

    tracing::info!(questions = questions.len(), "creating implementation plan");
    let history = vec![
        request,
        ChatMessage::assistant(analysis.clone()),
        ChatMessage::user(prompt::user_prompt_answers(&answers)),
    ];
    let plan = client
        .complete(
            &prompt::system_prompt_finalize(description, &answers),
            &history,
            &options.with_stage("plan"),
            &mut *observer,
        )
        .await?;

    Ok(PlanResult {
        description: description.to_string(),
        initial_analysis: analysis,
        answers,
        plan,
    })
}

/// `run_plan_phase`, with the failure path chosen by `policy`.
pub async fn run_plan_phase_with_policy(
    client: &dyn ChatClient,
    description: &str,
    max_tokens: Option<u32>,
    policy: FailurePolicy,
    observer: TokenObserver<'_>,
) -> Result<PlanResult> {
    match run_plan_phase(client, description, max_tokens, observer).await {
        Ok(plan) => Ok(plan),
        Err(e) if policy == FailurePolicy::Fallback => {
            tracing::warn!(error = %e, "plan phase failed; using fallback plan");
            Ok(fallback_plan(description))
        }
        Err(e) => Err(e),
    }
}
