use crate::wire::{AnswerSet, PlanResult};

pub const QUESTIONS_MARKER: &str = "关键问题:";

fn role_preamble() -> &'static str {
"You are a webapp generator planning bot. When a user inputs text, analyze and understand their requirements, then search the web for relevant knowledge. Create a webapp generation plan with multiple steps, including functionality design, visual UI design, code writing, testing, etc., which will be executed by another bot.

Please respond in English."
}

fn delivery_rules() -> &'static str {
"Delivery rules:
- Use modern HTML5, CSS3 and vanilla JavaScript only (no frameworks, no CDNs, no build step).
- The result must open directly in a browser from the file system.
- Default file set: index.html (markup), styles.css (styles), script.js (behaviour).
- Implement responsive design and use localStorage when data must persist."
}

/// Lines of `id: answer`, in question order.
pub fn format_answers(answers: &AnswerSet) -> String {
    answers
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn system_prompt_analysis(description: &str) -> String {
    format!(
"{preamble}

User's requirement description: \"{description}\"

CURRENT PHASE: PLAN

In this phase, you need to:
1. Analyze the user's requirements
2. Determine the main functions and components of the WebApp
3. Design the page structure and user interface
4. Determine the necessary HTML, CSS, and JavaScript files

First, provide a brief analysis of the requirements. Then, propose 3-5 key questions to better understand the user's needs. These questions should help clarify any ambiguities and gather additional details needed for implementation.

Output format:
1. Requirements Analysis: [Brief analysis of user requirements]
2. {marker}
1. [first question]
2. [second question]
...

The questions section MUST start with the literal header `{marker}` and contain one numbered question per line.",
        preamble = role_preamble(),
        description = description,
        marker = QUESTIONS_MARKER,
    )
}

pub fn user_prompt_request(description: &str) -> String {
    format!("I need a WebApp, described as follows: {description}")
}

pub fn user_prompt_answers(answers: &AnswerSet) -> String {
    format!("My answers:\n{}", format_answers(answers))
}

pub fn system_prompt_finalize(description: &str, answers: &AnswerSet) -> String {
    format!(
"{preamble}

User's requirement description: \"{description}\"

User's additional information:
{answers}

CURRENT PHASE: PLAN FINALIZATION

Based on the user's description and answers, create a detailed implementation plan for the WebApp. This plan will be used to generate the actual code in the next phase.

Output format:
1. Requirements Summary: [Summarize the user's requirements and answers]
2. Feature List: [List the main features of the WebApp]
3. Page Structure: [Describe the page structure and components]
4. File Structure: [List the necessary HTML, CSS, and JavaScript files]
5. Implementation Steps: [Provide detailed implementation steps]",
        preamble = role_preamble(),
        description = description,
        answers = format_answers(answers),
    )
}

pub fn system_prompt_act() -> String {
    format!(
"You are a webapp generator execution bot, responsible for generating complete webapp code according to the plan you receive.

Please respond in English.

CURRENT PHASE: ACT

In this phase, you need to:
1. Generate all necessary HTML, CSS, and JavaScript files
2. Ensure the code is high quality, well-structured, and follows best practices
3. Add appropriate comments to explain the code
4. Ensure the WebApp is fully functional and can run directly in a browser

{rules}

Output format:
1. File Structure: [List all files to be generated]
2. File Content: [For each file, a heading with its file name followed by the complete code]

For HTML files, use ```html format.
For CSS files, use ```css format.
For JavaScript files, use ```js format.

Make sure to generate complete, functional code that can run directly in a browser without any additional dependencies or build steps.",
        rules = delivery_rules(),
    )
}

/// The whole plan as pretty JSON.
pub fn user_prompt_act_json(plan: &PlanResult) -> String {
    let plan_json = serde_json::to_string_pretty(plan)
        .unwrap_or_else(|_| "<plan-json-unavailable>".to_string());
    format!(
"Generate the WebApp code according to this plan from the planning phase:

{plan_json}"
    )
}

pub fn system_prompt_act_sections() -> String {
    format!(
"You are a web application developer. Your task is to implement a web application based on the provided analysis and plan.

Please respond in English.

You need to create the following files:
1. index.html - The main HTML file
2. styles.css - The CSS styles
3. script.js - The JavaScript code

{rules}
- Ensure the code is clean, well-commented, and follows best practices
- Make sure all files work together correctly

IMPORTANT: You MUST implement the exact application described in the analysis and plan. DO NOT default to creating a todo list or task management app unless that is specifically what was requested.

Put each file in its own fenced block (```html, ```css, ```js) preceded by a heading with the file name.",
        rules = delivery_rules(),
    )
}

/// Analysis, plan and answers as labelled plain-text sections.
pub fn user_prompt_act_sections(plan: &PlanResult) -> String {
    let answers = plan
        .answers
        .iter()
        .map(|(k, v)| format!("- {k}: {v}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
"Please implement the web application based on the following analysis and plan:

ANALYSIS:
{analysis}

PLAN:
{plan}

ANSWERS TO KEY QUESTIONS:
{answers}

Generate the complete HTML, CSS, and JavaScript files for exactly the application described above. DO NOT create a generic todo list app.",
        analysis = plan.initial_analysis,
        plan = plan.plan,
        answers = answers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers() -> AnswerSet {
        let mut a = AnswerSet::new();
        a.insert("question_1", "Yes, use localStorage");
        a.insert("question_2", "No, keep it simple");
        a
    }

    #[test]
    fn answers_format_one_per_line() {
        assert_eq!(
            format_answers(&answers()),
            "question_1: Yes, use localStorage\nquestion_2: No, keep it simple"
        );
        assert_eq!(format_answers(&AnswerSet::new()), "");
    }

    #[test]
    fn analysis_prompt_asks_for_the_marker() {
        let p = system_prompt_analysis("a todo list app");
        assert!(p.contains("\"a todo list app\""));
        assert!(p.contains(QUESTIONS_MARKER));
    }

    #[test]
    fn finalize_prompt_embeds_answers() {
        let p = system_prompt_finalize("a timer", &answers());
        assert!(p.contains("question_2: No, keep it simple"));
        assert!(p.contains("PLAN FINALIZATION"));
    }

    #[test]
    fn act_prompts_carry_the_plan() {
        let plan = PlanResult {
            description: "a timer".into(),
            initial_analysis: "ANALYSIS TEXT".into(),
            answers: answers(),
            plan: "PLAN TEXT".into(),
        };
        let json = user_prompt_act_json(&plan);
        assert!(json.contains("\"initialAnalysis\": \"ANALYSIS TEXT\""));

        let sections = user_prompt_act_sections(&plan);
        assert!(sections.contains("ANALYSIS:\nANALYSIS TEXT"));
        assert!(sections.contains("- question_1: Yes, use localStorage"));
        assert!(system_prompt_act().contains("```css"));
    }
}
