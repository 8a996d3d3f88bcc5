//! Turns a free-text model response into named files.
//!
//! Strategies run in a fixed order and the first one that finds anything
//! wins; the content guard then replaces implausible files with templates.

use regex::Regex;
use std::sync::OnceLock;

use crate::safety::{is_safe_relative, normalize_relative};
use crate::wire::GeneratedFile;

pub mod templates;

use templates::{template_for, DEFAULT_CSS, DEFAULT_HTML, DEFAULT_JS};

/// CSS/JS shorter than this is not plausibly a real file.
pub const MIN_CODE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FencedByLanguage,
    LabeledByFilename,
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrategyOutcome {
    Found(Vec<GeneratedFile>),
    Nothing,
}

impl StrategyOutcome {
    fn from_files(files: Vec<GeneratedFile>) -> Self {
        if files.is_empty() { StrategyOutcome::Nothing } else { StrategyOutcome::Found(files) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// The strategy that produced `files`; `None` when nothing was found.
    pub strategy: Option<Strategy>,
    pub files: Vec<GeneratedFile>,
    /// Paths whose content the guard swapped for a template.
    pub replaced: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lang {
    Html,
    Css,
    Js,
}

impl Lang {
    fn from_tag(tag: &str) -> Option<Lang> {
        match tag.to_ascii_lowercase().as_str() {
            "html" => Some(Lang::Html),
            "css" => Some(Lang::Css),
            "js" | "javascript" => Some(Lang::Js),
            _ => None,
        }
    }

    fn ext(self) -> &'static str {
        match self {
            Lang::Html => "html",
            Lang::Css => "css",
            Lang::Js => "js",
        }
    }

    /// `index.html`, then `index1.html`, `index2.html`, ...
    fn default_name(self, nth: usize) -> String {
        let (stem, ext) = match self {
            Lang::Html => ("index", "html"),
            Lang::Css => ("styles", "css"),
            Lang::Js => ("script", "js"),
        };
        if nth == 0 { format!("{stem}.{ext}") } else { format!("{stem}{nth}.{ext}") }
    }
}

fn fenced_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)```[ \t]*(html|css|javascript|js)\s+(.*?)```").expect("valid regex")
    })
}

fn path_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_\-./]+\.(?:html|css|js)\b").expect("valid regex"))
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(index\.html|styles\.css|script\.js)\b").expect("valid regex"))
}

fn html_doc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)(?:<!DOCTYPE\s+html[^>]*>\s*)?<html\b.*?</html>").expect("valid regex")
    })
}

fn css_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/\*\s*CSS\s*\*/").expect("valid regex"))
}

fn js_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)/\*\s*JavaScript\s*\*/").expect("valid regex"))
}

fn body_rule_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*body\s*\{").expect("valid regex"))
}

fn dom_ready_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"document\.addEventListener\(\s*['"]DOMContentLoaded['"]"#).expect("valid regex")
    })
}

/// Runs the strategy cascade and the content guard.
pub fn extract(response: &str) -> Extraction {
    let cascade: [(Strategy, fn(&str) -> StrategyOutcome); 3] = [
        (Strategy::FencedByLanguage, fenced_by_language),
        (Strategy::LabeledByFilename, labeled_by_filename),
        (Strategy::Structural, structural),
    ];

    for (strategy, run) in cascade {
        if let StrategyOutcome::Found(files) = run(response) {
            tracing::debug!(?strategy, files = files.len(), "extraction strategy matched");
            let (files, replaced) = guard_content(files);
            return Extraction { strategy: Some(strategy), files, replaced };
        }
    }

    tracing::debug!("no extraction strategy matched");
    Extraction::default()
}

pub fn extract_files(response: &str) -> Vec<GeneratedFile> {
    extract(response).files
}

/// Path-like `name.(html|css|js)` tokens, in order of first appearance.
pub fn path_hints(response: &str) -> Vec<String> {
    let mut hints: Vec<String> = Vec::new();
    for m in path_hint_re().find_iter(response) {
        let hint = normalize_relative(m.as_str());
        if !is_safe_relative(&hint) || hint.contains("//") || hint.starts_with('.') {
            continue;
        }
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    }
    hints
}

/// Strategy 1: ```html / ```css / ```js fences. The n-th block of a language
/// takes the n-th path hint with that extension, else a default name.
pub fn fenced_by_language(response: &str) -> StrategyOutcome {
    let hints = path_hints(response);
    let mut seen = [0usize; 3];
    let mut files = Vec::new();

    for caps in fenced_re().captures_iter(response) {
        let Some(lang) = Lang::from_tag(&caps[1]) else { continue };
        let slot = &mut seen[lang as usize];
        let nth = *slot;
        *slot += 1;

        let suffix = format!(".{}", lang.ext());
        let path = hints
            .iter()
            .filter(|h| h.to_ascii_lowercase().ends_with(&suffix))
            .nth(nth)
            .cloned()
            .unwrap_or_else(|| lang.default_name(nth));
        files.push(GeneratedFile::new(path, strip_fences(&caps[2])));
    }

    StrategyOutcome::from_files(files)
}

/// Strategy 2: a short line naming `index.html`, `styles.css` or `script.js`
/// (heading, comment, bold text...) immediately followed by a fenced block.
pub fn labeled_by_filename(response: &str) -> StrategyOutcome {
    let mut files = Vec::new();
    let mut in_fence = false;
    let mut offset = 0usize;

    for line in response.split_inclusive('\n') {
        offset += line.len();
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence || line.trim().chars().count() > 100 {
            continue;
        }
        let Some(caps) = label_re().captures(line) else { continue };

        let rest = response[offset..].trim_start();
        if !rest.starts_with("```") {
            continue;
        }
        let body = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => "",
        };
        let content = match body.find("```") {
            Some(close) => &body[..close],
            None => body,
        };
        files.push(GeneratedFile::new(caps[1].to_ascii_lowercase(), strip_fences(content)));
    }

    StrategyOutcome::from_files(files)
}

/// Strategy 3: no usable fences. Looks for an `<html>...</html>` document,
/// then CSS and JS by comment markers or a `body {}` rule / `DOMContentLoaded`
/// listener outside that document.
pub fn structural(response: &str) -> StrategyOutcome {
    let mut files = Vec::new();

    let mut rest = response.to_string();
    if let Some(m) = html_doc_re().find(response) {
        files.push(GeneratedFile::new(DEFAULT_HTML, strip_fences(m.as_str())));
        rest.replace_range(m.range(), "");
    }

    let css = after_marker(&rest, css_marker_re())
        .or_else(|| body_rule_re().find(&rest).and_then(|m| css_run(&rest, m.start())));
    if let Some(css) = css.filter(|c| !c.is_empty()) {
        files.push(GeneratedFile::new(DEFAULT_CSS, css));
    }

    let js = after_marker(&rest, js_marker_re())
        .or_else(|| dom_ready_re().find(&rest).and_then(|m| listener_block(&rest, m.start())));
    if let Some(js) = js.filter(|j| !j.is_empty()) {
        files.push(GeneratedFile::new(DEFAULT_JS, js));
    }

    StrategyOutcome::from_files(files)
}

/// Text after a `/* CSS */`-style marker, up to the next fence or the end.
fn after_marker(text: &str, marker: &Regex) -> Option<String> {
    let m = marker.find(text)?;
    let tail = &text[m.end()..];
    let body = match tail.find("```") {
        Some(end) => &tail[..end],
        None => tail,
    };
    Some(strip_fences(body))
}

/// Index just past the `}` matching the `{` at `open`.
fn balanced_end(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, b) in s.bytes().enumerate().skip(open) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn looks_like_selector(s: &str) -> bool {
    let t = s.trim();
    if t.contains("=>") || t.contains("function") || t.contains("document") {
        return false;
    }
    t.lines().all(|l| l.trim().chars().count() <= 80)
        && t.chars().all(|c| {
            c.is_alphanumeric() || c.is_whitespace() || ".#:,>+~*[]=\"'-_%@()".contains(c)
        })
}

/// Consecutive CSS rules starting at the `body {` rule.
fn css_run(text: &str, start: usize) -> Option<String> {
    let mut end = None;
    let mut cursor = start;
    while let Some(brace) = text[cursor..].find('{') {
        if !looks_like_selector(&text[cursor..cursor + brace]) {
            break;
        }
        let Some(close) = balanced_end(text, cursor + brace) else { break };
        end = Some(close);
        cursor = close;
    }
    end.map(|e| text[start..e].trim().to_string())
}

/// `document.addEventListener('DOMContentLoaded', ...{ ... });`
fn listener_block(text: &str, start: usize) -> Option<String> {
    let open = start + text[start..].find('{')?;
    let close = balanced_end(text, open)?;
    let line_end = text[close..].find('\n').map(|n| close + n).unwrap_or(text.len());
    Some(text[start..line_end].trim().to_string())
}

/// Trims whitespace and any leading/trailing fence lines.
pub fn strip_fences(content: &str) -> String {
    let mut s = content.trim();
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(nl) => &s[nl + 1..],
            None => "",
        };
    }
    let s = s.trim_end();
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim().to_string()
}

/// True when `file` is too broken to ship as-is.
pub fn is_implausible(file: &GeneratedFile) -> bool {
    let content = file.content.trim();
    match file.extension().map(str::to_ascii_lowercase).as_deref() {
        Some("html") => {
            let lower = content.to_ascii_lowercase();
            !(lower.contains("<html") && lower.contains("</html>"))
        }
        Some("css") | Some("js") => content.chars().count() < MIN_CODE_CHARS,
        _ => false,
    }
}

/// Replaces implausible files with the built-in template for their type.
pub fn guard_content(files: Vec<GeneratedFile>) -> (Vec<GeneratedFile>, Vec<String>) {
    let mut replaced = Vec::new();
    let files = files
        .into_iter()
        .map(|mut f| {
            if is_implausible(&f) {
                if let Some(template) = f.extension().and_then(template_for) {
                    tracing::warn!(
                        path = %f.path,
                        chars = f.content.chars().count(),
                        "model output not usable as-is; replaced with built-in template"
                    );
                    replaced.push(f.path.clone());
                    f.content = template.to_string();
                }
            }
            f
        })
        .collect();
    (files, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use templates::{CSS_TEMPLATE, HTML_TEMPLATE, JS_TEMPLATE};

    const HTML: &str = "<!DOCTYPE html>\n<html>\n<head><link rel=\"stylesheet\" href=\"styles.css\"></head>\n<body><ul id=\"list\"></ul><script src=\"script.js\"></script></body>\n</html>";
    const CSS: &str = "body {\n    font-family: sans-serif;\n    margin: 0 auto;\n    max-width: 40rem;\n}";
    const JS: &str = "document.addEventListener('DOMContentLoaded', () => {\n    const list = document.getElementById('list');\n});";

    fn three_blocks() -> String {
        format!("Here is your app.\n\n```html\n{HTML}\n```\n\n```css\n{CSS}\n```\n\n```javascript\n{JS}\n```\n")
    }

    fn names(files: &[GeneratedFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn one_block_per_language_is_extracted_verbatim() {
        let ex = extract(&three_blocks());
        assert_eq!(ex.strategy, Some(Strategy::FencedByLanguage));
        assert_eq!(names(&ex.files), vec!["index.html", "styles.css", "script.js"]);
        assert_eq!(ex.files[0].content, HTML);
        assert_eq!(ex.files[1].content, CSS);
        assert_eq!(ex.files[2].content, JS);
        assert!(ex.replaced.is_empty());
    }

    #[test]
    fn language_tags_are_case_insensitive() {
        let text = format!("```HTML\n{HTML}\n```\n```Css\n{CSS}\n```\n```JS\n{JS}\n```");
        assert_eq!(names(&extract_files(&text)), vec!["index.html", "styles.css", "script.js"]);
    }

    #[test]
    fn path_hints_name_the_blocks() {
        let text = format!(
            "Files: public/app.html, css/theme.css, js/main.js\n\n```html\n{HTML}\n```\n```css\n{CSS}\n```\n```js\n{JS}\n```"
        );
        let files = extract_files(&text);
        assert_eq!(names(&files), vec!["public/app.html", "css/theme.css", "js/main.js"]);
    }

    #[test]
    fn extra_blocks_of_a_language_get_numbered_defaults() {
        let text = format!("```html\n{HTML}\n```\n```html\n{HTML}\n```");
        let files = extract_files(&text);
        // No `.html` token appears anywhere, so defaults apply.
        assert_eq!(names(&files), vec!["index.html", "index1.html"]);
    }

    #[test]
    fn hints_are_consumed_in_order_per_language() {
        let text = format!("about.html and contact.html\n```html\n{HTML}\n```\n```html\n{HTML}\n```\n```html\n{HTML}\n```");
        assert_eq!(
            names(&extract_files(&text)),
            vec!["about.html", "contact.html", "index2.html"]
        );
    }

    #[test]
    fn unsafe_or_url_hints_are_ignored() {
        let hints = path_hints("see ../../etc/x.js and https://cdn.example.com/lib.js and ./ok/app.js");
        assert_eq!(hints, vec!["ok/app.js"]);
    }

    #[test]
    fn json_fences_are_not_javascript() {
        assert_eq!(fenced_by_language("```json\n{\"a\": 1}\n```"), StrategyOutcome::Nothing);
    }

    #[test]
    fn labeled_blocks_are_paired_with_their_filenames() {
        let text = format!(
            "### index.html\n```\n{HTML}\n```\n\n<!-- styles.css -->\n```\n{CSS}\n```\n\n**script.js**:\n\n```\n{JS}\n```\n"
        );
        let ex = extract(&text);
        assert_eq!(ex.strategy, Some(Strategy::LabeledByFilename));
        assert_eq!(names(&ex.files), vec!["index.html", "styles.css", "script.js"]);
        assert_eq!(ex.files[1].content, CSS);
        assert_eq!(ex.files[2].content, JS);
    }

    #[test]
    fn labels_inside_code_or_without_a_fence_are_ignored() {
        let text = "Put your styles in styles.css.\n\nSome prose.\n```\n<link href=\"styles.css\">\n```\n";
        assert_eq!(labeled_by_filename(text), StrategyOutcome::Nothing);
    }

    #[test]
    fn bare_html_document_falls_back_to_structure() {
        let text = format!("Sure! Here it is:\n\n{HTML}\n\nEnjoy.");
        let ex = extract(&text);
        assert_eq!(ex.strategy, Some(Strategy::Structural));
        assert_eq!(names(&ex.files), vec!["index.html"]);
        assert_eq!(ex.files[0].content, HTML);
    }

    #[test]
    fn structural_css_and_js_outside_the_document() {
        let text = format!(
            "{HTML}\n\nStyles:\n\n{CSS}\n\n.card {{\n    padding: 1rem;\n}}\n\nThen the script:\n\n{JS}\n\nDone."
        );
        let ex = extract(&text);
        assert_eq!(names(&ex.files), vec!["index.html", "styles.css", "script.js"]);
        assert!(ex.files[1].content.starts_with("body {"));
        assert!(ex.files[1].content.ends_with(".card {\n    padding: 1rem;\n}"));
        assert_eq!(ex.files[2].content, JS);
    }

    #[test]
    fn comment_markers_delimit_structural_code() {
        let text = "/* CSS */\nbody { color: red; background: white; margin: 0; padding: 0 }\n```\n/* JavaScript */\nconsole.log('booting the application now, please wait');\n";
        let files = extract_files(text);
        assert_eq!(names(&files), vec!["styles.css", "script.js"]);
        assert!(files[0].content.starts_with("body { color: red;"));
        assert_eq!(files[1].content, "console.log('booting the application now, please wait');");
    }

    #[test]
    fn prose_only_yields_nothing() {
        let ex = extract("I could not generate the code, sorry.");
        assert_eq!(ex, Extraction::default());
    }

    #[test]
    fn html_without_document_tags_is_replaced() {
        let text = format!("```html\n<div>just a fragment</div>\n```\n```css\n{CSS}\n```");
        let ex = extract(&text);
        assert_eq!(ex.files[0].content, HTML_TEMPLATE);
        assert_eq!(ex.replaced, vec!["index.html".to_string()]);
        assert_eq!(ex.files[1].content, CSS);
    }

    #[test]
    fn code_guard_boundary_is_fifty_characters() {
        let at_49 = "a".repeat(49);
        let at_50 = "a".repeat(50);

        let (files, replaced) = guard_content(vec![
            GeneratedFile::new("styles.css", at_49.clone()),
            GeneratedFile::new("script.js", at_49),
            GeneratedFile::new("theme.css", at_50.clone()),
            GeneratedFile::new("app.js", at_50.clone()),
        ]);
        assert_eq!(files[0].content, CSS_TEMPLATE);
        assert_eq!(files[1].content, JS_TEMPLATE);
        assert_eq!(files[2].content, at_50);
        assert_eq!(files[3].content, at_50);
        assert_eq!(replaced, vec!["styles.css", "script.js"]);
    }

    #[test]
    fn guard_counts_characters_not_bytes() {
        let css = "é".repeat(49);
        assert!(is_implausible(&GeneratedFile::new("a.css", css)));
    }

    #[test]
    fn fences_and_whitespace_are_stripped() {
        assert_eq!(strip_fences("\n```js\nlet a = 1;\n```\n  "), "let a = 1;");
        assert_eq!(strip_fences("  plain  "), "plain");
        assert_eq!(strip_fences("```"), "");
    }
}
