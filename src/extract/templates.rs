use crate::wire::GeneratedFile;

pub const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Generated WebApp</title>
    <link rel="stylesheet" href="styles.css">
</head>
<body>
    <div class="container">
        <h1>Generated WebApp</h1>
        <div class="content">
            <!-- Content will be generated here -->
        </div>
    </div>
    <script src="script.js"></script>
</body>
</html>"#;

pub const CSS_TEMPLATE: &str = r#"* {
    margin: 0;
    padding: 0;
    box-sizing: border-box;
}

body {
    font-family: Arial, sans-serif;
    background-color: #f5f5f5;
    padding: 20px;
}

.container {
    max-width: 800px;
    margin: 0 auto;
    background-color: white;
    border-radius: 5px;
    box-shadow: 0 2px 5px rgba(0,0,0,0.1);
    padding: 20px;
}

h1 {
    text-align: center;
    margin-bottom: 20px;
    color: #333;
}

.content {
    padding: 20px;
    border: 1px solid #ddd;
    border-radius: 4px;
    background-color: #f8f9fa;
}

.content p {
    margin-bottom: 10px;
}

@media (max-width: 480px) {
    .container {
        width: 100%;
        padding: 10px;
    }
}"#;

pub const JS_TEMPLATE: &str = r#"document.addEventListener('DOMContentLoaded', () => {
    console.log('WebApp initialized');
    // JavaScript functionality will be implemented here
});"#;

pub const DEFAULT_HTML: &str = "index.html";
pub const DEFAULT_CSS: &str = "styles.css";
pub const DEFAULT_JS: &str = "script.js";

/// Built-in content for a file extension, if there is one.
pub fn template_for(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "html" => Some(HTML_TEMPLATE),
        "css" => Some(CSS_TEMPLATE),
        "js" => Some(JS_TEMPLATE),
        _ => None,
    }
}

/// Adds any of `index.html`, `styles.css`, `script.js` that `files` lacks.
pub fn complete_shell(mut files: Vec<GeneratedFile>) -> Vec<GeneratedFile> {
    for (name, content) in [(DEFAULT_HTML, HTML_TEMPLATE), (DEFAULT_CSS, CSS_TEMPLATE), (DEFAULT_JS, JS_TEMPLATE)] {
        if !files.iter().any(|f| f.path == name) {
            tracing::warn!(path = name, "file missing from model output; using built-in template");
            files.push(GeneratedFile::new(name, content));
        }
    }
    files
}

/// The file set written when generation itself failed.
pub fn fallback_files(error: &str) -> Vec<GeneratedFile> {
    let html = format!(
r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>WebApp</title>
    <link rel="stylesheet" href="styles.css">
</head>
<body>
    <div class="container">
        <h1>WebApp</h1>
        <div class="content">
            <p>This is a fallback template. The actual generation failed.</p>
            <p>Error: {}</p>
        </div>
    </div>
    <script src="script.js"></script>
</body>
</html>"#,
        htmlescape::encode_minimal(error)
    );

    vec![
        GeneratedFile::new(DEFAULT_HTML, html),
        GeneratedFile::new(DEFAULT_CSS, CSS_TEMPLATE),
        GeneratedFile::new(
            DEFAULT_JS,
            "document.addEventListener('DOMContentLoaded', () => {\n    console.log('WebApp initialized (fallback)');\n});",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_pass_the_content_guard() {
        assert!(HTML_TEMPLATE.contains("<html") && HTML_TEMPLATE.contains("</html>"));
        assert!(CSS_TEMPLATE.chars().count() >= 50);
        assert!(JS_TEMPLATE.chars().count() >= 50);
        assert_eq!(template_for("CSS"), Some(CSS_TEMPLATE));
        assert_eq!(template_for("json"), None);
    }

    #[test]
    fn shell_is_completed_without_touching_existing_files() {
        let files = complete_shell(vec![GeneratedFile::new("index.html", "<html>mine</html>")]);
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "styles.css", "script.js"]);
        assert_eq!(files[0].content, "<html>mine</html>");
    }

    #[test]
    fn fallback_html_escapes_the_error() {
        let files = fallback_files("bad <token> & \"quote\"");
        assert_eq!(files.len(), 3);
        assert!(files[0].content.contains("Error: bad &lt;token&gt; &amp; "));
        assert!(!files[0].content.contains("<token>"));
        assert!(!files[0].content.contains("\"quote\""));
        assert!(files[2].content.chars().count() >= 50);
    }
}
