use colored::Colorize;
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::apply::{WriteKind, WriteSummary};
use crate::config::{mask_key, Config};
use crate::wire::{AnswerSet, GeneratedFile, ProgressEvent};

pub fn banner(description: &str, out_dir: &Path) {
    println!("\n{}", "=== WebApp Generator ===".bold());
    println!("{} {}", "Description:".bold(), description);
    println!("{} {}\n", "Output:".bold(), out_dir.display());
}

pub fn show_answers(answers: &AnswerSet) {
    if answers.is_empty() {
        println!("{}", "(no clarifying questions were asked)".dimmed());
        return;
    }
    println!("\n{}", "=== DEFAULT ANSWERS ===".bold());
    for (id, answer) in answers.iter() {
        println!("  {}  {}", id.cyan(), answer);
    }
}

pub fn show_plan(plan: &str) {
    println!("\n{}", "=== PLAN ===".bold());
    println!("{}\n", plan.trim());
}

pub fn show_config(cfg: &Config, path: &Path) {
    let key = if cfg.api.key.trim().is_empty() {
        "(not set)".yellow().to_string()
    } else {
        mask_key(&cfg.api.key)
    };
    println!("\n{} {}", "Configuration:".bold(), path.display());
    println!("  {:<16} {}", "api.key", key);
    println!("  {:<16} {}", "api.base_url", cfg.api.base_url);
    println!("  {:<16} {}", "models.plain", cfg.models.plain);
    println!("  {:<16} {}", "models.search", cfg.models.search);
    println!("  {:<16} {}", "output.directory", cfg.output.directory);
    println!("  {:<16} {}s", "timeout", cfg.timeout_secs);
    if let Some(max) = cfg.max_tokens {
        println!("  {:<16} {}", "max_tokens", max);
    }
}

/// Renders pipeline events: a spinner while tokens stream, the plan once it
/// is settled, and the final file list.
pub struct Dashboard {
    bar: ProgressBar,
    chars: usize,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar, chars: 0 }
    }

    pub fn on_event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Data { text } => {
                self.chars += text.chars().count();
                self.bar.set_message(format!("receiving... {} chars", self.chars));
            }
            ProgressEvent::Status { text } => {
                self.chars = 0;
                self.bar.println(format!("{} {}", "•".cyan(), text));
                self.bar.set_message(text);
            }
            ProgressEvent::PlanComplete { answers, plan, .. } => {
                self.bar.suspend(|| {
                    show_answers(&answers);
                    show_plan(&plan);
                });
            }
            ProgressEvent::GenerationComplete { files } => {
                self.bar.finish_and_clear();
                show_files(&files);
            }
            ProgressEvent::Error { message } => {
                self.bar.abandon_with_message(format!("{} {}", "error:".red().bold(), message));
            }
        }
    }
}

pub fn show_files(files: &[GeneratedFile]) {
    println!("\n{}", "=== GENERATED FILES ===".bold());
    for f in files {
        println!("  {:<32} {}", f.path, format_size(f.content.len(), DECIMAL));
    }
}

pub fn print_write_dashboard(sum: &WriteSummary, out_dir: &Path) {
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━ Write Results ━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!(
        "  {}: {}   {}: {}   {}: {}",
        "Created".green().bold(), sum.created,
        "Updated".yellow().bold(), sum.updated,
        "Bytes".bold(), format_size(sum.bytes_written, DECIMAL)
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());

    for d in &sum.details {
        let label = match d.kind {
            WriteKind::Created => "[CREATE]".green().bold(),
            WriteKind::Updated => "[UPDATE]".yellow().bold(),
        };
        let rel = d.path.strip_prefix(out_dir).unwrap_or(&d.path);
        match d.bytes_before {
            Some(before) => println!(
                "{}  {}  {} -> {}",
                label,
                rel.display(),
                format_size(before, DECIMAL),
                format_size(d.bytes_after, DECIMAL)
            ),
            None => println!("{}  {}  {}", label, rel.display(), format_size(d.bytes_after, DECIMAL)),
        }
    }
    println!("\n{} {}", "Open in a browser:".bold(), out_dir.join("index.html").display());
}
