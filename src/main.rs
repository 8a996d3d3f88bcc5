use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};

use webgen::cli::{Cli, Command, ConfigArgs, CreateArgs};
use webgen::config::Config;
use webgen::log::{self, RecordingClient};
use webgen::pipeline::{self, PipelineOptions};
use webgen::provider::{DynClient, OpenRouterClient};
use webgen::session::{self, DIR_PREFIX};
use webgen::ux;
use webgen::wire::ProgressEvent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    log::init_tracing(cli.debug);

    let cfg_path = Config::path_in(Path::new(&cli.config_dir));
    let cfg = Config::load(&cfg_path)?;

    match cli.command {
        Command::Create(args) => create(&cfg, args).await,
        Command::Config(args) => configure(&cfg_path, cfg, args),
        Command::Latest { output } => latest(&cfg, output),
    }
}

async fn create(cfg: &Config, args: CreateArgs) -> anyhow::Result<()> {
    let description = args.description.trim();
    if description.is_empty() {
        bail!("description cannot be empty");
    }

    let (key, out_dir) = args.key_and_output_dir(cfg)?;
    let client: DynClient = Box::new(OpenRouterClient::from_config(cfg, &key)?);
    let client: DynClient = if args.save_transcripts {
        let recording = RecordingClient::new(client, &out_dir);
        println!("{} {}", "Transcripts:".bold(), recording.dir().display());
        Box::new(recording)
    } else {
        client
    };

    ux::banner(description, &out_dir);
    let options = PipelineOptions::cli().with_max_tokens(args.max_tokens.or(cfg.max_tokens));
    let mut dashboard = ux::Dashboard::new();
    let mut sink = |event: ProgressEvent| dashboard.on_event(event);

    let out = pipeline::run(&*client, description, &out_dir, &options, &mut sink)
        .await
        .with_context(|| format!("generating webapp into {}", out_dir.display()))?;

    ux::print_write_dashboard(&out.summary, &out_dir);
    Ok(())
}

fn configure(path: &Path, mut cfg: Config, args: ConfigArgs) -> anyhow::Result<()> {
    let mut changed = false;
    if let Some(key) = args.api_key.as_deref() {
        cfg.set_api_key(key)?;
        changed = true;
    }
    if let Some(dir) = args.output_dir.as_deref() {
        cfg.set_output_dir(dir)?;
        changed = true;
    }
    if changed {
        cfg.save(path)?;
        println!("{}", "Configuration saved.".green().bold());
    }
    ux::show_config(&cfg, path);
    Ok(())
}

fn latest(cfg: &Config, output: Option<String>) -> anyhow::Result<()> {
    let base = PathBuf::from(output.unwrap_or_else(|| cfg.output.directory.clone()));
    let found = session::newest_dir(&base, DIR_PREFIX)
        .or_else(|| base.join("index.html").is_file().then(|| base.clone()));
    match found {
        Some(dir) => {
            println!("{}", dir.display());
            Ok(())
        }
        None => bail!("no generated webapp found under {}", base.display()),
    }
}
