use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::errors::Result;
use crate::session::SessionStore;

/// Session label of `--unique` output directories.
pub const CLI_SESSION: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "webgen", version, about = "Generate a static HTML/CSS/JS webapp from a description")]
pub struct Cli {
    /// Directory holding config.json.
    #[arg(long, global = true, default_value = ".")]
    pub config_dir: String,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan and generate a webapp.
    Create(CreateArgs),
    /// Show or update the configuration.
    Config(ConfigArgs),
    /// Print the newest generated webapp directory.
    Latest {
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// What the webapp should do.
    pub description: String,

    /// Output directory (defaults to output.directory from the config).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Write into a fresh `webapp-cli-<timestamp>` directory under the output directory.
    #[arg(long, default_value_t = false)]
    pub unique: bool,

    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Save every model exchange under `<output>/.webgen/tx/`.
    #[arg(long, default_value_t = false)]
    pub save_transcripts: bool,
}

impl CreateArgs {
    /// Resolves the API key, then the output directory. A `--unique`
    /// directory is only created once a key is known.
    pub fn key_and_output_dir(&self, cfg: &Config) -> Result<(String, PathBuf)> {
        let key = cfg.resolve_api_key(self.api_key.as_deref())?;
        let base = PathBuf::from(self.output.clone().unwrap_or_else(|| cfg.output.directory.clone()));
        let out_dir = if self.unique {
            SessionStore::new(&base).allocate_output_dir(CLI_SESSION)?
        } else {
            base
        };
        Ok((key, out_dir))
    }
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[arg(long)]
    pub api_key: Option<String>,

    #[arg(long)]
    pub output_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::API_KEY_ENV;
    use crate::errors::WebgenError;
    use tempfile::TempDir;

    fn create_args(argv: &[&str]) -> CreateArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Create(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn create_takes_a_positional_description() {
        let cli = Cli::try_parse_from(["webgen", "create", "a todo list app", "-o", "out", "--unique"]).unwrap();
        match cli.command {
            Command::Create(args) => {
                assert_eq!(args.description, "a todo list app");
                assert_eq!(args.output.as_deref(), Some("out"));
                assert!(args.unique);
                assert!(!args.save_transcripts);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let cli = Cli::try_parse_from(["webgen", "config", "--api-key", "k", "--debug"]).unwrap();
        assert!(cli.debug);
        assert!(matches!(cli.command, Command::Config(ConfigArgs { api_key: Some(_), output_dir: None })));
    }

    #[test]
    fn create_requires_a_description() {
        assert!(Cli::try_parse_from(["webgen", "create"]).is_err());
    }

    #[test]
    fn missing_key_leaves_no_unique_directory_behind() {
        std::env::remove_var(API_KEY_ENV);
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().to_string_lossy().into_owned();
        let args = create_args(&["webgen", "create", "a clock", "-o", &out, "--unique"]);

        let err = args.key_and_output_dir(&Config::default()).err();
        assert!(matches!(err, Some(WebgenError::Authentication(_))));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn unique_directory_is_allocated_once_the_key_resolves() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().to_string_lossy().into_owned();
        let args = create_args(&["webgen", "create", "a clock", "-o", &out, "--unique", "--api-key", "sk-explicit"]);

        let (key, dir) = args.key_and_output_dir(&Config::default()).unwrap();
        assert_eq!(key, "sk-explicit");
        assert_eq!(dir.parent(), Some(tmp.path()));
        assert!(dir.is_dir());
        assert!(dir.file_name().unwrap().to_string_lossy().starts_with("webapp-cli-"));
    }
}
