//! CLI interface for gitai.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod commit;
pub mod config;
pub mod pr;
pub mod templates;

/// gitai: AI-powered commit and PR description generation.
#[derive(Parser)]
#[command(name = "gitai")]
#[command(about = "AI-powered commit and PR description generation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Main command categories.
#[derive(Subcommand)]
pub enum Commands {
    /// Generate a commit message from staged changes
    Commit(commit::CommitCommand),
    /// Generate a PR description from branch changes
    Pr(pr::PrCommand),
    /// Manage gitai configuration
    Config(config::ConfigCommand),
    /// List and inspect templates
    Templates(templates::TemplatesCommand),
}

impl Cli {
    /// Executes the selected command.
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Commit(cmd) => cmd.execute().await,
            Commands::Pr(cmd) => cmd.execute().await,
            Commands::Config(cmd) => cmd.execute(),
            Commands::Templates(cmd) => cmd.execute(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn commit_flags_parse() {
        let cli = Cli::try_parse_from([
            "gitai",
            "commit",
            "--preview",
            "-t",
            "minimal",
            "-p",
            "anthropic",
            "--include-untracked",
        ])
        .expect("parse");
        match cli.command {
            Commands::Commit(cmd) => {
                assert!(cmd.preview);
                assert!(cmd.include_untracked);
                assert_eq!(cmd.template.as_deref(), Some("minimal"));
                assert_eq!(cmd.provider.as_deref(), Some("anthropic"));
            }
            _ => panic!("expected commit command"),
        }
    }

    #[test]
    fn pr_flags_parse() {
        let cli = Cli::try_parse_from(["gitai", "pr", "-b", "develop", "-o", "pr.md"])
            .expect("parse");
        match cli.command {
            Commands::Pr(cmd) => {
                assert_eq!(cmd.base.as_deref(), Some("develop"));
                assert_eq!(
                    cmd.output.as_deref(),
                    Some(std::path::Path::new("pr.md"))
                );
            }
            _ => panic!("expected pr command"),
        }
    }
}
