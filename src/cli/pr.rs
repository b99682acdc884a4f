//! `gitai pr` implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::ai::{prompt, GenerationRequest, Provider, Purpose};
use crate::cli::commit::resolve_provider;
use crate::config::ConfigManager;
use crate::context::{ContextBuilder, UserInfo};
use crate::git::GitAnalyzer;
use crate::templates::{TemplateKind, TemplateManager};

/// Generate a PR description from branch changes.
#[derive(Args)]
pub struct PrCommand {
    /// Base branch to compare against (default from config, normally
    /// "main")
    #[arg(short, long)]
    pub base: Option<String>,

    /// Template to use (default from config, normally "github")
    #[arg(short, long)]
    pub template: Option<String>,

    /// AI provider to use (default from config, normally "ollama")
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Write the description to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl PrCommand {
    /// Runs the PR flow: analyze the branch range, render, generate,
    /// print or save.
    pub async fn execute(self) -> Result<()> {
        let config = ConfigManager::new().load()?;

        let base_branch = self
            .base
            .clone()
            .unwrap_or_else(|| config.git.default_branch.clone());
        let template_name = self
            .template
            .clone()
            .unwrap_or_else(|| config.templates.default_pr_template.clone());
        let provider_name = resolve_provider(self.provider.as_deref(), &config);

        info!(
            base_branch = %base_branch,
            template = %template_name,
            provider = %provider_name,
            "Analyzing branch changes"
        );

        let analyzer = GitAnalyzer::new()?.with_ignore_patterns(&config.git.ignore_patterns);
        let analysis = analyzer.branch_changes(&base_branch)?;

        if analysis.files_changed.is_empty() {
            anyhow::bail!("No changes found between current branch and '{base_branch}'");
        }

        let builder = ContextBuilder::new();
        let user = config.user.as_ref().map(|u| UserInfo {
            name: u.name.clone(),
            email: u.email.clone(),
        });
        let context = builder.build_pr_context(&analysis, &base_branch, None, user);

        let manager = TemplateManager::from_config(&config);
        let template_name = if manager.exists(&template_name, TemplateKind::Pr) {
            template_name
        } else {
            warn!("Template '{template_name}' not found, falling back to 'github'");
            "github".to_string()
        };

        let rendered = match manager.render(&template_name, TemplateKind::Pr, &context) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("Template rendering failed: {e}, using basic prompt");
                prompt::fallback_pr_prompt(&template_name, &analysis)
            }
        };

        let provider = Provider::create(&provider_name, &config)?;
        let request = GenerationRequest::new(rendered, context);
        let response = provider.generate(&request, Purpose::Pr).await?;
        let description = response.content.trim().to_string();

        info!(
            description_length = description.len(),
            model_used = %response.model_used,
            "PR description generated"
        );

        match &self.output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)
                            .with_context(|| format!("Failed to create {}", parent.display()))?;
                    }
                }
                std::fs::write(path, &description)
                    .with_context(|| format!("Failed to write to {}", path.display()))?;
                println!("PR description saved to {}", path.display());
            }
            None => {
                println!(
                    "Generated PR Description (template: {template_name}, \
                     provider: {provider_name}, base: {base_branch}):\n\n{description}\n\n\
                     Save to file with: gitai pr --base {base_branch} --output pr.md"
                );
            }
        }

        Ok(())
    }
}
