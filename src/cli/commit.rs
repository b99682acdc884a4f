//! `gitai commit` implementation.

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use crate::ai::{prompt, GenerationRequest, Provider, Purpose};
use crate::config::{ConfigManager, GitAiConfig};
use crate::context::{ContextBuilder, UserInfo};
use crate::git::{GitAnalyzer, GitRepository};
use crate::templates::{TemplateKind, TemplateManager};

/// Generate a commit message from staged changes.
#[derive(Args)]
pub struct CommitCommand {
    /// Template to use (default from config, normally "conventional")
    #[arg(short, long)]
    pub template: Option<String>,

    /// AI provider to use (default from config, normally "ollama")
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Preview the message without committing
    #[arg(short = 'P', long)]
    pub preview: bool,

    /// Include untracked files in the analysis
    #[arg(long)]
    pub include_untracked: bool,
}

impl CommitCommand {
    /// Runs the commit flow: analyze, render, generate, apply or
    /// preview.
    pub async fn execute(self) -> Result<()> {
        let config = ConfigManager::new().load()?;

        let template_name = self
            .template
            .clone()
            .unwrap_or_else(|| config.templates.default_commit_template.clone());
        let provider_name = resolve_provider(self.provider.as_deref(), &config);

        info!(
            template = %template_name,
            provider = %provider_name,
            "Analyzing staged changes"
        );

        let analyzer = GitAnalyzer::new()?.with_ignore_patterns(&config.git.ignore_patterns);
        let analysis = analyzer.staged_changes(self.include_untracked)?;

        let builder = ContextBuilder::new();
        let user = config.user.as_ref().map(|u| UserInfo {
            name: u.name.clone(),
            email: u.email.clone(),
        });
        let context = builder.build_commit_context(&analysis, user);

        let manager = TemplateManager::from_config(&config);
        let template_name = if manager.exists(&template_name, TemplateKind::Commit) {
            template_name
        } else {
            warn!("Template '{template_name}' not found, falling back to 'conventional'");
            "conventional".to_string()
        };

        let rendered = match manager.render(&template_name, TemplateKind::Commit, &context) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!("Template rendering failed: {e}, using basic prompt");
                prompt::fallback_commit_prompt(&template_name, &analysis)
            }
        };

        let provider = Provider::create(&provider_name, &config)?;
        let request = GenerationRequest::new(rendered, context);
        let response = provider.generate(&request, Purpose::Commit).await?;
        let message = response.content.trim().to_string();

        info!(
            message_length = message.len(),
            model_used = %response.model_used,
            "Commit message generated"
        );

        if self.preview {
            println!(
                "Generated Commit Message (template: {template_name}, provider: {provider_name}):\n\
                 \n{message}\n\nRun without --preview to apply this commit message."
            );
        } else {
            let repo = GitRepository::discover()?;
            repo.commit_staged(&message)
                .context("Failed to apply commit")?;
            println!("Commit applied successfully!");
            println!("Message: {message}");
        }

        Ok(())
    }
}

/// Provider precedence: explicit flag, then the user's configured
/// preference, then ollama.
pub(crate) fn resolve_provider(flag: Option<&str>, config: &GitAiConfig) -> String {
    flag.map(str::to_string)
        .or_else(|| {
            config
                .user
                .as_ref()
                .and_then(|u| u.preferred_provider.clone())
        })
        .unwrap_or_else(|| "ollama".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserSettings;

    #[test]
    fn provider_flag_wins() {
        let mut config = GitAiConfig::default();
        config.user = Some(UserSettings {
            preferred_provider: Some("anthropic".to_string()),
            ..Default::default()
        });
        assert_eq!(resolve_provider(Some("openai"), &config), "openai");
    }

    #[test]
    fn configured_preference_beats_default() {
        let mut config = GitAiConfig::default();
        config.user = Some(UserSettings {
            preferred_provider: Some("anthropic".to_string()),
            ..Default::default()
        });
        assert_eq!(resolve_provider(None, &config), "anthropic");
    }

    #[test]
    fn default_is_ollama() {
        let config = GitAiConfig::default();
        assert_eq!(resolve_provider(None, &config), "ollama");
    }
}
