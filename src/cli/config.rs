//! `gitai config` implementation.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::config::{ConfigLevel, ConfigManager, ProviderEntry, TeamSettings};

/// Manage gitai configuration.
#[derive(Args)]
pub struct ConfigCommand {
    /// Initialize the global (user-level) configuration
    #[arg(long = "global")]
    pub init_global: bool,

    /// Initialize a team configuration with this name
    #[arg(long)]
    pub team: Option<String>,

    /// Show the current merged configuration
    #[arg(long)]
    pub show: bool,

    /// Set the preferred AI provider in the user configuration
    #[arg(long)]
    pub set_provider: Option<String>,
}

impl ConfigCommand {
    /// Dispatches to the requested configuration operation.
    pub fn execute(self) -> Result<()> {
        let manager = ConfigManager::new();

        if self.show {
            show_config(&manager)
        } else if self.init_global {
            init_global(&manager)
        } else if let Some(team) = &self.team {
            init_team(team)
        } else if let Some(provider) = &self.set_provider {
            set_provider(&manager, provider)
        } else {
            println!(
                "gitai configuration\n\n\
                 Available commands:\n\
                 \x20 gitai config --global                  # Initialize global user config\n\
                 \x20 gitai config --team <name>             # Initialize team config\n\
                 \x20 gitai config --show                    # Show current configuration\n\
                 \x20 gitai config --set-provider <name>     # Set preferred AI provider"
            );
            Ok(())
        }
    }
}

fn show_config(manager: &ConfigManager) -> Result<()> {
    let config = manager.load()?;

    println!("Current Configuration:\n");

    println!("Configuration Sources:");
    for (level, path, exists) in manager.describe_sources() {
        let marker = if exists { "present" } else { "absent " };
        let shown = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "N/A".to_string());
        println!("  {level:?}\t{marker}\t{shown}");
    }
    println!();

    println!("Enabled providers (by priority):");
    for name in config.enabled_providers() {
        println!("  {name}");
    }
    println!();

    println!("Templates:");
    println!(
        "  Default commit: {}",
        config.templates.default_commit_template
    );
    println!("  Default PR: {}", config.templates.default_pr_template);

    if let Some(user) = &config.user {
        println!();
        println!("User Information:");
        if let Some(name) = &user.name {
            println!("  Name: {name}");
        }
        if let Some(email) = &user.email {
            println!("  Email: {email}");
        }
        if let Some(provider) = &user.preferred_provider {
            println!("  Preferred Provider: {provider}");
        }
    }

    Ok(())
}

fn init_global(manager: &ConfigManager) -> Result<()> {
    let path = manager
        .config_path(ConfigLevel::User)
        .context("Cannot determine user configuration path")?;

    if path.exists() {
        println!("Global configuration already exists at {}", path.display());
        return Ok(());
    }

    manager.init_user_config(None, None, "ollama")?;
    info!(config_path = %path.display(), "Global config created");

    println!(
        "Global configuration initialized successfully!\n\n\
         Configuration file: {}\n\n\
         Default provider: ollama (localhost:11434)\n\
         Default templates: conventional (commit), github (PR)",
        path.display()
    );
    Ok(())
}

fn init_team(team_name: &str) -> Result<()> {
    if team_name.is_empty()
        || !team_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!("Team name must be alphanumeric with dashes or underscores");
    }

    let team_dir = ConfigManager::default_user_config_dir()
        .join("teams")
        .join(team_name);
    let manager = ConfigManager::new().with_team_dir(team_dir.clone());

    let path = team_dir.join("config.yaml");
    if path.exists() {
        println!(
            "Team configuration for '{team_name}' already exists at {}",
            path.display()
        );
        return Ok(());
    }

    let templates_dir = team_dir.join("templates");
    let mut config = manager.load()?;
    config.team = Some(TeamSettings {
        name: team_name.to_string(),
        templates_dir: Some(templates_dir.clone()),
        conventions: Default::default(),
    });
    manager.save(&config, ConfigLevel::Team)?;

    std::fs::create_dir_all(templates_dir.join("commit"))
        .context("Failed to create team templates directory")?;

    info!(team = team_name, config_path = %path.display(), "Team config created");

    println!(
        "Team configuration for '{team_name}' initialized successfully!\n\n\
         Configuration file: {}\n\
         Templates directory: {}\n\n\
         Add templates under templates/commit and templates/pr, then share\n\
         the directory with team members.",
        path.display(),
        templates_dir.display()
    );
    Ok(())
}

fn set_provider(manager: &ConfigManager, provider_name: &str) -> Result<()> {
    let path = manager
        .config_path(ConfigLevel::User)
        .context("Cannot determine user configuration path")?;

    if !path.exists() {
        println!(
            "Global configuration does not exist yet.\n\n\
             Please initialize it first with:\n  gitai config --global\n\n\
             Then set the provider with:\n  gitai config --set-provider {provider_name}"
        );
        return Ok(());
    }

    if !crate::ai::PROVIDER_NAMES.contains(&provider_name) {
        anyhow::bail!(
            "Unknown provider '{provider_name}'. Available providers: {}",
            crate::ai::PROVIDER_NAMES.join(", ")
        );
    }

    let mut config = manager.load()?;

    // Selected provider gets priority 1; the rest keep a stable order
    // after it.
    for (offset, name) in crate::ai::PROVIDER_NAMES.iter().enumerate() {
        let priority = if *name == provider_name {
            1
        } else {
            2 + offset as i32
        };
        config.providers.insert(
            (*name).to_string(),
            ProviderEntry {
                enabled: true,
                priority,
            },
        );
    }

    manager.save(&config, ConfigLevel::User)?;
    info!(provider = provider_name, "Provider set successfully");

    println!(
        "Provider set to '{provider_name}' successfully!\n\n\
         Configuration file: {}\n\n\
         Use 'gitai config --show' to view the full configuration.",
        path.display()
    );
    Ok(())
}
