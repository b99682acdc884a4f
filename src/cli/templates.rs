//! `gitai templates` implementation.

use anyhow::Result;
use clap::{Args, ValueEnum};

use crate::config::ConfigManager;
use crate::templates::{TemplateKind, TemplateManager};

/// Template category argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    /// Commit message templates.
    Commit,
    /// PR description templates.
    Pr,
}

impl From<KindArg> for TemplateKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Commit => TemplateKind::Commit,
            KindArg::Pr => TemplateKind::Pr,
        }
    }
}

/// List and inspect commit and PR templates.
#[derive(Args)]
pub struct TemplatesCommand {
    /// List available templates
    #[arg(long)]
    pub list: bool,

    /// Show a template's content
    #[arg(long)]
    pub show: Option<String>,

    /// Template category
    #[arg(long = "kind", value_enum, default_value = "commit")]
    pub kind: KindArg,
}

impl TemplatesCommand {
    /// Lists templates or prints one template's content.
    pub fn execute(self) -> Result<()> {
        let config = ConfigManager::new().load()?;
        let manager = TemplateManager::from_config(&config);
        let kind = TemplateKind::from(self.kind);

        if let Some(name) = &self.show {
            let content = manager.load(name, kind)?;
            println!("{content}");
            return Ok(());
        }

        if self.list {
            let templates = manager.list(kind);
            println!("Available {kind} templates:\n");
            for info in templates {
                let source = info
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "builtin".to_string());
                println!("  {:<14} {}  [{source}]", info.name, info.description);
            }
            return Ok(());
        }

        println!(
            "gitai templates\n\n\
             Available commands:\n\
             \x20 gitai templates --list                 # List commit templates\n\
             \x20 gitai templates --list --kind pr       # List PR templates\n\
             \x20 gitai templates --show conventional    # Show template content"
        );
        Ok(())
    }
}
