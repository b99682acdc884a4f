//! Template discovery, loading and rendering.
//!
//! Templates live as `<dir>/<kind>/<name>.tmpl` files in the configured
//! search paths; builtin templates back every lookup. Earlier search
//! paths shadow later ones and all user paths shadow the builtins.

pub mod builtin;
pub mod render;

use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::config::GitAiConfig;

/// Template categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Commit message templates.
    Commit,
    /// PR description templates.
    Pr,
}

impl TemplateKind {
    /// Subdirectory name for this kind in a template search path.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Pr => "pr",
        }
    }

    fn builtins(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Commit => &builtin::COMMIT_TEMPLATES,
            Self::Pr => &builtin::PR_TEMPLATES,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Template subsystem errors.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// No template with this name exists in any search path or builtin.
    #[error("Template '{name}' not found in category '{kind}'")]
    NotFound {
        /// Requested template name.
        name: String,
        /// Requested category.
        kind: TemplateKind,
    },

    /// A placeholder referenced a variable missing from the context.
    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable {
        /// The dotted variable path that failed to resolve.
        variable: String,
    },

    /// Template file could not be read.
    #[error("Failed to read template {path}: {source}")]
    Read {
        /// Path of the unreadable template.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Rendering failed for a reason other than an undefined variable.
    #[error("Failed to render template: {reason}")]
    Render {
        /// What went wrong.
        reason: String,
    },
}

/// Metadata about one discoverable template.
#[derive(Debug, Clone)]
pub struct TemplateInfo {
    /// Template name (file stem).
    pub name: String,
    /// Category the template belongs to.
    pub kind: TemplateKind,
    /// File path, `None` for builtins.
    pub path: Option<PathBuf>,
    /// Description from the template's `{# description: ... #}` header.
    pub description: String,
    /// Placeholder variables the template references.
    pub variables: Vec<String>,
}

/// Finds and renders templates across the configured search paths.
pub struct TemplateManager {
    search_paths: Vec<PathBuf>,
}

impl TemplateManager {
    /// Creates a manager with explicit search paths, highest precedence
    /// first.
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Creates a manager with the search paths a configuration implies.
    pub fn from_config(config: &GitAiConfig) -> Self {
        Self::new(config.template_search_paths())
    }

    /// Loads a template's raw text.
    pub fn load(&self, name: &str, kind: TemplateKind) -> Result<String, TemplateError> {
        for dir in &self.search_paths {
            let path = dir.join(kind.dir_name()).join(format!("{name}.tmpl"));
            if path.exists() {
                return std::fs::read_to_string(&path)
                    .map_err(|source| TemplateError::Read { path, source });
            }
        }

        kind.builtins()
            .iter()
            .find(|(builtin_name, _)| *builtin_name == name)
            .map(|(_, content)| (*content).to_string())
            .ok_or_else(|| TemplateError::NotFound {
                name: name.to_string(),
                kind,
            })
    }

    /// Whether a template with this name exists.
    pub fn exists(&self, name: &str, kind: TemplateKind) -> bool {
        self.load(name, kind).is_ok()
    }

    /// Renders a template against a context map.
    pub fn render(
        &self,
        name: &str,
        kind: TemplateKind,
        context: &Map<String, Value>,
    ) -> Result<String, TemplateError> {
        let template = self.load(name, kind)?;
        render::render_str(&template, context)
    }

    /// Lists available templates for a category, shadowed duplicates
    /// omitted.
    pub fn list(&self, kind: TemplateKind) -> Vec<TemplateInfo> {
        let mut seen = Vec::new();
        let mut templates = Vec::new();

        for dir in &self.search_paths {
            let kind_dir = dir.join(kind.dir_name());
            let Ok(entries) = std::fs::read_dir(&kind_dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("tmpl") {
                    continue;
                }
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                if seen.contains(&name.to_string()) {
                    continue;
                }
                match std::fs::read_to_string(&path) {
                    Ok(content) => {
                        seen.push(name.to_string());
                        templates.push(TemplateInfo {
                            name: name.to_string(),
                            kind,
                            path: Some(path.clone()),
                            description: extract_description(&content),
                            variables: render::extract_variables(&content),
                        });
                    }
                    Err(e) => warn!("Failed to read template {}: {e}", path.display()),
                }
            }
        }

        for (name, content) in kind.builtins() {
            if seen.contains(&(*name).to_string()) {
                continue;
            }
            templates.push(TemplateInfo {
                name: (*name).to_string(),
                kind,
                path: None,
                description: extract_description(content),
                variables: render::extract_variables(content),
            });
        }

        templates
    }
}

/// Pulls the description out of a `{# description: ... #}` header line.
fn extract_description(content: &str) -> String {
    for line in content.lines().take(10) {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("{#") {
            if let Some(idx) = rest.find("description:") {
                return rest[idx + "description:".len()..]
                    .trim_end_matches("#}")
                    .trim()
                    .to_string();
            }
        }
    }
    "No description available".to_string()
}
