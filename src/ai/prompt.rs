//! Prompt assembly for the generation providers.

use serde_json::{Map, Value};

use crate::git::change::DiffAnalysis;

/// Maximum files itemized in the context digest appended to prompts.
const DIGEST_FILE_LIMIT: usize = 10;

/// What the generated text is for; selects the system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Commit message generation.
    Commit,
    /// PR description generation.
    Pr,
}

/// System prompt matching the generation purpose.
pub fn system_prompt(purpose: Purpose) -> &'static str {
    match purpose {
        Purpose::Commit => {
            "You are a helpful assistant that generates clear, concise commit \
             messages based on git changes. Follow the template format provided \
             exactly and focus on the actual changes made."
        }
        Purpose::Pr => {
            "You are a helpful assistant that generates clear, concise pull request \
             descriptions based on git changes. Follow the template format provided \
             exactly and focus on the actual changes made."
        }
    }
}

/// Appends a compact digest of the analysis context to a rendered
/// template.
///
/// The digest keeps local models on track: repository name, summary,
/// totals and the first few files.
pub fn compose_prompt(prompt: &str, context: &Map<String, Value>) -> String {
    let mut composed = prompt.to_string();
    composed.push('\n');

    if let Some(name) = context
        .get("repository")
        .and_then(|r| r.get("name"))
        .and_then(Value::as_str)
    {
        composed.push_str(&format!("\nRepository: {name}\n"));
    }

    let changes = context.get("changes");

    if let Some(summary) = changes
        .and_then(|c| c.get("summary"))
        .and_then(Value::as_str)
    {
        composed.push_str(&format!("\nSummary: {summary}\n"));
    }

    if let (Some(added), Some(deleted)) = (
        changes
            .and_then(|c| c.get("lines_added"))
            .and_then(Value::as_u64),
        changes
            .and_then(|c| c.get("lines_deleted"))
            .and_then(Value::as_u64),
    ) {
        composed.push_str(&format!("\nStatistics: +{added} -{deleted} lines\n"));
    }

    if let Some(files) = changes
        .and_then(|c| c.get("affected_files"))
        .and_then(Value::as_array)
    {
        if !files.is_empty() {
            composed.push_str(&format!("\nFiles changed ({}):\n", files.len()));
            for file in files.iter().take(DIGEST_FILE_LIMIT) {
                let path = file.get("path").and_then(Value::as_str).unwrap_or("unknown");
                let change_type = file
                    .get("change_type")
                    .and_then(Value::as_str)
                    .unwrap_or("modified");
                let added = file.get("lines_added").and_then(Value::as_u64).unwrap_or(0);
                let deleted = file
                    .get("lines_deleted")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                composed.push_str(&format!("- {path}: {change_type} (+{added}, -{deleted})\n"));
            }
            if files.len() > DIGEST_FILE_LIMIT {
                composed.push_str(&format!(
                    "... and {} more files\n",
                    files.len() - DIGEST_FILE_LIMIT
                ));
            }
        }
    }

    composed
        .push_str("\nPlease provide a concise, clear response. Avoid unnecessary explanations.");
    composed
}

/// Hand-built commit prompt used when template rendering fails.
pub fn fallback_commit_prompt(template: &str, analysis: &DiffAnalysis) -> String {
    let mut prompt = format!(
        "Generate a commit message using the '{template}' style for the following changes.\n\n\
         Files changed: {}\nLines added: {}\nLines removed: {}\n\n\
         Change summary: {}\n\nMake it clear, concise, and descriptive.",
        analysis.file_count(),
        analysis.total_additions,
        analysis.total_deletions,
        analysis.change_summary,
    );

    match template {
        "conventional" => prompt.push_str(
            "\n\nUse conventional commit format: type(scope): description\n\
             Where type is one of: feat, fix, docs, style, refactor, test, chore",
        ),
        "minimal" => {
            prompt.push_str("\n\nKeep it under 50 characters and use present tense.");
        }
        _ => {}
    }

    prompt
}

/// Hand-built PR prompt used when template rendering fails.
pub fn fallback_pr_prompt(template: &str, analysis: &DiffAnalysis) -> String {
    let mut prompt = format!(
        "Generate a pull request description using the '{template}' style for the following changes.\n\n\
         Files changed: {}\nLines added: {}\nLines removed: {}\n\n\
         Change summary: {}\n\nMake it clear, informative, and well-structured.",
        analysis.file_count(),
        analysis.total_additions,
        analysis.total_deletions,
        analysis.change_summary,
    );

    match template {
        "github" => prompt.push_str(
            "\n\nUse GitHub PR format with:\n## Summary, ## Changes, ## Testing sections",
        ),
        "gitlab" => prompt.push_str(
            "\n\nUse GitLab MR format with:\n\
             ## Summary, ## Changes Made, ## Testing Done, ## Documentation sections",
        ),
        "detailed" => prompt.push_str(
            "\n\nInclude comprehensive sections:\n\
             - Executive summary\n- Detailed breakdown of changes\n\
             - Technical considerations\n- Testing approach\n\
             - Breaking changes (if any)",
        ),
        _ => {}
    }

    prompt
}
