//! Git repository access shared by the analyzer and the commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::Repository;
use tracing::debug;

use crate::git::change::RepositoryMetadata;
use crate::git::error::AnalysisError;

/// Thin wrapper around [`git2::Repository`] with the lookups this tool needs.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Opens the repository containing the current directory, searching
    /// parent directories like git itself does.
    pub fn discover() -> Result<Self, AnalysisError> {
        Self::discover_at(".")
    }

    /// Opens the repository containing `path`.
    pub fn discover_at<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let shown = path.as_ref().display().to_string();
        let repo = Repository::discover(path.as_ref())
            .map_err(|_| AnalysisError::InvalidRepository(shown))?;
        Ok(Self { repo })
    }

    /// Access to the underlying git2 repository.
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Absolute path of the working tree root.
    ///
    /// Bare repositories fall back to the `.git` directory path.
    pub fn root(&self) -> PathBuf {
        self.repo
            .workdir()
            .unwrap_or_else(|| self.repo.path())
            .to_path_buf()
    }

    /// Directory name of the working tree root.
    pub fn name(&self) -> String {
        self.root()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Name of the currently checked-out branch.
    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD reference")?;

        if let Some(name) = head.shorthand() {
            if name != "HEAD" {
                return Ok(name.to_string());
            }
        }

        anyhow::bail!("Repository is in detached HEAD state")
    }

    /// Name of the first configured remote, `origin` preferred.
    pub fn remote_name(&self) -> Option<String> {
        let remotes = self.repo.remotes().ok()?;
        if remotes.iter().flatten().any(|name| name == "origin") {
            return Some("origin".to_string());
        }
        remotes.get(0).map(str::to_string)
    }

    /// URL of the preferred remote, if any.
    pub fn remote_url(&self) -> Option<String> {
        let name = self.remote_name()?;
        let remote = self.repo.find_remote(&name).ok()?;
        remote.url().map(str::to_string)
    }

    /// Message and author of the HEAD commit, best-effort.
    pub fn head_commit_info(&self) -> Option<(String, String)> {
        let commit = self.repo.head().ok()?.peel_to_commit().ok()?;
        let message = commit.message().unwrap_or("").trim().to_string();
        let author = format!(
            "{} <{}>",
            commit.author().name().unwrap_or("Unknown"),
            commit.author().email().unwrap_or("unknown")
        );
        Some((message, author))
    }

    /// `user.name` and `user.email` from the git configuration, best-effort.
    pub fn user_identity(&self) -> (Option<String>, Option<String>) {
        let Ok(mut config) = self.repo.config() else {
            return (None, None);
        };
        let snapshot = match config.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("Could not snapshot git config: {e}");
                return (None, None);
            }
        };
        let name = snapshot.get_str("user.name").ok().map(str::to_string);
        let email = snapshot.get_str("user.email").ok().map(str::to_string);
        (name, email)
    }

    /// Repository identification for analysis results.
    pub fn metadata(&self) -> RepositoryMetadata {
        RepositoryMetadata {
            name: self.name(),
            path: self.root().display().to_string(),
            remote_url: self.remote_url().unwrap_or_default(),
        }
    }

    /// Creates a commit from the current index with the given message.
    pub fn commit_staged(&self, message: &str) -> Result<git2::Oid> {
        let signature = self
            .repo
            .signature()
            .context("Failed to resolve commit signature; set user.name and user.email")?;

        let mut index = self.repo.index().context("Failed to open index")?;
        let tree_id = index.write_tree().context("Failed to write index tree")?;
        let tree = self.repo.find_tree(tree_id).context("Failed to find tree")?;

        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .context("Failed to create commit")
    }
}
