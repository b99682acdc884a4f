//! Analysis-specific error handling.

use thiserror::Error;

/// Errors raised while extracting change data from a repository.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The given path is not inside a git working tree.
    #[error("Not a git repository: {0}")]
    InvalidRepository(String),

    /// Nothing is staged and untracked files were not requested (or absent).
    #[error("No staged changes found. Stage files with `git add` first")]
    NoChangesFound,

    /// An underlying git query failed; carries the operation and subject.
    #[error("Git {operation} failed for '{subject}': {source}")]
    GitOperationFailed {
        /// The git operation that failed (e.g. "diff", "revparse").
        operation: &'static str,
        /// The path or reference the operation targeted.
        subject: String,
        /// Underlying git error.
        #[source]
        source: git2::Error,
    },

    /// Catch-all for unexpected failures during extraction.
    #[error("Failed to analyze changes: {0}")]
    AnalysisFailed(String),
}

impl AnalysisError {
    /// Wraps a git2 error with the operation and subject that produced it.
    pub fn git_op(operation: &'static str, subject: impl Into<String>, source: git2::Error) -> Self {
        Self::GitOperationFailed {
            operation,
            subject: subject.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_failure_names_operation_and_subject() {
        let inner = git2::Error::from_str("boom");
        let err = AnalysisError::git_op("diff", "origin/main", inner);
        let msg = err.to_string();
        assert!(msg.contains("diff"), "message should name the operation: {msg}");
        assert!(msg.contains("origin/main"), "message should name the subject: {msg}");
    }

    #[test]
    fn no_changes_message_is_actionable() {
        assert!(AnalysisError::NoChangesFound.to_string().contains("git add"));
    }
}
