//! Enrichment of raw diff analyses into template-ready context.
//!
//! Everything in this module is total: repository and user lookups are
//! best-effort with environment fallbacks, and enrichment itself performs
//! no I/O.

pub mod classify;

use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::git::change::DiffAnalysis;
use crate::git::repository::GitRepository;

/// Fraction of files that must carry a role flag before the whole change
/// set takes that role.
const ROLE_MAJORITY_RATIO: f64 = 0.7;

static ISSUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"#(\d+)",
        r"(?i)closes?\s+#(\d+)",
        r"(?i)fixes?\s+#(\d+)",
        r"(?i)resolves?\s+#(\d+)",
    ]
    .iter()
    .map(|p| {
        Regex::new(p)
            .unwrap_or_else(|e| unreachable!("invalid builtin issue pattern {p}: {e}"))
    })
    .collect()
});

/// Repository information exposed to templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Repository name (root directory name).
    pub name: String,
    /// Remote URL, if a remote is configured.
    pub url: Option<String>,
    /// Currently checked-out branch.
    pub branch: String,
    /// Remote name, `origin` by default.
    pub remote: String,
    /// Absolute path of the repository root.
    pub root_path: PathBuf,
}

impl Default for RepositoryInfo {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            url: None,
            branch: "main".to_string(),
            remote: "origin".to_string(),
            root_path: PathBuf::from("."),
        }
    }
}

/// User identity exposed to templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Full name from git config or environment.
    pub name: Option<String>,
    /// Email address from git config or environment.
    pub email: Option<String>,
}

/// A file change with classification flags, ready for templates.
///
/// Field names are part of the template contract and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedFileChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Change kind as a lowercase label (`"added"`, `"modified"`, ...).
    pub change_type: String,
    /// Lines added in this file.
    pub lines_added: usize,
    /// Lines deleted in this file.
    pub lines_deleted: usize,
    /// Short display description of the change.
    pub description: Option<String>,
    /// Whether the path follows a test convention.
    pub is_test: bool,
    /// Whether the path is a build/dependency/environment manifest.
    pub is_config: bool,
    /// Whether the path follows a documentation convention.
    pub is_docs: bool,
    /// Detected language, if the extension is known.
    pub language: Option<String>,
}

/// Classified view of a whole change set, ready for templates.
///
/// The kind-based lists partition `affected_files`; `test_files` is an
/// overlapping view selected by the `is_test` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDiffAnalysis {
    /// One-line summary of the change set.
    pub summary: String,
    /// Short scope label, absent when no scope could be derived.
    pub scope: Option<String>,
    /// Whether the change set looks like a new feature.
    pub is_feature: bool,
    /// Whether the change set looks like a bug fix.
    pub is_fix: bool,
    /// Whether the change set looks like a refactor.
    pub is_refactor: bool,
    /// Whether the change set is primarily documentation.
    pub is_docs: bool,
    /// Whether the change set is primarily tests.
    pub is_test: bool,
    /// Every changed file, in diff order.
    pub affected_files: Vec<EnhancedFileChange>,
    /// Files with change type `"added"`.
    pub added_files: Vec<EnhancedFileChange>,
    /// Files with change type `"modified"`.
    pub modified_files: Vec<EnhancedFileChange>,
    /// Files with change type `"deleted"`.
    pub deleted_files: Vec<EnhancedFileChange>,
    /// Files flagged as tests, overlapping the kind-based lists.
    pub test_files: Vec<EnhancedFileChange>,
    /// Total lines added.
    pub lines_added: usize,
    /// Total lines deleted.
    pub lines_deleted: usize,
    /// Issue references like `#42`, deduplicated and sorted.
    pub related_issues: Vec<String>,
}

/// Converts one [`FileChange`](crate::git::FileChange) into its enriched
/// form.
pub fn enhance_file_change(change: &crate::git::FileChange) -> EnhancedFileChange {
    let is_test = classify::is_test_file(&change.path);
    let is_config = classify::is_config_file(&change.path);
    let is_docs = classify::is_docs_file(&change.path);
    let description = classify::describe_change(change, is_test, is_config, is_docs);

    EnhancedFileChange {
        path: change.path.clone(),
        change_type: change.change_kind.label().to_string(),
        lines_added: change.lines_added,
        lines_deleted: change.lines_removed,
        description: Some(description.to_string()),
        is_test,
        is_config,
        is_docs,
        language: classify::detect_language(&change.path).map(str::to_string),
    }
}

/// Enriches a raw [`DiffAnalysis`] into its template-ready form.
///
/// Deterministic: the same input always yields the same output.
pub fn enhance_diff_analysis(analysis: &DiffAnalysis) -> EnhancedDiffAnalysis {
    let affected_files: Vec<EnhancedFileChange> = analysis
        .files_changed
        .iter()
        .map(enhance_file_change)
        .collect();

    let select = |change_type: &str| -> Vec<EnhancedFileChange> {
        affected_files
            .iter()
            .filter(|f| f.change_type == change_type)
            .cloned()
            .collect()
    };
    let added_files = select("added");
    let modified_files = select("modified");
    let deleted_files = select("deleted");
    let test_files: Vec<EnhancedFileChange> = affected_files
        .iter()
        .filter(|f| f.is_test)
        .cloned()
        .collect();

    let is_docs = role_majority(&affected_files, |f| f.is_docs);
    let is_test = role_majority(&affected_files, |f| f.is_test);
    let is_feature = analysis.is_likely_feature();
    let is_fix = analysis.is_likely_fix();
    let is_refactor = analysis.is_likely_refactor();

    let summary = if analysis.change_summary.trim().is_empty() {
        derive_summary(is_docs, is_test, is_feature, is_fix, is_refactor)
    } else {
        analysis.change_summary.clone()
    };

    let scope = analysis.change_scope();

    EnhancedDiffAnalysis {
        summary,
        scope: (!scope.is_empty()).then_some(scope),
        is_feature,
        is_fix,
        is_refactor,
        is_docs,
        is_test,
        affected_files,
        added_files,
        modified_files,
        deleted_files,
        test_files,
        lines_added: analysis.total_additions,
        lines_deleted: analysis.total_deletions,
        related_issues: extract_related_issues(&analysis.change_summary),
    }
}

fn role_majority(files: &[EnhancedFileChange], flag: impl Fn(&EnhancedFileChange) -> bool) -> bool {
    if files.is_empty() {
        return false;
    }
    let flagged = files.iter().filter(|f| flag(f)).count();
    flagged as f64 > files.len() as f64 * ROLE_MAJORITY_RATIO
}

/// Fallback summary when the raw analysis carried none.
fn derive_summary(
    is_docs: bool,
    is_test: bool,
    is_feature: bool,
    is_fix: bool,
    is_refactor: bool,
) -> String {
    if is_docs {
        "Update documentation"
    } else if is_test {
        "Update tests"
    } else if is_feature {
        "Add new feature"
    } else if is_fix {
        "Fix bug"
    } else if is_refactor {
        "Refactor code"
    } else {
        "Update code"
    }
    .to_string()
}

/// Extracts `#<digits>` issue references from prose, deduplicated and
/// sorted.
pub fn extract_related_issues(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut issues = BTreeSet::new();
    for pattern in ISSUE_PATTERNS.iter() {
        for capture in pattern.captures_iter(text) {
            if let Some(number) = capture.get(1) {
                issues.insert(format!("#{}", number.as_str()));
            }
        }
    }

    issues.into_iter().collect()
}

/// Builds template context from analyses plus repository and user
/// metadata.
pub struct ContextBuilder {
    repo: Option<GitRepository>,
}

impl ContextBuilder {
    /// Creates a builder for the repository containing the current
    /// directory; repository lookups degrade to defaults outside one.
    pub fn new() -> Self {
        Self {
            repo: GitRepository::discover().ok(),
        }
    }

    /// Creates a builder for the repository containing `path`.
    pub fn at_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self {
            repo: GitRepository::discover_at(path).ok(),
        }
    }

    /// Repository information, with defaults when lookups fail.
    pub fn repository_info(&self) -> RepositoryInfo {
        let Some(repo) = &self.repo else {
            return RepositoryInfo::default();
        };

        RepositoryInfo {
            name: repo.name(),
            url: repo.remote_url(),
            branch: repo
                .current_branch()
                .unwrap_or_else(|_| "main".to_string()),
            remote: repo.remote_name().unwrap_or_else(|| "origin".to_string()),
            root_path: repo.root(),
        }
    }

    /// User identity from git config, falling back to the environment.
    pub fn user_info(&self) -> UserInfo {
        let (mut name, mut email) = match &self.repo {
            Some(repo) => repo.user_identity(),
            None => (None, None),
        };

        if name.is_none() {
            name = env::var("GIT_AUTHOR_NAME")
                .ok()
                .or_else(|| env::var("USER").ok());
        }
        if email.is_none() {
            email = env::var("GIT_AUTHOR_EMAIL").ok();
        }

        UserInfo { name, email }
    }

    /// Context for commit message templates.
    pub fn build_commit_context(
        &self,
        analysis: &DiffAnalysis,
        user: Option<UserInfo>,
    ) -> Map<String, Value> {
        let mut context = Map::new();
        context.insert("changes".to_string(), json!(enhance_diff_analysis(analysis)));
        context.insert("repository".to_string(), json!(self.repository_info()));
        context.insert(
            "user".to_string(),
            json!(user.unwrap_or_else(|| self.user_info())),
        );
        context.insert(
            "timestamp".to_string(),
            json!(chrono::Local::now().to_rfc3339()),
        );
        context
    }

    /// Context for PR description templates.
    pub fn build_pr_context(
        &self,
        analysis: &DiffAnalysis,
        base_branch: &str,
        head_branch: Option<&str>,
        user: Option<UserInfo>,
    ) -> Map<String, Value> {
        let head = head_branch.map(str::to_string).unwrap_or_else(|| {
            self.repo
                .as_ref()
                .and_then(|repo| repo.current_branch().ok())
                .unwrap_or_else(|| "current".to_string())
        });

        let mut context = self.build_commit_context(analysis, user);
        context.insert("base_branch".to_string(), json!(base_branch));
        context.insert("head_branch".to_string(), json!(head));
        context
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::change::{ChangeKind, FileChange, RepositoryMetadata};

    fn change(path: &str, kind: ChangeKind, added: usize, removed: usize) -> FileChange {
        FileChange {
            path: path.to_string(),
            change_kind: kind,
            lines_added: added,
            lines_removed: removed,
            content_preview: String::new(),
            old_path: None,
        }
    }

    fn analysis(files: Vec<FileChange>, summary: &str) -> DiffAnalysis {
        let total_additions = files.iter().map(|f| f.lines_added).sum();
        let total_deletions = files.iter().map(|f| f.lines_removed).sum();
        DiffAnalysis {
            files_changed: files,
            total_additions,
            total_deletions,
            change_summary: summary.to_string(),
            commit_context: Map::new(),
            repository_info: RepositoryMetadata::default(),
        }
    }

    // ── issue extraction ───────────────────────────────────────────

    #[test]
    fn issues_deduplicated_and_sorted() {
        let issues = extract_related_issues("Fixes #42 and relates to #7, closes #42");
        assert_eq!(issues, vec!["#42", "#7"]);
    }

    #[test]
    fn issues_case_insensitive_keywords() {
        let issues = extract_related_issues("RESOLVES #10");
        assert_eq!(issues, vec!["#10"]);
    }

    #[test]
    fn issues_empty_text() {
        assert!(extract_related_issues("").is_empty());
        assert!(extract_related_issues("no references here").is_empty());
    }

    // ── per-file enrichment ────────────────────────────────────────

    #[test]
    fn enhance_file_sets_flags_and_language() {
        let enhanced = enhance_file_change(&change("tests/api_test.rs", ChangeKind::Added, 50, 0));
        assert!(enhanced.is_test);
        assert!(!enhanced.is_config);
        assert_eq!(enhanced.language.as_deref(), Some("rust"));
        assert_eq!(enhanced.change_type, "added");
        assert_eq!(enhanced.description.as_deref(), Some("Test file"));
    }

    #[test]
    fn enhance_file_unusual_kind_renders_changed() {
        let enhanced = enhance_file_change(&change("src/a.rs", ChangeKind::Unmerged, 1, 1));
        assert_eq!(enhanced.change_type, "changed");
    }

    // ── change-set enrichment ──────────────────────────────────────

    #[test]
    fn partition_matches_change_type_and_tests_overlap() {
        let a = analysis(
            vec![
                change("src/new.rs", ChangeKind::Added, 10, 0),
                change("src/lib.rs", ChangeKind::Modified, 5, 5),
                change("old.rs", ChangeKind::Deleted, 0, 20),
                change("tests/new_test.rs", ChangeKind::Added, 30, 0),
            ],
            "",
        );
        let enhanced = enhance_diff_analysis(&a);

        assert_eq!(enhanced.affected_files.len(), 4);
        assert_eq!(enhanced.added_files.len(), 2);
        assert_eq!(enhanced.modified_files.len(), 1);
        assert_eq!(enhanced.deleted_files.len(), 1);
        // The test file also appears in the added partition.
        assert_eq!(enhanced.test_files.len(), 1);
        assert_eq!(enhanced.test_files[0].path, "tests/new_test.rs");

        let partitioned =
            enhanced.added_files.len() + enhanced.modified_files.len() + enhanced.deleted_files.len();
        assert_eq!(partitioned, enhanced.affected_files.len());
    }

    #[test]
    fn totals_carried_through() {
        let a = analysis(vec![change("a.rs", ChangeKind::Modified, 12, 7)], "x");
        let enhanced = enhance_diff_analysis(&a);
        assert_eq!(enhanced.lines_added, 12);
        assert_eq!(enhanced.lines_deleted, 7);
    }

    #[test]
    fn raw_summary_wins_over_derived() {
        let a = analysis(
            vec![change("README.md", ChangeKind::Modified, 3, 1)],
            "1 file 1 modified",
        );
        assert_eq!(enhance_diff_analysis(&a).summary, "1 file 1 modified");
    }

    #[test]
    fn derived_summary_docs_change() {
        let a = analysis(
            vec![
                change("README.md", ChangeKind::Modified, 3, 1),
                change("docs/guide.md", ChangeKind::Modified, 5, 0),
            ],
            "",
        );
        let enhanced = enhance_diff_analysis(&a);
        assert!(enhanced.is_docs);
        assert_eq!(enhanced.summary, "Update documentation");
    }

    #[test]
    fn derived_summary_generic_fallback() {
        let a = analysis(vec![change("src/a.rs", ChangeKind::Modified, 2, 0)], "");
        let enhanced = enhance_diff_analysis(&a);
        assert!(!enhanced.is_feature && !enhanced.is_fix && !enhanced.is_refactor);
        assert_eq!(enhanced.summary, "Update code");
    }

    #[test]
    fn role_majority_requires_strictly_more_than_seventy_percent() {
        // 7 of 10 docs files is not strictly more than 70%.
        let mut files: Vec<FileChange> = (0..7)
            .map(|i| change(&format!("docs/{i}.md"), ChangeKind::Modified, 1, 0))
            .collect();
        files.extend((0..3).map(|i| change(&format!("src/{i}.rs"), ChangeKind::Modified, 1, 0)));
        assert!(!enhance_diff_analysis(&analysis(files, "")).is_docs);

        // 8 of 10 is.
        let mut files: Vec<FileChange> = (0..8)
            .map(|i| change(&format!("docs/{i}.md"), ChangeKind::Modified, 1, 0))
            .collect();
        files.extend((0..2).map(|i| change(&format!("src/{i}.rs"), ChangeKind::Modified, 1, 0)));
        assert!(enhance_diff_analysis(&analysis(files, "")).is_docs);
    }

    #[test]
    fn scope_absent_when_underivable() {
        let a = analysis(vec![change("Makefile", ChangeKind::Modified, 1, 0)], "");
        assert_eq!(enhance_diff_analysis(&a).scope, None);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let a = analysis(
            vec![
                change("src/feature.rs", ChangeKind::Added, 120, 0),
                change("src/lib.rs", ChangeKind::Modified, 4, 10),
            ],
            "2 files (1 added, 1 modified)",
        );
        let first = enhance_diff_analysis(&a);
        let second = enhance_diff_analysis(&a);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).expect("serialize"),
            serde_json::to_string(&second).expect("serialize")
        );
    }

    // ── context building ───────────────────────────────────────────

    #[test]
    fn commit_context_has_contract_keys() {
        let builder = ContextBuilder::at_path(std::env::temp_dir());
        let a = analysis(vec![change("src/a.rs", ChangeKind::Modified, 1, 0)], "s");
        let context = builder.build_commit_context(&a, None);

        for key in ["changes", "repository", "user", "timestamp"] {
            assert!(context.contains_key(key), "missing key {key}");
        }
        assert_eq!(context["changes"]["summary"], json!("s"));
    }

    #[test]
    fn pr_context_adds_branch_keys() {
        let builder = ContextBuilder::at_path(std::env::temp_dir());
        let a = analysis(vec![change("src/a.rs", ChangeKind::Modified, 1, 0)], "s");
        let context = builder.build_pr_context(&a, "main", Some("feature/x"), None);

        assert_eq!(context["base_branch"], json!("main"));
        assert_eq!(context["head_branch"], json!("feature/x"));
    }

    #[test]
    fn user_info_falls_back_to_environment() {
        let builder = ContextBuilder::at_path(std::env::temp_dir());
        // Outside a repository the name comes from the environment when
        // set; either way the lookup must not fail.
        let _ = builder.user_info();
    }
}
