//! Change records shared by all analysis stages.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Ratio of additions to deletions above which a change looks like a feature.
const FEATURE_ADDITION_RATIO: usize = 2;

/// Relative tolerance within which additions and deletions count as balanced.
const REFACTOR_TOLERANCE: f64 = 0.3;

/// Extensions treated as primary languages when deriving a scope label.
const PRIMARY_LANGUAGE_EXTENSIONS: [&str; 6] = ["py", "js", "ts", "java", "cpp", "c"];

/// Directory names recognized as conventional scopes.
const COMMON_SCOPES: [&str; 5] = ["src", "lib", "tests", "docs", "config"];

/// Kind of change applied to a single file.
///
/// Maps 1:1 to the single-character git status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// New file (`A`).
    Added,
    /// Content change (`M`).
    Modified,
    /// File removed (`D`).
    Deleted,
    /// File moved (`R`).
    Renamed,
    /// File duplicated (`C`).
    Copied,
    /// Merge conflict entry (`U`).
    Unmerged,
    /// Pairing broken (`B`).
    Broken,
    /// Untracked or unrecognized (`?`).
    Unknown,
}

impl ChangeKind {
    /// Parses a one-character git status code.
    ///
    /// Returns `None` for codes outside the documented set; callers decide
    /// whether that is an error or falls back to [`ChangeKind::Modified`].
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'A' => Some(Self::Added),
            'M' => Some(Self::Modified),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            'U' => Some(Self::Unmerged),
            'B' => Some(Self::Broken),
            '?' => Some(Self::Unknown),
            _ => None,
        }
    }

    /// The one-character git status code for this kind.
    pub fn code(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Unmerged => 'U',
            Self::Broken => 'B',
            Self::Unknown => '?',
        }
    }

    /// Lowercase label used in template contexts.
    ///
    /// Kinds outside the five common ones render as `"changed"`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Unmerged | Self::Broken | Self::Unknown => "changed",
        }
    }
}

/// A single file change extracted from a diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    /// Path relative to the repository root.
    pub path: String,
    /// Kind of change.
    pub change_kind: ChangeKind,
    /// Lines added in this file.
    pub lines_added: usize,
    /// Lines removed in this file.
    pub lines_removed: usize,
    /// Up to five changed lines, each truncated to 100 characters.
    pub content_preview: String,
    /// Previous path; set only for renamed or copied files.
    pub old_path: Option<String>,
}

impl FileChange {
    /// Whether the file looks binary (no countable lines, no preview).
    pub fn is_binary(&self) -> bool {
        self.lines_added == 0 && self.lines_removed == 0 && self.content_preview.is_empty()
    }

    /// Net line change, positive for growth.
    pub fn net_lines(&self) -> i64 {
        self.lines_added as i64 - self.lines_removed as i64
    }

    /// Human-readable one-line description of the change.
    pub fn change_description(&self) -> String {
        match self.change_kind {
            ChangeKind::Added => format!("Added {}", self.path),
            ChangeKind::Deleted => format!("Deleted {}", self.path),
            ChangeKind::Modified => format!(
                "Modified {} (+{}, -{})",
                self.path, self.lines_added, self.lines_removed
            ),
            ChangeKind::Renamed => format!(
                "Renamed {} -> {}",
                self.old_path.as_deref().unwrap_or("?"),
                self.path
            ),
            ChangeKind::Copied => format!(
                "Copied {} -> {}",
                self.old_path.as_deref().unwrap_or("?"),
                self.path
            ),
            _ => format!("Changed {}", self.path),
        }
    }
}

/// Repository identification attached to every analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    /// Directory name of the repository root.
    pub name: String,
    /// Absolute path of the repository root.
    pub path: String,
    /// URL of the `origin` remote, empty when absent.
    pub remote_url: String,
}

/// Raw aggregate of a diff: per-file records plus totals and context.
///
/// Built once per invocation and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffAnalysis {
    /// File changes in the order the diff enumerated them.
    pub files_changed: Vec<FileChange>,
    /// Sum of `lines_added` over all files.
    pub total_additions: usize,
    /// Sum of `lines_removed` over all files.
    pub total_deletions: usize,
    /// High-level summary such as `"3 files (2 modified, 1 added)"`.
    pub change_summary: String,
    /// Mode-dependent commit context (branch names, commit count, ...).
    pub commit_context: serde_json::Map<String, serde_json::Value>,
    /// Repository identification.
    pub repository_info: RepositoryMetadata,
}

impl DiffAnalysis {
    /// Number of files changed.
    pub fn file_count(&self) -> usize {
        self.files_changed.len()
    }

    /// Net line change across all files.
    pub fn net_lines(&self) -> i64 {
        self.total_additions as i64 - self.total_deletions as i64
    }

    /// Groups file changes by kind.
    pub fn files_by_kind(&self) -> HashMap<ChangeKind, Vec<&FileChange>> {
        let mut grouped: HashMap<ChangeKind, Vec<&FileChange>> = HashMap::new();
        for change in &self.files_changed {
            grouped.entry(change.change_kind).or_default().push(change);
        }
        grouped
    }

    /// Unique lowercase file extensions across the change set, sorted.
    pub fn file_extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self
            .files_changed
            .iter()
            .filter(|fc| fc.path.contains('.'))
            .filter_map(|fc| fc.path.rsplit('.').next())
            .map(str::to_lowercase)
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    /// Directories containing changed files, sorted. Root-level files
    /// contribute no entry.
    pub fn affected_directories(&self) -> Vec<String> {
        let mut directories: Vec<String> = self
            .files_changed
            .iter()
            .filter_map(|fc| fc.path.rsplit_once('/').map(|(dir, _)| dir.to_string()))
            .collect();
        directories.sort();
        directories.dedup();
        directories
    }

    /// Derives a short scope label for the change set.
    ///
    /// Precedence: single shared directory, single primary-language
    /// extension, a conventional directory name, then `""` for a single
    /// file or `"core"` for many.
    pub fn change_scope(&self) -> String {
        let directories = self.affected_directories();
        if directories.len() == 1 {
            return directories[0].clone();
        }

        let extensions = self.file_extensions();
        if extensions.len() == 1 && PRIMARY_LANGUAGE_EXTENSIONS.contains(&extensions[0].as_str()) {
            return extensions[0].clone();
        }

        for scope in COMMON_SCOPES {
            if directories.iter().any(|dir| dir.contains(scope)) {
                return scope.to_string();
            }
        }

        if self.file_count() > 1 {
            "core".to_string()
        } else {
            String::new()
        }
    }

    /// Whether the change set looks like a new feature: mostly additions,
    /// multiple files, at least one new file.
    pub fn is_likely_feature(&self) -> bool {
        self.total_additions > self.total_deletions * FEATURE_ADDITION_RATIO
            && self.file_count() > 1
            && self
                .files_changed
                .iter()
                .any(|fc| fc.change_kind == ChangeKind::Added)
    }

    /// Whether the change set looks like a bug fix: few files, no new
    /// files, a mix of additions and deletions.
    pub fn is_likely_fix(&self) -> bool {
        self.file_count() <= 3
            && !self
                .files_changed
                .iter()
                .any(|fc| fc.change_kind == ChangeKind::Added)
            && self.total_additions > 0
            && self.total_deletions > 0
    }

    /// Whether the change set looks like a refactor: balanced additions
    /// and deletions plus at least one rename or copy.
    pub fn is_likely_refactor(&self) -> bool {
        let additions = self.total_additions as f64;
        let deletions = self.total_deletions as f64;
        (additions - deletions).abs() < additions.max(deletions) * REFACTOR_TOLERANCE
            && self.files_changed.iter().any(|fc| {
                matches!(fc.change_kind, ChangeKind::Renamed | ChangeKind::Copied)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn analysis(files: Vec<FileChange>) -> DiffAnalysis {
        let total_additions = files.iter().map(|f| f.lines_added).sum();
        let total_deletions = files.iter().map(|f| f.lines_removed).sum();
        DiffAnalysis {
            files_changed: files,
            total_additions,
            total_deletions,
            change_summary: String::new(),
            commit_context: serde_json::Map::new(),
            repository_info: RepositoryMetadata::default(),
        }
    }

    // ── ChangeKind codes ───────────────────────────────────────────

    #[test]
    fn kind_round_trips_all_codes() {
        for code in ['A', 'M', 'D', 'R', 'C', 'U', 'B', '?'] {
            let kind = ChangeKind::from_code(code).expect("documented code");
            assert_eq!(kind.code(), code);
        }
    }

    #[test]
    fn kind_rejects_unknown_code() {
        assert_eq!(ChangeKind::from_code('T'), None);
        assert_eq!(ChangeKind::from_code('x'), None);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(ChangeKind::Added.label(), "added");
        assert_eq!(ChangeKind::Renamed.label(), "renamed");
        assert_eq!(ChangeKind::Unmerged.label(), "changed");
    }

    // ── FileChange ─────────────────────────────────────────────────

    #[test]
    fn binary_detection() {
        let fc = change("logo.png", ChangeKind::Modified, 0, 0);
        assert!(fc.is_binary());

        let fc = change("src/main.rs", ChangeKind::Modified, 1, 0);
        assert!(!fc.is_binary());
    }

    #[test]
    fn rename_description_uses_old_path() {
        let mut fc = change("src/new.rs", ChangeKind::Renamed, 0, 0);
        fc.old_path = Some("src/old.rs".to_string());
        assert_eq!(fc.change_description(), "Renamed src/old.rs -> src/new.rs");
    }

    // ── aggregates ─────────────────────────────────────────────────

    #[test]
    fn totals_are_sum_of_files() {
        let a = analysis(vec![
            change("a.rs", ChangeKind::Modified, 10, 3),
            change("b.rs", ChangeKind::Added, 20, 0),
        ]);
        assert_eq!(a.total_additions, 30);
        assert_eq!(a.total_deletions, 3);
        assert_eq!(a.net_lines(), 27);
    }

    #[test]
    fn extensions_are_unique_and_sorted() {
        let a = analysis(vec![
            change("a.rs", ChangeKind::Modified, 1, 0),
            change("b.py", ChangeKind::Modified, 1, 0),
            change("c.rs", ChangeKind::Modified, 1, 0),
        ]);
        assert_eq!(a.file_extensions(), vec!["py", "rs"]);
    }

    #[test]
    fn root_files_have_no_directory() {
        let a = analysis(vec![change("README.md", ChangeKind::Modified, 1, 0)]);
        assert!(a.affected_directories().is_empty());
    }

    // ── scope derivation ───────────────────────────────────────────

    #[test]
    fn scope_single_shared_directory() {
        let a = analysis(vec![
            change("src/payments/gateway.rs", ChangeKind::Modified, 5, 2),
            change("src/payments/refund.rs", ChangeKind::Modified, 3, 1),
        ]);
        assert_eq!(a.change_scope(), "src/payments");
    }

    #[test]
    fn scope_single_primary_extension() {
        let a = analysis(vec![
            change("handlers/auth.py", ChangeKind::Modified, 1, 0),
            change("models/user.py", ChangeKind::Modified, 1, 0),
        ]);
        assert_eq!(a.change_scope(), "py");
    }

    #[test]
    fn scope_common_directory_name() {
        let a = analysis(vec![
            change("src/a.txt", ChangeKind::Modified, 1, 0),
            change("notes/b.md", ChangeKind::Modified, 1, 0),
        ]);
        assert_eq!(a.change_scope(), "src");
    }

    #[test]
    fn scope_fallback_single_file_is_empty() {
        let a = analysis(vec![change("Makefile", ChangeKind::Modified, 1, 0)]);
        assert_eq!(a.change_scope(), "");
    }

    #[test]
    fn scope_fallback_many_files_is_core() {
        let a = analysis(vec![
            change("one/a.xyz", ChangeKind::Modified, 1, 0),
            change("two/b.qrs", ChangeKind::Modified, 1, 0),
        ]);
        assert_eq!(a.change_scope(), "core");
    }

    // ── change-set heuristics ──────────────────────────────────────

    #[test]
    fn feature_heuristic_example() {
        let a = analysis(vec![
            change("src/feature.rs", ChangeKind::Added, 100, 0),
            change("src/lib.rs", ChangeKind::Modified, 20, 10),
        ]);
        assert!(a.is_likely_feature());
        assert!(!a.is_likely_fix());
    }

    #[test]
    fn fix_heuristic_example() {
        let a = analysis(vec![
            change("src/parser.rs", ChangeKind::Modified, 3, 3),
            change("src/lexer.rs", ChangeKind::Modified, 2, 2),
        ]);
        assert!(a.is_likely_fix());
        assert!(!a.is_likely_feature());
    }

    #[test]
    fn fix_requires_both_totals_positive() {
        let a = analysis(vec![change("src/parser.rs", ChangeKind::Modified, 3, 0)]);
        assert!(!a.is_likely_fix());
    }

    #[test]
    fn refactor_heuristic_needs_rename() {
        let mut renamed = change("src/new_name.rs", ChangeKind::Renamed, 50, 48);
        renamed.old_path = Some("src/old_name.rs".to_string());
        let a = analysis(vec![renamed]);
        assert!(a.is_likely_refactor());

        let a = analysis(vec![change("src/lib.rs", ChangeKind::Modified, 50, 48)]);
        assert!(!a.is_likely_refactor());
    }

    #[test]
    fn heuristics_can_all_be_false() {
        let a = analysis(vec![
            change("a.bin", ChangeKind::Modified, 100, 1),
            change("b.bin", ChangeKind::Modified, 100, 1),
            change("c.bin", ChangeKind::Modified, 100, 1),
            change("d.bin", ChangeKind::Modified, 100, 1),
        ]);
        assert!(!a.is_likely_feature());
        assert!(!a.is_likely_fix());
        assert!(!a.is_likely_refactor());
    }
}
