//! Extraction of change data from staged files or branch ranges.

use std::fs;

use git2::{Delta, Diff, DiffFindOptions, DiffOptions, Patch, Status, StatusOptions};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::git::change::{ChangeKind, DiffAnalysis, FileChange};
use crate::git::error::AnalysisError;
use crate::git::repository::GitRepository;

/// Maximum number of changed lines shown in a content preview.
const PREVIEW_MAX_LINES: usize = 5;

/// Maximum characters kept per preview line.
const PREVIEW_MAX_CHARS: usize = 100;

/// Extracts [`DiffAnalysis`] records from a repository.
///
/// Two entry modes: [`staged_changes`](Self::staged_changes) for commit
/// message generation and [`branch_changes`](Self::branch_changes) for PR
/// descriptions.
pub struct GitAnalyzer {
    repo: GitRepository,
    ignore: Option<GlobSet>,
}

impl GitAnalyzer {
    /// Creates an analyzer for the repository containing the current
    /// directory.
    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self {
            repo: GitRepository::discover()?,
            ignore: None,
        })
    }

    /// Creates an analyzer for the repository containing `path`.
    pub fn at_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, AnalysisError> {
        Ok(Self {
            repo: GitRepository::discover_at(path)?,
            ignore: None,
        })
    }

    /// Excludes paths matching any of the glob `patterns` from analysis.
    ///
    /// Invalid globs are skipped with a warning rather than failing the
    /// analyzer.
    pub fn with_ignore_patterns(mut self, patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => warn!("Skipping invalid ignore pattern '{pattern}': {e}"),
            }
        }
        match builder.build() {
            Ok(set) => self.ignore = Some(set),
            Err(e) => warn!("Could not build ignore set: {e}"),
        }
        self
    }

    /// The repository this analyzer reads from.
    pub fn repository(&self) -> &GitRepository {
        &self.repo
    }

    fn is_ignored(&self, path: &str) -> bool {
        self.ignore.as_ref().is_some_and(|set| set.is_match(path))
    }

    /// Analyzes staged changes (index vs. HEAD) for commit generation.
    ///
    /// With `include_untracked`, working-tree files unknown to git are
    /// added as [`ChangeKind::Added`] records. Fails with
    /// [`AnalysisError::NoChangesFound`] when nothing is staged and no
    /// untracked files were requested or found.
    pub fn staged_changes(&self, include_untracked: bool) -> Result<DiffAnalysis, AnalysisError> {
        let git = self.repo.inner();

        // Unborn HEAD diffs against the empty tree.
        let head_tree = git.head().ok().and_then(|head| head.peel_to_tree().ok());

        let mut opts = DiffOptions::new();
        let mut diff = git
            .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut opts))
            .map_err(|e| AnalysisError::git_op("diff", "index", e))?;

        let mut find = DiffFindOptions::new();
        find.renames(true).copies(true);
        diff.find_similar(Some(&mut find))
            .map_err(|e| AnalysisError::git_op("rename detection", "index", e))?;

        let mut file_changes = Vec::new();
        for idx in 0..diff.deltas().len() {
            if let Some(change) = self.staged_record(&diff, idx)? {
                file_changes.push(change);
            }
        }

        if include_untracked {
            file_changes.extend(self.untracked_records()?);
        }

        if file_changes.is_empty() {
            return Err(AnalysisError::NoChangesFound);
        }

        let total_additions = file_changes.iter().map(|fc| fc.lines_added).sum();
        let total_deletions = file_changes.iter().map(|fc| fc.lines_removed).sum();
        let change_summary = summarize_changes(&file_changes);

        let analysis = DiffAnalysis {
            files_changed: file_changes,
            total_additions,
            total_deletions,
            change_summary,
            commit_context: self.commit_context(),
            repository_info: self.repo.metadata(),
        };

        info!(
            file_count = analysis.file_count(),
            total_additions, total_deletions, "Staged changes analyzed"
        );

        Ok(analysis)
    }

    /// Analyzes changes between the current branch and `base_branch` for
    /// PR generation.
    ///
    /// An empty diff is a successful result with the summary
    /// `"No changes found"`, not an error.
    pub fn branch_changes(&self, base_branch: &str) -> Result<DiffAnalysis, AnalysisError> {
        let git = self.repo.inner();

        // Best-effort refresh of the remote ref; stale local refs are
        // usable but worth a notice.
        match git.find_remote("origin") {
            Ok(mut remote) => {
                if let Err(e) = remote.fetch(&[base_branch], None, None) {
                    warn!(
                        "Could not fetch origin/{base_branch}: {e}; \
                         comparing against possibly stale local refs"
                    );
                }
            }
            Err(e) => debug!("No origin remote: {e}"),
        }

        let current_branch = self
            .repo
            .current_branch()
            .unwrap_or_else(|_| "HEAD".to_string());

        // Remote-tracking ref first, local branch as fallback; the same
        // resolved base feeds both the stat pass and the status lookup.
        let (base_ref, base_object) = match git.revparse_single(&format!("origin/{base_branch}")) {
            Ok(object) => (format!("origin/{base_branch}"), object),
            Err(_) => {
                let object = git.revparse_single(base_branch).map_err(|e| {
                    AnalysisError::git_op("revparse", base_branch.to_string(), e)
                })?;
                (base_branch.to_string(), object)
            }
        };

        let base_commit = base_object
            .peel_to_commit()
            .map_err(|e| AnalysisError::git_op("peel", base_ref.clone(), e))?;
        let head_commit = git
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| AnalysisError::git_op("revparse", "HEAD", e))?;

        // Three-dot semantics: diff from the merge base, not the base tip.
        let merge_base = git
            .merge_base(base_commit.id(), head_commit.id())
            .map_err(|e| AnalysisError::git_op("merge-base", base_ref.clone(), e))?;
        let merge_base_tree = git
            .find_commit(merge_base)
            .and_then(|commit| commit.tree())
            .map_err(|e| AnalysisError::git_op("tree lookup", base_ref.clone(), e))?;
        let head_tree = head_commit
            .tree()
            .map_err(|e| AnalysisError::git_op("tree lookup", "HEAD", e))?;

        let mut opts = DiffOptions::new();
        let mut diff = git
            .diff_tree_to_tree(Some(&merge_base_tree), Some(&head_tree), Some(&mut opts))
            .map_err(|e| AnalysisError::git_op("diff", base_ref.clone(), e))?;

        let mut find = DiffFindOptions::new();
        find.renames(true).copies(true);
        diff.find_similar(Some(&mut find))
            .map_err(|e| AnalysisError::git_op("rename detection", base_ref.clone(), e))?;

        let mut commit_context = Map::new();
        commit_context.insert("current_branch".to_string(), json!(current_branch));
        commit_context.insert("base_branch".to_string(), json!(base_branch));

        if diff.deltas().len() == 0 {
            return Ok(DiffAnalysis {
                files_changed: Vec::new(),
                total_additions: 0,
                total_deletions: 0,
                change_summary: "No changes found".to_string(),
                commit_context,
                repository_info: self.repo.metadata(),
            });
        }

        let mut file_changes = Vec::new();
        for idx in 0..diff.deltas().len() {
            if let Some(change) = self.branch_record(&diff, idx)? {
                file_changes.push(change);
            }
        }

        let commit_count = self.count_commits_since(base_commit.id(), head_commit.id());
        commit_context.insert("commit_count".to_string(), json!(commit_count));

        let total_additions = file_changes.iter().map(|fc| fc.lines_added).sum();
        let total_deletions = file_changes.iter().map(|fc| fc.lines_removed).sum();
        let change_summary = summarize_changes(&file_changes);

        let analysis = DiffAnalysis {
            files_changed: file_changes,
            total_additions,
            total_deletions,
            change_summary,
            commit_context,
            repository_info: self.repo.metadata(),
        };

        info!(
            current_branch = %current_branch,
            base_branch = %base_branch,
            file_count = analysis.file_count(),
            total_additions,
            total_deletions,
            "Branch changes analyzed"
        );

        Ok(analysis)
    }

    /// Builds one record from a staged delta; `None` when the path is
    /// ignored.
    fn staged_record(&self, diff: &Diff, idx: usize) -> Result<Option<FileChange>, AnalysisError> {
        let Some(delta) = diff.get_delta(idx) else {
            return Ok(None);
        };

        let path = delta_path(&delta);
        if self.is_ignored(&path) {
            debug!("Ignoring staged change in {path}");
            return Ok(None);
        }

        let change_kind = match delta.status() {
            Delta::Added => ChangeKind::Added,
            Delta::Deleted => ChangeKind::Deleted,
            Delta::Renamed => ChangeKind::Renamed,
            Delta::Copied => ChangeKind::Copied,
            _ => ChangeKind::Modified,
        };

        let old_path = matches!(change_kind, ChangeKind::Renamed | ChangeKind::Copied)
            .then(|| delta.old_file().path())
            .flatten()
            .map(|p| p.to_string_lossy().into_owned());

        let patch_text = patch_text(diff, idx);
        let (lines_added, lines_removed) = count_patch_lines(&patch_text);

        Ok(Some(FileChange {
            path,
            change_kind,
            lines_added,
            lines_removed,
            content_preview: patch_preview(&patch_text),
            old_path,
        }))
    }

    /// Builds one record from a branch-range delta.
    ///
    /// The change kind comes from the delta's status code; codes outside
    /// the documented set fall back to [`ChangeKind::Modified`], matching
    /// the name-status lookup behavior this replaces.
    fn branch_record(&self, diff: &Diff, idx: usize) -> Result<Option<FileChange>, AnalysisError> {
        let Some(delta) = diff.get_delta(idx) else {
            return Ok(None);
        };

        let path = delta_path(&delta);
        if self.is_ignored(&path) {
            debug!("Ignoring branch change in {path}");
            return Ok(None);
        }

        let change_kind =
            ChangeKind::from_code(delta_code(delta.status())).unwrap_or(ChangeKind::Modified);

        let old_path = matches!(change_kind, ChangeKind::Renamed | ChangeKind::Copied)
            .then(|| delta.old_file().path())
            .flatten()
            .map(|p| p.to_string_lossy().into_owned());

        // Binary files carry no countable lines and are recorded as 0/0.
        let (lines_added, lines_removed, content_preview) =
            match Patch::from_diff(diff, idx).ok().flatten() {
                Some(mut patch) => {
                    let (_, additions, deletions) = patch.line_stats().unwrap_or((0, 0, 0));
                    let text = patch
                        .to_buf()
                        .ok()
                        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
                        .unwrap_or_default();
                    (additions, deletions, patch_preview(&text))
                }
                None => (0, 0, String::new()),
            };

        Ok(Some(FileChange {
            path,
            change_kind,
            lines_added,
            lines_removed,
            content_preview,
            old_path,
        }))
    }

    /// Collects untracked working-tree files as added records.
    ///
    /// Files that cannot be read are skipped with a warning.
    fn untracked_records(&self) -> Result<Vec<FileChange>, AnalysisError> {
        let git = self.repo.inner();

        let mut opts = StatusOptions::new();
        opts.include_untracked(true).recurse_untracked_dirs(true);
        let statuses = git
            .statuses(Some(&mut opts))
            .map_err(|e| AnalysisError::git_op("status", "working tree", e))?;

        let root = self.repo.root();
        let mut records = Vec::new();

        for entry in statuses.iter() {
            if !entry.status().contains(Status::WT_NEW) {
                continue;
            }
            let Some(path) = entry.path() else {
                continue;
            };
            if self.is_ignored(path) {
                debug!("Ignoring untracked file {path}");
                continue;
            }

            let content = match fs::read_to_string(root.join(path)) {
                Ok(content) => content,
                Err(e) => {
                    warn!("Could not analyze untracked file {path}: {e}");
                    continue;
                }
            };

            records.push(FileChange {
                path: path.to_string(),
                change_kind: ChangeKind::Added,
                lines_added: content.lines().count(),
                lines_removed: 0,
                content_preview: file_preview(&content),
                old_path: None,
            });
        }

        Ok(records)
    }

    /// Commit context for staged mode: branch plus last commit info.
    fn commit_context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        let branch = self
            .repo
            .current_branch()
            .unwrap_or_else(|_| "HEAD".to_string());
        context.insert("branch".to_string(), json!(branch));

        let (last_commit, author) = self.repo.head_commit_info().unwrap_or_default();
        context.insert("last_commit".to_string(), json!(last_commit));
        context.insert("author".to_string(), json!(author));

        context
    }

    /// Number of commits in `base..head`, zero when the walk fails.
    fn count_commits_since(&self, base: git2::Oid, head: git2::Oid) -> usize {
        let git = self.repo.inner();
        let walk = || -> Result<usize, git2::Error> {
            let mut walker = git.revwalk()?;
            walker.push(head)?;
            walker.hide(base)?;
            Ok(walker.count())
        };
        walk().unwrap_or_else(|e| {
            debug!("Could not count commits: {e}");
            0
        })
    }
}

/// New-side path of a delta, falling back to the old side for deletions.
fn delta_path(delta: &git2::DiffDelta<'_>) -> String {
    delta
        .new_file()
        .path()
        .or_else(|| delta.old_file().path())
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One-character status code for a delta, as git name-status reports it.
fn delta_code(status: Delta) -> char {
    match status {
        Delta::Added => 'A',
        Delta::Deleted => 'D',
        Delta::Modified => 'M',
        Delta::Renamed => 'R',
        Delta::Copied => 'C',
        Delta::Conflicted => 'U',
        Delta::Typechange => 'T',
        _ => '?',
    }
}

/// Renders the patch for one delta to text; empty for binary files.
fn patch_text(diff: &Diff, idx: usize) -> String {
    Patch::from_diff(diff, idx)
        .ok()
        .flatten()
        .and_then(|mut patch| patch.to_buf().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

/// Counts added and removed lines in raw patch text.
///
/// A line counts when it starts with exactly one `+` or `-` followed by
/// another character, which excludes the `+++`/`---` file headers as well
/// as hunk headers and context lines.
pub(crate) fn count_patch_lines(patch: &str) -> (usize, usize) {
    let mut additions = 0;
    let mut deletions = 0;
    for line in patch.lines() {
        match line.as_bytes() {
            [b'+', next, ..] if *next != b'+' => additions += 1,
            [b'-', next, ..] if *next != b'-' => deletions += 1,
            _ => {}
        }
    }
    (additions, deletions)
}

/// Extracts a short preview of changed lines from raw patch text.
pub(crate) fn patch_preview(patch: &str) -> String {
    let mut preview = Vec::new();
    for line in patch.lines() {
        if line.starts_with("@@") || line.starts_with("+++") || line.starts_with("---") {
            continue;
        }
        if (line.starts_with('+') || line.starts_with('-')) && preview.len() < PREVIEW_MAX_LINES {
            preview.push(truncate_chars(line, PREVIEW_MAX_CHARS));
        }
    }
    preview.join("\n")
}

/// First lines of a file's content, for untracked-file previews.
pub(crate) fn file_preview(content: &str) -> String {
    content
        .lines()
        .take(PREVIEW_MAX_LINES)
        .map(|line| truncate_chars(line, PREVIEW_MAX_CHARS))
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(line: &str, max: usize) -> String {
    line.chars().take(max).collect()
}

/// Renders a change summary like `"3 files (2 modified, 1 added)"`.
///
/// Zero categories are omitted; only added/modified/deleted/renamed are
/// reported.
pub(crate) fn summarize_changes(file_changes: &[FileChange]) -> String {
    if file_changes.is_empty() {
        return "No changes".to_string();
    }

    let count_of = |kind: ChangeKind| {
        file_changes
            .iter()
            .filter(|fc| fc.change_kind == kind)
            .count()
    };

    let mut parts = Vec::new();
    for (kind, label) in [
        (ChangeKind::Added, "added"),
        (ChangeKind::Modified, "modified"),
        (ChangeKind::Deleted, "deleted"),
        (ChangeKind::Renamed, "renamed"),
    ] {
        let count = count_of(kind);
        if count > 0 {
            parts.push(format!("{count} {label}"));
        }
    }

    let file_count = file_changes.len();
    if file_count == 1 {
        format!("1 file {}", parts.join(", "))
    } else {
        format!("{file_count} files ({})", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PATCH: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,4 +1,5 @@
 use std::fmt;
-fn old_helper() {}
+fn new_helper() {}
+fn another_helper() {}
 fn unchanged() {}
";

    // ── count_patch_lines ──────────────────────────────────────────

    #[test]
    fn counts_additions_and_deletions() {
        assert_eq!(count_patch_lines(SAMPLE_PATCH), (2, 1));
    }

    #[test]
    fn excludes_file_headers_from_counts() {
        let patch = "--- a/x\n+++ b/x\n+real\n-gone\n";
        assert_eq!(count_patch_lines(patch), (1, 1));
    }

    #[test]
    fn context_and_hunk_lines_do_not_count() {
        let patch = "@@ -1,2 +1,2 @@\n context line\n+added\n";
        assert_eq!(count_patch_lines(patch), (1, 0));
    }

    #[test]
    fn empty_patch_counts_nothing() {
        assert_eq!(count_patch_lines(""), (0, 0));
    }

    // ── previews ───────────────────────────────────────────────────

    #[test]
    fn preview_skips_headers_and_keeps_changed_lines() {
        let preview = patch_preview(SAMPLE_PATCH);
        assert_eq!(
            preview,
            "-fn old_helper() {}\n+fn new_helper() {}\n+fn another_helper() {}"
        );
    }

    #[test]
    fn preview_caps_at_five_lines() {
        let patch = "+1\n+2\n+3\n+4\n+5\n+6\n+7\n";
        let preview = patch_preview(patch);
        assert_eq!(preview.lines().count(), 5);
    }

    #[test]
    fn preview_truncates_long_lines() {
        let long = format!("+{}", "x".repeat(300));
        let preview = patch_preview(&long);
        assert_eq!(preview.chars().count(), 100);
    }

    #[test]
    fn file_preview_takes_first_lines() {
        let content = "one\ntwo\nthree\nfour\nfive\nsix\n";
        assert_eq!(file_preview(content), "one\ntwo\nthree\nfour\nfive");
    }

    // ── summarize_changes ──────────────────────────────────────────

    fn change(kind: ChangeKind) -> FileChange {
        FileChange {
            path: "file".to_string(),
            change_kind: kind,
            lines_added: 0,
            lines_removed: 0,
            content_preview: String::new(),
            old_path: None,
        }
    }

    #[test]
    fn summary_single_file() {
        let files = vec![change(ChangeKind::Modified)];
        assert_eq!(summarize_changes(&files), "1 file 1 modified");
    }

    #[test]
    fn summary_multiple_kinds_omits_zero_categories() {
        let files = vec![
            change(ChangeKind::Added),
            change(ChangeKind::Added),
            change(ChangeKind::Modified),
        ];
        assert_eq!(summarize_changes(&files), "3 files (2 added, 1 modified)");
    }

    #[test]
    fn summary_empty_set() {
        assert_eq!(summarize_changes(&[]), "No changes");
    }

    // ── delta codes ────────────────────────────────────────────────

    #[test]
    fn delta_codes_map_to_change_kinds() {
        assert_eq!(
            ChangeKind::from_code(delta_code(Delta::Added)),
            Some(ChangeKind::Added)
        );
        assert_eq!(
            ChangeKind::from_code(delta_code(Delta::Conflicted)),
            Some(ChangeKind::Unmerged)
        );
        // Typechange has no ChangeKind; callers fall back to Modified.
        assert_eq!(ChangeKind::from_code(delta_code(Delta::Typechange)), None);
    }
}
