//! Path-based file classification.
//!
//! All functions here are pure and look only at the path string: the same
//! path always classifies the same way regardless of change kind or
//! content.

use std::sync::LazyLock;

use regex::Regex;

use crate::git::change::{ChangeKind, FileChange};

/// Ratio of added to removed lines (or vice versa) that makes a change
/// "major" in its file description.
const MAJOR_CHANGE_RATIO: usize = 3;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("(?i){p}")).unwrap_or_else(|e| {
                unreachable!("invalid builtin classification pattern {p}: {e}")
            })
        })
        .collect()
}

static TEST_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"test_.*\.py$",
        r".*_test\.(py|go|rs)$",
        r".*\.test\.(js|ts)$",
        r".*\.spec\.(js|ts)$",
        r"tests?/.*",
        r"spec/.*",
        r"__tests__/.*",
    ])
});

static CONFIG_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r".*\.config\.(js|ts|json|yaml|yml)$",
        r".*\.env.*",
        r"Dockerfile.*",
        r".*\.ini$",
        r".*\.cfg$",
        r".*\.lock$",
        r"pyproject\.toml$",
        r"Cargo\.toml$",
        r"go\.mod$",
        r"package\.json$",
        r"requirements.*\.txt$",
        r"Gemfile$",
        r"pom\.xml$",
    ])
});

static DOCS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r".*\.md$",
        r".*\.rst$",
        r".*\.txt$",
        r"docs?/.*",
        r"README.*",
        r"CHANGELOG.*",
        r"LICENSE.*",
    ])
});

/// Extension to language name, lowercase on both sides.
const LANGUAGE_TABLE: [(&str, &str); 23] = [
    ("py", "python"),
    ("js", "javascript"),
    ("ts", "typescript"),
    ("java", "java"),
    ("cpp", "cpp"),
    ("c", "c"),
    ("h", "c"),
    ("rs", "rust"),
    ("go", "go"),
    ("php", "php"),
    ("rb", "ruby"),
    ("swift", "swift"),
    ("kt", "kotlin"),
    ("cs", "csharp"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("xml", "xml"),
    ("sql", "sql"),
    ("sh", "shell"),
];

/// Whether the path follows a test-file convention.
pub fn is_test_file(path: &str) -> bool {
    TEST_PATTERNS.iter().any(|re| re.is_match(path))
}

/// Whether the path is a build, dependency or environment manifest.
pub fn is_config_file(path: &str) -> bool {
    CONFIG_PATTERNS.iter().any(|re| re.is_match(path))
}

/// Whether the path follows a documentation convention.
pub fn is_docs_file(path: &str) -> bool {
    DOCS_PATTERNS.iter().any(|re| re.is_match(path))
}

/// Programming language implied by the file extension, if known.
pub fn detect_language(path: &str) -> Option<&'static str> {
    if !path.contains('.') {
        return None;
    }
    let extension = path.rsplit('.').next()?.to_lowercase();
    LANGUAGE_TABLE
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| *language)
}

/// Short display description for a file change.
///
/// Role flags take precedence over size-based descriptions.
pub fn describe_change(
    change: &FileChange,
    is_test: bool,
    is_config: bool,
    is_docs: bool,
) -> &'static str {
    if is_test {
        "Test file"
    } else if is_config {
        "Configuration file"
    } else if is_docs {
        "Documentation"
    } else if change.change_kind == ChangeKind::Added {
        "New file"
    } else if change.lines_added > change.lines_removed * MAJOR_CHANGE_RATIO {
        "Major additions"
    } else if change.lines_removed > change.lines_added * MAJOR_CHANGE_RATIO {
        "Major deletions"
    } else {
        "Updated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(kind: ChangeKind, added: usize, removed: usize) -> FileChange {
        FileChange {
            path: "src/module.rs".to_string(),
            change_kind: kind,
            lines_added: added,
            lines_removed: removed,
            content_preview: String::new(),
            old_path: None,
        }
    }

    // ── is_test_file ───────────────────────────────────────────────

    #[test]
    fn test_file_python_prefix() {
        assert!(is_test_file("test_analyzer.py"));
    }

    #[test]
    fn test_file_suffix_conventions() {
        assert!(is_test_file("analyzer_test.rs"));
        assert!(is_test_file("widget.test.js"));
        assert!(is_test_file("widget.spec.ts"));
    }

    #[test]
    fn test_file_directories() {
        assert!(is_test_file("tests/integration.rs"));
        assert!(is_test_file("src/__tests__/app.js"));
        assert!(is_test_file("spec/models/user_spec.rb"));
    }

    #[test]
    fn test_file_case_insensitive() {
        assert!(is_test_file("Tests/Helper.cs"));
    }

    #[test]
    fn not_test_file() {
        assert!(!is_test_file("src/analyzer.rs"));
    }

    // ── is_config_file ─────────────────────────────────────────────

    #[test]
    fn config_file_manifests() {
        assert!(is_config_file("Cargo.toml"));
        assert!(is_config_file("package.json"));
        assert!(is_config_file("pyproject.toml"));
        assert!(is_config_file("requirements-dev.txt"));
    }

    #[test]
    fn config_file_lockfiles_and_env() {
        assert!(is_config_file("Cargo.lock"));
        assert!(is_config_file(".env.production"));
        assert!(is_config_file("Dockerfile.release"));
    }

    #[test]
    fn not_config_file() {
        assert!(!is_config_file("src/main.rs"));
    }

    // ── is_docs_file ───────────────────────────────────────────────

    #[test]
    fn docs_file_conventions() {
        assert!(is_docs_file("README.md"));
        assert!(is_docs_file("docs/guide.rst"));
        assert!(is_docs_file("CHANGELOG"));
        assert!(is_docs_file("LICENSE-MIT"));
    }

    #[test]
    fn docs_and_test_are_not_exclusive() {
        // A markdown test plan inside tests/ carries both roles.
        let path = "tests/plan.md";
        assert!(is_docs_file(path));
        assert!(is_test_file(path));
    }

    #[test]
    fn not_docs_file() {
        assert!(!is_docs_file("src/main.rs"));
    }

    // ── detect_language ────────────────────────────────────────────

    #[test]
    fn language_from_extension() {
        assert_eq!(detect_language("src/main.rs"), Some("rust"));
        assert_eq!(detect_language("app/models.py"), Some("python"));
        assert_eq!(detect_language("deploy.yml"), Some("yaml"));
    }

    #[test]
    fn language_unknown_or_missing_extension() {
        assert_eq!(detect_language("Makefile"), None);
        assert_eq!(detect_language("data.parquet"), None);
    }

    #[test]
    fn language_extension_is_case_insensitive() {
        assert_eq!(detect_language("Legacy.PY"), Some("python"));
    }

    // ── describe_change ────────────────────────────────────────────

    #[test]
    fn description_role_precedence() {
        let fc = change(ChangeKind::Added, 100, 0);
        assert_eq!(describe_change(&fc, true, true, true), "Test file");
        assert_eq!(describe_change(&fc, false, true, true), "Configuration file");
        assert_eq!(describe_change(&fc, false, false, true), "Documentation");
        assert_eq!(describe_change(&fc, false, false, false), "New file");
    }

    #[test]
    fn description_major_additions_and_deletions() {
        let fc = change(ChangeKind::Modified, 40, 10);
        assert_eq!(describe_change(&fc, false, false, false), "Major additions");

        let fc = change(ChangeKind::Modified, 10, 40);
        assert_eq!(describe_change(&fc, false, false, false), "Major deletions");
    }

    #[test]
    fn description_default_updated() {
        let fc = change(ChangeKind::Modified, 10, 8);
        assert_eq!(describe_change(&fc, false, false, false), "Updated");
    }

    // ── property tests ────────────────────────────────────────────

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn classification_deterministic(path in ".*") {
                prop_assert_eq!(is_test_file(&path), is_test_file(&path));
                prop_assert_eq!(is_config_file(&path), is_config_file(&path));
                prop_assert_eq!(is_docs_file(&path), is_docs_file(&path));
                prop_assert_eq!(detect_language(&path), detect_language(&path));
            }

            #[test]
            fn tests_directory_always_classifies(name in "[a-z][a-z0-9_]{0,20}") {
                let path = format!("tests/{name}.rs");
                prop_assert!(is_test_file(&path));
            }
        }
    }
}
