//! Templates compiled into the binary, used when no user template
//! shadows them.

/// Builtin commit message templates.
pub const COMMIT_TEMPLATES: [(&str, &str); 3] = [
    ("conventional", CONVENTIONAL),
    ("minimal", MINIMAL),
    ("descriptive", DESCRIPTIVE),
];

/// Builtin PR description templates.
pub const PR_TEMPLATES: [(&str, &str); 3] = [
    ("github", GITHUB),
    ("gitlab", GITLAB),
    ("detailed", DETAILED),
];

const CONVENTIONAL: &str = "\
{# description: Conventional commit format (type(scope): description) #}
Generate a commit message for the following staged changes.

Repository: {{ repository.name }}
Branch: {{ repository.branch }}
Change summary: {{ changes.summary }}
Scope hint: {{ changes.scope }}
Statistics: +{{ changes.lines_added }} -{{ changes.lines_deleted }} lines

Files changed:
{{ changes.affected_files }}

Write a single-line conventional commit message of the form
type(scope): description, where type is one of feat, fix, docs, style,
refactor, test, chore. Use the imperative mood and keep the first line
under 72 characters. Return only the commit message.
";

const MINIMAL: &str = "\
{# description: Short single-line commit message #}
Generate a commit message for these changes.

Change summary: {{ changes.summary }}
Files changed:
{{ changes.affected_files }}

Keep it under 50 characters, present tense, no trailing period.
Return only the commit message.
";

const DESCRIPTIVE: &str = "\
{# description: Subject line plus explanatory body #}
Generate a commit message with a subject line and a short body for the
following staged changes.

Repository: {{ repository.name }}
Change summary: {{ changes.summary }}
Statistics: +{{ changes.lines_added }} -{{ changes.lines_deleted }} lines

Files changed:
{{ changes.affected_files }}

Write an imperative subject line under 72 characters, a blank line, then
2-4 sentences explaining what changed and why. Return only the commit
message.
";

const GITHUB: &str = "\
{# description: GitHub pull request description #}
Generate a pull request description for merging {{ head_branch }} into
{{ base_branch }}.

Repository: {{ repository.name }}
Change summary: {{ changes.summary }}
Statistics: +{{ changes.lines_added }} -{{ changes.lines_deleted }} lines
Related issues: {{ changes.related_issues }}

Files changed:
{{ changes.affected_files }}

Use GitHub PR format with ## Summary, ## Changes and ## Testing
sections. Be concrete about what changed; do not invent testing that is
not implied by the changes. Return only the description.
";

const GITLAB: &str = "\
{# description: GitLab merge request description #}
Generate a merge request description for merging {{ head_branch }} into
{{ base_branch }}.

Repository: {{ repository.name }}
Change summary: {{ changes.summary }}

Files changed:
{{ changes.affected_files }}

Use GitLab MR format with ## Summary, ## Changes Made, ## Testing Done
and ## Documentation sections. Return only the description.
";

const DETAILED: &str = "\
{# description: Comprehensive PR description with technical notes #}
Generate a detailed pull request description for merging
{{ head_branch }} into {{ base_branch }}.

Repository: {{ repository.name }}
Change summary: {{ changes.summary }}
Statistics: +{{ changes.lines_added }} -{{ changes.lines_deleted }} lines
Related issues: {{ changes.related_issues }}

Added files:
{{ changes.added_files }}
Modified files:
{{ changes.modified_files }}
Deleted files:
{{ changes.deleted_files }}

Include sections for an executive summary, a detailed breakdown of
changes, technical considerations, testing approach and breaking
changes (if any). Return only the description.
";
