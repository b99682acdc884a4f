//! Placeholder substitution against a JSON context.
//!
//! Templates use `{{ dotted.path }}` placeholders resolved against the
//! context map and `{# ... #}` comments which are stripped. Undefined
//! variables are errors, not silent blanks.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::TemplateError;

static VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}")
        .unwrap_or_else(|e| unreachable!("invalid variable pattern: {e}"))
});

static COMMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{#.*?#\}\n?").unwrap_or_else(|e| unreachable!("invalid comment pattern: {e}"))
});

/// Renders a template against the context, substituting every
/// placeholder.
pub fn render_str(
    template: &str,
    context: &Map<String, Value>,
) -> Result<String, TemplateError> {
    let stripped = COMMENT_PATTERN.replace_all(template, "");

    let mut output = String::with_capacity(stripped.len());
    let mut last_end = 0;
    for capture in VARIABLE_PATTERN.captures_iter(&stripped) {
        let whole = capture.get(0).ok_or_else(|| TemplateError::Render {
            reason: "placeholder match without extent".to_string(),
        })?;
        let variable = capture.get(1).ok_or_else(|| TemplateError::Render {
            reason: "placeholder match without name".to_string(),
        })?;

        let value = lookup(context, variable.as_str()).ok_or_else(|| {
            TemplateError::UndefinedVariable {
                variable: variable.as_str().to_string(),
            }
        })?;

        output.push_str(&stripped[last_end..whole.start()]);
        output.push_str(&render_value(value));
        last_end = whole.end();
    }
    output.push_str(&stripped[last_end..]);

    Ok(output)
}

/// Names of all placeholders in a template, sorted and deduplicated.
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut variables: Vec<String> = VARIABLE_PATTERN
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    variables.sort();
    variables.dedup();
    variables
}

/// Resolves a dotted path like `changes.summary` in the context.
fn lookup<'a>(context: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Renders one context value as prompt text.
///
/// File-change objects and lists of them become bullet lines; nulls
/// render empty.
fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_array_item)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => render_object(value),
    }
}

fn render_array_item(item: &Value) -> String {
    match item {
        Value::Object(_) => format!("- {}", render_object(item)),
        other => format!("- {}", render_value(other)),
    }
}

fn render_object(value: &Value) -> String {
    // A file-change record renders as "path (type, +a/-d)"; anything
    // else falls back to compact JSON.
    if let (Some(Value::String(path)), Some(Value::String(change_type))) =
        (value.get("path"), value.get("change_type"))
    {
        let added = value.get("lines_added").and_then(Value::as_u64).unwrap_or(0);
        let deleted = value
            .get("lines_deleted")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        return format!("{path} ({change_type}, +{added}/-{deleted})");
    }
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "changes".to_string(),
            json!({
                "summary": "Fix parser bug",
                "scope": null,
                "lines_added": 12,
                "affected_files": [
                    {"path": "src/parser.rs", "change_type": "modified",
                     "lines_added": 10, "lines_deleted": 2},
                ],
            }),
        );
        map.insert("base_branch".to_string(), json!("main"));
        map
    }

    #[test]
    fn substitutes_dotted_paths() {
        let rendered =
            render_str("Summary: {{ changes.summary }} onto {{ base_branch }}", &context())
                .expect("render");
        assert_eq!(rendered, "Summary: Fix parser bug onto main");
    }

    #[test]
    fn null_renders_empty() {
        let rendered = render_str("scope=[{{ changes.scope }}]", &context()).expect("render");
        assert_eq!(rendered, "scope=[]");
    }

    #[test]
    fn numbers_render_plainly() {
        let rendered = render_str("{{ changes.lines_added }} lines", &context()).expect("render");
        assert_eq!(rendered, "12 lines");
    }

    #[test]
    fn file_lists_render_as_bullets() {
        let rendered = render_str("{{ changes.affected_files }}", &context()).expect("render");
        assert_eq!(rendered, "- src/parser.rs (modified, +10/-2)");
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = render_str("{{ nope.missing }}", &context()).expect_err("must fail");
        assert!(matches!(
            err,
            TemplateError::UndefinedVariable { ref variable } if variable == "nope.missing"
        ));
    }

    #[test]
    fn comments_are_stripped() {
        let rendered =
            render_str("{# description: test #}body {{ base_branch }}", &context())
                .expect("render");
        assert_eq!(rendered, "body main");
    }

    #[test]
    fn extract_variables_sorted_unique() {
        let variables =
            extract_variables("{{ b }} {{ a.x }} {{ b }}");
        assert_eq!(variables, vec!["a.x", "b"]);
    }
}
