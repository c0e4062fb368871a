//! Generic rendering of extracted-data trees
//!
//! Extraction payloads have no fixed schema, so they are rendered as a
//! depth-bounded indented tree rather than through typed accessors.

use serde_json::Value;

/// Maximum nesting depth rendered before eliding
const MAX_DEPTH: usize = 6;

/// Indentation per nesting level
const INDENT: &str = "  ";

/// Render an arbitrary extraction payload as indented display lines.
#[must_use]
pub fn format_extracted(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 1, MAX_DEPTH);
    // drop the trailing newline for embedding in log lines
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize, budget: usize) {
    if budget == 0 {
        push_line(out, depth, "…");
        return;
    }

    match value {
        Value::Null => push_line(out, depth, "(none)"),
        Value::Bool(b) => push_line(out, depth, &b.to_string()),
        Value::Number(n) => push_line(out, depth, &n.to_string()),
        Value::String(s) => push_line(out, depth, s),
        Value::Array(items) => {
            if items.is_empty() {
                push_line(out, depth, "(empty list)");
                return;
            }
            for item in items {
                if item.is_object() || item.is_array() {
                    push_line(out, depth, "-");
                    write_value(out, item, depth + 1, budget - 1);
                } else {
                    push_line(out, depth, &format!("- {}", scalar_text(item)));
                }
            }
        }
        Value::Object(map) => {
            if map.is_empty() {
                push_line(out, depth, "(empty)");
                return;
            }
            for (key, item) in map {
                if item.is_object() || item.is_array() {
                    push_line(out, depth, &format!("{}:", label(key)));
                    write_value(out, item, depth + 1, budget - 1);
                } else {
                    push_line(out, depth, &format!("{}: {}", label(key), scalar_text(item)));
                }
            }
        }
    }
}

fn push_line(out: &mut String, depth: usize, text: &str) {
    out.push_str(&INDENT.repeat(depth));
    out.push_str(text);
    out.push('\n');
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turn a snake_case key into a display label
fn label(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    for word in key.split('_') {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => {
                words.push(first.to_uppercase().collect::<String>() + chars.as_str());
            }
            None => continue,
        }
    }
    if words.is_empty() {
        key.to_string()
    } else {
        words.join(" ")
    }
}
