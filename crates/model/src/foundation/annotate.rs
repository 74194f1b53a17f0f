//! Human-readable rendering of a failed input.
//!
//! The input is printed as indented JSON. Each failing key gets its detail
//! numbers appended (`"a" [1]: 10`), absent keys are listed as
//! `"b" [2]: -- missing --`, array items get their numbers after the element,
//! and the numbered messages follow.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::error::ValidationError;
use super::state::PathSegment;
use crate::value::{Value, format_number, quote};

const RED: &str = "\u{1b}[31m";
const RED_BG: &str = "\u{1b}[41m";
const END: &str = "\u{1b}[0m";

enum Mark {
    Error(Vec<usize>),
    Missing(usize),
}

/// Marks keyed by the path of the container that holds the marked entry.
type Marks = HashMap<Vec<String>, IndexMap<String, Mark>>;

struct Palette {
    red: &'static str,
    red_bg: &'static str,
    end: &'static str,
}

pub(crate) fn annotate(error: &ValidationError, strip_colors: bool) -> String {
    let palette = if strip_colors {
        Palette { red: "", red_bg: "", end: "" }
    } else {
        Palette { red: RED, red_bg: RED_BG, end: END }
    };

    let details = error.details();
    let Some(first) = details.first() else {
        return error.message().to_owned();
    };

    let object = match error.object() {
        Some(Value::Null) => Value::object(),
        Some(value @ (Value::Object(_) | Value::Array(_))) => value.clone(),
        _ => return first.message.clone(),
    };

    let mut marks = Marks::new();
    for (index, detail) in details.iter().enumerate().rev() {
        let pos = index + 1;
        let mut segments: Vec<String> = detail.path.iter().map(PathSegment::to_string).collect();
        if segments.is_empty() {
            match detail.context.get("label").and_then(Value::as_str) {
                Some(label) => segments.push(label.to_owned()),
                None => continue,
            }
        }

        let mut container = &object;
        let mut at = Vec::new();
        for (depth, segment) in segments.iter().enumerate() {
            let child = container.get(segment);
            let last = depth + 1 == segments.len();
            match child {
                Some(next @ (Value::Object(_) | Value::Array(_))) if !last => {
                    at.push(segment.clone());
                    container = next;
                }
                Some(_) => {
                    let entries = marks.entry(at).or_default();
                    match entries.entry(segment.clone()).or_insert_with(|| Mark::Error(Vec::new())) {
                        Mark::Error(positions) => positions.push(pos),
                        Mark::Missing(_) => {}
                    }
                    break;
                }
                None => {
                    if container.is_object() {
                        marks
                            .entry(at)
                            .or_default()
                            .entry(segment.clone())
                            .or_insert(Mark::Missing(pos));
                    }
                    break;
                }
            }
        }
    }

    let mut out = String::new();
    let mut path = Vec::new();
    write_value(&mut out, &object, 0, &mut path, &marks, &palette);

    out.push('\n');
    out.push_str(palette.red);
    for (index, detail) in details.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}", index + 1, detail.message));
    }
    out.push_str(palette.end);
    out
}

fn positions(list: &[usize]) -> String {
    let mut sorted = list.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn write_value(
    out: &mut String,
    value: &Value,
    indent: usize,
    path: &mut Vec<String>,
    marks: &Marks,
    palette: &Palette,
) {
    let pad = " ".repeat(indent + 2);
    let close = " ".repeat(indent);
    let here = marks.get(path.as_slice());

    match value {
        Value::Object(map) => {
            let mut lines = Vec::new();
            for (key, child) in map {
                if here.is_some_and(|m| m.contains_key(key)) {
                    continue;
                }
                path.push(key.clone());
                let mut text = String::new();
                write_value(&mut text, child, indent + 2, path, marks, palette);
                path.pop();
                lines.push(format!("{pad}{}: {text}", quote(key)));
            }
            for (key, mark) in here.into_iter().flatten() {
                match mark {
                    Mark::Error(list) => {
                        let Some(child) = map.get(key) else { continue };
                        path.push(key.clone());
                        let mut text = String::new();
                        write_value(&mut text, child, indent + 2, path, marks, palette);
                        path.pop();
                        lines.push(format!(
                            "{pad}{} {}[{}]{}: {text}",
                            quote(key),
                            palette.red,
                            positions(list),
                            palette.end
                        ));
                    }
                    Mark::Missing(pos) => lines.push(format!(
                        "{pad}{}{}{}{} [{pos}]: -- missing --{}",
                        palette.red_bg,
                        quote(key),
                        palette.end,
                        palette.red,
                        palette.end
                    )),
                }
            }
            if lines.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str(&format!("{{\n{}\n{close}}}", lines.join(",\n")));
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            let mut lines = Vec::new();
            for (index, item) in items.iter().enumerate() {
                let key = index.to_string();
                let comma = if index + 1 < items.len() { "," } else { "" };
                path.push(key.clone());
                let mut text = String::new();
                write_value(&mut text, item, indent + 2, path, marks, palette);
                path.pop();
                let line = match here.and_then(|m| m.get(&key)) {
                    Some(Mark::Error(list)) => {
                        let marker = format!("{}[{}]{}", palette.red, positions(list), palette.end);
                        match text.split_once('\n') {
                            Some((head, rest)) => format!("{pad}{head} {marker}\n{rest}{comma}"),
                            None => format!("{pad}{text}{comma} {marker}"),
                        }
                    }
                    _ => format!("{pad}{text}{comma}"),
                };
                lines.push(line);
            }
            out.push_str(&format!("[\n{}\n{close}]", lines.join("\n")));
        }
        Value::Number(n) => out.push_str(&format_number(*n)),
        Value::Function(f) => out.push_str(&f.to_string()),
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::error::{Context, Report};
    use crate::foundation::state::Path;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use smallvec::smallvec;
    use std::borrow::Cow;

    fn report(code: &'static str, message: &str, path: Path) -> Report {
        let mut context = Context::new();
        context.insert("label".to_owned(), Value::from("value"));
        Report {
            code: Cow::Borrowed(code),
            message: message.to_owned(),
            path,
            context,
            reasons: Vec::new(),
            replacement: None,
        }
    }

    #[test]
    fn marks_errors_and_missing_keys() {
        let object = Value::from(json!({ "a": 10, "c": "x" }));
        let error = ValidationError::from_reports(
            &[
                report("number.max", "\"a\" must be less than or equal to 3", smallvec!["a".into()]),
                report("any.required", "\"b\" is required", smallvec!["b".into()]),
            ],
            Some(object),
        );

        let expected = [
            "{",
            "  \"c\": \"x\",",
            "  \"b\" [2]: -- missing --,",
            "  \"a\" [1]: 10",
            "}",
            "",
            "[1] \"a\" must be less than or equal to 3",
            "[2] \"b\" is required",
        ]
        .join("\n");
        assert_eq!(error.annotate(true), expected);
    }

    #[test]
    fn marks_array_items() {
        let object = Value::from(json!({ "list": [1, "x"] }));
        let error = ValidationError::from_reports(
            &[report(
                "number.base",
                "\"1\" must be a number",
                smallvec!["list".into(), PathSegment::Index(1)],
            )],
            Some(object),
        );

        let expected = [
            "{",
            "  \"list\": [",
            "    1,",
            "    \"x\" [1]",
            "  ]",
            "}",
            "",
            "[1] \"1\" must be a number",
        ]
        .join("\n");
        assert_eq!(error.annotate(true), expected);
    }

    #[test]
    fn scalars_return_first_message() {
        let error = ValidationError::from_reports(
            &[report("number.base", "\"value\" must be a number", Path::new())],
            Some(Value::from("x")),
        );
        assert_eq!(error.annotate(true), "\"value\" must be a number");
    }

    #[test]
    fn colors_wrap_markers() {
        let error = ValidationError::from_reports(
            &[report("any.required", "\"b\" is required", smallvec!["b".into()])],
            Some(Value::object()),
        );
        let annotated = error.annotate(false);
        assert!(annotated.contains("\u{1b}[41m\"b\"\u{1b}[0m\u{1b}[31m [1]: -- missing --\u{1b}[0m"));
        assert!(annotated.ends_with("[1] \"b\" is required\u{1b}[0m"));
    }
}
