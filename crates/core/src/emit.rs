//! Starlark emission and in-place BUILD file updates
//!
//! Existing text is only touched where a generated declaration replaces or
//! deletes a rule, or where a load statement is missing. Everything else,
//! comments and hand-written rules included, is kept byte for byte.

use std::collections::BTreeSet;

use crate::bazel::BuildFileContents;
use crate::engine::GenerateResult;
use crate::generate::GeneratedDeclaration;

const INDENT: &str = "    ";
const PUBLIC_VISIBILITY: &str = "//visibility:public";

/// The `.bzl` file that defines `kind`
pub fn load_label(load_prefix: &str, kind: &str) -> String {
    format!("{}:{}.bzl", load_prefix, kind)
}

pub fn render_load(load_prefix: &str, kind: &str) -> String {
    format!("load(\"{}\", \"{}\")", load_label(load_prefix, kind), kind)
}

/// Render one declaration as a Starlark call
pub fn render_declaration(declaration: &GeneratedDeclaration) -> String {
    let mut out = format!("{}(\n", declaration.kind);
    push_string_attr(&mut out, "name", &declaration.name);
    push_list_attr(&mut out, "srcs", &declaration.srcs);
    if let Some(proto) = &declaration.proto {
        push_string_attr(&mut out, "proto", &proto.rel_to(&declaration.package));
    }
    if !declaration.deps.is_empty() {
        push_list_attr(&mut out, "deps", &declaration.deps);
    }
    push_list_attr(&mut out, "visibility", &[PUBLIC_VISIBILITY.to_string()]);
    out.push(')');
    out
}

fn push_string_attr(out: &mut String, name: &str, value: &str) {
    out.push_str(&format!("{}{} = {},\n", INDENT, name, quote(value)));
}

fn push_list_attr(out: &mut String, name: &str, values: &[String]) {
    match values {
        [] => out.push_str(&format!("{}{} = [],\n", INDENT, name)),
        [value] => out.push_str(&format!("{}{} = [{}],\n", INDENT, name, quote(value))),
        _ => {
            out.push_str(&format!("{}{} = [\n", INDENT, name));
            for value in values {
                out.push_str(&format!("{}{}{},\n", INDENT, INDENT, quote(value)));
            }
            out.push_str(&format!("{}],\n", INDENT));
        }
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

struct Edit {
    start: usize,
    end: usize,
    text: String,
}

/// Apply `result` to the BUILD file text `original`, whose parsed form is
/// `existing`. The output always ends with a single newline unless empty.
pub fn update_build_file(
    original: &str,
    existing: &BuildFileContents,
    result: &GenerateResult,
    load_prefix: &str,
) -> String {
    let mut edits = Vec::new();
    let mut appended = Vec::new();

    for declaration in &result.generated {
        let rendered = render_declaration(declaration);
        match existing.rules.iter().find(|rule| rule.name == declaration.name) {
            Some(rule) => edits.push(Edit {
                start: rule.span.start,
                end: rule.span.end,
                text: rendered,
            }),
            None => appended.push(rendered),
        }
    }

    for empty in &result.empty {
        if let Some(rule) = existing
            .rules
            .iter()
            .find(|rule| rule.name == empty.name && rule.rule_type == empty.kind)
        {
            let trailing = original[rule.span.end..]
                .find(|c: char| !c.is_whitespace())
                .unwrap_or(original.len() - rule.span.end);
            edits.push(Edit {
                start: rule.span.start,
                end: rule.span.end + trailing,
                text: String::new(),
            });
        }
    }

    let missing: BTreeSet<&str> = result
        .generated
        .iter()
        .map(|d| d.kind.as_str())
        .filter(|kind| !existing.loads_symbol(kind))
        .collect();
    if !missing.is_empty() {
        let loads: Vec<String> = missing.iter().map(|kind| render_load(load_prefix, kind)).collect();
        let edit = match existing.loads.iter().map(|load| load.span.end).max() {
            Some(end) => Edit {
                start: end,
                end,
                text: format!("\n{}", loads.join("\n")),
            },
            None => Edit {
                start: 0,
                end: 0,
                text: format!("{}\n\n", loads.join("\n")),
            },
        };
        edits.push(edit);
    }

    edits.sort_by(|a, b| b.start.cmp(&a.start).then(b.end.cmp(&a.end)));
    let mut content = original.to_string();
    for edit in edits {
        content.replace_range(edit.start..edit.end, &edit.text);
    }

    let mut content = content.trim_end().to_string();
    for rendered in appended {
        if !content.is_empty() {
            content.push_str("\n\n");
        }
        content.push_str(&rendered);
    }
    if !content.is_empty() {
        content.push('\n');
    }
    content
}
