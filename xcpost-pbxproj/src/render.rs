//! Xcode-style serializer.
//!
//! Output follows the layout Xcode itself writes: tab indentation, the `objects`
//! dictionary grouped into `/* Begin <isa> section */` blocks sorted by isa and then
//! by identifier, and build files / file references on a single line. Rendering is
//! deterministic, so rendering a parsed rendering reproduces it byte for byte.

use crate::value::{Dict, Value};

const HEADER: &str = "// !$*UTF8*$!\n";

/// Object kinds Xcode writes on one line.
const INLINE_ISAS: &[&str] = &["PBXBuildFile", "PBXFileReference"];

pub fn render_document(root: &Dict) -> String {
    let mut out = String::from(HEADER);
    out.push_str("{\n");
    for (key, value) in root.iter() {
        indent(&mut out, 1);
        write_string(&mut out, key);
        out.push_str(" = ");
        match value {
            Value::Dict(objects) if key == "objects" => write_objects(&mut out, objects),
            other => write_value(&mut out, other, 1),
        }
        out.push_str(";\n");
    }
    out.push_str("}\n");
    out
}

fn write_objects(out: &mut String, objects: &Dict) {
    let mut sorted: Vec<(&str, &str, &Value)> = objects
        .iter()
        .map(|(id, obj)| {
            let isa = obj.as_dict().and_then(|d| d.get_str("isa")).unwrap_or("");
            (isa, id, obj)
        })
        .collect();
    sorted.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    out.push_str("{\n");
    let mut current: Option<&str> = None;
    for (isa, id, obj) in sorted {
        if current != Some(isa) {
            if let Some(prev) = current.filter(|p| !p.is_empty()) {
                out.push_str(&format!("/* End {prev} section */\n"));
            }
            out.push('\n');
            if !isa.is_empty() {
                out.push_str(&format!("/* Begin {isa} section */\n"));
            }
            current = Some(isa);
        }
        indent(out, 2);
        write_string(out, id);
        out.push_str(" = ");
        if INLINE_ISAS.contains(&isa) {
            write_inline(out, obj);
        } else {
            write_value(out, obj, 2);
        }
        out.push_str(";\n");
    }
    if let Some(prev) = current.filter(|p| !p.is_empty()) {
        out.push_str(&format!("/* End {prev} section */\n"));
    }
    indent(out, 1);
    out.push('}');
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::String(s) => write_string(out, s),
        Value::Data(hex) => {
            out.push('<');
            out.push_str(hex);
            out.push('>');
        }
        Value::Array(items) => {
            out.push_str("(\n");
            for item in items {
                indent(out, depth + 1);
                write_value(out, item, depth + 1);
                out.push_str(",\n");
            }
            indent(out, depth);
            out.push(')');
        }
        Value::Dict(dict) => {
            out.push_str("{\n");
            for (key, item) in dict.iter() {
                indent(out, depth + 1);
                write_string(out, key);
                out.push_str(" = ");
                write_value(out, item, depth + 1);
                out.push_str(";\n");
            }
            indent(out, depth);
            out.push('}');
        }
    }
}

fn write_inline(out: &mut String, value: &Value) {
    match value {
        Value::Array(items) => {
            out.push('(');
            for item in items {
                write_inline(out, item);
                out.push_str(", ");
            }
            out.push(')');
        }
        Value::Dict(dict) => {
            out.push('{');
            for (key, item) in dict.iter() {
                write_string(out, key);
                out.push_str(" = ");
                write_inline(out, item);
                out.push_str("; ");
            }
            out.push('}');
        }
        other => write_value(out, other, 0),
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

/// Whether `s` can be written without quotes and read back unchanged.
pub(crate) fn is_bare_safe(s: &str) -> bool {
    !s.is_empty()
        && !s.contains("//")
        && !s.contains("/*")
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.'))
}

pub(crate) fn write_string(out: &mut String, s: &str) {
    if is_bare_safe(s) {
        out.push_str(s);
        return;
    }
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}
