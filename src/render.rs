//! Entry rendering: one validated record into one self-contained HTML block.
//!
//! Source records carry loosely-typed fields (`phonetic`, `summary`,
//! `definitions`, `synonyms`, `extra_explanation`) whose values may be plain
//! strings, lists, or nested bilingual objects. [`compact_text`] flattens any
//! such value into a single line of text; the `render_*` functions assemble
//! the flattened pieces into the markup stored in the MDX package.
//!
//! All user-supplied text passes through XML escaping before it is embedded.
//! Optional fields that flatten to nothing produce no section at all.

use log::trace;
use quick_xml::escape::escape;
use serde_json::{Map, Value};

/// Localized region labels for phonetic variants.
const PHONETIC_LABELS: &[(&str, &str)] = &[("uk", "英式"), ("us", "美式")];

const SYNONYMS_TITLE: &str = "相关词";
const EXTRA_EXPLANATION_TITLE: &str = "额外说明";

/// Flattens a loosely-typed value into a single line of text.
///
/// Strings are trimmed, scalars stringified, list items joined with `"; "`
/// (empty items dropped). An object with a non-empty `en` or `zh` field
/// flattens to those two texts joined with a space; any other object becomes
/// `"key: value"` pairs joined with `"; "`, in source field order, dropping
/// pairs whose value flattens empty.
pub fn compact_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(compact_text)
                .filter(|part| !part.is_empty())
                .collect();
            parts.join("; ")
        }
        Value::Object(map) => {
            let en = map.get("en").map(compact_text).unwrap_or_default();
            let zh = map.get("zh").map(compact_text).unwrap_or_default();
            if !en.is_empty() || !zh.is_empty() {
                let parts: Vec<&str> = [en.as_str(), zh.as_str()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect();
                return parts.join(" ");
            }
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(key, child)| {
                    let child_text = compact_text(child);
                    if child_text.is_empty() {
                        None
                    } else {
                        Some(format!("{key}: {child_text}"))
                    }
                })
                .collect();
            parts.join("; ")
        }
    }
}

/// Returns a string value as-is; anything else is flattened.
///
/// Used for sub-fields that are normally plain strings, where surrounding
/// whitespace is the caller's concern.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => compact_text(other),
    }
}

/// Renders a `phonetic` value of any supported shape into a single line.
///
/// Plain strings are trimmed, list variants joined with `" / "`, and labeled
/// mappings become `"label: text"` joined with `" | "`, with region keys
/// localized (`uk` and `us`, matched case-insensitively).
pub fn render_phonetic(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(compact_text)
                .filter(|part| !part.is_empty())
                .collect();
            parts.join(" / ")
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(key, child)| {
                    let text = compact_text(child);
                    if text.is_empty() {
                        None
                    } else {
                        Some(format!("{}: {}", phonetic_label(key), text))
                    }
                })
                .collect();
            parts.join(" | ")
        }
        other => compact_text(other),
    }
}

fn phonetic_label(key: &str) -> &str {
    let lower = key.to_lowercase();
    PHONETIC_LABELS
        .iter()
        .find(|(region, _)| *region == lower)
        .map(|(_, label)| *label)
        .unwrap_or(key)
}

/// Renders a titled `<ul>` section from a string, list, or nested value.
///
/// Returns the empty string when the value yields no non-empty items, so
/// absent or empty fields never produce a visible section.
pub fn render_list_section(title: &str, value: Option<&Value>) -> String {
    let items: Vec<String> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => {
            let text = s.trim();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![text.to_string()]
            }
        }
        Some(Value::Array(list)) => list
            .iter()
            .map(compact_text)
            .filter(|item| !item.is_empty())
            .collect(),
        Some(other) => {
            let text = compact_text(other);
            if text.is_empty() { Vec::new() } else { vec![text] }
        }
    };

    if items.is_empty() {
        return String::new();
    }

    let mut html = String::new();
    html.push_str("<section class=\"section\">");
    html.push_str(&format!("<h2 class=\"title\">{}</h2>", escape(title)));
    html.push_str("<ul>");
    for item in &items {
        html.push_str(&format!("<li>{}</li>", escape(item)));
    }
    html.push_str("</ul>");
    html.push_str("</section>");
    html
}

/// Renders one record into its complete HTML entry block.
///
/// The block is fully self-contained: a heading, an optional
/// phonetic/summary line, an ordered definitions list with nested example
/// lists, and optional titled sections for related terms and supplementary
/// notes. Elements are concatenated without separators.
pub fn render_entry(word: &str, fields: &Map<String, Value>) -> String {
    trace!("Rendering entry for '{word}'");
    let mut html = String::new();
    html.push_str("<div class=\"entry\">");
    html.push_str(&format!("<h1 class=\"word\">{}</h1>", escape(word)));

    let phonetic = fields
        .get("phonetic")
        .map(render_phonetic)
        .unwrap_or_default();
    let summary = match fields.get("summary") {
        Some(Value::Object(map)) => map
            .get("zh")
            .map(text_of)
            .unwrap_or_default()
            .trim()
            .to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };
    let line_parts: Vec<&str> = [phonetic.as_str(), summary.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if !line_parts.is_empty() {
        html.push_str(&format!(
            "<div class=\"phonetic-summary\">{}</div>",
            escape(&line_parts.join(" "))
        ));
    }

    if let Some(Value::Array(definitions)) = fields.get("definitions") {
        if !definitions.is_empty() {
            html.push_str("<section class=\"section\">");
            html.push_str("<ol>");
            for item in definitions {
                render_definition_item(&mut html, item);
            }
            html.push_str("</ol>");
            html.push_str("</section>");
        }
    }

    html.push_str(&render_list_section(SYNONYMS_TITLE, fields.get("synonyms")));
    html.push_str(&render_list_section(
        EXTRA_EXPLANATION_TITLE,
        fields.get("extra_explanation"),
    ));

    html.push_str("</div>");
    html
}

/// Renders one item of the `definitions` list.
///
/// Object items always produce an `<li>`, even when every sub-field is
/// empty. Non-object items only appear when they flatten to something.
fn render_definition_item(html: &mut String, item: &Value) {
    let Value::Object(obj) = item else {
        let text = compact_text(item);
        if !text.is_empty() {
            html.push_str(&format!("<li>{}</li>", escape(&text)));
        }
        return;
    };

    html.push_str("<li>");

    let pos = obj.get("partOfSpeech").map(compact_text).unwrap_or_default();
    let definition = obj.get("definition").map(compact_text).unwrap_or_default();
    let line_parts: Vec<&str> = [pos.as_str(), definition.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if !line_parts.is_empty() {
        html.push_str(&format!(
            "<div class=\"def-line\">{}</div>",
            escape(&line_parts.join(" "))
        ));
    }

    // A non-empty examples list keeps its <ul> even when every item
    // flattens empty
    if let Some(Value::Array(examples)) = obj.get("examples") {
        if !examples.is_empty() {
            html.push_str("<ul class=\"examples\">");
            for example in examples {
                let text = compact_text(example);
                if !text.is_empty() {
                    html.push_str(&format!("<li>{}</li>", escape(&text)));
                }
            }
            html.push_str("</ul>");
        }
    }

    html.push_str("</li>");
}
