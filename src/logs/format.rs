use crate::logs::Level;
use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::BTreeMap;

/// Timestamp layout used at the start of every line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Structured context attached to a record
///
/// A `BTreeMap` keeps the serialized context block stable between renders.
pub type Context = BTreeMap<String, Value>;

/// Substitutes context values into a message template
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: &str, context: &Context) -> String;
}

/// Replaces `{key}` placeholders with the matching context value.
/// Placeholders without a matching key are kept verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderRenderer;

impl TemplateRenderer for PlaceholderRenderer {
    fn render(&self, template: &str, context: &Context) -> String {
        if context.is_empty() || !template.contains('{') {
            return template.to_string();
        }

        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find(|c: char| c == '{' || c == '}') {
                Some(end) if after.as_bytes()[end] == b'}' => {
                    let key = &after[..end];
                    match context.get(key) {
                        Some(value) => out.push_str(&stringify_value(value)),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                _ => {
                    // Unterminated or nested brace: keep it and scan on
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// A single record to be rendered
#[derive(Debug, Clone)]
pub struct Record<'a> {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub template: &'a str,
    pub context: &'a Context,
}

/// Turn a context value into the text that replaces its placeholder
///
/// Strings are used as-is, `null` becomes empty, scalars use their display form
/// and arrays/objects are written as compact JSON. Serialization problems never
/// abort the write; the debug representation is used instead.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
        }
    }
}

/// Serialize the context block appended after the message
pub fn serialize_context(context: &Context) -> String {
    serde_json::to_string(context).unwrap_or_else(|_| format!("{:?}", context))
}

/// Collapse line breaks to spaces so a record always stays on one line
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Render one log line
///
/// Layout: `[<timestamp>] [<process id>] <message>[ <context>]\n`. The level
/// is not part of the line; it only decides whether the record is written.
/// Line breaks in the message or context become spaces.
pub fn format_record(
    record: &Record<'_>,
    process_id: &str,
    include_context: bool,
    renderer: &dyn TemplateRenderer,
) -> String {
    let message = single_line(&renderer.render(record.template, record.context));
    let timestamp = record.timestamp.format(TIMESTAMP_FORMAT);

    let mut line = format!("[{}] [{}] {}", timestamp, process_id, message);
    if include_context {
        line.push(' ');
        line.push_str(&single_line(&serialize_context(record.context)));
    }
    line.push('\n');
    line
}
