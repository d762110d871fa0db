//! Chat prompt rendering and completion parsing.
//!
//! Fields are delimited by `[[ ## name ## ]]` header lines, both in the
//! prompt (inputs) and in the expected completion (outputs).

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write as _;

use crate::LlmError;
use crate::request::{FieldValue, GenerationRequest};
use crate::schema::{Field, FieldKind, Signature};
use crate::types::Message;

const COMPLETED: &str = "completed";

static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\[\[ ## ([A-Za-z0-9_]+) ## \]\][ \t]*$").expect("section header pattern")
});

fn header(name: &str) -> String {
    format!("[[ ## {name} ## ]]")
}

fn fence(language: &str, code: &str) -> String {
    format!("```{language}\n{}\n```", code.trim_end())
}

fn describe_fields(out: &mut String, fields: &[Field]) {
    for (i, field) in fields.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. `{}` ({}): {}",
            i + 1,
            field.name,
            field.kind.type_hint(),
            field.description
        );
    }
}

fn system_message(request: &GenerationRequest) -> String {
    let signature = &request.signature;
    let mut out = String::new();

    out.push_str("Your input fields are:\n");
    describe_fields(&mut out, &signature.inputs);
    out.push_str("Your output fields are:\n");
    describe_fields(&mut out, &signature.outputs);

    out.push_str(
        "All interactions will be structured in the following way, with the appropriate values filled in.\n\n",
    );
    for field in signature.inputs.iter().chain(&signature.outputs) {
        let _ = writeln!(out, "{}\n{{{}}}\n", header(&field.name), field.name);
    }
    let _ = writeln!(out, "{}\n", header(COMPLETED));

    out.push_str(&reference_instructions(signature, &request.reference_hints));

    let _ = write!(
        out,
        "In adhering to this structure, your objective is:\n        {}",
        signature.instructions
    );
    out
}

fn reference_instructions(signature: &Signature, hints: &IndexMap<String, Vec<String>>) -> String {
    let mut out = String::new();
    for output in &signature.outputs {
        let Some(statements) = hints.get(&output.name) else {
            continue;
        };
        let language = output.kind.language().map(|l| l.as_str()).unwrap_or("");
        let _ = writeln!(
            out,
            "When generating code for `{}`, use the following code to re-use other outputs:",
            output.name
        );
        let _ = writeln!(out, "{}\n", fence(language, &statements.join("\n")));
    }
    out
}

fn render_value(kind: &FieldKind, value: &FieldValue) -> String {
    match (kind, value) {
        (FieldKind::Code { language }, FieldValue::Text(code)) => fence(language.as_str(), code),
        (FieldKind::CodeList { language }, FieldValue::List(items)) => {
            if items.is_empty() {
                return "[]".to_string();
            }
            items
                .iter()
                .enumerate()
                .map(|(i, code)| format!("[{}]\n{}", i + 1, fence(language.as_str(), code)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        (_, FieldValue::Text(text)) => text.clone(),
        (_, FieldValue::List(items)) => items.join("\n"),
    }
}

fn user_message(request: &GenerationRequest) -> String {
    let mut out = String::new();

    for field in &request.signature.inputs {
        let Some(value) = request.inputs.get(&field.name) else {
            continue;
        };
        let _ = writeln!(out, "{}\n{}\n", header(&field.name), render_value(&field.kind, value));
    }

    let outputs: Vec<String> = request
        .signature
        .outputs
        .iter()
        .map(|f| format!("`{}`", header(&f.name)))
        .collect();
    let _ = write!(
        out,
        "Respond with the corresponding output fields, starting with the field {}, and then ending with the marker for `{}`.",
        outputs.join(", then "),
        header(COMPLETED)
    );
    out
}

/// System and user messages for `request`.
#[must_use]
pub fn render_messages(request: &GenerationRequest) -> Vec<Message> {
    vec![
        Message::system(system_message(request)),
        Message::user(user_message(request)),
    ]
}

/// Remove one enclosing Markdown code fence, if present.
#[must_use]
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return String::new(),
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim_end()
        .to_string()
}

/// Split a completion into its `[[ ## name ## ]]` sections.
#[must_use]
pub fn parse_sections(completion: &str) -> IndexMap<String, String> {
    let mut sections = IndexMap::new();

    let headers: Vec<(String, usize, usize)> = SECTION_HEADER
        .captures_iter(completion)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((name.as_str().to_string(), whole.start(), whole.end()))
        })
        .collect();

    for (i, (name, _, body_start)) in headers.iter().enumerate() {
        let body_end = headers
            .get(i + 1)
            .map_or(completion.len(), |(_, start, _)| *start);
        // First occurrence wins.
        sections
            .entry(name.clone())
            .or_insert_with(|| completion[*body_start..body_end].trim().to_string());
    }

    sections.shift_remove(COMPLETED);
    sections
}

/// Extract every declared output from a completion.
///
/// # Errors
///
/// Returns [`LlmError::MissingField`] for the first declared output without
/// a section.
pub fn parse_outputs(
    signature: &Signature,
    completion: &str,
) -> Result<IndexMap<String, String>, LlmError> {
    let mut sections = parse_sections(completion);

    signature
        .outputs
        .iter()
        .map(|field| {
            let raw = sections
                .shift_remove(&field.name)
                .ok_or_else(|| LlmError::MissingField {
                    field: field.name.clone(),
                })?;
            let value = if field.kind.is_code() {
                strip_code_fence(&raw)
            } else {
                raw
            };
            Ok((field.name.clone(), value))
        })
        .collect()
}
