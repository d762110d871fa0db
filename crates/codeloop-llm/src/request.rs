use indexmap::IndexMap;
use serde::Serialize;

use crate::schema::{Field, FieldKind, Signature, attempts_field, outcome_field, template_field};

/// Value bound to an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Feedback gathered for one code output after a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactFeedback {
    /// Previous contents, newest last.
    pub attempts: Vec<String>,
    /// Latest outcome message.
    pub outcome: String,
}

/// Everything a generator needs for one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub signature: Signature,
    pub inputs: IndexMap<String, FieldValue>,
    /// Output name → reference statements for its dependencies.
    pub reference_hints: IndexMap<String, Vec<String>>,
}

impl GenerationRequest {
    #[must_use]
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            inputs: IndexMap::new(),
            reference_hints: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    /// Declare and bind `<output>_template`, the scaffold `output` must
    /// reproduce outside the regions marked with `sentinel`.
    ///
    /// The input takes the output's language. Binding the same output again
    /// replaces the value without declaring a second field.
    #[must_use]
    pub fn with_template(
        mut self,
        output: &str,
        template: impl Into<String>,
        sentinel: &str,
    ) -> Self {
        let name = template_field(output);
        if self.signature.input_field(&name).is_none() {
            let language = self
                .signature
                .output_field(output)
                .and_then(|f| f.kind.language());
            let kind = match language {
                Some(language) => FieldKind::Code {
                    language: language.clone(),
                },
                None => FieldKind::Plain,
            };
            self.signature.inputs.push(Field {
                name: name.clone(),
                kind,
                description: format!(
                    "The template `{output}` must follow. Keep every line and only change the code where it is marked with {sentinel}"
                ),
            });
        }
        self.inputs.insert(name, FieldValue::Text(template.into()));
        self
    }

    #[must_use]
    pub fn with_reference_hints(mut self, output: impl Into<String>, hints: Vec<String>) -> Self {
        if !hints.is_empty() {
            self.reference_hints.insert(output.into(), hints);
        }
        self
    }
}

/// Build the request for the next step from the base request and the
/// feedback collected so far.
///
/// With no feedback the base request is returned unchanged. Otherwise the
/// signature gains the feedback channels and, for each output with feedback,
/// `<name>_attempts` and `<name>_outcome` are bound. The base is not modified.
#[must_use]
pub fn augment(
    base: &GenerationRequest,
    feedback: &IndexMap<String, ArtifactFeedback>,
) -> GenerationRequest {
    let mut request = base.clone();
    if feedback.is_empty() {
        return request;
    }

    request.signature = base.signature.with_feedback_fields();
    for (name, entry) in feedback {
        request
            .inputs
            .insert(attempts_field(name), FieldValue::List(entry.attempts.clone()));
        request
            .inputs
            .insert(outcome_field(name), FieldValue::Text(entry.outcome.clone()));
    }

    request
}
