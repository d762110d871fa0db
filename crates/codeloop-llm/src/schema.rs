//! Declared inputs and outputs of a generation task.
//!
//! A [`Signature`] is built once per task. The refinement loop derives the
//! variant with feedback channels through [`Signature::with_feedback_fields`]
//! instead of mutating the original.

use codeloop_utils::Language;
use serde::Serialize;

/// Whether a field carries free text or source code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Plain,
    Code { language: Language },
    /// Ordered list of code snippets, oldest first.
    CodeList { language: Language },
}

impl FieldKind {
    #[must_use]
    pub fn language(&self) -> Option<&Language> {
        match self {
            Self::Plain => None,
            Self::Code { language } | Self::CodeList { language } => Some(language),
        }
    }

    #[must_use]
    pub fn is_code(&self) -> bool {
        matches!(self, Self::Code { .. })
    }

    /// Human-readable type shown to the model.
    #[must_use]
    pub fn type_hint(&self) -> String {
        match self {
            Self::Plain => "str".to_string(),
            Self::Code { language } => format!("code ({language})"),
            Self::CodeList { language } => format!("list of code ({language})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
}

impl Field {
    #[must_use]
    pub fn plain(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Plain,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn code(
        name: impl Into<String>,
        language: Language,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Code { language },
            description: description.into(),
        }
    }
}

/// Suffix of the input holding previous attempts of an output.
pub const ATTEMPTS_SUFFIX: &str = "_attempts";
/// Suffix of the input holding the latest outcome of an output.
pub const OUTCOME_SUFFIX: &str = "_outcome";

/// Suffix of the input holding the template an output must follow.
pub const TEMPLATE_SUFFIX: &str = "_template";

#[must_use]
pub fn template_field(output: &str) -> String {
    format!("{output}{TEMPLATE_SUFFIX}")
}

#[must_use]
pub fn attempts_field(output: &str) -> String {
    format!("{output}{ATTEMPTS_SUFFIX}")
}

#[must_use]
pub fn outcome_field(output: &str) -> String {
    format!("{output}{OUTCOME_SUFFIX}")
}

/// Instructions plus ordered input and output fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub instructions: String,
    pub inputs: Vec<Field>,
    pub outputs: Vec<Field>,
}

impl Signature {
    #[must_use]
    pub fn new(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn input(mut self, field: Field) -> Self {
        self.inputs.push(field);
        self
    }

    #[must_use]
    pub fn output(mut self, field: Field) -> Self {
        self.outputs.push(field);
        self
    }

    #[must_use]
    pub fn input_field(&self, name: &str) -> Option<&Field> {
        self.inputs.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn output_field(&self, name: &str) -> Option<&Field> {
        self.outputs.iter().find(|f| f.name == name)
    }

    /// Any field, inputs first.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.input_field(name).or_else(|| self.output_field(name))
    }

    /// Outputs that produce code, in declaration order.
    pub fn code_outputs(&self) -> impl Iterator<Item = &Field> {
        self.outputs.iter().filter(|f| f.kind.is_code())
    }

    /// Copy of this signature with `<name>_attempts` and `<name>_outcome`
    /// inputs appended for every code output. Applying it twice adds nothing.
    #[must_use]
    pub fn with_feedback_fields(&self) -> Self {
        let mut signature = self.clone();

        for output in self.code_outputs() {
            let Some(language) = output.kind.language() else {
                continue;
            };
            let attempts = attempts_field(&output.name);
            if signature.input_field(&attempts).is_some() {
                continue;
            }

            signature.inputs.push(Field {
                name: attempts,
                kind: FieldKind::CodeList {
                    language: language.clone(),
                },
                description: format!("The previous attempts for `{}`", output.name),
            });
            signature.inputs.push(Field::plain(
                outcome_field(&output.name),
                format!(
                    "Outcome of attempting to execute the latest of `{}`",
                    attempts_field(&output.name)
                ),
            ));
        }

        signature
    }
}
