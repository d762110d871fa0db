//! Generator seam and LLM backends
//!
//! The refinement loop only sees the [`Generator`] trait: a request with a
//! [`Signature`] and bound inputs goes in, one string per declared output
//! comes out. [`ChatGenerator`] implements it on top of any [`LlmBackend`]
//! by rendering chat messages and parsing `[[ ## field ## ]]` sections from
//! the completion. [`from_config`] wires up the configured provider.

mod format;
mod generator;
pub(crate) mod http_client;
mod openrouter_backend;
mod request;
mod schema;
mod types;

pub use codeloop_utils::LlmError;
pub use format::{parse_outputs, parse_sections, render_messages, strip_code_fence};
pub use generator::{
    ChatGenerator, GeneratedOutputs, Generator, backend_from_config, from_config,
};
pub use request::{ArtifactFeedback, FieldValue, GenerationRequest, augment};
pub use schema::{
    ATTEMPTS_SUFFIX, Field, FieldKind, OUTCOME_SUFFIX, Signature, TEMPLATE_SUFFIX, attempts_field,
    outcome_field, template_field,
};
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
