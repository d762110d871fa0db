//! The problem-solving project scaffold.
//!
//! Layout under `<name>/`:
//!
//! ```text
//! cases                 (input, never generated)
//! solution
//! measurements/runtime  -> cases, solution
//! measurements/memory   -> cases, solution
//! test                  -> cases, solution, runtime, memory
//! ```

use codeloop_config::Config;
use codeloop_graph::{ArtifactGraph, GraphError, Language};
use codeloop_llm::{Field, GenerationRequest, Signature};
use codeloop_runner::ExecutionPlan;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CASES: &str = "cases";
pub const SOLUTION: &str = "solution";
pub const RUNTIME: &str = "runtime";
pub const MEMORY: &str = "memory";
pub const TEST: &str = "test";

/// Build the scaffold graph for project `name` under `root`.
///
/// # Errors
///
/// Returns [`GraphError::LanguageNotImplemented`] for languages without a
/// file convention.
pub fn problem_solving_graph(
    root: impl Into<PathBuf>,
    name: &str,
    language: Language,
) -> Result<ArtifactGraph, GraphError> {
    let mut graph = ArtifactGraph::new(root, language)?;
    let project = Path::new(name);

    graph.add_artifact(project.join(CASES))?;
    graph.add_artifact(project.join(SOLUTION))?;
    graph.add_artifact(project.join("measurements").join(RUNTIME))?;
    graph.add_artifact(project.join("measurements").join(MEMORY))?;
    graph.add_artifact(project.join(TEST))?;

    graph.add_dependency(RUNTIME, &[CASES, SOLUTION])?;
    graph.add_dependency(MEMORY, &[CASES, SOLUTION])?;
    graph.add_dependency(TEST, &[CASES, SOLUTION, RUNTIME, MEMORY])?;

    Ok(graph)
}

#[must_use]
pub fn problem_solving_signature(language: &Language) -> Signature {
    Signature::new(format!(
        "You are an expert in solving algorithmic problems using {language}."
    ))
    .input(Field::plain(
        "problem",
        "The description of the problem to be solved",
    ))
    .input(Field::code(
        CASES,
        language.clone(),
        "The paired inputs and outputs for the problem written as jagged arrays",
    ))
    .output(Field::plain(
        "explanation",
        "An explanation of the implementation of `solution`",
    ))
    .output(Field::code(
        SOLUTION,
        language.clone(),
        "Code that when executed with the inputs, produces the expected outputs",
    ))
    .output(Field::code(
        RUNTIME,
        language.clone(),
        "Code that profiles the execution time of `solution` when running on `cases`",
    ))
    .output(Field::code(
        MEMORY,
        language.clone(),
        "Code that profiles the runtime memory usage of `solution` when running on `cases`",
    ))
    .output(Field::code(
        TEST,
        language.clone(),
        "Code that tests the `solution` on the provided `cases` and runs `runtime` and `memory` measurements",
    ))
}

/// First-step request: the problem, the rendered cases and, for every code
/// output with dependencies, the reference statements it may use.
///
/// # Errors
///
/// - [`GraphError::MissingArtifact`] if a code output has no artifact
/// - [`GraphError::CrossLanguageReference`] for mixed-language dependencies
pub fn problem_solving_request(
    graph: &ArtifactGraph,
    problem: &str,
    cases_source: &str,
) -> Result<GenerationRequest, GraphError> {
    let signature = problem_solving_signature(graph.language());
    let outputs: Vec<String> = signature.code_outputs().map(|f| f.name.clone()).collect();

    let mut request = GenerationRequest::new(signature)
        .with_input("problem", problem)
        .with_input(CASES, cases_source);
    for name in outputs {
        let hints = graph.reference_hints(&name)?;
        request = request.with_reference_hints(name, hints);
    }

    Ok(request)
}

/// Execution plan rooted where the graph's locations are relative to.
#[must_use]
pub fn execution_plan(config: &Config) -> ExecutionPlan {
    ExecutionPlan {
        program: config.runner.program.clone(),
        args: config.runner.args.clone(),
        pre_command: config.pre_command(),
        root: config.project.root.clone(),
        timeout: Duration::from_secs(config.defaults.execution_timeout),
    }
}
