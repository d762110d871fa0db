use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::common::{read_input, to_json};
use crate::engine::project::{
    CASES, execution_plan, problem_solving_graph, problem_solving_request,
};
use crate::template::split_at_guard;
use crate::{
    ArtifactGraph, CodeloopError, Config, ConfigError, ExitCode, Executor, RefineOutput,
    RefineSettings, Refiner, RunnerError, Terminal, write_cases,
};

#[derive(Debug, Serialize)]
struct ArtifactSummary {
    location: String,
    succeeded: bool,
    outcome: String,
}

#[derive(Debug, Serialize)]
struct SolveSummary {
    status: Terminal,
    steps_taken: u32,
    project_dir: String,
    finished_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    artifacts: IndexMap<String, ArtifactSummary>,
}

fn summarize(output: &RefineOutput, graph: &ArtifactGraph, config: &Config) -> SolveSummary {
    let artifacts = output
        .final_outcomes()
        .map(|outcomes| {
            outcomes
                .iter()
                .map(|(name, outcome)| {
                    let location = graph
                        .path_on_disk(name)
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    (
                        name.clone(),
                        ArtifactSummary {
                            location,
                            succeeded: outcome.succeeded,
                            outcome: outcome.message.clone(),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    SolveSummary {
        status: output.status,
        steps_taken: output.steps_taken,
        project_dir: config.project_dir().display().to_string(),
        finished_at: chrono::Utc::now().to_rfc3339(),
        explanation: output.outputs.get("explanation").cloned(),
        artifacts,
    }
}

fn ensure_runner_available(program: &str) -> Result<PathBuf, CodeloopError> {
    which::which(program).map_err(|err| {
        CodeloopError::Runner(RunnerError::SpawnFailed {
            program: program.to_string(),
            reason: err.to_string(),
        })
    })
}

// Writes the cases file from JSON if given, otherwise keeps an existing one.
fn prepare_cases(graph: &ArtifactGraph, cases: Option<&Path>) -> Result<String, CodeloopError> {
    let path = match cases {
        Some(json_path) => {
            let raw = read_input("cases", json_path)?;
            let value: serde_json::Value = serde_json::from_str(&raw).map_err(|err| {
                CodeloopError::Config(ConfigError::InvalidValue {
                    key: "cases".to_string(),
                    value: format!("{} is not valid JSON: {err}", json_path.display()),
                })
            })?;
            write_cases(graph, CASES, &value)?
        }
        None => {
            let existing = graph.path_on_disk(CASES)?;
            if existing.exists() {
                existing
            } else {
                warn!("No test cases given; writing an empty case list");
                write_cases(graph, CASES, &serde_json::Value::Array(Vec::new()))?
            }
        }
    };

    Ok(fs::read_to_string(path)?)
}

/// Run the refinement loop for the problem in `problem` and print a JSON
/// summary.
pub async fn execute_solve_command(
    problem: &Path,
    cases: Option<&Path>,
    templates: &[(String, PathBuf)],
    extras: &[(String, PathBuf)],
    config: &Config,
) -> Result<ExitCode> {
    let runner_path = ensure_runner_available(&config.runner.program)?;
    info!(runner = %runner_path.display(), "Using runner");

    let problem = read_input("problem", problem)?;
    let graph = problem_solving_graph(
        &config.project.root,
        &config.project.name,
        config.project.language.clone(),
    )?;
    graph.initialize_modules()?;
    let cases_source = prepare_cases(&graph, cases)?;
    let mut request = problem_solving_request(&graph, &problem, &cases_source)?;

    let generator = codeloop_llm::from_config(config)?;
    let executor = Executor::native(execution_plan(config));
    let mut refiner = Refiner::new(
        generator,
        executor,
        graph,
        RefineSettings::from_config(config),
    );

    // The entry-point block of a template is appended verbatim rather than
    // shown to the model. An explicit --extra replaces it.
    let guard = config.project.language.main_guard();
    for (name, path) in templates {
        refiner.graph().get(name)?;
        let source = read_input("template", path)?;
        let (template, tail) = match guard {
            Some(guard) => split_at_guard(&source, guard),
            None => (source.as_str(), None),
        };
        request = request.with_template(name, template, &config.defaults.sentinel);
        refiner = refiner.with_template(name.as_str(), template);
        if let Some(tail) = tail {
            refiner = refiner.with_extra(name.as_str(), tail);
        }
    }
    for (name, path) in extras {
        refiner.graph().get(name)?;
        refiner = refiner.with_extra(name.as_str(), read_input("extra", path)?);
    }

    let output = refiner.refine(&request).await?;
    let summary = summarize(&output, refiner.graph(), config);
    println!("{}", to_json(&summary)?);

    Ok(match output.status {
        Terminal::AllSucceeded => ExitCode::SUCCESS,
        Terminal::StepBudgetExhausted => ExitCode::BUDGET_EXHAUSTED,
    })
}
