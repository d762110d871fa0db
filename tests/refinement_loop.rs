//! Refinement loop integration tests
//!
//! Drives `Refiner` over the problem-solving scaffold with an in-memory
//! generator and a process runner double, so neither a model nor an
//! interpreter is needed.

use async_trait::async_trait;
use codeloop::engine::project::{problem_solving_graph, problem_solving_request};
use codeloop::llm::{FieldValue, GeneratedOutputs};
use codeloop::runner::{CommandSpec, ExecutionPlan, ProcessOutput, RunnerError};
use codeloop::{
    CodeloopError, Executor, GenerationRequest, Generator, Language, LlmError, ProcessRunner,
    RefineSettings, Refiner, Terminal,
};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const OK: &str = "Code executed successfully!";

/// Returns queued responses in order and records every request.
struct ScriptedGenerator {
    responses: Mutex<Vec<GeneratedOutputs>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    fn new(responses: Vec<GeneratedOutputs>) -> Self {
        let mut responses = responses;
        responses.reverse();
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::default(),
        }
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedOutputs, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LlmError::Transport("script exhausted".to_string()))
    }
}

/// Reads the module's file and fails with the text after `FAIL:`.
/// Modules listed in `hanging` time out.
struct SourceRunner {
    root: std::path::PathBuf,
    commands: Mutex<Vec<String>>,
    hanging: Vec<&'static str>,
}

impl SourceRunner {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            commands: Mutex::default(),
            hanging: Vec::new(),
        }
    }
}

impl ProcessRunner for SourceRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        self.commands.lock().unwrap().push(cmd.to_string());
        let module = cmd
            .args
            .last()
            .map(|m| m.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.hanging.contains(&module.as_str()) {
            return Err(RunnerError::Timeout {
                timeout_seconds: timeout.as_secs(),
            });
        }

        let path = self.root.join(format!("{}.py", module.replace('.', "/")));
        let source = fs::read_to_string(path).unwrap_or_default();
        match source.split_once("FAIL:") {
            Some((_, message)) => {
                Ok(ProcessOutput::new(message.trim().as_bytes().to_vec(), Some(1)))
            }
            None => Ok(ProcessOutput::new(Vec::new(), Some(0))),
        }
    }
}

fn outputs(solution: &str, runtime: &str, memory: &str, test: &str) -> GeneratedOutputs {
    [
        ("explanation", "Adds the numbers."),
        ("solution", solution),
        ("runtime", runtime),
        ("memory", memory),
        ("test", test),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

type TestRefiner = Refiner<Arc<ScriptedGenerator>, SourceRunner>;

fn refiner(
    dir: &TempDir,
    generator: Arc<ScriptedGenerator>,
    runner: SourceRunner,
    settings: RefineSettings,
) -> (TestRefiner, GenerationRequest) {
    let graph = problem_solving_graph(dir.path(), "output", Language::Python).unwrap();
    graph.initialize_modules().unwrap();
    let request = problem_solving_request(&graph, "Add two numbers.", "cases = []\n").unwrap();

    let plan = ExecutionPlan {
        root: dir.path().to_path_buf(),
        timeout: Duration::from_secs(3),
        ..ExecutionPlan::default()
    };
    let refiner = Refiner::new(
        generator,
        Executor::new(runner, plan),
        graph,
        settings,
    );
    (refiner, request)
}

#[tokio::test]
async fn test_first_step_success_exits_early() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new(vec![
        outputs("a", "b", "c", "d"),
        outputs("x", "x", "x", "x"),
    ]));
    let (refiner, request) = refiner(
        &dir,
        Arc::clone(&generator),
        SourceRunner::new(dir.path()),
        RefineSettings::default(),
    );

    let output = refiner.refine(&request).await.unwrap();
    assert_eq!(output.status, Terminal::AllSucceeded);
    assert_eq!(output.steps_taken, 1);
    assert_eq!(output.steps.len(), 1);
    assert_eq!(output.outputs["solution"], "a");
    assert_eq!(generator.calls(), 1);

    let outcomes = output.final_outcomes().unwrap();
    assert_eq!(
        outcomes.keys().collect::<Vec<_>>(),
        vec!["solution", "runtime", "memory", "test"]
    );
    assert!(outcomes.values().all(|o| o.message == OK));

    let root = dir.path().join("output");
    assert_eq!(fs::read_to_string(root.join("solution.py")).unwrap(), "a");
    assert_eq!(fs::read_to_string(root.join("measurements/memory.py")).unwrap(), "c");
    assert!(root.join("__init__.py").exists());
    assert!(root.join("measurements/__init__.py").exists());
}

#[tokio::test]
async fn test_budget_exhaustion_returns_last_outputs() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new(vec![
        outputs("FAIL: first", "ok", "ok", "ok"),
        outputs("FAIL: second", "ok", "ok", "ok"),
    ]));
    let (refiner, request) = refiner(
        &dir,
        generator,
        SourceRunner::new(dir.path()),
        RefineSettings {
            max_steps: 2,
            ..RefineSettings::default()
        },
    );

    let output = refiner.refine(&request).await.unwrap();
    assert_eq!(output.status, Terminal::StepBudgetExhausted);
    assert_eq!(output.steps_taken, 2);
    assert_eq!(output.outputs["solution"], "FAIL: second");
    assert_eq!(output.failing(), vec!["solution"]);
    assert_eq!(output.final_outcomes().unwrap()["solution"].message, "second");
}

#[tokio::test]
async fn test_every_step_is_reported() {
    let dir = TempDir::new().unwrap();
    let responses = (0..4)
        .map(|i| outputs(&format!("FAIL: v{i}"), "ok", "ok", "ok"))
        .collect();
    let (refiner, request) = refiner(
        &dir,
        Arc::new(ScriptedGenerator::new(responses)),
        SourceRunner::new(dir.path()),
        RefineSettings {
            max_steps: 4,
            trajectory_window: 2,
            ..RefineSettings::default()
        },
    );

    let output = refiner.refine(&request).await.unwrap();
    assert_eq!(output.steps_taken, 4);
    assert_eq!(output.steps.len(), 4);
    assert!(output.steps.iter().enumerate().all(|(i, r)| r.step as usize == i));

    let report = &output.steps[3];
    assert!(!report.all_succeeded);
    assert_eq!(report.outcomes["solution"].message, "v3");
    assert!(report.outcomes["runtime"].succeeded);
}

#[tokio::test]
async fn test_requests_carry_outcomes_and_bounded_attempts() {
    let dir = TempDir::new().unwrap();
    let generator = Arc::new(ScriptedGenerator::new(
        (0..3)
            .map(|i| outputs(&format!("FAIL: v{i}"), "ok", "ok", "ok"))
            .collect(),
    ));
    let (refiner, _) = refiner(
        &dir,
        Arc::clone(&generator),
        SourceRunner::new(dir.path()),
        RefineSettings {
            max_steps: 3,
            trajectory_window: 1,
            ..RefineSettings::default()
        },
    );

    let request = problem_solving_request(refiner.graph(), "p", "cases = []\n").unwrap();
    refiner.refine(&request).await.unwrap();
    assert_eq!(generator.calls(), 3);

    let requests = generator.requests.lock().unwrap();
    assert!(!requests[0].inputs.contains_key("solution_attempts"));
    assert!(requests[0].signature.input_field("solution_outcome").is_none());

    assert_eq!(
        requests[2].inputs["solution_attempts"],
        FieldValue::List(vec!["FAIL: v1".to_string()])
    );
    assert_eq!(requests[2].inputs["solution_outcome"], FieldValue::text("v1"));
    assert_eq!(requests[2].inputs["test_outcome"], FieldValue::text(OK));
    assert_eq!(requests[2].inputs["problem"], FieldValue::text("p"));
    assert!(requests[2].signature.input_field("memory_attempts").is_some());
}

#[tokio::test]
async fn test_timeout_is_feedback_not_error() {
    let dir = TempDir::new().unwrap();
    let mut runner = SourceRunner::new(dir.path());
    runner.hanging.push("output.test");
    let (refiner, request) = refiner(
        &dir,
        Arc::new(ScriptedGenerator::new(vec![outputs(
            "ok",
            "ok",
            "ok",
            "while True: pass",
        )])),
        runner,
        RefineSettings {
            max_steps: 1,
            ..RefineSettings::default()
        },
    );

    let output = refiner.refine(&request).await.unwrap();
    assert_eq!(output.status, Terminal::StepBudgetExhausted);
    assert_eq!(
        output.final_outcomes().unwrap()["test"].message,
        "Execution timed out after 3 seconds!"
    );
}

#[tokio::test]
async fn test_template_violation_skips_execution() {
    let dir = TempDir::new().unwrap();
    let template = "def solve(a, b):\n    # TODO: implement\n    ...\n\nprint(solve(1, 2))";
    let conforming = "def solve(a, b):\n    return a + b\n\nprint(solve(1, 2))";
    let (refiner, request) = refiner(
        &dir,
        Arc::new(ScriptedGenerator::new(vec![
            outputs("import os\nprint(os.getcwd())", "ok", "ok", "ok"),
            outputs(conforming, "ok", "ok", "ok"),
        ])),
        SourceRunner::new(dir.path()),
        RefineSettings::default(),
    );
    let refiner = refiner.with_template("solution", template);

    let output = refiner.refine(&request).await.unwrap();
    assert_eq!(output.status, Terminal::AllSucceeded);
    assert_eq!(output.steps_taken, 2);

    let first = &output.steps[0].outcomes["solution"];
    assert!(!first.executed);
    assert_eq!(
        first.message,
        "You must strictly follow the provided template and only modify the code where it is marked with # TODO:!"
    );
    assert!(output.steps[1].outcomes["solution"].executed);
}

#[tokio::test]
async fn test_extra_is_appended_but_not_validated() {
    let dir = TempDir::new().unwrap();
    let (refiner, request) = refiner(
        &dir,
        Arc::new(ScriptedGenerator::new(vec![outputs(
            "def run():\n    pass",
            "ok",
            "ok",
            "ok",
        )])),
        SourceRunner::new(dir.path()),
        RefineSettings::default(),
    );
    let refiner = refiner
        .with_template("solution", "def run():\n    # TODO: body\n    ...")
        .with_extra("solution", "run()");

    let output = refiner.refine(&request).await.unwrap();
    assert!(output.all_succeeded());
    assert_eq!(
        fs::read_to_string(dir.path().join("output/solution.py")).unwrap(),
        "def run():\n    pass\n\nrun()"
    );
}

#[tokio::test]
async fn test_generator_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let (refiner, request) = refiner(
        &dir,
        Arc::new(ScriptedGenerator::new(Vec::new())),
        SourceRunner::new(dir.path()),
        RefineSettings::default(),
    );

    let err = refiner.refine(&request).await.unwrap_err();
    assert!(matches!(err, CodeloopError::Llm(LlmError::Transport(_))));
}

#[tokio::test]
async fn test_commands_use_module_paths() {
    let dir = TempDir::new().unwrap();
    let generator = ScriptedGenerator::new(vec![outputs("a", "b", "c", "d")]);
    let runner = SourceRunner::new(dir.path());
    let graph = problem_solving_graph(dir.path(), "output", Language::Python).unwrap();
    graph.initialize_modules().unwrap();
    let request = problem_solving_request(&graph, "p", "cases = []\n").unwrap();
    let plan = ExecutionPlan {
        root: dir.path().to_path_buf(),
        pre_command: Some(vec!["uv".to_string(), "sync".to_string()]),
        ..ExecutionPlan::default()
    };
    let executor = Executor::new(&runner, plan);
    let refiner = Refiner::new(generator, executor, graph, RefineSettings::default());

    refiner.refine(&request).await.unwrap();
    let commands = runner.commands.lock().unwrap();
    assert_eq!(
        *commands,
        vec![
            "uv sync",
            "uv run -m output.solution",
            "uv sync",
            "uv run -m output.measurements.runtime",
            "uv sync",
            "uv run -m output.measurements.memory",
            "uv sync",
            "uv run -m output.test",
        ]
    );
}

#[tokio::test]
async fn test_template_file_is_shown_and_entry_point_appended() {
    let dir = TempDir::new().unwrap();
    let source = "def solve(a, b):\n    # TODO: implement\n    ...\n\nif __name__ == \"__main__\":\n    print(solve(1, 2))\n";
    let guard = Language::Python.main_guard().unwrap();
    let (template, tail) = codeloop::template::split_at_guard(source, guard);
    let tail = tail.unwrap();

    let generator = Arc::new(ScriptedGenerator::new(vec![outputs(
        "def solve(a, b):\n    return a + b",
        "ok",
        "ok",
        "ok",
    )]));
    let (refiner, request) = refiner(
        &dir,
        Arc::clone(&generator),
        SourceRunner::new(dir.path()),
        RefineSettings::default(),
    );
    let request = request.with_template("solution", template, "# TODO:");
    let refiner = refiner
        .with_template("solution", template)
        .with_extra("solution", tail);

    let output = refiner.refine(&request).await.unwrap();
    assert_eq!(output.status, Terminal::AllSucceeded);

    let seen = &generator.requests.lock().unwrap()[0];
    assert_eq!(seen.inputs["solution_template"], FieldValue::text(template));
    let user = &codeloop::llm::render_messages(seen)[1].content;
    assert!(user.contains("# TODO: implement"));
    assert!(!user.contains("print(solve(1, 2))"));

    assert_eq!(
        fs::read_to_string(dir.path().join("output/solution.py")).unwrap(),
        "def solve(a, b):\n    return a + b\n\nif __name__ == \"__main__\":\n    print(solve(1, 2))\n"
    );
}
