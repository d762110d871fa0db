use codeloop_config::Config;
use codeloop_graph::ArtifactGraph;
use codeloop_llm::{ArtifactFeedback, GeneratedOutputs, GenerationRequest, Generator, augment};
use codeloop_runner::{ExecutionOutcome, Executor, NativeRunner, ProcessRunner};
use codeloop_template::{validate, violation_message};
use codeloop_utils::CodeloopError;
use codeloop_utils::logging::{refine_span, step_span};
use indexmap::IndexMap;
use tracing::{Instrument, debug, info, warn};

use crate::outcome::{ArtifactOutcome, RefineOutput, StepReport, Terminal};
use crate::persist::persist_artifact;
use crate::trajectory::Trajectory;

/// Knobs of one refinement run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineSettings {
    pub max_steps: u32,
    /// Attempts kept per artifact; 0 keeps all.
    pub trajectory_window: usize,
    /// Outcome text that marks an artifact as succeeded.
    pub success_message: String,
    /// Marker of mutable template regions.
    pub sentinel: String,
}

impl Default for RefineSettings {
    fn default() -> Self {
        Self {
            max_steps: codeloop_config::DEFAULT_STEPS,
            trajectory_window: 0,
            success_message: codeloop_config::DEFAULT_SUCCESS_MESSAGE.to_string(),
            sentinel: codeloop_config::DEFAULT_SENTINEL.to_string(),
        }
    }
}

impl RefineSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_steps: config.defaults.steps,
            trajectory_window: config.defaults.trajectory_len,
            success_message: config.defaults.success_message.clone(),
            sentinel: config.defaults.sentinel.clone(),
        }
    }
}

/// Drives generation, persistence, validation and execution until every
/// code artifact succeeds or the step budget runs out.
///
/// Each step makes exactly one generator call. Every returned code output
/// is written to its location in the graph, checked against its template
/// (if one is registered) and executed. Outcomes and bounded attempt
/// histories are fed back as `<name>_outcome` / `<name>_attempts` inputs of
/// the next step.
///
/// Failing artifacts never abort the run; only configuration problems, graph
/// lookups, write failures and generator errors do.
pub struct Refiner<G, R = NativeRunner> {
    generator: G,
    executor: Executor<R>,
    graph: ArtifactGraph,
    settings: RefineSettings,
    templates: IndexMap<String, String>,
    extras: IndexMap<String, String>,
}

impl<G: Generator, R: ProcessRunner> Refiner<G, R> {
    #[must_use]
    pub fn new(
        generator: G,
        executor: Executor<R>,
        graph: ArtifactGraph,
        settings: RefineSettings,
    ) -> Self {
        Self {
            generator,
            executor,
            graph,
            settings,
            templates: IndexMap::new(),
            extras: IndexMap::new(),
        }
    }

    /// Require content generated for `artifact` to conform to `template`.
    #[must_use]
    pub fn with_template(mut self, artifact: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(artifact.into(), template.into());
        self
    }

    /// Append `extra` (after a blank line) whenever `artifact` is written.
    #[must_use]
    pub fn with_extra(mut self, artifact: impl Into<String>, extra: impl Into<String>) -> Self {
        self.extras.insert(artifact.into(), extra.into());
        self
    }

    #[must_use]
    pub fn graph(&self) -> &ArtifactGraph {
        &self.graph
    }

    #[must_use]
    pub fn settings(&self) -> &RefineSettings {
        &self.settings
    }

    /// Run the loop starting from `base`.
    ///
    /// Returns the outputs of the last generation call. Running out of steps
    /// is not an error: the result carries
    /// [`Terminal::StepBudgetExhausted`] and the per-artifact outcomes.
    ///
    /// # Errors
    ///
    /// - [`CodeloopError::Llm`] if the generator fails
    /// - [`CodeloopError::Graph`] if a code output has no artifact in the graph
    /// - [`CodeloopError::Persist`] if an artifact cannot be written
    /// - [`CodeloopError::Runner`] if the runner program cannot be started
    pub async fn refine(&self, base: &GenerationRequest) -> Result<RefineOutput, CodeloopError> {
        let span = refine_span(self.settings.max_steps, self.settings.trajectory_window);
        self.run(base).instrument(span).await
    }

    async fn run(&self, base: &GenerationRequest) -> Result<RefineOutput, CodeloopError> {
        let mut trajectories: IndexMap<String, Trajectory> = IndexMap::new();
        let mut feedback: IndexMap<String, ArtifactFeedback> = IndexMap::new();
        let mut steps = Vec::new();
        let mut outputs = GeneratedOutputs::new();

        for step in 0..self.settings.max_steps {
            let span = step_span(step);
            info!(step, feedback = feedback.len(), "Starting step");

            let request = augment(base, &feedback);
            outputs = self
                .generator
                .generate(&request)
                .instrument(span.clone())
                .await?;

            let report =
                span.in_scope(|| self.check_outputs(step, base, &outputs, &mut trajectories))?;

            feedback = report
                .outcomes
                .iter()
                .map(|(name, outcome)| {
                    let attempts = trajectories
                        .get(name)
                        .map(Trajectory::to_vec)
                        .unwrap_or_default();
                    (
                        name.clone(),
                        ArtifactFeedback {
                            attempts,
                            outcome: outcome.message.clone(),
                        },
                    )
                })
                .collect();

            let all_succeeded = report.all_succeeded;
            info!(step, all_succeeded, "Step finished");
            steps.push(report);

            if all_succeeded {
                info!(steps_taken = step + 1, "All artifacts succeeded");
                return Ok(RefineOutput {
                    status: Terminal::AllSucceeded,
                    steps_taken: step + 1,
                    outputs,
                    steps,
                });
            }
        }

        let output = RefineOutput {
            status: Terminal::StepBudgetExhausted,
            steps_taken: self.settings.max_steps,
            outputs,
            steps,
        };
        info!(failing = ?output.failing(), "Step budget exhausted");
        Ok(output)
    }

    fn check_outputs(
        &self,
        step: u32,
        base: &GenerationRequest,
        outputs: &GeneratedOutputs,
        trajectories: &mut IndexMap<String, Trajectory>,
    ) -> Result<StepReport, CodeloopError> {
        let mut outcomes = IndexMap::new();

        for field in base.signature.code_outputs() {
            let name = field.name.as_str();
            let Some(content) = outputs.get(name) else {
                warn!(artifact = name, "No content generated");
                outcomes.insert(
                    name.to_string(),
                    ArtifactOutcome {
                        message: format!("No code was generated for `{name}`."),
                        succeeded: false,
                        executed: false,
                    },
                );
                continue;
            };

            let outcome = self.check_artifact(name, content)?;
            trajectories
                .entry(name.to_string())
                .or_insert_with(|| Trajectory::new(self.settings.trajectory_window))
                .push(content.as_str());
            outcomes.insert(name.to_string(), outcome);
        }

        Ok(StepReport {
            step,
            all_succeeded: outcomes.values().all(|o| o.succeeded),
            outcomes,
        })
    }

    fn check_artifact(&self, name: &str, content: &str) -> Result<ArtifactOutcome, CodeloopError> {
        let artifact = self.graph.get(name)?;
        let path = self.graph.path_on_disk(name)?;
        persist_artifact(
            name,
            &path,
            content,
            self.extras.get(name).map(String::as_str),
        )?;

        if let Some(template) = self.templates.get(name) {
            let conformance = validate(Some(template), content, &self.settings.sentinel);
            if !conformance.valid {
                warn!(artifact = name, "Generated content does not conform to its template");
                return Ok(ArtifactOutcome {
                    message: conformance
                        .feedback
                        .unwrap_or_else(|| violation_message(&self.settings.sentinel)),
                    succeeded: false,
                    executed: false,
                });
            }
        }

        let location = self.graph.qualified_location(artifact);
        let outcome = self.executor.execute(&location, artifact.language())?;
        if let ExecutionOutcome::TimedOut { timeout_seconds } = outcome {
            warn!(artifact = name, timeout_seconds, "Artifact execution timed out");
        }

        let message = outcome.into_message(&self.settings.success_message);
        let succeeded = message == self.settings.success_message;
        debug!(artifact = name, succeeded, "Artifact checked");

        Ok(ArtifactOutcome {
            message,
            succeeded,
            executed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codeloop_llm::{Field, LlmError, Signature};
    use codeloop_runner::{CommandSpec, ExecutionPlan, ProcessOutput, RunnerError};
    use codeloop_utils::Language;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct QueuedGenerator {
        responses: Mutex<Vec<GeneratedOutputs>>,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl QueuedGenerator {
        fn new(responses: Vec<Vec<(&str, &str)>>) -> Self {
            let responses = responses
                .into_iter()
                .rev()
                .map(|fields| {
                    fields
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect()
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl Generator for QueuedGenerator {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<GeneratedOutputs, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| LlmError::Transport("no more responses".to_string()))
        }
    }

    // Fails when the written file contains "raise".
    struct FileCheckingRunner {
        root: std::path::PathBuf,
    }

    impl ProcessRunner for FileCheckingRunner {
        fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
            let module = cmd.args.last().cloned().unwrap_or_default();
            let module = module.to_string_lossy().replace('.', "/");
            let source = std::fs::read_to_string(self.root.join(format!("{module}.py")))
                .unwrap_or_default();
            if source.contains("raise") {
                Ok(ProcessOutput::new(b"Traceback".to_vec(), Some(1)))
            } else {
                Ok(ProcessOutput::new(Vec::new(), Some(0)))
            }
        }
    }

    fn setup(
        dir: &TempDir,
        responses: Vec<Vec<(&str, &str)>>,
        settings: RefineSettings,
    ) -> Refiner<QueuedGenerator, FileCheckingRunner> {
        let mut graph = ArtifactGraph::new(dir.path(), Language::Python).unwrap();
        graph.add_artifact("proj/solution").unwrap();
        graph.initialize_modules().unwrap();

        let plan = ExecutionPlan {
            root: dir.path().to_path_buf(),
            ..ExecutionPlan::default()
        };
        let runner = FileCheckingRunner {
            root: dir.path().to_path_buf(),
        };
        Refiner::new(
            QueuedGenerator::new(responses),
            Executor::new(runner, plan),
            graph,
            settings,
        )
    }

    fn base() -> GenerationRequest {
        GenerationRequest::new(
            Signature::new("Solve.")
                .input(Field::plain("problem", "Problem"))
                .output(Field::plain("explanation", "Why"))
                .output(Field::code("solution", Language::Python, "Code")),
        )
        .with_input("problem", "p")
    }

    #[tokio::test]
    async fn test_early_exit_on_first_success() {
        let dir = TempDir::new().unwrap();
        let refiner = setup(
            &dir,
            vec![vec![("explanation", "e"), ("solution", "x = 1")]],
            RefineSettings::default(),
        );

        let output = refiner.refine(&base()).await.unwrap();
        assert_eq!(output.status, Terminal::AllSucceeded);
        assert_eq!(output.steps_taken, 1);
        assert_eq!(refiner.generator.requests.lock().unwrap().len(), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("proj/solution.py")).unwrap(),
            "x = 1"
        );
    }

    #[tokio::test]
    async fn test_feedback_is_attached_after_failure() {
        let dir = TempDir::new().unwrap();
        let refiner = setup(
            &dir,
            vec![
                vec![("explanation", "e"), ("solution", "raise ValueError")],
                vec![("explanation", "e"), ("solution", "x = 2")],
            ],
            RefineSettings::default(),
        );

        let output = refiner.refine(&base()).await.unwrap();
        assert_eq!(output.status, Terminal::AllSucceeded);
        assert_eq!(output.steps_taken, 2);
        assert_eq!(output.steps[0].outcomes["solution"].message, "Traceback");

        let requests = refiner.generator.requests.lock().unwrap();
        assert!(!requests[0].inputs.contains_key("solution_outcome"));
        assert_eq!(
            requests[1].inputs["solution_attempts"],
            codeloop_llm::FieldValue::List(vec!["raise ValueError".to_string()])
        );
    }

    #[tokio::test]
    async fn test_non_conforming_content_is_not_executed() {
        let dir = TempDir::new().unwrap();
        let refiner = setup(
            &dir,
            vec![vec![("explanation", "e"), ("solution", "print('free form')")]],
            RefineSettings {
                max_steps: 1,
                ..RefineSettings::default()
            },
        )
        .with_template("solution", "def f():\n    # TODO: body\n    ...\n");

        let output = refiner.refine(&base()).await.unwrap();
        assert_eq!(output.status, Terminal::StepBudgetExhausted);
        let outcome = &output.steps[0].outcomes["solution"];
        assert!(!outcome.executed);
        assert_eq!(outcome.message, violation_message("# TODO:"));
        assert_eq!(output.failing(), vec!["solution"]);
    }

    #[tokio::test]
    async fn test_missing_code_output_fails_the_step() {
        let dir = TempDir::new().unwrap();
        let refiner = setup(
            &dir,
            vec![
                vec![("explanation", "nothing to show")],
                vec![("explanation", "e"), ("solution", "x = 1")],
            ],
            RefineSettings {
                max_steps: 2,
                ..RefineSettings::default()
            },
        );

        let output = refiner.refine(&base()).await.unwrap();
        assert_eq!(output.status, Terminal::AllSucceeded);
        assert_eq!(output.steps_taken, 2);

        let first = &output.steps[0];
        assert!(!first.all_succeeded);
        assert!(!first.outcomes["solution"].executed);
        assert_eq!(
            first.outcomes["solution"].message,
            "No code was generated for `solution`."
        );

        let requests = refiner.generator.requests.lock().unwrap();
        assert_eq!(
            requests[1].inputs["solution_outcome"],
            codeloop_llm::FieldValue::text("No code was generated for `solution`.")
        );
        assert_eq!(
            requests[1].inputs["solution_attempts"],
            codeloop_llm::FieldValue::List(Vec::new())
        );
    }

    #[tokio::test]
    async fn test_only_missing_outputs_exhaust_the_budget() {
        let dir = TempDir::new().unwrap();
        let refiner = setup(
            &dir,
            vec![vec![("explanation", "e")]],
            RefineSettings {
                max_steps: 1,
                ..RefineSettings::default()
            },
        );

        let output = refiner.refine(&base()).await.unwrap();
        assert_eq!(output.status, Terminal::StepBudgetExhausted);
        assert_eq!(output.failing(), vec!["solution"]);
        assert!(!dir.path().join("proj/solution.py").exists());
    }

    #[tokio::test]
    async fn test_unknown_code_output_is_fatal() {
        let dir = TempDir::new().unwrap();
        let refiner = setup(
            &dir,
            vec![vec![("explanation", "e"), ("solution", "x"), ("test", "y")]],
            RefineSettings::default(),
        );
        let request = GenerationRequest::new(
            base()
                .signature
                .output(Field::code("test", Language::Python, "Tests")),
        );

        let err = refiner.refine(&request).await.unwrap_err();
        assert!(matches!(err, CodeloopError::Graph(_)));
    }
}
