//! CLI argument definitions and parsing structures
//!
//! Global flags feed the configuration layer (`CliArgs`); subcommand flags
//! that also exist in the config file override it the same way.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::CliArgs;

/// codeloop - generate, execute and repair code projects with an LLM
#[derive(Parser, Debug)]
#[command(name = "codeloop")]
#[command(about = "Generate, execute and iteratively repair multi-file code projects with an LLM")]
#[command(long_about = r#"
codeloop asks a language model for a solution to an algorithmic problem together
with its tests and performance probes, writes them into a project directory,
runs each artifact and feeds failures back to the model until everything passes
or the step budget is spent.

EXAMPLES:
  # Solve a problem with test cases
  codeloop solve --problem problem.md --cases cases.json

  # Constrain the solution to a scaffold
  codeloop solve --problem problem.md --template solution=scaffold.py

  # Check a candidate against a template
  codeloop validate --template scaffold.py --candidate solution.py

  # Show the project layout and dependency hints
  codeloop graph --json

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .codeloop/config.toml
  Use --config to specify an explicit config file path
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Model to use for LLM provider calls
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// LLM provider to use (openrouter)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// Project directory name, relative to the project root
    #[arg(long, global = true)]
    pub project_name: Option<String>,

    /// Working directory artifacts are written under and executed from
    #[arg(long, global = true)]
    pub project_root: Option<PathBuf>,

    /// Artifact language (python)
    #[arg(long, global = true)]
    pub language: Option<String>,

    /// Sentinel marking mutable template regions
    #[arg(long, global = true)]
    pub sentinel: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a solution, tests and measurements, then repair them until they run
    ///
    /// Prints a JSON summary to stdout. Exits with 4 when the step budget is
    /// exhausted while some artifact still fails.
    ///
    /// EXAMPLES:
    ///   codeloop solve --problem problem.md --cases cases.json --steps 5
    ///   codeloop solve --problem problem.md --template solution=scaffold.py
    Solve {
        /// File holding the problem statement
        #[arg(long)]
        problem: PathBuf,

        /// JSON file with an array of [inputs, outputs] pairs
        #[arg(long)]
        cases: Option<PathBuf>,

        /// Maximum refinement steps
        #[arg(long)]
        steps: Option<u32>,

        /// Attempts kept per artifact (0 keeps all)
        #[arg(long)]
        trajectory_len: Option<usize>,

        /// Template an artifact must conform to, as NAME=PATH
        #[arg(long = "template", value_name = "NAME=PATH", value_parser = parse_named_path)]
        templates: Vec<(String, PathBuf)>,

        /// Code appended to an artifact when it is written, as NAME=PATH
        #[arg(long = "extra", value_name = "NAME=PATH", value_parser = parse_named_path)]
        extras: Vec<(String, PathBuf)>,

        /// Seconds allowed per artifact command
        #[arg(long)]
        execution_timeout: Option<u64>,

        /// Program used to run artifacts (e.g. uv)
        #[arg(long)]
        runner: Option<String>,
    },

    /// Check that a candidate only edits a template inside marked regions
    ///
    /// Prints `{"valid": bool, "feedback": ...}`. Exits with 3 when the
    /// candidate does not conform.
    ///
    /// EXAMPLES:
    ///   codeloop validate --template scaffold.py --candidate solution.py
    ///   codeloop validate --template scaffold.py --candidate solution.py --sentinel "# EDIT:"
    Validate {
        /// Template file
        #[arg(long)]
        template: PathBuf,

        /// Candidate file
        #[arg(long)]
        candidate: PathBuf,
    },

    /// Show artifact locations, dependencies and reference hints of the project scaffold
    Graph {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Parse `NAME=PATH`.
pub fn parse_named_path(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected NAME=PATH, got '{value}'")),
    }
}

impl Cli {
    /// Values this invocation contributes to the configuration layer.
    #[must_use]
    pub fn config_args(&self) -> CliArgs {
        let mut args = CliArgs {
            config_path: self.config.clone(),
            sentinel: self.sentinel.clone(),
            project_name: self.project_name.clone(),
            project_root: self.project_root.clone(),
            language: self.language.clone(),
            provider: self.llm_provider.clone(),
            model: self.model.clone(),
            ..CliArgs::default()
        };

        if let Commands::Solve {
            steps,
            trajectory_len,
            execution_timeout,
            runner,
            ..
        } = &self.command
        {
            args.steps = *steps;
            args.trajectory_len = *trajectory_len;
            args.execution_timeout = *execution_timeout;
            args.runner_program = runner.clone();
        }

        args
    }
}
