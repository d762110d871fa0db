use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use super::common::to_json;
use crate::engine::project::problem_solving_graph;
use crate::{ArtifactGraph, CodeloopError, Config, ExitCode};

#[derive(Debug, Serialize)]
struct GraphSummary {
    root: String,
    language: String,
    order: Vec<String>,
    locations: IndexMap<String, String>,
    dependencies: IndexMap<String, Vec<String>>,
    reference_hints: IndexMap<String, Vec<String>>,
}

fn summarize(graph: &ArtifactGraph) -> Result<GraphSummary, CodeloopError> {
    let locations = graph
        .location_map()
        .into_iter()
        .map(|(name, path)| (name, path.display().to_string()))
        .collect();
    let dependencies = graph
        .dependency_map()
        .into_iter()
        .map(|(name, deps)| {
            let deps = deps.iter().map(|p| p.display().to_string()).collect();
            (name, deps)
        })
        .collect();

    let mut reference_hints = IndexMap::new();
    for name in graph.names() {
        let hints = graph.reference_hints(name)?;
        if !hints.is_empty() {
            reference_hints.insert(name.to_string(), hints);
        }
    }

    Ok(GraphSummary {
        root: graph.root().display().to_string(),
        language: graph.language().to_string(),
        order: graph.topological_order()?,
        locations,
        dependencies,
        reference_hints,
    })
}

/// Print the scaffold graph for the configured project.
pub fn execute_graph_command(json: bool, config: &Config) -> Result<ExitCode> {
    let graph = problem_solving_graph(
        &config.project.root,
        &config.project.name,
        config.project.language.clone(),
    )?;
    let summary = summarize(&graph)?;

    if json {
        println!("{}", to_json(&summary)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("Project root: {} ({})", summary.root, summary.language);
    println!("\nArtifacts (dependency order):");
    for name in &summary.order {
        let location = summary.locations.get(name).map_or("?", String::as_str);
        println!("  {name:<10} {location}");
    }

    println!("\nDependencies:");
    for (name, deps) in &summary.dependencies {
        if !deps.is_empty() {
            println!("  {name} -> {}", deps.join(", "));
        }
    }

    println!("\nReference hints:");
    for (name, hints) in &summary.reference_hints {
        println!("  {name}:");
        for hint in hints {
            println!("    {hint}");
        }
    }

    Ok(ExitCode::SUCCESS)
}
