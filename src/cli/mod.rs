//! A thin `clap`-derived binary shim over the Config->Graph->Solver core.
//!
//! This is explicitly not the deliverable (see spec §1's Non-goals): it
//! exists only so the pipeline can be exercised end-to-end from a
//! terminal without any real plugins registered. It loads a project,
//! converts legacy modules, builds the graph, and either prints it
//! (`validate`/`graph`) or drives the solver with an empty
//! [`PluginRegistry`] (`run`), which is only useful for actions whose
//! types have no plugin registered, surfacing a `Plugin` error for those
//! that do. Real command parsing, output rendering, and plugin wiring
//! live outside this core crate.

use crate::core::env::CoreEnv;
use crate::core::error::GardenError;
use crate::core::model::{ActionKind, ActionRef};
use crate::core::vcs::FilesystemHashProvider;
use crate::graph::{build_graph, Graph};
use crate::loader::{load_project, LoadedProject};
use crate::solver::scheduler::{Operation, Scheduler};
use crate::solver::{EventBus, PluginRegistry};
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// The `garden` command-line interface.
#[derive(Debug, Parser)]
#[command(name = "garden", version, about = "Config->Graph->Solver pipeline for development automation")]
pub struct Cli {
    /// Project root directory. Defaults to the current directory.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Environment name. Defaults to the project's `defaultEnvironment`.
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Print debug-level logs even without `RUST_LOG` set.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the project, build the graph, and report any errors.
    Validate,
    /// Print every action in the graph and its dependency edges.
    Graph,
    /// Drive the solver for the given actions with no plugins registered.
    ///
    /// Useful only to exercise scheduling/caching behavior against action
    /// types that have no real side effects; any action whose `type` would
    /// need a registered plugin fails with a `Plugin` error.
    Run {
        /// `<kind>.<name>` references, e.g. `deploy.api`.
        targets: Vec<String>,
        /// Force reprocessing even if `Status` reports `ready`.
        #[arg(long)]
        force: bool,
    },
}

/// Logging configuration derived from CLI flags and `RUST_LOG`, handed to
/// `main` so it can initialize `tracing_subscriber` before running a
/// command.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub verbose: bool,
}

impl Cli {
    /// Derive the logging configuration implied by this invocation's
    /// flags, before any subcommand runs.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            verbose: self.verbose,
        }
    }

    /// Run the selected subcommand to completion.
    pub async fn execute(&self) -> Result<(), GardenError> {
        let root = self
            .root
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        let loaded = load_project(&root, self.env.as_deref())?;
        let graph = build_action_graph(&root, &loaded)?;

        match &self.command {
            Command::Validate => {
                println!(
                    "project '{}' ({} actions) validated OK",
                    loaded.project.name,
                    graph.all_actions().count()
                );
                Ok(())
            }
            Command::Graph => {
                print_graph(&graph);
                Ok(())
            }
            Command::Run { targets, force } => {
                run_targets(&root, graph, targets, *force).await
            }
        }
    }
}

fn build_action_graph(root: &std::path::Path, loaded: &LoadedProject) -> Result<Graph, GardenError> {
    let mut actions = loaded.actions.clone();
    crate::convert::convert_modules(&loaded.modules, &mut actions, None)?;

    let hasher = FilesystemHashProvider;
    build_graph(actions, root, &hasher, &[], None)
}

fn print_graph(graph: &Graph) {
    for action_ref in graph.topo_order() {
        let version = graph.version(&action_ref).unwrap_or("<unknown>");
        println!("{action_ref}  [{version}]");
        for edge in graph.dependencies(&action_ref) {
            println!("  -> {} ({:?}/{:?})", edge.to, edge.kind, edge.source);
        }
    }
}

async fn run_targets(
    root: &std::path::Path,
    graph: Graph,
    targets: &[String],
    force: bool,
) -> Result<(), GardenError> {
    let parsed: Vec<ActionRef> = targets
        .iter()
        .map(|t| parse_action_ref(t))
        .collect::<Result<_, _>>()?;

    let operation = parsed
        .first()
        .map(|r| operation_for_kind(r.kind))
        .unwrap_or(Operation::Deploy);

    let env = CoreEnv::new(root.to_path_buf(), Uuid::new_v4());
    let scheduler = Scheduler::new(std::sync::Arc::new(graph), PluginRegistry::new(), env, EventBus::default());

    let base_context: std::sync::Arc<dyn crate::template::EvalContext> =
        std::sync::Arc::new(crate::context::ProjectContext::new(String::new(), root.to_path_buf()).with_process_env());

    let force_set: HashSet<ActionRef> = if force { parsed.iter().cloned().collect() } else { HashSet::new() };

    let result = scheduler.run(operation, &parsed, &force_set, base_context).await;

    println!(
        "succeeded={} failed={} cancelled={} aborted={}",
        result.succeeded.len(),
        result.failed.len(),
        result.cancelled.len(),
        result.aborted
    );

    if result.success {
        Ok(())
    } else {
        Err(GardenError::Internal {
            message: format!("operation failed: {} action(s) failed", result.failed.len()),
        })
    }
}

fn operation_for_kind(kind: ActionKind) -> Operation {
    match kind {
        ActionKind::Build => Operation::Build,
        ActionKind::Deploy => Operation::Deploy,
        ActionKind::Run => Operation::Run,
        ActionKind::Test => Operation::Test,
    }
}

fn parse_action_ref(raw: &str) -> Result<ActionRef, GardenError> {
    let (kind, name) = raw.split_once('.').ok_or_else(|| GardenError::Configuration {
        document: raw.to_string(),
        reason: "expected '<kind>.<name>', e.g. 'deploy.api'".to_string(),
    })?;
    let kind = ActionKind::from_str(kind).map_err(|reason| GardenError::Configuration {
        document: raw.to_string(),
        reason,
    })?;
    Ok(ActionRef::new(kind, name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_dot_name() {
        let r = parse_action_ref("deploy.api").unwrap();
        assert_eq!(r.kind, ActionKind::Deploy);
        assert_eq!(r.name, "api");
    }

    #[test]
    fn rejects_missing_dot() {
        assert!(parse_action_ref("deployapi").is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(parse_action_ref("frobnicate.api").is_err());
    }
}
