//! Graph Builder (4.5): turns a flat list of [`ActionConfig`]s into a
//! validated, immutable [`Graph`] with typed edges (status vs process,
//! per the status-vs-process invariant the Solver relies on) and a
//! content-addressed `version` per action.

pub mod version;

use crate::action::ActionConfig;
use crate::core::error::GardenError;
use crate::core::model::{ActionKind, ActionRef};
use crate::core::vcs::VcsHashProvider;
use crate::template::ActionPathField;
use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::path::Path;

/// Whether a dependency edge can be satisfied by a `Status` task alone, or
/// requires the dependency's `Process` task to have actually run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// The dependent only reads the dependency's version or a pre-execution
    /// ("static") output; `Status(dependency)` is sufficient.
    Status,
    /// The dependent reads an output only known after the dependency has
    /// actually been processed.
    Process,
}

/// Whether an edge came from an action's explicit `dependencies`/`build`
/// fields, or was discovered by scanning `spec`/`variables` for a template
/// reference to another action. The Solver's task graph construction
/// (4.6) treats these differently: `Status(A)` only waits on `Declared`
/// dependencies, while `Resolve(A)` only waits on `Implicit` ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeSource {
    Declared,
    Implicit,
}

/// One dependency edge from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: ActionRef,
    pub to: ActionRef,
    pub kind: EdgeKind,
    pub source: EdgeSource,
    /// Set when this is a `Status` edge discovered from a reference to one
    /// of `to`'s *static* outputs (3. *Version*'s "resolved values of any
    /// template references to dependency actions' static outputs"). Carries
    /// the referenced output key so [`version::compute_versions`] can fold
    /// that contribution into the dependent's hash. `None` for declared
    /// dependencies, `build` edges, and `version` references, none of which
    /// name a specific output.
    pub static_output_key: Option<String>,
}

/// A provider's opportunity to contribute additional actions/edges after
/// the initial graph is built. Mirrors the Solver's `Plugin::augment_graph`
/// hook but is kept decoupled here so the Graph Builder has no dependency
/// on the solver module.
pub type AugmentHook = fn(&Graph) -> Vec<ActionConfig>;

/// An immutable action dependency graph.
#[derive(Debug, Clone)]
pub struct Graph {
    actions: IndexMap<ActionRef, ActionConfig>,
    /// Forward edges: action -> the actions it depends on.
    dependencies: HashMap<ActionRef, Vec<Edge>>,
    /// Reverse edges: action -> the actions that depend on it.
    dependants: HashMap<ActionRef, Vec<ActionRef>>,
    versions: HashMap<ActionRef, String>,
}

impl Graph {
    /// Look up an action config by its `(kind, name)` identity.
    #[must_use]
    pub fn action(&self, action_ref: &ActionRef) -> Option<&ActionConfig> {
        self.actions.get(action_ref)
    }

    /// Every action of a given kind, in discovery order.
    pub fn actions_of_kind(&self, kind: ActionKind) -> impl Iterator<Item = &ActionConfig> {
        self.actions.values().filter(move |a| a.kind == kind)
    }

    /// All actions in the graph, in discovery order.
    pub fn all_actions(&self) -> impl Iterator<Item = &ActionConfig> {
        self.actions.values()
    }

    /// The edges `action_ref` depends on.
    #[must_use]
    pub fn dependencies(&self, action_ref: &ActionRef) -> &[Edge] {
        self.dependencies.get(action_ref).map_or(&[], Vec::as_slice)
    }

    /// The actions that depend on `action_ref`.
    #[must_use]
    pub fn dependants(&self, action_ref: &ActionRef) -> &[ActionRef] {
        self.dependants.get(action_ref).map_or(&[], Vec::as_slice)
    }

    /// The computed content-hash version of `action_ref`, if it exists.
    #[must_use]
    pub fn version(&self, action_ref: &ActionRef) -> Option<&str> {
        self.versions.get(action_ref).map(String::as_str)
    }

    /// Actions in topological order (dependencies before dependants).
    #[must_use]
    pub fn topo_order(&self) -> Vec<ActionRef> {
        version::topo_order(&self.actions, &self.dependencies)
    }
}

/// Build and validate a [`Graph`] from a flat action list, computing every
/// action's version along the way. `augment` is called once after the
/// initial graph passes validation; any configs it returns are merged in
/// and the whole graph is re-validated (augmentation cannot remove or
/// mutate existing actions, per 4.5).
pub fn build_graph(
    actions: Vec<ActionConfig>,
    project_root: &Path,
    hasher: &dyn VcsHashProvider,
    default_cache_exclude: &[String],
    augment: Option<AugmentHook>,
) -> Result<Graph, GardenError> {
    let mut graph = build_once(actions, project_root, hasher, default_cache_exclude)?;

    if let Some(hook) = augment {
        let additions = hook(&graph);
        if !additions.is_empty() {
            let mut combined: Vec<ActionConfig> = graph.actions.into_values().collect();
            combined.extend(additions);
            graph = build_once(combined, project_root, hasher, default_cache_exclude)?;
        }
    }

    Ok(graph)
}

fn build_once(
    actions: Vec<ActionConfig>,
    project_root: &Path,
    hasher: &dyn VcsHashProvider,
    default_cache_exclude: &[String],
) -> Result<Graph, GardenError> {
    let mut by_ref: IndexMap<ActionRef, ActionConfig> = IndexMap::new();
    for action in actions {
        let action_ref = action.action_ref();
        if by_ref.insert(action_ref.clone(), action).is_some() {
            return Err(GardenError::Validation {
                reason: format!("duplicate action '{action_ref}'"),
            });
        }
    }

    let mut dependencies: HashMap<ActionRef, Vec<Edge>> = HashMap::new();
    let mut dependants: HashMap<ActionRef, Vec<ActionRef>> = HashMap::new();

    for action in by_ref.values() {
        let from = action.action_ref();
        let mut edges: Vec<Edge> = Vec::new();

        for dep in &action.dependencies {
            require_exists(&by_ref, dep, &from)?;
            edges.push(Edge {
                from: from.clone(),
                to: dep.clone(),
                kind: EdgeKind::Status,
                source: EdgeSource::Declared,
                static_output_key: None,
            });
        }

        if let Some(build_name) = &action.build {
            let build_ref = ActionRef::new(ActionKind::Build, build_name.clone());
            require_kind(&by_ref, &build_ref, ActionKind::Build, &from)?;
            if !edges.iter().any(|e| e.to == build_ref) {
                edges.push(Edge {
                    from: from.clone(),
                    to: build_ref,
                    kind: EdgeKind::Status,
                    source: EdgeSource::Declared,
                    static_output_key: None,
                });
            }
        }

        for (node, _source) in [(&action.spec, "spec"), (&action.variables, "variables")] {
            let mut refs = Vec::new();
            node.scan_action_refs(&mut refs);
            for r in refs {
                let Ok(kind) = r.kind.parse::<ActionKind>() else {
                    continue;
                };
                let to = ActionRef::new(kind, r.name);
                require_exists(&by_ref, &to, &from)?;
                // A Build's outputs (e.g. an image reference) are knowable
                // before it runs, so a reference to them only needs
                // Status(to); every other kind's outputs are only known
                // once it has actually been processed (3. *Version*,
                // glossary "Static output"/"Runtime output").
                let (edge_kind, static_output_key) = match &r.field {
                    ActionPathField::Version => (EdgeKind::Status, None),
                    ActionPathField::Outputs { key } if to.kind == ActionKind::Build => {
                        (EdgeKind::Status, Some(key.clone()))
                    }
                    ActionPathField::Outputs { .. } => (EdgeKind::Process, None),
                };
                if !edges.iter().any(|e| {
                    e.to == to && e.kind == edge_kind && e.source == EdgeSource::Implicit && e.static_output_key == static_output_key
                }) {
                    edges.push(Edge {
                        from: from.clone(),
                        to,
                        kind: edge_kind,
                        source: EdgeSource::Implicit,
                        static_output_key,
                    });
                }
            }
        }

        for edge in &edges {
            dependants.entry(edge.to.clone()).or_default().push(from.clone());
        }
        dependencies.insert(from, edges);
    }

    detect_cycles(&by_ref, &dependencies)?;

    let versions = version::compute_versions(&by_ref, &dependencies, project_root, hasher, default_cache_exclude)?;

    Ok(Graph {
        actions: by_ref,
        dependencies,
        dependants,
        versions,
    })
}

fn require_exists(
    actions: &IndexMap<ActionRef, ActionConfig>,
    target: &ActionRef,
    from: &ActionRef,
) -> Result<(), GardenError> {
    if actions.contains_key(target) {
        Ok(())
    } else {
        Err(GardenError::Validation {
            reason: format!("'{from}' depends on unknown action '{target}'"),
        })
    }
}

fn require_kind(
    actions: &IndexMap<ActionRef, ActionConfig>,
    target: &ActionRef,
    expected: ActionKind,
    from: &ActionRef,
) -> Result<(), GardenError> {
    match actions.get(target) {
        Some(action) if action.kind == expected => Ok(()),
        Some(action) => Err(GardenError::Validation {
            reason: format!(
                "'{from}' references '{target}' as a {expected} dependency, but it is a {}",
                action.kind
            ),
        }),
        None => Err(GardenError::Validation {
            reason: format!("'{from}' references unknown action '{target}'"),
        }),
    }
}

/// Detect dependency cycles with Tarjan's SCC algorithm, reporting every
/// cycle found (not just the first), per 4.5's "produce an error naming
/// every cycle."
fn detect_cycles(
    actions: &IndexMap<ActionRef, ActionConfig>,
    dependencies: &HashMap<ActionRef, Vec<Edge>>,
) -> Result<(), GardenError> {
    let mut graph = DiGraph::<ActionRef, ()>::new();
    let mut indices: HashMap<ActionRef, NodeIndex> = HashMap::new();
    for action_ref in actions.keys() {
        indices.insert(action_ref.clone(), graph.add_node(action_ref.clone()));
    }
    for (from, edges) in dependencies {
        for edge in edges {
            graph.add_edge(indices[from], indices[&edge.to], ());
        }
    }

    let cycles: Vec<String> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .map(|scc| {
            scc.iter()
                .map(|idx| graph[*idx].to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        })
        .collect();

    if cycles.is_empty() {
        Ok(())
    } else {
        Err(GardenError::Validation {
            reason: format!("dependency cycle(s) detected: {}", cycles.join("; ")),
        })
    }
}
