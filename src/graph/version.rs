//! Version computation (3. *Version*, 4.5): a content hash per action,
//! folding in kind+name+type, tracked source files, resolved structural
//! fields, and dependency versions, computed in topological order so a
//! dependency's version is always available before its dependants need it.

use super::Edge;
use crate::action::ActionConfig;
use crate::core::error::GardenError;
use crate::core::model::{ActionKind, ActionRef};
use crate::core::vcs::VcsHashProvider;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Return `actions` in dependency order (a dependency always precedes its
/// dependants). Assumes the graph has already passed cycle detection.
pub fn topo_order(
    actions: &IndexMap<ActionRef, ActionConfig>,
    dependencies: &HashMap<ActionRef, Vec<Edge>>,
) -> Vec<ActionRef> {
    let mut order = Vec::with_capacity(actions.len());
    let mut visited: HashSet<ActionRef> = HashSet::new();

    fn visit(
        action_ref: &ActionRef,
        dependencies: &HashMap<ActionRef, Vec<Edge>>,
        visited: &mut HashSet<ActionRef>,
        order: &mut Vec<ActionRef>,
    ) {
        if !visited.insert(action_ref.clone()) {
            return;
        }
        if let Some(edges) = dependencies.get(action_ref) {
            for edge in edges {
                visit(&edge.to, dependencies, visited, order);
            }
        }
        order.push(action_ref.clone());
    }

    for action_ref in actions.keys() {
        visit(action_ref, dependencies, &mut visited, &mut order);
    }
    order
}

/// Compute every action's version, in topological order, via a SHA-256 of
/// its identity, tracked source files, resolved structural fields (minus
/// `spec`/`variables`, which only contribute via `cache.exclude`-governed
/// paths — left to the Solver's Resolve stage, since only it can see their
/// fully-evaluated form), and its dependencies' versions.
pub fn compute_versions(
    actions: &IndexMap<ActionRef, ActionConfig>,
    dependencies: &HashMap<ActionRef, Vec<Edge>>,
    project_root: &Path,
    hasher: &dyn VcsHashProvider,
    default_cache_exclude: &[String],
) -> Result<HashMap<ActionRef, String>, GardenError> {
    let order = topo_order(actions, dependencies);
    let mut versions: HashMap<ActionRef, String> = HashMap::with_capacity(actions.len());

    for action_ref in order {
        let Some(action) = actions.get(&action_ref) else {
            continue; // augmentation may list an edge to an action not in this pass
        };
        let mut digest = Sha256::new();
        digest.update(action.kind.as_str().as_bytes());
        digest.update(b":");
        digest.update(action.name.as_bytes());
        digest.update(b":");
        digest.update(action.type_name.as_bytes());

        let source_root = action
            .source
            .as_ref()
            .map(|s| project_root.join(&s.path))
            .unwrap_or_else(|| project_root.to_path_buf());
        let mut files = hasher.tracked_files(&source_root, &action.include, &action.exclude)?;
        files.sort();
        for file in &files {
            digest.update(file.path.to_string_lossy().as_bytes());
            digest.update(file.hash.as_bytes());
        }

        let mut exclude: Vec<&str> = default_cache_exclude.iter().map(String::as_str).collect();
        exclude.extend(action.cache_exclude.iter().map(String::as_str));
        exclude.sort_unstable();
        for path in exclude {
            digest.update(path.as_bytes());
        }

        digest.update(action.disabled.to_string().as_bytes());
        digest.update(action.timeout.unwrap_or_default().to_string().as_bytes());
        digest.update(action.mode.as_str().as_bytes());

        // 3. *Version*: only build dependencies' versions are folded in
        // unconditionally; a process-edge dependency (e.g. a Deploy's
        // implicit edge to a Run it doesn't build from) would over-
        // invalidate the cache on every unrelated change to that Run. A
        // status edge that names one of its dependency's *static* outputs
        // contributes too (the "resolved values of any template references
        // to dependency actions' static outputs" clause) — the dependency's
        // own version stands in for that resolved value here, since the
        // Graph Builder runs before any plugin has actually computed it;
        // the referenced key is folded in alongside it so two different
        // static-output references to the same dependency don't collapse
        // into one contribution.
        if let Some(edges) = dependencies.get(&action_ref) {
            let mut dep_versions: Vec<(String, String)> = edges
                .iter()
                .filter(|e| {
                    let is_build_dependency = actions.get(&e.to).is_some_and(|a| a.kind == ActionKind::Build);
                    is_build_dependency || e.static_output_key.is_some()
                })
                .filter_map(|e| {
                    versions.get(&e.to).map(|v| {
                        let name = match &e.static_output_key {
                            Some(key) => format!("{}#outputs.{key}", e.to),
                            None => e.to.to_string(),
                        };
                        (name, v.clone())
                    })
                })
                .collect();
            dep_versions.sort();
            dep_versions.dedup();
            for (name, version) in dep_versions {
                digest.update(name.as_bytes());
                digest.update(version.as_bytes());
            }
        }

        let hash = hex::encode(digest.finalize());
        versions.insert(action_ref, format!("v-{hash}"));
    }

    Ok(versions)
}
