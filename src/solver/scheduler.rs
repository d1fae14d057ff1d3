//! The actual executor (4.6 "Task graph construction", "Scheduling
//! model", "Cancellation", "Timeouts"): turns a [`Graph`] plus a set of
//! requested targets into a task forest of `Resolve`/`Status`/`Process`
//! tasks and drives it to completion.
//!
//! The forest is built once, up front, as a plain dependency map — no
//! different from the Graph Builder's own edge list, just one level more
//! granular (three tasks per action instead of one node). A single loop
//! (5. "A single logical scheduler thread owns task state") pulls ready
//! tasks off a deterministic queue, hands each to a `tokio::spawn`'d
//! future bounded by a per-kind `Semaphore`, and folds results back in as
//! they complete via a `tokio::task::JoinSet`. Nothing here runs two
//! pieces of scheduler bookkeeping concurrently with each other — only
//! the plugin invocations themselves run in parallel.

use crate::action::ActionConfig;
use crate::core::env::{CoreEnv, FailurePolicy};
use crate::core::error::GardenError;
use crate::core::model::ActionRef;
use crate::graph::{EdgeKind, EdgeSource, Graph};
use crate::solver::cache::{ResultCache, StatusCache};
use crate::solver::context::build_resolve_context;
use crate::solver::events::{EventBus, TaskState as EventState};
use crate::solver::plugin::{PluginRegistry, ResolvedAction};
use crate::solver::{OperationResult, ResultState, TaskId, TaskKind, TaskResult};
use crate::template::{deep_evaluate, evaluate, to_garden_error, EvalContext, TemplateValue};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// The operation kind a run is performed for (6. "Action config schema",
/// 4.6 "given ... an operation kind"). Only `Cleanup` changes which
/// plugin handler a `Process` task invokes (`deploy.delete` rather than
/// `deploy.deploy`, etc.) — everything else about task construction is
/// identical regardless of `Operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Build,
    Deploy,
    Run,
    Test,
    Cleanup,
}

fn terminal(state: ResultState, error: Option<String>, started: SystemTime) -> TaskResult {
    TaskResult {
        state,
        outputs: IndexMap::new(),
        detail: None,
        started_at: started,
        completed_at: SystemTime::now(),
        error,
    }
}

/// One task's static dependency set, built once from the graph and never
/// mutated afterward.
struct Forest {
    deps: HashMap<TaskId, Vec<TaskId>>,
    dependants: HashMap<TaskId, Vec<TaskId>>,
    /// Actions that get a `Process` task: requested targets, plus anything
    /// reached through a process-edge from another forest member.
    process_actions: HashSet<ActionRef>,
}

/// Build the task forest for `targets` and their transitive dependencies,
/// per 4.6's "Task graph construction".
fn build_forest(graph: &Graph, targets: &[ActionRef]) -> Forest {
    let mut needed: HashSet<ActionRef> = HashSet::new();
    let mut process_actions: HashSet<ActionRef> = HashSet::new();
    let mut stack: Vec<ActionRef> = targets.to_vec();
    process_actions.extend(targets.iter().cloned());

    while let Some(action_ref) = stack.pop() {
        if !needed.insert(action_ref.clone()) {
            continue;
        }
        for edge in graph.dependencies(&action_ref) {
            if edge.kind == EdgeKind::Process {
                process_actions.insert(edge.to.clone());
            }
            if !needed.contains(&edge.to) {
                stack.push(edge.to.clone());
            }
        }
    }

    // A disabled action never produces a Process task (4.6's skip-on-
    // disabled invariant, carried into the forest itself).
    process_actions.retain(|a| graph.action(a).is_some_and(|cfg| !cfg.disabled));

    let mut deps: HashMap<TaskId, Vec<TaskId>> = HashMap::new();

    for action_ref in &needed {
        let resolve_id = TaskId::new(action_ref.clone(), TaskKind::Resolve);
        let status_id = TaskId::new(action_ref.clone(), TaskKind::Status);

        let mut resolve_deps: HashSet<TaskId> = HashSet::new();
        let mut status_deps: HashSet<TaskId> = HashSet::new();
        status_deps.insert(resolve_id.clone());

        for edge in graph.dependencies(action_ref) {
            match edge.source {
                EdgeSource::Implicit => {
                    resolve_deps.insert(TaskId::new(edge.to.clone(), TaskKind::Resolve));
                    if edge.kind == EdgeKind::Process {
                        resolve_deps.insert(TaskId::new(edge.to.clone(), TaskKind::Process));
                    }
                }
                EdgeSource::Declared => {
                    status_deps.insert(TaskId::new(edge.to.clone(), TaskKind::Status));
                }
            }
        }

        deps.insert(resolve_id.clone(), resolve_deps.into_iter().collect());
        deps.insert(status_id.clone(), status_deps.into_iter().collect());

        if process_actions.contains(action_ref) {
            let process_id = TaskId::new(action_ref.clone(), TaskKind::Process);
            let mut process_deps: HashSet<TaskId> = HashSet::new();
            process_deps.insert(status_id);
            process_deps.insert(resolve_id);
            for edge in graph.dependencies(action_ref) {
                let kind = match edge.kind {
                    EdgeKind::Status => TaskKind::Status,
                    EdgeKind::Process => TaskKind::Process,
                };
                process_deps.insert(TaskId::new(edge.to.clone(), kind));
            }
            deps.insert(process_id, process_deps.into_iter().collect());
        }
    }

    let mut dependants: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for (task, task_deps) in &deps {
        for dep in task_deps {
            dependants.entry(dep.clone()).or_default().push(task.clone());
        }
    }

    Forest { deps, dependants, process_actions }
}

/// Deterministic tie-break among tasks that become ready at the same
/// moment, per 4.6's "ordering among peers is deterministic by
/// (kind, action-name)".
fn ready_order_key(task_id: &TaskId) -> (u8, String) {
    let kind_rank = match task_id.kind {
        TaskKind::Resolve => 0,
        TaskKind::Status => 1,
        TaskKind::Process => 2,
    };
    (kind_rank, task_id.action_ref.to_string())
}

/// What a spawned task reports back to the scheduler loop.
struct Finished {
    task_id: TaskId,
    result: TaskResult,
    resolved: Option<ResolvedAction>,
}

/// Drives one task forest to completion. Constructed fresh per
/// [`Scheduler::run`] call; holds no state between runs.
pub struct Scheduler {
    graph: Arc<Graph>,
    plugins: PluginRegistry,
    env: CoreEnv,
    events: EventBus,
    status_cache: Arc<StatusCache>,
    result_cache: Arc<ResultCache>,
}

impl Scheduler {
    #[must_use]
    pub fn new(graph: Arc<Graph>, plugins: PluginRegistry, env: CoreEnv, events: EventBus) -> Self {
        let result_cache = Arc::new(ResultCache::new(env.cache_dir()));
        Self {
            graph,
            plugins,
            env,
            events,
            status_cache: Arc::new(StatusCache::new()),
            result_cache,
        }
    }

    /// Run `operation` for `targets`, forcing re-processing (bypassing
    /// the skip-on-ready and result-cache shortcuts) for any action in
    /// `force`.
    pub async fn run(
        &self,
        operation: Operation,
        targets: &[ActionRef],
        force: &HashSet<ActionRef>,
        base_context: Arc<dyn EvalContext>,
    ) -> OperationResult {
        let forest = build_forest(&self.graph, targets);
        let mut remaining: HashMap<TaskId, usize> =
            forest.deps.iter().map(|(id, deps)| (id.clone(), deps.len())).collect();

        let mut results: HashMap<TaskId, TaskResult> = HashMap::new();
        let mut resolved: HashMap<ActionRef, ResolvedAction> = HashMap::new();
        // Every forest action's version is known statically from the
        // graph; seed it immediately so status-edge references resolve
        // without waiting on anything, and overwrite with real outputs
        // once that action's Process task completes.
        let mut outputs: HashMap<ActionRef, crate::context::ActionOutputs> = forest
            .deps
            .keys()
            .map(|id| &id.action_ref)
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|action_ref| {
                let version = self.graph.version(action_ref)?.to_string();
                Some((action_ref.clone(), crate::context::ActionOutputs { outputs: IndexMap::new(), version }))
            })
            .collect();

        let mut ready: VecDeque<TaskId> =
            remaining.iter().filter(|(_, n)| **n == 0).map(|(id, _)| id.clone()).collect();
        sort_ready(&mut ready);

        let resolve_sem = Arc::new(Semaphore::new(self.env.concurrency.resolve.max(1)));
        let status_sem = Arc::new(Semaphore::new(self.env.concurrency.status.max(1)));
        let process_sem = Arc::new(Semaphore::new(self.env.concurrency.process.max(1)));

        let mut in_flight: JoinSet<Finished> = JoinSet::new();
        let mut aborted = false;

        while !ready.is_empty() || !in_flight.is_empty() {
            while let Some(task_id) = ready.pop_front() {
                if aborted && self.env.failure_policy == FailurePolicy::AbortOnFailure {
                    cancel_task(&task_id, "operation aborted after an earlier failure", &mut results, &mut remaining, &mut ready, &forest);
                    continue;
                }
                self.publish(&task_id, EventState::Started, None);
                self.spawn_task(
                    &task_id,
                    &forest,
                    &resolved,
                    &outputs,
                    &results,
                    operation,
                    force,
                    base_context.clone(),
                    &resolve_sem,
                    &status_sem,
                    &process_sem,
                    &mut in_flight,
                );
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let finished = match joined {
                Ok(f) => f,
                Err(join_err) => {
                    // A task panicked; treat it like any other failure so
                    // dependants are cancelled rather than hanging forever.
                    tracing::error!(target: "solver::scheduler", error = %join_err, "task panicked");
                    continue;
                }
            };

            let event_state = match finished.result.state {
                ResultState::Failed => EventState::Failed,
                ResultState::Missing => EventState::Cancelled,
                _ => EventState::Completed,
            };
            self.publish(&finished.task_id, event_state, finished.result.error.clone());

            if finished.result.state == ResultState::Failed {
                aborted = true;
            }

            if let Some(resolved_action) = finished.resolved {
                resolved.insert(finished.task_id.action_ref.clone(), resolved_action);
            }
            if finished.task_id.kind == TaskKind::Process && finished.result.is_success() {
                outputs.insert(
                    finished.task_id.action_ref.clone(),
                    crate::context::ActionOutputs {
                        outputs: finished.result.outputs.clone(),
                        version: self.graph.version(&finished.task_id.action_ref).unwrap_or_default().to_string(),
                    },
                );
            }

            let cascades = matches!(finished.result.state, ResultState::Failed | ResultState::Missing);
            let dependants = forest.dependants.get(&finished.task_id).cloned().unwrap_or_default();
            results.insert(finished.task_id.clone(), finished.result);

            for dependant in dependants {
                if results.contains_key(&dependant) {
                    continue;
                }
                if cascades {
                    cancel_task(&dependant, "a dependency failed or was cancelled", &mut results, &mut remaining, &mut ready, &forest);
                } else if let Some(count) = remaining.get_mut(&dependant) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dependant);
                    }
                }
            }
            sort_ready(&mut ready);
        }

        self.finish(targets, &forest, results)
    }

    fn publish(&self, task_id: &TaskId, state: EventState, error: Option<String>) {
        self.events.publish(crate::solver::SolverEvent {
            ts: SystemTime::now(),
            session_id: self.env.session_id,
            action_ref: task_id.action_ref.clone(),
            version: self.graph.version(&task_id.action_ref).map(str::to_string),
            task_kind: task_id.kind,
            state,
            error,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_task(
        &self,
        task_id: &TaskId,
        forest: &Forest,
        resolved: &HashMap<ActionRef, ResolvedAction>,
        outputs: &HashMap<ActionRef, crate::context::ActionOutputs>,
        results: &HashMap<TaskId, TaskResult>,
        operation: Operation,
        force: &HashSet<ActionRef>,
        base_context: Arc<dyn EvalContext>,
        resolve_sem: &Arc<Semaphore>,
        status_sem: &Arc<Semaphore>,
        process_sem: &Arc<Semaphore>,
        in_flight: &mut JoinSet<Finished>,
    ) {
        let Some(action) = self.graph.action(&task_id.action_ref).cloned() else {
            return;
        };
        let version = self.graph.version(&task_id.action_ref).unwrap_or_default().to_string();
        let started = SystemTime::now();
        let timeout = Duration::from_secs(action.timeout.unwrap_or(self.env.default_timeout_secs));
        let task_id = task_id.clone();

        match task_id.kind {
            TaskKind::Resolve => {
                let graph = Arc::clone(&self.graph);
                let sem = Arc::clone(resolve_sem);
                let outputs = outputs.clone();
                in_flight.spawn(async move {
                    let _permit = sem.acquire_owned().await;
                    let result = run_resolve(&action, &version, &graph, &outputs, base_context, timeout, started).await;
                    Finished { task_id, result: result.0, resolved: result.1 }
                });
            }
            TaskKind::Status => {
                let Some(resolved_action) = resolved.get(&task_id.action_ref).cloned() else {
                    in_flight.spawn(async move {
                        Finished {
                            task_id,
                            result: terminal(ResultState::Missing, Some("resolve did not complete".to_string()), started),
                            resolved: None,
                        }
                    });
                    return;
                };
                let disabled = action.disabled;
                let plugin = self.plugins.get(&action.type_name).cloned();
                let cache = Arc::clone(&self.status_cache);
                let sem = Arc::clone(status_sem);
                in_flight.spawn(async move {
                    let _permit = sem.acquire_owned().await;
                    let result = run_status(disabled, plugin.as_deref(), &resolved_action, &cache, timeout, started).await;
                    Finished { task_id, result, resolved: None }
                });
            }
            TaskKind::Process => {
                if !forest.process_actions.contains(&task_id.action_ref) {
                    in_flight.spawn(async move {
                        Finished {
                            task_id,
                            result: terminal(ResultState::Missing, Some("action is disabled".to_string()), started),
                            resolved: None,
                        }
                    });
                    return;
                }
                let Some(resolved_action) = resolved.get(&task_id.action_ref).cloned() else {
                    in_flight.spawn(async move {
                        Finished {
                            task_id,
                            result: terminal(ResultState::Missing, Some("resolve did not complete".to_string()), started),
                            resolved: None,
                        }
                    });
                    return;
                };
                // 4.6's central skip-on-ready rule: "A Process(A) is
                // skipped ... iff Status(A) reports ready and the caller
                // did not pass force=true for A." Status(A) is always a
                // dependency of Process(A) (see `build_forest`), so by
                // the time this task is ready its result is already in
                // `results`.
                let status_ready = results
                    .get(&TaskId::new(task_id.action_ref.clone(), TaskKind::Status))
                    .is_some_and(|r| r.state == ResultState::Ready);
                let force_this = force.contains(&task_id.action_ref);
                let plugin = self.plugins.get(&action.type_name).cloned();
                let result_cache = Arc::clone(&self.result_cache);
                let sem = Arc::clone(process_sem);
                let kind = action.kind;
                in_flight.spawn(async move {
                    if status_ready && !force_this {
                        return Finished {
                            task_id,
                            result: terminal(ResultState::Ready, None, started),
                            resolved: None,
                        };
                    }
                    let _permit = sem.acquire_owned().await;
                    let result = run_process(operation, kind, plugin.as_deref(), &resolved_action, &result_cache, force_this, timeout, started).await;
                    Finished { task_id, result, resolved: None }
                });
            }
        }
    }

    /// Build the composite [`OperationResult`] from every requested
    /// target's `Process` task outcome.
    fn finish(&self, targets: &[ActionRef], forest: &Forest, task_results: HashMap<TaskId, TaskResult>) -> OperationResult {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut cancelled = Vec::new();

        for target in targets {
            let process_id = TaskId::new(target.clone(), TaskKind::Process);
            match task_results.get(&process_id) {
                Some(result) if result.is_success() => succeeded.push(target.clone()),
                Some(result) if result.state == ResultState::Failed => failed.push(target.clone()),
                _ => cancelled.push(target.clone()),
            }
        }
        let _ = &forest.process_actions;

        let aborted = !failed.is_empty() && self.env.failure_policy == FailurePolicy::AbortOnFailure && !cancelled.is_empty();

        OperationResult {
            success: failed.is_empty() && cancelled.is_empty(),
            aborted,
            succeeded,
            failed,
            cancelled,
            task_results,
        }
    }
}

fn sort_ready(ready: &mut VecDeque<TaskId>) {
    let mut items: Vec<TaskId> = ready.drain(..).collect();
    items.sort_by_key(ready_order_key);
    ready.extend(items);
}

fn cancel_task(
    task_id: &TaskId,
    reason: &str,
    results: &mut HashMap<TaskId, TaskResult>,
    remaining: &mut HashMap<TaskId, usize>,
    ready: &mut VecDeque<TaskId>,
    forest: &Forest,
) {
    if results.contains_key(task_id) {
        return;
    }
    let now = SystemTime::now();
    results.insert(
        task_id.clone(),
        TaskResult {
            state: ResultState::Missing,
            outputs: IndexMap::new(),
            detail: None,
            started_at: now,
            completed_at: now,
            error: Some(reason.to_string()),
        },
    );
    remaining.remove(task_id);
    ready.retain(|t| t != task_id);
    if let Some(dependants) = forest.dependants.get(task_id) {
        for dependant in dependants.clone() {
            cancel_task(&dependant, reason, results, remaining, ready, forest);
        }
    }
}

async fn run_resolve(
    action: &ActionConfig,
    version: &str,
    graph: &Graph,
    outputs: &HashMap<ActionRef, crate::context::ActionOutputs>,
    base_context: Arc<dyn EvalContext>,
    timeout: Duration,
    started: SystemTime,
) -> (TaskResult, Option<ResolvedAction>) {
    let ctx = build_resolve_context(base_context, action, graph, outputs);
    let outcome = tokio::time::timeout(timeout, async {
        let spec_label = format!("{}.spec", action.action_ref());
        let spec = evaluate(&action.spec, &ctx, false, &spec_label).map_err(|e| to_garden_error(&e))?;
        let spec = deep_evaluate(spec, &ctx, false).map_err(|e| to_garden_error(&e))?;
        let vars_label = format!("{}.variables", action.action_ref());
        let variables = evaluate(&action.variables, &ctx, false, &vars_label).map_err(|e| to_garden_error(&e))?;
        let variables = deep_evaluate(variables, &ctx, false).map_err(|e| to_garden_error(&e))?;
        Ok::<(TemplateValue, TemplateValue), GardenError>((spec, variables))
    })
    .await;

    match outcome {
        Ok(Ok((spec, variables))) => {
            let resolved_action = ResolvedAction {
                action_ref: action.action_ref(),
                type_name: action.type_name.clone(),
                version: version.to_string(),
                spec,
                variables,
            };
            (terminal(ResultState::Ready, None, started), Some(resolved_action))
        }
        Ok(Err(err)) => (terminal(ResultState::Failed, Some(err.to_string()), started), None),
        Err(_) => (terminal(ResultState::Failed, Some(format!("resolve timed out after {}s", timeout.as_secs())), started), None),
    }
}

async fn run_status(
    disabled: bool,
    plugin: Option<&(dyn crate::solver::Plugin)>,
    resolved: &ResolvedAction,
    cache: &StatusCache,
    timeout: Duration,
    started: SystemTime,
) -> TaskResult {
    if disabled {
        return terminal(ResultState::Skipped, None, started);
    }

    if let Some(cached) = cache.get(&resolved.action_ref, &resolved.version) {
        return cached;
    }

    let Some(plugin) = plugin else {
        return terminal(
            ResultState::Failed,
            Some(format!("no plugin registered for type '{}'", resolved.type_name)),
            started,
        );
    };

    let outcome = tokio::time::timeout(timeout, plugin.get_status(resolved)).await;
    let result = match outcome {
        // A getStatus error is treated as not-ready, never as a task
        // failure (failure semantics summary).
        Ok(Err(err)) => terminal(ResultState::NotReady, Some(err.to_string()), started),
        Ok(Ok(result)) => result,
        Err(_) => terminal(ResultState::NotReady, Some(format!("getStatus timed out after {}s", timeout.as_secs())), started),
    };
    cache.insert(&resolved.action_ref, &resolved.version, result.clone());
    result
}

async fn run_process(
    operation: Operation,
    kind: crate::core::model::ActionKind,
    plugin: Option<&(dyn crate::solver::Plugin)>,
    resolved: &ResolvedAction,
    result_cache: &ResultCache,
    force: bool,
    timeout: Duration,
    started: SystemTime,
) -> TaskResult {
    use crate::core::model::ActionKind;

    let cacheable = matches!(kind, ActionKind::Run | ActionKind::Test) && operation != Operation::Cleanup;
    if cacheable && !force {
        if let Some(cached) = result_cache.load(&resolved.action_ref, &resolved.version) {
            return TaskResult { state: ResultState::Cached, ..cached };
        }
    }

    let Some(plugin) = plugin else {
        return terminal(
            ResultState::Failed,
            Some(format!("no plugin registered for type '{}'", resolved.type_name)),
            started,
        );
    };

    let outcome = tokio::time::timeout(timeout, plugin.process(resolved)).await;
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => terminal(ResultState::Failed, Some(err.to_string()), started),
        Err(_) => terminal(ResultState::Failed, Some(format!("process timed out after {}s", timeout.as_secs())), started),
    };

    if cacheable && result.is_success() {
        result_cache.store(&resolved.action_ref, &resolved.version, &result);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::SourceConfig;
    use crate::context::ProjectContext;
    use crate::core::model::{ActionKind, ActionMode};
    use crate::core::vcs::{TrackedFile, VcsHashProvider};
    use crate::solver::{Plugin, ResultState as RS};
    use crate::template::Node;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};

    struct NoFiles;
    impl VcsHashProvider for NoFiles {
        fn tracked_files(&self, _root: &Path, _include: &[String], _exclude: &[String]) -> Result<Vec<TrackedFile>, GardenError> {
            Ok(Vec::new())
        }
    }

    fn action(kind: ActionKind, name: &str, deps: Vec<ActionRef>, disabled: bool) -> ActionConfig {
        ActionConfig {
            kind,
            name: name.to_string(),
            type_name: "fake".to_string(),
            description: None,
            source: Some(SourceConfig { path: PathBuf::from(".") }),
            include: Vec::new(),
            exclude: Vec::new(),
            dependencies: deps,
            build: None,
            variables: Node::Object(Vec::new()),
            timeout: None,
            mode: ActionMode::default(),
            disabled,
            spec: Node::Object(Vec::new()),
            cache_exclude: Vec::new(),
            document_path: PathBuf::from("garden.yml"),
            render_inputs: None,
        }
    }

    struct FakePlugin {
        status: RS,
        fail_process: bool,
    }

    #[async_trait]
    impl Plugin for FakePlugin {
        fn type_name(&self) -> &str {
            "fake"
        }

        async fn get_status(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
            Ok(terminal(self.status, None, SystemTime::now()))
        }

        async fn process(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
            if self.fail_process {
                Err(GardenError::Plugin {
                    kind: "build".to_string(),
                    name: "api".to_string(),
                    reason: "boom".to_string(),
                })
            } else {
                Ok(terminal(RS::Ready, None, SystemTime::now()))
            }
        }
    }

    fn base_context() -> Arc<dyn EvalContext> {
        Arc::new(ProjectContext::new("demo", PathBuf::from("/tmp")))
    }

    #[tokio::test]
    async fn single_action_runs_to_completion() {
        let build = action(ActionKind::Build, "api", Vec::new(), false);
        let graph = Arc::new(crate::graph::build_graph(vec![build], Path::new("/tmp"), &NoFiles, &[], None).unwrap());

        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(FakePlugin { status: RS::NotReady, fail_process: false }));

        let env = CoreEnv::new("/tmp", uuid::Uuid::nil());
        let scheduler = Scheduler::new(Arc::clone(&graph), registry, env, EventBus::default());

        let target = ActionRef::new(ActionKind::Build, "api");
        let result = scheduler.run(Operation::Build, &[target.clone()], &HashSet::new(), base_context()).await;

        assert!(result.success);
        assert_eq!(result.succeeded, vec![target]);
    }

    struct CountingPlugin {
        status: RS,
        process_calls: Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for CountingPlugin {
        fn type_name(&self) -> &str {
            "fake"
        }

        async fn get_status(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
            Ok(terminal(self.status, None, SystemTime::now()))
        }

        async fn process(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
            self.process_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(terminal(RS::Ready, None, SystemTime::now()))
        }
    }

    #[tokio::test]
    async fn process_is_skipped_when_status_already_ready() {
        let build = action(ActionKind::Build, "api", Vec::new(), false);
        let graph = Arc::new(crate::graph::build_graph(vec![build], Path::new("/tmp"), &NoFiles, &[], None).unwrap());

        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(CountingPlugin { status: RS::Ready, process_calls: Arc::clone(&calls) }));

        let env = CoreEnv::new("/tmp", uuid::Uuid::nil());
        let scheduler = Scheduler::new(Arc::clone(&graph), registry, env, EventBus::default());

        let target = ActionRef::new(ActionKind::Build, "api");
        let result = scheduler.run(Operation::Build, &[target.clone()], &HashSet::new(), base_context()).await;

        assert!(result.success);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0, "process must not be invoked when Status already reports ready");
        let process_result = result.task_results.get(&TaskId::new(target, TaskKind::Process)).unwrap();
        assert_eq!(process_result.state, RS::Ready);
    }

    #[tokio::test]
    async fn force_reprocesses_even_when_status_ready() {
        let build = action(ActionKind::Build, "api", Vec::new(), false);
        let graph = Arc::new(crate::graph::build_graph(vec![build], Path::new("/tmp"), &NoFiles, &[], None).unwrap());

        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(CountingPlugin { status: RS::Ready, process_calls: Arc::clone(&calls) }));

        let env = CoreEnv::new("/tmp", uuid::Uuid::nil());
        let scheduler = Scheduler::new(Arc::clone(&graph), registry, env, EventBus::default());

        let target = ActionRef::new(ActionKind::Build, "api");
        let mut force = HashSet::new();
        force.insert(target.clone());
        let result = scheduler.run(Operation::Build, &[target], &force, base_context()).await;

        assert!(result.success);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1, "force=true must bypass the skip-on-ready shortcut");
    }

    #[tokio::test]
    async fn disabled_dependency_is_skipped_not_ready() {
        let build = action(ActionKind::Build, "api", Vec::new(), true);
        let deploy = action(ActionKind::Deploy, "api", vec![ActionRef::new(ActionKind::Build, "api")], false);
        let graph = Arc::new(crate::graph::build_graph(vec![build, deploy], Path::new("/tmp"), &NoFiles, &[], None).unwrap());

        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(FakePlugin { status: RS::Ready, fail_process: false }));

        let env = CoreEnv::new("/tmp", uuid::Uuid::nil());
        let scheduler = Scheduler::new(Arc::clone(&graph), registry, env, EventBus::default());

        let target = ActionRef::new(ActionKind::Deploy, "api");
        let result = scheduler.run(Operation::Deploy, &[target.clone()], &HashSet::new(), base_context()).await;

        let build_status = result.task_results.get(&TaskId::new(ActionRef::new(ActionKind::Build, "api"), TaskKind::Status)).unwrap();
        assert_eq!(build_status.state, RS::Skipped);
        assert!(result.success);
    }

    #[tokio::test]
    async fn process_failure_cancels_dependants_but_not_siblings() {
        let a = action(ActionKind::Build, "a", Vec::new(), false);
        let b = action(ActionKind::Deploy, "b", vec![ActionRef::new(ActionKind::Build, "a")], false);
        let c = action(ActionKind::Build, "c", Vec::new(), false);
        let graph = Arc::new(crate::graph::build_graph(vec![a, b, c], Path::new("/tmp"), &NoFiles, &[], None).unwrap());

        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(FakePlugin { status: RS::NotReady, fail_process: true }));

        let env = CoreEnv::new("/tmp", uuid::Uuid::nil());
        let scheduler = Scheduler::new(Arc::clone(&graph), registry, env, EventBus::default());

        let targets = vec![
            ActionRef::new(ActionKind::Deploy, "b"),
            ActionRef::new(ActionKind::Build, "c"),
        ];
        let result = scheduler.run(Operation::Deploy, &targets, &HashSet::new(), base_context()).await;

        assert!(!result.success);
        assert!(result.failed.contains(&ActionRef::new(ActionKind::Build, "a")) || result.cancelled.contains(&ActionRef::new(ActionKind::Deploy, "b")));
        assert!(result.succeeded.contains(&ActionRef::new(ActionKind::Build, "c")));
    }
}
