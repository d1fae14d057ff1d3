//! The non-action document kinds a project can declare, per the Config
//! Loader's discovery phase (4.3): `Project`, `Environment`, `Provider`,
//! `Workflow`, `Command`, `ConfigTemplate`, `RenderTemplate`, plus legacy
//! `Module`. Action documents (`Build`/`Deploy`/`Run`/`Test`) parse
//! straight into [`super::config::ActionConfig`] and aren't wrapped here.

use crate::core::model::ActionRef;
use crate::template::Node;
use std::path::PathBuf;

/// The single required `Project` document.
#[derive(Debug, Clone)]
pub struct ProjectDoc {
    pub name: String,
    pub default_environment: Option<String>,
    /// Raw, project-scoped default variables, overridden per-environment.
    pub variables: Node,
    pub additional_source_roots: Vec<PathBuf>,
    /// Dotted paths excluded from every action's version hash unless an
    /// action overrides `cache.exclude` itself.
    pub cache_exclude: Vec<String>,
}

/// One `Environment` document.
#[derive(Debug, Clone)]
pub struct EnvironmentDoc {
    pub name: String,
    pub namespace: Option<String>,
    pub variables: Node,
    /// Names of `Provider` documents active when this environment is
    /// selected; the provider list is filtered by this membership.
    pub providers: Vec<String>,
}

/// One `Provider` document.
#[derive(Debug, Clone)]
pub struct ProviderDoc {
    pub name: String,
    pub type_name: String,
    /// Environments this provider is active in; empty means "all".
    pub environments: Vec<String>,
    pub config: Node,
}

/// A custom `Command` document (a user-defined CLI subcommand); the core
/// only needs its identity and opaque spec — execution is a CLI concern.
#[derive(Debug, Clone)]
pub struct CommandDoc {
    pub name: String,
    pub spec: Node,
}

/// A `Workflow` document: a named sequence of action invocations. The core
/// resolves its steps' action references but leaves orchestration (retry,
/// manual approval gates) to the CLI collaborator.
#[derive(Debug, Clone)]
pub struct WorkflowDoc {
    pub name: String,
    pub steps: Node,
}

/// A `ConfigTemplate` document: a typed macro. `configs` holds the raw,
/// partially-templated action/module sub-documents that reference
/// `${inputs.*}`; they are only turned into real [`super::config::ActionConfig`]s
/// once a `RenderTemplate` supplies concrete inputs.
#[derive(Debug, Clone)]
pub struct ConfigTemplateDoc {
    pub name: String,
    /// Kept opaque (not validated as a JSON Schema) — the core only needs
    /// to know the input names `configs` is allowed to reference; type
    /// checking inputs against this schema is left to the plugin/CLI
    /// layer that authored the template.
    pub inputs_schema: Node,
    /// Each entry is a full raw document node (same shape as a top-level
    /// action/module document) minus a leading `kind:` dispatch, handled
    /// by the same parser used for top-level documents.
    pub configs: Vec<(String, Node)>,
    pub document_path: PathBuf,
}

/// A `RenderTemplate` document: one invocation of a named `ConfigTemplate`.
#[derive(Debug, Clone)]
pub struct RenderTemplateDoc {
    pub name: String,
    pub template: String,
    /// Raw (unevaluated) input expressions — kept as `Node` rather than a
    /// resolved `TemplateValue` so an input that itself references a
    /// dependency action's output stays re-evaluatable once that
    /// dependency is known, rather than being forced to resolve at
    /// expansion time.
    pub inputs: Vec<(String, Node)>,
    pub document_path: PathBuf,
}

/// One `services` entry of a legacy `Module` document.
#[derive(Debug, Clone)]
pub struct ModuleServiceDoc {
    pub name: String,
    pub dependencies: Vec<ActionRef>,
    pub spec: Node,
}

/// One `tests` entry of a legacy `Module` document.
#[derive(Debug, Clone)]
pub struct ModuleTestDoc {
    pub name: String,
    pub dependencies: Vec<ActionRef>,
    pub spec: Node,
}

/// One `tasks` entry of a legacy `Module` document.
#[derive(Debug, Clone)]
pub struct ModuleTaskDoc {
    pub name: String,
    pub dependencies: Vec<ActionRef>,
    pub spec: Node,
}

/// A `copyFrom` directive: copy `source` (relative to another module's
/// build output) to `target` (relative to this module's build context)
/// before the derived Build runs.
#[derive(Debug, Clone)]
pub struct CopyFromEntry {
    pub source: String,
    pub target: String,
}

/// A legacy `Module` document: build + services + tests + tasks, fanned
/// out into native actions by the Module->Action Converter (C4).
#[derive(Debug, Clone)]
pub struct ModuleDoc {
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
    pub source_path: Option<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub dependencies: Vec<ActionRef>,
    /// Build-specific fields, becomes the derived Build action's `spec`.
    pub build_spec: Node,
    pub copy_from: Vec<CopyFromEntry>,
    pub services: Vec<ModuleServiceDoc>,
    pub tests: Vec<ModuleTestDoc>,
    pub tasks: Vec<ModuleTaskDoc>,
    pub document_path: PathBuf,
    /// Set when this module was produced by expanding a `RenderTemplate`;
    /// threaded into every derived action's context chain by C4.
    pub render_inputs: Option<indexmap::IndexMap<String, crate::template::TemplateValue>>,
}

/// Every document kind the loader can discover and the templater can
/// produce.
#[derive(Debug, Clone)]
pub enum ConfigDocument {
    Project(ProjectDoc),
    Environment(EnvironmentDoc),
    Provider(ProviderDoc),
    Workflow(WorkflowDoc),
    Command(CommandDoc),
    ConfigTemplate(ConfigTemplateDoc),
    RenderTemplate(RenderTemplateDoc),
    Action(super::config::ActionConfig),
    Module(ModuleDoc),
}

impl ConfigDocument {
    /// The `kind:` discriminator string, as it would appear in the source
    /// document — used for error messages and name-collision reports.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Project(_) => "Project",
            Self::Environment(_) => "Environment",
            Self::Provider(_) => "Provider",
            Self::Workflow(_) => "Workflow",
            Self::Command(_) => "Command",
            Self::ConfigTemplate(_) => "ConfigTemplate",
            Self::RenderTemplate(_) => "RenderTemplate",
            Self::Action(action) => action.kind.as_str_title(),
            Self::Module(_) => "Module",
        }
    }
}
