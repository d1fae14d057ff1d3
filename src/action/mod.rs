//! The action config schema shared by the Config Loader (C3), the
//! Module->Action Converter (C4), and the Graph Builder (C5).
//!
//! [`config::ActionConfig`] is the common currency all three produce or
//! consume: a graph-ready node with its structural fields resolved and
//! `spec`/`variables` kept as raw template trees. [`document`] holds every
//! other document kind the loader can discover.

pub mod config;
pub mod document;

pub use config::{ActionConfig, SourceConfig};
pub use document::{
    CommandDoc, ConfigDocument, ConfigTemplateDoc, CopyFromEntry, EnvironmentDoc, ModuleDoc,
    ModuleServiceDoc, ModuleTaskDoc, ModuleTestDoc, ProjectDoc, ProviderDoc, RenderTemplateDoc,
    WorkflowDoc,
};
