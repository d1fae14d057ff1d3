//! Small shared identifiers used across the context, graph, and solver
//! layers so none of them needs to depend "upward" on each other just to
//! name an action.

use std::fmt;

/// The four action kinds the core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    Build,
    Deploy,
    Run,
    Test,
}

impl ActionKind {
    /// The lowercase name used in dotted context paths
    /// (`actions.build.api...`) and cache directory segments.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Deploy => "deploy",
            Self::Run => "run",
            Self::Test => "test",
        }
    }

    /// The title-cased name used as a document's `kind:` discriminator
    /// (`kind: Build|Deploy|Run|Test`).
    #[must_use]
    pub fn as_str_title(self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::Deploy => "Deploy",
            Self::Run => "Run",
            Self::Test => "Test",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "build" => Ok(Self::Build),
            "deploy" => Ok(Self::Deploy),
            "run" => Ok(Self::Run),
            "test" => Ok(Self::Test),
            _ => Err(format!("unknown action kind '{s}'")),
        }
    }
}

/// The execution mode an action runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionMode {
    #[default]
    Default,
    Sync,
    Local,
}

impl ActionMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "sync" => Ok(Self::Sync),
            "local" => Ok(Self::Local),
            other => Err(format!("unknown action mode '{other}'")),
        }
    }
}

/// A reference to an action by its globally-unique `(kind, name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionRef {
    pub kind: ActionKind,
    pub name: String,
}

impl ActionRef {
    #[must_use]
    pub fn new(kind: ActionKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}
