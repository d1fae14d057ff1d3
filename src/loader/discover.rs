//! Discovery: walk the project root (and any declared additional source
//! roots) for configuration documents, split `---`-delimited multi-document
//! YAML files, and hand back raw `(kind, Node, path)` triples.

use crate::core::error::GardenError;
use crate::template::{self, Node};
use std::path::{Path, PathBuf};

/// A single YAML document pulled out of a (possibly multi-document)
/// config file, loaded into the template AST but not yet evaluated or
/// typed.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// The document's `kind:` discriminator, verbatim from the source.
    pub kind: String,
    /// The whole document, structural-operator-aware loaded.
    pub node: Node,
    /// File this document came from (for error messages).
    pub path: PathBuf,
}

/// File names recognized as Garden config documents.
const CONFIG_FILE_NAMES: &[&str] = &["garden.yml", "garden.yaml"];

/// `.gardenignore` name, read from `root` only (not from additional roots).
const IGNORE_FILE_NAME: &str = ".gardenignore";

/// Loads `.gardenignore` from `root` if present: one glob pattern per line,
/// blank lines and `#`-prefixed comments skipped. Invalid patterns are
/// skipped rather than failing discovery outright.
fn load_ignore_patterns(root: &Path) -> Vec<glob::Pattern> {
    let path = root.join(IGNORE_FILE_NAME);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Vec::new();
    };
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|pattern| glob::Pattern::new(pattern).ok())
        .collect()
}

fn is_ignored(path: &Path, root: &Path, patterns: &[glob::Pattern]) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    patterns.iter().any(|p| p.matches_path(relative))
}

/// Walk `root` and every path in `additional_roots` for config documents,
/// parse each into one or more [`RawDocument`]s. Entries matching a glob
/// pattern in `root`'s `.gardenignore` (if any) are skipped.
pub fn discover(root: &Path, additional_roots: &[PathBuf]) -> Result<Vec<RawDocument>, GardenError> {
    let ignore_patterns = load_ignore_patterns(root);
    let mut out = Vec::new();
    for dir in std::iter::once(root).chain(additional_roots.iter().map(PathBuf::as_path)) {
        if !dir.exists() {
            continue;
        }
        let walker = walkdir::WalkDir::new(dir).into_iter().filter_entry(|entry| {
            !is_ignored(entry.path(), root, &ignore_patterns)
        });
        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.path().file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !CONFIG_FILE_NAMES.iter().any(|n| file_name.eq_ignore_ascii_case(n)) {
                continue;
            }
            out.extend(parse_file(entry.path())?);
        }
    }
    // Stable, deterministic order independent of filesystem iteration order.
    out.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.kind.cmp(&b.kind)));
    Ok(out)
}

/// Parse one config file, splitting `---`-delimited multi-document YAML
/// and loading each document into the template AST.
fn parse_file(path: &Path) -> Result<Vec<RawDocument>, GardenError> {
    let content = std::fs::read_to_string(path)?;
    let mut out = Vec::new();
    for raw in serde_yaml::Deserializer::from_str(&content) {
        let value = serde_yaml::Value::deserialize(raw).map_err(|err| GardenError::Configuration {
            document: path.display().to_string(),
            reason: err.to_string(),
        })?;
        if matches!(value, serde_yaml::Value::Null) {
            continue; // empty document between/after `---`
        }
        let serde_yaml::Value::Mapping(map) = &value else {
            return Err(GardenError::Configuration {
                document: path.display().to_string(),
                reason: "expected a YAML mapping at the document root".to_string(),
            });
        };
        let kind = map
            .get(serde_yaml::Value::String("kind".to_string()))
            .and_then(|v| v.as_str())
            .ok_or_else(|| GardenError::Configuration {
                document: path.display().to_string(),
                reason: "document is missing required field 'kind'".to_string(),
            })?
            .to_string();
        let node = template::operators::load(&value).map_err(|err| GardenError::Configuration {
            document: path.display().to_string(),
            reason: err.to_string(),
        })?;
        out.push(RawDocument {
            kind,
            node,
            path: path.to_path_buf(),
        });
    }
    Ok(out)
}

use serde::Deserialize;
