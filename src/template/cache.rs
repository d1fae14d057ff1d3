//! A small cache mapping raw template source strings to their parsed AST,
//! so a config field referenced from many action specs is only lexed and
//! parsed once per process.

use crate::template::ast::Node;
use crate::template::error::TemplateResult;
use crate::template::parser::parse_template;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Thread-safe cache of parsed templates, keyed by their source text.
#[derive(Debug, Default)]
pub struct AstCache {
    entries: RwLock<HashMap<String, Arc<Node>>>,
}

impl AstCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Parse `source`, or return the previously parsed tree if this exact
    /// source string was seen before.
    pub fn get_or_parse(&self, source: &str) -> TemplateResult<Arc<Node>> {
        if let Some(node) = self.entries.read().get(source) {
            return Ok(Arc::clone(node));
        }
        let node = Arc::new(parse_template(source)?);
        self.entries
            .write()
            .insert(source.to_string(), Arc::clone(&node));
        Ok(node)
    }

    /// Number of distinct source strings currently cached.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// `true` if nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reparsing_the_same_source_hits_the_cache() {
        let cache = AstCache::new();
        let first = cache.get_or_parse("${a.b}").unwrap();
        assert_eq!(cache.len(), 1);
        let second = cache.get_or_parse("${a.b}").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_sources_get_distinct_entries() {
        let cache = AstCache::new();
        cache.get_or_parse("${a}").unwrap();
        cache.get_or_parse("${b}").unwrap();
        assert_eq!(cache.len(), 2);
    }
}
