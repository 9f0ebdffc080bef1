//! Fresh identifier generation.
//!
//! A fresh identifier is a root prefix followed by [`FRESH_MARKER`] and a
//! counter value, e.g. `xs@3`. The marker cannot occur in a source
//! identifier, so fresh names never clash with user names in the source
//! namespace. When emitting target code the marker is replaced by
//! [`TARGET_MARKER`] using [`to_target_ident`].

use std::collections::HashMap;

/// Separator between root prefix and counter in source-level fresh names.
pub const FRESH_MARKER: char = '@';

/// Separator used in the target spelling of fresh names.
pub const TARGET_MARKER: char = '_';

/// Strip the freshness suffix of `name`, if any.
///
/// `root_prefix("xs@3") == "xs"`, `root_prefix("xs") == "xs"`.
pub fn root_prefix(name: &str) -> &str {
    match name.find(FRESH_MARKER) {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// Whether `name` was produced by the fresh name generator.
pub fn is_fresh(name: &str) -> bool {
    name.contains(FRESH_MARKER)
}

/// Spelling of a source identifier in the target namespace.
pub fn to_target_ident(name: &str) -> String {
    name.replace(FRESH_MARKER, &TARGET_MARKER.to_string())
}

/// Per-prefix counters. Counters only ever grow within one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct FreshNames {
    counters: HashMap<String, u32>,
}

impl FreshNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next candidate for `prefix`. The caller is responsible for
    /// rejecting candidates that are already in use.
    pub fn next_candidate(&mut self, prefix: &str) -> String {
        let root = root_prefix(prefix);
        let counter = self.counters.entry(root.to_string()).or_insert(0);
        let name = format!("{}{}{}", root, FRESH_MARKER, counter);
        *counter += 1;
        name
    }

    /// Current counter value for a root prefix.
    pub fn counter(&self, prefix: &str) -> u32 {
        self.counters.get(root_prefix(prefix)).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_prefix() {
        assert_eq!(root_prefix("xs"), "xs");
        assert_eq!(root_prefix("xs@3"), "xs");
        assert_eq!(root_prefix("f_helper@0"), "f_helper");
    }

    #[test]
    fn test_refreshing_does_not_grow_prefix() {
        let mut fresh = FreshNames::new();
        assert_eq!(fresh.next_candidate("x"), "x@0");
        assert_eq!(fresh.next_candidate("x@0"), "x@1");
        assert_eq!(fresh.next_candidate("y"), "y@0");
        assert_eq!(fresh.counter("x@7"), 2);
    }

    #[test]
    fn test_target_spelling() {
        assert_eq!(to_target_ident("len_helper@0"), "len_helper_0");
        assert_eq!(to_target_ident("len"), "len");
        assert!(is_fresh("len@0"));
        assert!(!is_fresh("len_0"));
    }
}
