// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Statement evaluation scope: a chain of environment frames.
//!

use crate::{function::FnInfo, queryable::Q, statement::Select};
use core::fmt;
use regex::Regex;
use std::{collections::HashMap, sync::OnceLock};
use tracing::debug;

/// A dynamically scoped environment. Each frame holds variable bindings, a
/// view registry and a function registry; lookups walk from the local frame
/// up the parent chain. A child extends its parent by reference and writes
/// never escape upward.
#[derive(Default)]
pub struct Scope<'a> {
    parent: Option<&'a Scope<'a>>,
    variables: HashMap<String, Q>,
    views: HashMap<String, Select>,
    functions: HashMap<String, FnInfo>,
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("variables", &self.variables)
            .field("views", &self.views.keys())
            .field("functions", &self.functions.keys())
            .field("depth", &self.depth())
            .finish()
    }
}

// `${name}` or `$name` interpolation sites w/in a text.
fn expansion_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
            .unwrap_or_else(|x| panic!("Invalid expansion pattern: {x}"))
    })
}

impl<'a> Scope<'a> {
    /// Create a new root (parent-less) scope w/ no registered functions.
    pub fn root() -> Scope<'static> {
        Scope::default()
    }

    /// Create a child frame extending this one. The child sees everything
    /// the chain holds; this frame never sees the child's bindings.
    pub fn child(&self) -> Scope<'_> {
        Scope {
            parent: Some(self),
            ..Scope::default()
        }
    }

    fn depth(&self) -> usize {
        match self.parent {
            Some(p) => 1 + p.depth(),
            None => 0,
        }
    }

    /// Bind a variable in this frame, shadowing any parent binding of the
    /// same name.
    pub fn bind(&mut self, name: impl Into<String>, value: Q) {
        self.variables.insert(name.into(), value);
    }

    /// Resolve a variable walking the chain; local bindings win.
    pub fn lookup(&self, name: &str) -> Option<&Q> {
        match self.variables.get(name) {
            Some(q) => Some(q),
            None => self.parent.and_then(|p| p.lookup(name)),
        }
    }

    /// Register a function (Rust closure) by name w/ an optional fixed arity
    /// (`None` means variadic).
    pub fn register<F>(&mut self, name: &str, arity: Option<usize>, closure: F)
    where
        F: Fn(&[Q]) -> Result<Q, crate::MyError> + Send + Sync + 'static,
    {
        self.functions
            .insert(name.to_ascii_lowercase(), FnInfo::new(closure, arity));
    }

    /// Register all builtin functions we support.
    pub fn register_builtins(&mut self) {
        crate::function::add_builtins(self);
    }

    /// Resolve a function by name, case-insensitively, walking the chain.
    pub fn lookup_function(&self, name: &str) -> Option<&FnInfo> {
        let key = name.to_ascii_lowercase();
        match self.functions.get(&key) {
            Some(info) => Some(info),
            None => self.parent.and_then(|p| p.lookup_function(name)),
        }
    }

    /// Register a named view in this frame.
    pub(crate) fn register_view(&mut self, name: &str, query: Select) {
        self.views.insert(name.to_owned(), query);
    }

    /// Resolve a view by name walking the chain.
    pub(crate) fn lookup_view(&self, name: &str) -> Option<&Select> {
        match self.views.get(name) {
            Some(v) => Some(v),
            None => self.parent.and_then(|p| p.lookup_view(name)),
        }
    }

    /// Interpolate `${var}` and `$var` references w/in the given text. An
    /// unresolvable reference is left untouched.
    pub fn expand(&self, text: &str) -> String {
        expansion_pattern()
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.lookup(name) {
                    Some(q) => q.to_text(),
                    None => {
                        debug!("No variable named '{name}' to expand");
                        caps.get(0).map(|m| m.as_str()).unwrap_or_default().to_owned()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_shadowing() {
        let mut parent = Scope::root();
        parent.bind("x", Q::Num(1.0));
        {
            let mut child = parent.child();
            child.bind("x", Q::Num(2.0));
            assert_eq!(child.lookup("x"), Some(&Q::Num(2.0)));
        }
        // releasing the child restores the parent binding...
        assert_eq!(parent.lookup("x"), Some(&Q::Num(1.0)));
    }

    #[test]
    fn test_child_reads_parent() {
        let mut parent = Scope::root();
        parent.bind("greeting", Q::Str("hello".into()));
        let child = parent.child();
        assert_eq!(child.lookup("greeting"), Some(&Q::Str("hello".into())));
        assert_eq!(child.lookup("absent"), None);
    }

    #[test]
    #[traced_test]
    fn test_expand() {
        let mut scope = Scope::root();
        scope.bind("dir", Q::Str("/tmp/data".into()));
        scope.bind("n", Q::Num(7.0));
        assert_eq!(scope.expand("${dir}/tickers.csv"), "/tmp/data/tickers.csv");
        assert_eq!(scope.expand("row $n"), "row 7");
        assert_eq!(scope.expand("$missing stays"), "$missing stays");
    }

    #[test]
    fn test_function_lookup_is_case_insensitive() {
        let mut scope = Scope::root();
        scope.register("Upper", Some(1), |args| {
            Ok(Q::Str(args[0].to_text().to_uppercase()))
        });
        let child = scope.child();
        assert!(child.lookup_function("UPPER").is_some());
        assert!(child.lookup_function("upper").is_some());
        assert!(child.lookup_function("nope").is_none());
    }
}
