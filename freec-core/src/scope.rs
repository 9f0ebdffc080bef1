//! Lexical scope tracking for passes that need to know which binder a name
//! refers to at a given program point.

use indexmap::IndexMap;

/// A single scope containing variable bindings in binding order
#[derive(Debug, Clone)]
pub struct Scope<T> {
    bindings: IndexMap<String, T>,
}

impl<T: Clone> Default for Scope<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Scope<T> {
    pub fn new() -> Self {
        Scope {
            bindings: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, name: String, value: T) {
        // Re-binding within one scope moves the name to the end.
        self.bindings.shift_remove(&name);
        self.bindings.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.bindings.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// A stack-based scope manager that tracks nested scopes.
///
/// The bottom scope (depth 0) usually holds the formal parameters of the
/// function being processed.
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    scopes: Vec<Scope<T>>,
}

impl<T: Clone> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ScopeStack<T> {
    /// Create a new scope stack with a bottom scope
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the current scope from the stack.
    /// Returns None if trying to pop the bottom scope
    pub fn pop_scope(&mut self) -> Option<Scope<T>> {
        if self.scopes.len() > 1 { self.scopes.pop() } else { None }
    }

    /// Insert a binding in the current (innermost) scope
    pub fn insert(&mut self, name: String, value: T) {
        if let Some(current_scope) = self.scopes.last_mut() {
            current_scope.insert(name, value);
        }
    }

    /// Look up a binding, searching from innermost to outermost scope.
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains_key(name))
    }

    /// Depth of the scope holding the innermost binding of `name`.
    pub fn binding_depth(&self, name: &str) -> Option<usize> {
        self.scopes.iter().rposition(|scope| scope.contains_key(name))
    }

    /// Whether `name` still refers to its binding in the bottom scope.
    pub fn refers_to_bottom(&self, name: &str) -> bool {
        self.binding_depth(name) == Some(0)
    }

    /// Get the current scope depth (0 = bottom scope)
    pub fn depth(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    /// All visible bindings, outermost scope first. A shadowed binding is
    /// reported only at the position of its innermost binder.
    pub fn visible_bindings(&self) -> Vec<(&str, &T)> {
        let mut visible = Vec::new();
        for (depth, scope) in self.scopes.iter().enumerate() {
            for (name, value) in &scope.bindings {
                if self.binding_depth(name) == Some(depth) {
                    visible.push((name.as_str(), value));
                }
            }
        }
        visible
    }
}
