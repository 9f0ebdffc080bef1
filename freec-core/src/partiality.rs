//! Partiality analysis.
//!
//! A function is partial if its right-hand side uses `undefined` or `error`,
//! or refers to a function that is partial. Components are processed in
//! dependency order, so the callees outside of a component are already
//! classified. All functions of a recursive component share one result.

use crate::ast::FuncDecl;
use crate::dependency::{DependencyComponent, DependencyNode, ERROR_KEY, UNDEFINED_KEY};
use crate::env::Environment;
use log::debug;

/// Classify the functions of one component and record the result in `env`.
///
/// Returns whether the component is partial.
pub fn analyze_component(env: &mut Environment, component: &DependencyComponent<FuncDecl>) -> bool {
    let decls = component.decls();
    let own: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
    let partial = decls.iter().any(|decl| {
        decl.references().iter().any(|name| {
            name == UNDEFINED_KEY
                || name == ERROR_KEY
                || (!own.contains(&name.as_str()) && env.is_partial(name))
        })
    });
    if partial {
        debug!("partial: {}", own.join(", "));
    }
    for name in &own {
        env.set_partial(name, partial);
    }
    partial
}

/// Classify every function of `components`, which must be in dependency order.
pub fn analyze_partiality(env: &mut Environment, components: &[DependencyComponent<FuncDecl>]) {
    for component in components {
        analyze_component(env, component);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::group_dependencies;
    use crate::env::FuncEntry;
    use crate::testing::*;

    fn analyze(decls: Vec<FuncDecl>) -> Environment {
        let mut env = Environment::new();
        for decl in &decls {
            env.add_func_entry(FuncEntry::from_decl(decl));
        }
        let components = group_dependencies(decls);
        analyze_partiality(&mut env, &components);
        env
    }

    #[test]
    fn test_markers_make_a_function_partial() {
        let env = analyze(vec![
            func("head", &["xs"], case_of(var("xs"), vec![alt_con("Nil", &[], undefined())])),
            func("fail", &[], error("boom")),
            func("total", &["x"], var("x")),
        ]);
        assert!(env.is_partial("head"));
        assert!(env.is_partial("fail"));
        assert!(!env.is_partial("total"));
    }

    #[test]
    fn test_partiality_propagates_to_callers() {
        let env = analyze(vec![
            func("main", &[], app(var("first"), vec![con("Nil")])),
            func("first", &["xs"], app(var("head"), vec![var("xs")])),
            func("head", &["xs"], undefined()),
            func("other", &["xs"], var("xs")),
        ]);
        assert!(env.is_partial("head"));
        assert!(env.is_partial("first"));
        assert!(env.is_partial("main"));
        assert!(!env.is_partial("other"));
    }

    #[test]
    fn test_recursive_component_shares_partiality() {
        // even n = if n == 0 then True else odd (n - 1); odd n = if n == 0 then undefined else even (n - 1)
        let env = analyze(vec![
            func(
                "even",
                &["n"],
                if_(op(var("n"), "==", int(0)), con("True"), app(var("odd"), vec![op(var("n"), "-", int(1))])),
            ),
            func(
                "odd",
                &["n"],
                if_(op(var("n"), "==", int(0)), undefined(), app(var("even"), vec![op(var("n"), "-", int(1))])),
            ),
        ]);
        assert!(env.is_partial("even"));
        assert!(env.is_partial("odd"));
    }

    #[test]
    fn test_shadowed_partial_function_is_ignored() {
        // f head = head 1
        let env = analyze(vec![
            func("head", &["xs"], undefined()),
            func("f", &["head"], app(var("head"), vec![int(1)])),
        ]);
        assert!(!env.is_partial("f"));
    }
}
