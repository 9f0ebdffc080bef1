use crate::ast::{FuncDecl, Type};
use crate::dependency::*;
use crate::testing::*;
use std::collections::HashMap;

fn component_keys<D: DependencyNode>(components: &[DependencyComponent<D>]) -> Vec<Vec<String>> {
    components.iter().map(|c| c.keys().into_iter().map(String::from).collect()).collect()
}

/// A batch with a chain, a mutually recursive pair, a self loop and an
/// unresolved reference.
fn sample_batch() -> Vec<FuncDecl> {
    vec![
        func("main", &["x"], app(var("even"), vec![app(var("double"), vec![var("x")])])),
        func("even", &["n"], if_(var("n"), con("True"), app(var("odd"), vec![var("n")]))),
        func("odd", &["n"], if_(var("n"), con("False"), app(var("even"), vec![var("n")]))),
        func("double", &["x"], op(var("x"), "+", var("x"))),
        func("loop", &["x"], app(var("loop"), vec![var("x")])),
        func("lonely", &[], app(var("unknown"), vec![int(1)])),
    ]
}

#[test]
fn test_components_are_strongly_connected_and_ordered() {
    let decls = sample_batch();
    let graph = DependencyGraph::new(decls.clone());
    let components = group_dependencies(decls.clone());

    let mut position: HashMap<String, usize> = HashMap::new();
    for (i, component) in components.iter().enumerate() {
        for key in component.keys() {
            position.insert(key.to_string(), i);
        }
    }
    assert_eq!(position.len(), decls.len());

    for decl in &decls {
        for dep in graph.dependencies(&decl.name) {
            // Dependencies are emitted no later than their users.
            assert!(position[dep] <= position[&decl.name], "{} -> {}", decl.name, dep);
        }
    }

    for component in &components {
        let keys = component.keys();
        if keys.len() > 1 {
            for from in &keys {
                for to in &keys {
                    assert!(reaches(&graph, from, to, &keys), "{} does not reach {}", from, to);
                }
            }
        }
    }
}

fn reaches(graph: &DependencyGraph<FuncDecl>, from: &str, to: &str, within: &[&str]) -> bool {
    let mut stack = vec![from.to_string()];
    let mut seen = vec![];
    while let Some(current) = stack.pop() {
        for dep in graph.dependencies(&current) {
            if dep == to {
                return true;
            }
            if within.contains(&dep) && !seen.contains(&dep.to_string()) {
                seen.push(dep.to_string());
                stack.push(dep.to_string());
            }
        }
    }
    from == to
}

#[test]
fn test_sample_batch_order() {
    let components = group_dependencies(sample_batch());
    assert_eq!(
        component_keys(&components),
        vec![
            vec!["even".to_string(), "odd".to_string()],
            vec!["double".to_string()],
            vec!["main".to_string()],
            vec!["loop".to_string()],
            vec!["lonely".to_string()],
        ]
    );
    assert!(components[0].is_recursive());
    assert!(!components[1].is_recursive());
    assert!(!components[2].is_recursive());
    assert!(components[3].is_recursive());
    assert!(!components[4].is_recursive());
}

#[test]
fn test_self_loop_is_recursive() {
    let components = group_dependencies(vec![len_decl()]);
    assert_eq!(components.len(), 1);
    assert!(matches!(&components[0], DependencyComponent::Recursive(decls) if decls.len() == 1));
}

#[test]
fn test_independent_components_keep_batch_order() {
    let decls = vec![
        func("c", &[], int(3)),
        func("a", &[], int(1)),
        func("b", &[], int(2)),
    ];
    let components = group_dependencies(decls);
    assert_eq!(
        component_keys(&components),
        vec![vec!["c".to_string()], vec!["a".to_string()], vec!["b".to_string()]]
    );
}

#[test]
fn test_shadowed_and_parameter_references_are_not_edges() {
    // f x = (\g -> g x) id;  g y = f y
    let decls = vec![
        func("f", &["x"], app(lam(&["g"], app(var("g"), vec![var("x")])), vec![var("id")])),
        func("g", &["y"], app(var("f"), vec![var("y")])),
    ];
    let graph = DependencyGraph::new(decls);
    assert!(!graph.has_edge("f", "g"));
    assert!(graph.has_edge("g", "f"));
    let refs: Vec<_> = graph.references("f").into_iter().flatten().cloned().collect();
    assert_eq!(refs, vec!["id".to_string()]);
}

#[test]
fn test_partiality_markers_are_references() {
    let decls = vec![
        func("head", &["xs"], case_of(var("xs"), vec![alt_con("Nil", &[], undefined()), alt_con("Cons", &["y", "ys"], var("y"))])),
        func("boom", &[], error("boom")),
    ];
    let graph = DependencyGraph::new(decls);
    assert!(graph.references("head").is_some_and(|r| r.contains(UNDEFINED_KEY)));
    assert!(graph.references("boom").is_some_and(|r| r.contains(ERROR_KEY)));
    assert!(graph.dependencies("head").is_empty());
}

#[test]
fn test_type_declarations() {
    let decls = vec![
        synonym("Forest", &["a"], list_of(Type::app(tcon("Tree"), vec![tvar("a")]))),
        data("Tree", &["a"], vec![("Node", vec![tvar("a"), Type::app(tcon("Forest"), vec![tvar("a")])])]),
        list_decl(),
        synonym("Name", &[], tcon("String")),
    ];
    let components = group_dependencies(decls);
    assert_eq!(
        component_keys(&components),
        vec![
            vec!["List".to_string()],
            vec!["Forest".to_string(), "Tree".to_string()],
            vec!["Name".to_string()],
        ]
    );
    assert!(components[0].is_recursive());
    assert!(components[1].is_recursive());
    assert!(!components[2].is_recursive());
}
