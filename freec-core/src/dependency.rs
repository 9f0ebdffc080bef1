//! Dependency analysis for declarations.
//!
//! Builds a graph with one node per declaration and an edge `A -> B` whenever
//! `A` refers to `B`, then splits it into strongly connected components in
//! dependency order: every component comes after the components it depends on.
//! Components that do not depend on each other keep the order in which their
//! first declaration appears in the input.

use crate::ast::{ExprKind, FuncDecl, TypeDecl};
use crate::free_vars::free_vars;
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reference key of the `undefined` marker.
pub const UNDEFINED_KEY: &str = "undefined";
/// Reference key of the `error` marker.
pub const ERROR_KEY: &str = "error";

/// A declaration that can take part in dependency analysis.
pub trait DependencyNode {
    /// The declared name.
    fn key(&self) -> &str;

    /// Names this declaration refers to, in order of first occurrence.
    fn references(&self) -> IndexSet<String>;
}

impl DependencyNode for FuncDecl {
    fn key(&self) -> &str {
        &self.name
    }

    /// Free variables of the right-hand side minus the parameters. The
    /// function's own name is kept so that direct recursion shows up as a
    /// self loop.
    fn references(&self) -> IndexSet<String> {
        let mut refs = free_vars(&self.rhs);
        for arg in &self.args {
            refs.shift_remove(&arg.name);
        }
        collect_marker_refs(&self.rhs, &mut refs);
        refs
    }
}

impl DependencyNode for TypeDecl {
    fn key(&self) -> &str {
        self.name()
    }

    fn references(&self) -> IndexSet<String> {
        match self {
            TypeDecl::Data(decl) => decl
                .constructors
                .iter()
                .flat_map(|con| con.fields.iter())
                .flat_map(|field| field.type_cons())
                .collect(),
            TypeDecl::Synonym(decl) => decl.rhs.type_cons(),
        }
    }
}

fn collect_marker_refs(expr: &crate::ast::Expr, refs: &mut IndexSet<String>) {
    match &expr.kind {
        ExprKind::Undefined => {
            refs.insert(UNDEFINED_KEY.to_string());
        }
        ExprKind::Error(_) => {
            refs.insert(ERROR_KEY.to_string());
        }
        ExprKind::Var(_) | ExprKind::Con(_) | ExprKind::IntLit(_) => {}
        ExprKind::App { func, arg } => {
            collect_marker_refs(func, refs);
            collect_marker_refs(arg, refs);
        }
        ExprKind::TypeApp { expr, .. } => collect_marker_refs(expr, refs),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            collect_marker_refs(cond, refs);
            collect_marker_refs(then_branch, refs);
            collect_marker_refs(else_branch, refs);
        }
        ExprKind::Case { scrutinee, alts } => {
            collect_marker_refs(scrutinee, refs);
            for alt in alts {
                collect_marker_refs(&alt.rhs, refs);
            }
        }
        ExprKind::Lambda { body, .. } => collect_marker_refs(body, refs),
        ExprKind::Let { binds, body } => {
            for bind in binds {
                collect_marker_refs(&bind.rhs, refs);
            }
            collect_marker_refs(body, refs);
        }
    }
}

// =============================================================================
// Components
// =============================================================================

/// A strongly connected component of a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyComponent<D> {
    /// A single declaration that does not refer to itself.
    NonRecursive(D),
    /// Mutually recursive declarations, or a single directly recursive one.
    Recursive(Vec<D>),
}

impl<D> DependencyComponent<D> {
    pub fn is_recursive(&self) -> bool {
        matches!(self, DependencyComponent::Recursive(_))
    }

    pub fn decls(&self) -> Vec<&D> {
        match self {
            DependencyComponent::NonRecursive(decl) => vec![decl],
            DependencyComponent::Recursive(decls) => decls.iter().collect(),
        }
    }

    pub fn into_decls(self) -> Vec<D> {
        match self {
            DependencyComponent::NonRecursive(decl) => vec![decl],
            DependencyComponent::Recursive(decls) => decls,
        }
    }

    pub fn map<E>(self, mut f: impl FnMut(D) -> E) -> DependencyComponent<E> {
        match self {
            DependencyComponent::NonRecursive(decl) => DependencyComponent::NonRecursive(f(decl)),
            DependencyComponent::Recursive(decls) => {
                DependencyComponent::Recursive(decls.into_iter().map(f).collect())
            }
        }
    }
}

impl<D: DependencyNode> DependencyComponent<D> {
    pub fn keys(&self) -> Vec<&str> {
        self.decls().into_iter().map(|d| d.key()).collect()
    }
}

// =============================================================================
// Graph
// =============================================================================

/// Dependency graph over a batch of declarations of the same kind.
pub struct DependencyGraph<D> {
    decls: Vec<D>,
    /// Graph node of each declaration, in batch order.
    nodes: IndexMap<String, NodeIndex>,
    /// All names referenced by each declaration, including unresolved ones.
    references: Vec<IndexSet<String>>,
    graph: DiGraph<usize, ()>,
}

impl<D: DependencyNode> DependencyGraph<D> {
    pub fn new(decls: Vec<D>) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = IndexMap::new();
        for (i, decl) in decls.iter().enumerate() {
            let node = graph.add_node(i);
            if nodes.contains_key(decl.key()) {
                warn!("duplicate declaration of '{}', later references resolve to the first", decl.key());
                continue;
            }
            nodes.insert(decl.key().to_string(), node);
        }

        let references: Vec<IndexSet<String>> = decls.iter().map(|d| d.references()).collect();
        for (i, refs) in references.iter().enumerate() {
            let from = NodeIndex::new(i);
            for name in refs {
                if let Some(&to) = nodes.get(name) {
                    graph.update_edge(from, to, ());
                }
            }
        }

        DependencyGraph {
            decls,
            nodes,
            references,
            graph,
        }
    }

    pub fn decls(&self) -> &[D] {
        &self.decls
    }

    /// Every name referenced by the declaration with the given key, resolved or not.
    pub fn references(&self, key: &str) -> Option<&IndexSet<String>> {
        self.nodes.get(key).map(|node| &self.references[node.index()])
    }

    /// Keys of the declarations the given declaration depends on.
    pub fn dependencies(&self, key: &str) -> Vec<&str> {
        let Some(&node) = self.nodes.get(key) else {
            return vec![];
        };
        let mut deps: Vec<NodeIndex> = self.graph.neighbors(node).collect();
        deps.sort();
        deps.into_iter().map(|n| self.decls[n.index()].key()).collect()
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.nodes.get(from), self.nodes.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Strongly connected components in dependency order.
    ///
    /// Among the components whose dependencies have all been emitted, the one
    /// containing the earliest declaration of the batch comes first.
    pub fn components(self) -> Vec<DependencyComponent<D>> {
        let mut sccs = petgraph::algo::tarjan_scc(&self.graph);
        for scc in &mut sccs {
            scc.sort();
        }
        let recursive: Vec<bool> = sccs
            .iter()
            .map(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .collect();

        let order = self.emission_order(&sccs);
        let mut sccs: Vec<Option<Vec<NodeIndex>>> = sccs.into_iter().map(Some).collect();

        let mut slots: Vec<Option<D>> = self.decls.into_iter().map(Some).collect();
        let mut components = Vec::with_capacity(order.len());
        for id in order {
            let Some(scc) = sccs[id].take() else {
                panic!("BUG: component #{} emitted twice", id);
            };
            let is_recursive = recursive[id];
            let mut decls: Vec<D> = scc
                .iter()
                .map(|node| {
                    slots[node.index()]
                        .take()
                        .unwrap_or_else(|| panic!("BUG: declaration #{} in two components", node.index()))
                })
                .collect();
            let component = if is_recursive {
                DependencyComponent::Recursive(decls)
            } else {
                match decls.pop() {
                    Some(decl) => DependencyComponent::NonRecursive(decl),
                    None => panic!("BUG: empty strongly connected component"),
                }
            };
            debug!("dependency component: {:?}", component.keys());
            components.push(component);
        }
        components
    }

    /// Topological order of the condensation. Node lists must be sorted.
    fn emission_order(&self, sccs: &[Vec<NodeIndex>]) -> Vec<usize> {
        let mut component_of = vec![0; self.graph.node_count()];
        for (id, scc) in sccs.iter().enumerate() {
            for node in scc {
                component_of[node.index()] = id;
            }
        }

        let mut pending: Vec<usize> = vec![0; sccs.len()];
        let mut users: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); sccs.len()];
        for edge in self.graph.raw_edges() {
            let (user, dep) = (component_of[edge.source().index()], component_of[edge.target().index()]);
            if user != dep && users[dep].insert(user) {
                pending[user] += 1;
            }
        }

        // Ready components keyed by their earliest declaration.
        let mut ready: BTreeSet<(NodeIndex, usize)> =
            (0..sccs.len()).filter(|&id| pending[id] == 0).map(|id| (sccs[id][0], id)).collect();
        let mut order = Vec::with_capacity(sccs.len());
        while let Some((_, id)) = ready.pop_first() {
            order.push(id);
            for &user in &users[id] {
                pending[user] -= 1;
                if pending[user] == 0 {
                    ready.insert((sccs[user][0], user));
                }
            }
        }
        assert_eq!(order.len(), sccs.len(), "BUG: cycle in the condensation graph");
        order
    }
}

/// Order declarations by their dependencies.
pub fn group_dependencies<D: DependencyNode>(decls: Vec<D>) -> Vec<DependencyComponent<D>> {
    DependencyGraph::new(decls).components()
}
