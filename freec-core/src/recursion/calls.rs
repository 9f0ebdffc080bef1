//! Call sites within a recursive group.
//!
//! For every call from a group member to a group member we record, per value
//! argument, what the argument is known to be relative to the caller's
//! parameters: the parameter itself (unshadowed) or a strict sub-value of
//! some parameters.

use crate::ast::{Expr, ExprKind, FuncDecl, Pattern};
use crate::scope::ScopeStack;
use std::collections::BTreeSet;

/// What a local variable is known to be relative to the caller's parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Origin {
    /// Parameter positions the variable is equal to.
    equal: BTreeSet<usize>,
    /// Parameter positions the variable is a strict sub-value of.
    smaller: BTreeSet<usize>,
}

/// A call from one member of a recursive group to another. Bare references
/// are calls without arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub caller: String,
    pub callee: String,
    /// Per value argument: the caller parameter positions it is a strict
    /// sub-value of.
    pub smaller_than: Vec<BTreeSet<usize>>,
    /// Per value argument: the caller parameter it refers to directly, if the
    /// argument is an unshadowed reference to a parameter.
    pub param_refs: Vec<Option<usize>>,
}

impl CallSite {
    pub fn arg_count(&self) -> usize {
        self.param_refs.len()
    }

    /// Whether the argument at `position` is a strict sub-value of the
    /// caller's parameter `param`.
    pub fn decreases(&self, position: usize, param: usize) -> bool {
        self.smaller_than.get(position).is_some_and(|set| set.contains(&param))
    }

    /// Whether the argument at `position` is the caller's own parameter
    /// at the same position.
    pub fn passes_param_unchanged(&self, position: usize) -> bool {
        self.param_refs.get(position).copied().flatten() == Some(position)
    }
}

/// Collect all calls from `decl` to the functions named in `group`.
pub fn collect_calls(decl: &FuncDecl, group: &[&str]) -> Vec<CallSite> {
    let mut collector = CallCollector {
        group,
        caller: decl,
        vars: ScopeStack::new(),
        calls: vec![],
    };
    for (index, arg) in decl.args.iter().enumerate() {
        let origin = Origin {
            equal: BTreeSet::from([index]),
            smaller: BTreeSet::new(),
        };
        collector.vars.insert(arg.name.clone(), origin);
    }
    collector.visit(&decl.rhs);
    collector.calls
}

/// Collect the calls of every member of `decls` to every other member.
pub fn collect_group_calls(decls: &[FuncDecl]) -> Vec<CallSite> {
    let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
    decls.iter().flat_map(|d| collect_calls(d, &names)).collect()
}

struct CallCollector<'a> {
    group: &'a [&'a str],
    caller: &'a FuncDecl,
    vars: ScopeStack<Origin>,
    calls: Vec<CallSite>,
}

impl CallCollector<'_> {
    fn is_group_ref(&self, name: &str) -> bool {
        self.group.contains(&name) && !self.vars.is_defined(name)
    }

    fn origin(&self, expr: &Expr) -> Origin {
        expr.as_var().and_then(|name| self.vars.lookup(name)).cloned().unwrap_or_default()
    }

    fn param_ref(&self, expr: &Expr) -> Option<usize> {
        let name = expr.as_var()?;
        if !self.vars.refers_to_bottom(name) {
            return None;
        }
        self.caller.args.iter().position(|a| a.name == name)
    }

    fn record_call(&mut self, callee: &str, args: &[&Expr]) {
        let smaller_than = args.iter().map(|arg| self.origin(arg).smaller).collect();
        let param_refs = args.iter().map(|arg| self.param_ref(arg)).collect();
        self.calls.push(CallSite {
            caller: self.caller.name.clone(),
            callee: callee.to_string(),
            smaller_than,
            param_refs,
        });
    }

    fn visit_scoped(&mut self, bindings: Vec<(String, Origin)>, body: &Expr) {
        self.vars.push_scope();
        for (name, origin) in bindings {
            self.vars.insert(name, origin);
        }
        self.visit(body);
        self.vars.pop_scope();
    }

    fn visit(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Var(name) => {
                if self.is_group_ref(name) {
                    self.record_call(name, &[]);
                }
            }
            ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => {}
            ExprKind::App { .. } | ExprKind::TypeApp { .. } => {
                let (head, args) = expr.value_args();
                match head.as_var() {
                    Some(name) if self.is_group_ref(name) => self.record_call(name, &args),
                    _ => self.visit(head),
                }
                for arg in args {
                    self.visit(arg);
                }
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit(cond);
                self.visit(then_branch);
                self.visit(else_branch);
            }
            ExprKind::Case { scrutinee, alts } => {
                self.visit(scrutinee);
                let origin = self.origin(scrutinee);
                let sub_value = Origin {
                    equal: BTreeSet::new(),
                    smaller: origin.equal.union(&origin.smaller).copied().collect(),
                };
                for alt in alts {
                    let bindings = match &alt.pattern {
                        Pattern::Con { vars, .. } => {
                            vars.iter().map(|v| (v.name.clone(), sub_value.clone())).collect()
                        }
                        // A variable pattern is an alias of the scrutinee.
                        Pattern::Var(v) => vec![(v.name.clone(), origin.clone())],
                        Pattern::Lit(_) | Pattern::Wildcard => vec![],
                    };
                    self.visit_scoped(bindings, &alt.rhs);
                }
            }
            ExprKind::Lambda { params, body } => {
                let bindings = params.iter().map(|p| (p.name.clone(), Origin::default())).collect();
                self.visit_scoped(bindings, body);
            }
            ExprKind::Let { binds, body } => {
                self.vars.push_scope();
                for bind in binds {
                    self.vars.insert(bind.var.name.clone(), Origin::default());
                }
                for bind in binds {
                    self.visit(&bind.rhs);
                }
                self.visit(body);
                self.vars.pop_scope();
            }
        }
    }
}
