//! Inlining of non-recursive function declarations.
//!
//! Every unshadowed reference to one of the given declarations is replaced by
//! the declaration's right-hand side. The parameters of the inlined function
//! are renamed to fresh names first, then enclosing applications substitute
//! their arguments one by one. Parameters that are still unsubstituted when
//! the expression is used as a value become a lambda. Local binders that
//! would capture a free variable of an inlined right-hand side are renamed.

use crate::ast::{Alt, Bind, Expr, ExprKind, FuncDecl, Type, VarPat};
use crate::bail_unresolved;
use crate::env::Environment;
use crate::error::Result;
use crate::free_vars::free_vars;
use crate::subst::{apply_subst, Subst};
use indexmap::{IndexMap, IndexSet};
use log::trace;

/// A partially applied inlined function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial {
    /// Type parameters that still await a type argument.
    pub type_args: Vec<String>,
    /// Value parameters that still await an argument.
    pub args: Vec<VarPat>,
    pub expr: Expr,
}

impl Partial {
    fn saturated(expr: Expr) -> Self {
        Partial {
            type_args: vec![],
            args: vec![],
            expr,
        }
    }
}

/// Inline `decls` into the right-hand side of `decl`.
pub fn inline_func_decls(env: &mut Environment, decls: &[FuncDecl], decl: &FuncDecl) -> Result<FuncDecl> {
    let mut inliner = Inliner::new(env, decls);
    let (args, scope) = inliner.avoid_capture(&decl.args, &[&decl.rhs]);
    let rhs = inliner.with_shadowed(&args, |this| this.inline_value(&scope[0]))?;
    Ok(FuncDecl {
        args,
        rhs,
        ..decl.clone()
    })
}

/// Inline `decls` into `expr`.
pub fn inline_expr(env: &mut Environment, decls: &[FuncDecl], expr: &Expr) -> Result<Expr> {
    Inliner::new(env, decls).inline_value(expr)
}

struct Inliner<'a> {
    env: &'a mut Environment,
    decls: IndexMap<&'a str, &'a FuncDecl>,
    /// Free variables of the inlined right-hand sides.
    globals: IndexSet<String>,
    /// Locally bound names; references to them are never inlined.
    shadowed: Vec<String>,
    /// Declarations currently being inlined.
    active: Vec<String>,
}

impl<'a> Inliner<'a> {
    fn new(env: &'a mut Environment, decls: &'a [FuncDecl]) -> Self {
        let globals = decls
            .iter()
            .flat_map(|d| {
                let params = d.arg_names();
                free_vars(&d.rhs).into_iter().filter(move |v| !params.contains(&v.as_str()))
            })
            .collect();
        Inliner {
            env,
            decls: decls.iter().map(|d| (d.name.as_str(), d)).collect(),
            globals,
            shadowed: vec![],
            active: vec![],
        }
    }

    /// Inline into an expression that is used as a value.
    fn inline_value(&mut self, expr: &Expr) -> Result<Expr> {
        let partial = self.inline(expr)?;
        if let Some(missing) = partial.type_args.first() {
            bail_unresolved!("inlined reference is used without its type argument '{}'", missing);
        }
        Ok(Expr::lambda(partial.args, partial.expr))
    }

    fn inline(&mut self, expr: &Expr) -> Result<Partial> {
        match &expr.kind {
            ExprKind::Var(name) if self.is_inlined(name) => self.unfold(name),
            ExprKind::Var(_) | ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => {
                Ok(Partial::saturated(expr.clone()))
            }
            ExprKind::App { func, arg } => {
                let mut partial = self.inline(func)?;
                let arg = self.inline_value(arg)?;
                if let Some(missing) = partial.type_args.first() {
                    bail_unresolved!("value argument applied before the type argument '{}'", missing);
                }
                if partial.args.is_empty() {
                    let span = expr.span;
                    return Ok(Partial::saturated(Expr {
                        kind: ExprKind::App {
                            func: Box::new(partial.expr),
                            arg: Box::new(arg),
                        },
                        span,
                        ty: expr.ty.clone(),
                    }));
                }
                let param = partial.args.remove(0);
                partial.expr = apply_subst(self.env, &Subst::single(&param.name, arg), &partial.expr);
                Ok(partial)
            }
            ExprKind::TypeApp { expr: inner, ty } => {
                let mut partial = self.inline(inner)?;
                if partial.type_args.is_empty() {
                    if !partial.args.is_empty() {
                        bail_unresolved!("type application to an inlined function without type parameters");
                    }
                    return Ok(Partial::saturated(Expr {
                        kind: ExprKind::TypeApp {
                            expr: Box::new(partial.expr),
                            ty: ty.clone(),
                        },
                        span: expr.span,
                        ty: expr.ty.clone(),
                    }));
                }
                let type_var = partial.type_args.remove(0);
                let subst = Subst::single_type(&type_var, ty.clone());
                partial.expr = apply_subst(self.env, &subst, &partial.expr);
                for param in &mut partial.args {
                    param.ty = param.ty.as_ref().map(|t| subst.apply_to_type(t));
                }
                Ok(partial)
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let kind = ExprKind::If {
                    cond: Box::new(self.inline_value(cond)?),
                    then_branch: Box::new(self.inline_value(then_branch)?),
                    else_branch: Box::new(self.inline_value(else_branch)?),
                };
                Ok(self.rebuild(expr, kind))
            }
            ExprKind::Case { scrutinee, alts } => {
                let scrutinee = self.inline_value(scrutinee)?;
                let alts = alts
                    .iter()
                    .map(|alt| {
                        let (binders, scope) = self.avoid_capture(alt.pattern.binders(), &[&alt.rhs]);
                        let rhs = self.with_shadowed(&binders, |this| this.inline_value(&scope[0]))?;
                        let mut pattern = alt.pattern.clone();
                        for (slot, binder) in pattern.binders_mut().iter_mut().zip(binders) {
                            *slot = binder;
                        }
                        Ok(Alt { pattern, rhs })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.rebuild(
                    expr,
                    ExprKind::Case {
                        scrutinee: Box::new(scrutinee),
                        alts,
                    },
                ))
            }
            ExprKind::Lambda { params, body } => {
                let (params, scope) = self.avoid_capture(params, &[body.as_ref()]);
                let body = self.with_shadowed(&params, |this| this.inline_value(&scope[0]))?;
                Ok(self.rebuild(
                    expr,
                    ExprKind::Lambda {
                        params,
                        body: Box::new(body),
                    },
                ))
            }
            ExprKind::Let { binds, body } => {
                let vars: Vec<VarPat> = binds.iter().map(|b| b.var.clone()).collect();
                let mut scope: Vec<&Expr> = binds.iter().map(|b| &b.rhs).collect();
                scope.push(body.as_ref());
                let (vars, mut scope) = self.avoid_capture(&vars, &scope);
                let Some(body) = scope.pop() else {
                    panic!("BUG: let scope without a body");
                };
                let (binds, body) = self.with_shadowed(&vars, |this| {
                    let binds = vars
                        .iter()
                        .zip(&scope)
                        .map(|(var, rhs)| {
                            Ok(Bind {
                                var: var.clone(),
                                rhs: this.inline_value(rhs)?,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    Ok((binds, this.inline_value(&body)?))
                })?;
                Ok(self.rebuild(
                    expr,
                    ExprKind::Let {
                        binds,
                        body: Box::new(body),
                    },
                ))
            }
        }
    }

    fn rebuild(&self, expr: &Expr, kind: ExprKind) -> Partial {
        Partial::saturated(Expr {
            kind,
            span: expr.span,
            ty: expr.ty.clone(),
        })
    }

    fn is_inlined(&self, name: &str) -> bool {
        self.decls.contains_key(name) && !self.shadowed.iter().any(|s| s == name)
    }

    fn with_shadowed<T>(&mut self, binders: &[VarPat], f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let depth = self.shadowed.len();
        self.shadowed.extend(binders.iter().map(|b| b.name.clone()));
        let result = f(self);
        self.shadowed.truncate(depth);
        result
    }

    /// Rename the `binders` that would capture a free variable of an inlined
    /// right-hand side, in the binders and in their `scope`.
    fn avoid_capture(&mut self, binders: &[VarPat], scope: &[&Expr]) -> (Vec<VarPat>, Vec<Expr>) {
        let mut renaming = Subst::new();
        let mut renamed = Vec::with_capacity(binders.len());
        for binder in binders {
            if !self.globals.contains(&binder.name) {
                renamed.push(binder.clone());
                continue;
            }
            let fresh = self.env.fresh_ident(&binder.name);
            trace!("inline: renaming binder {} to {} to avoid capture", binder.name, fresh);
            renaming.insert(&binder.name, Expr::var(&fresh).with_span(binder.span).with_type(binder.ty.clone()));
            renamed.push(VarPat {
                name: fresh,
                ..binder.clone()
            });
        }
        let scope = scope.iter().map(|e| apply_subst(self.env, &renaming, e)).collect();
        (renamed, scope)
    }

    /// Replace a reference to `name` by the declaration's right-hand side with
    /// fresh parameter names.
    fn unfold(&mut self, name: &str) -> Result<Partial> {
        let Some(&decl) = self.decls.get(name) else {
            bail_unresolved!("'{}' is not among the inlined declarations", name);
        };
        if self.active.iter().any(|a| a == name) {
            bail_unresolved!("'{}' would be inlined into itself", name);
        }
        let mut renaming = Subst::new();
        let mut type_args = Vec::with_capacity(decl.type_args.len());
        for type_arg in &decl.type_args {
            let fresh = self.env.fresh_ident(&type_arg.name);
            renaming.insert_type(&type_arg.name, Type::Var(fresh.clone()));
            type_args.push(fresh);
        }
        let mut args = Vec::with_capacity(decl.args.len());
        for arg in &decl.args {
            let fresh = VarPat {
                name: self.env.fresh_ident(&arg.name),
                ty: arg.ty.as_ref().map(|t| renaming.apply_to_type(t)),
                span: arg.span,
            };
            renaming.insert(&arg.name, fresh.to_expr());
            args.push(fresh);
        }
        trace!(
            "inline: unfolding {} with parameters [{}]",
            name,
            args.iter().map(|a| a.name.as_str()).collect::<Vec<_>>().join(", ")
        );

        let rhs = apply_subst(self.env, &renaming, &decl.rhs);
        self.active.push(name.to_string());
        let result = self.with_shadowed(&args, |this| this.inline_value(&rhs));
        self.active.pop();
        Ok(Partial {
            type_args,
            args,
            expr: result?,
        })
    }
}
