//! Helper/main split for recursive functions.
//!
//! Every outermost `case` on the decreasing argument of a recursive function
//! is lifted into a helper function whose parameters are the variables the
//! `case` uses from its enclosing scope. The original function becomes a
//! non-recursive main function that calls its helpers. Finally the main
//! functions of the group are inlined into the helpers so that the helpers
//! recurse on each other directly and are structurally recursive.

use crate::ast::{Alt, Bind, Expr, ExprKind, FuncDecl, Type, VarPat};
use crate::env::{DecArg, Environment, FuncEntry};
use crate::error::Result;
use crate::free_vars::free_vars;
use crate::fresh::root_prefix;
use crate::inline::inline_func_decls;
use crate::scope::ScopeStack;
use crate::sentence::{FixpointBody, Sentence};
use log::debug;

/// Split a recursive function into helpers and a main function.
///
/// `dec_arg` is the position of the decreasing parameter of `decl`. The
/// helpers are registered in the environment together with their decreasing
/// arguments. They still call the original function by name.
pub fn transform_rec_func_decl(
    env: &mut Environment,
    decl: &FuncDecl,
    dec_arg: usize,
) -> Result<(Vec<FuncDecl>, FuncDecl)> {
    let Some(dec_param) = decl.args.get(dec_arg) else {
        panic!("BUG: decreasing argument #{} of '{}' out of range", dec_arg, decl.name);
    };

    let mut extractor = HelperExtractor::new(env, decl, &dec_param.name);
    let rhs = extractor.extract(&decl.rhs, true);
    let mut helpers = extractor.helpers;

    let main_rhs = if helpers.is_empty() {
        debug!("no case on '{}' in '{}', using the whole body as helper", dec_param.name, decl.name);
        let params: Vec<(String, Option<Type>)> =
            decl.args.iter().map(|a| (a.name.clone(), a.ty.clone())).collect();
        let (helper, call) = make_helper(env, decl, &dec_param.name, params, decl.rhs.clone(), true);
        helpers.push(helper);
        call
    } else {
        rhs
    };

    let main = FuncDecl {
        rhs: main_rhs,
        ..decl.clone()
    };
    Ok((helpers, main))
}

/// Transform a recursive group with known decreasing arguments.
///
/// Produces one `Fixpoint` with the helpers of all functions followed by a
/// `Definition` for each main function.
pub fn convert_rec_func_decls_with_helpers(
    env: &mut Environment,
    decls: &[FuncDecl],
    dec_args: &[usize],
) -> Result<Vec<Sentence>> {
    let mut helpers = Vec::new();
    let mut mains = Vec::with_capacity(decls.len());
    for (decl, &dec_arg) in decls.iter().zip(dec_args) {
        let (decl_helpers, main) = transform_rec_func_decl(env, decl, dec_arg)?;
        debug!(
            "split '{}' into [{}] and a main function",
            decl.name,
            decl_helpers.iter().map(|h| h.name.as_str()).collect::<Vec<_>>().join(", ")
        );
        helpers.extend(decl_helpers);
        mains.push(main);
    }

    let helpers = env.scoped(|env| {
        helpers.iter().map(|helper| inline_func_decls(env, &mains, helper)).collect::<Result<Vec<_>>>()
    })?;

    let mut bodies = Vec::with_capacity(helpers.len());
    for helper in helpers {
        let Some(index) = env.lookup_dec_arg(&helper.name).map(|d| d.index) else {
            panic!("BUG: helper '{}' has no decreasing argument", helper.name);
        };
        // Inlining may have renamed the parameters of the helper.
        let decreasing_arg = DecArg {
            index,
            name: helper.args[index].name.clone(),
        };
        env.define_dec_arg(&helper.name, index, &decreasing_arg.name);
        bodies.push(FixpointBody {
            decl: helper,
            decreasing_arg,
        });
    }
    for main in &mains {
        env.remove_dec_arg(&main.name);
    }

    let mut sentences = vec![Sentence::Fixpoint(bodies)];
    sentences.extend(mains.into_iter().map(Sentence::Definition));
    Ok(sentences)
}

/// Create and register a helper for `body`. Returns the helper and the
/// expression that calls it.
fn make_helper(
    env: &mut Environment,
    decl: &FuncDecl,
    dec_param: &str,
    params: Vec<(String, Option<Type>)>,
    body: Expr,
    is_root: bool,
) -> (FuncDecl, Expr) {
    let name = env.fresh_ident(&format!("{}_helper", root_prefix(&decl.name)));
    let Some(dec_index) = params.iter().position(|(p, _)| p == dec_param) else {
        panic!("BUG: helper of '{}' does not capture the decreasing argument", decl.name);
    };

    let return_type = if is_root { decl.return_type.clone() } else { body.ty.clone() };
    let args: Vec<VarPat> = params
        .into_iter()
        .map(|(p, ty)| VarPat {
            name: p,
            ty,
            span: body.span,
        })
        .collect();

    env.add_func_entry(FuncEntry {
        name: name.clone(),
        span: decl.span,
        type_args: decl.type_arg_names(),
        arg_types: args.iter().map(|a| a.ty.clone()).collect(),
        return_type: return_type.clone(),
        needs_free_args: env.needs_free_args(&decl.name),
        partial: env.is_partial(&decl.name),
    });
    env.define_dec_arg(&name, dec_index, dec_param);

    let call = Expr::app(
        Expr::type_app(Expr::var(&name), decl.type_args.iter().map(|t| t.to_type()).collect()),
        args.iter().map(|a| a.to_expr()).collect(),
    )
    .with_span(body.span)
    .with_type(body.ty.clone());

    let helper = FuncDecl {
        name,
        span: decl.span,
        type_args: decl.type_args.clone(),
        args,
        return_type,
        rhs: body,
    };
    (helper, call)
}

/// Replaces the outermost `case` expressions on the decreasing argument by
/// calls to new helpers.
struct HelperExtractor<'a> {
    env: &'a mut Environment,
    decl: &'a FuncDecl,
    dec_param: &'a str,
    /// Bound variables with their types; the bottom scope holds the parameters.
    scope: ScopeStack<Option<Type>>,
    helpers: Vec<FuncDecl>,
}

impl<'a> HelperExtractor<'a> {
    fn new(env: &'a mut Environment, decl: &'a FuncDecl, dec_param: &'a str) -> Self {
        let mut scope = ScopeStack::new();
        for arg in &decl.args {
            scope.insert(arg.name.clone(), arg.ty.clone());
        }
        HelperExtractor {
            env,
            decl,
            dec_param,
            scope,
            helpers: vec![],
        }
    }

    fn is_dec_arg_case(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Case { scrutinee, .. } => {
                scrutinee.as_var() == Some(self.dec_param) && self.scope.refers_to_bottom(self.dec_param)
            }
            _ => false,
        }
    }

    /// Variables used by `expr` that are bound in the current scope, in
    /// binding order.
    fn captured_vars(&self, expr: &Expr) -> Vec<(String, Option<Type>)> {
        let used = free_vars(expr);
        self.scope
            .visible_bindings()
            .into_iter()
            .filter(|(name, _)| used.contains(*name))
            .map(|(name, ty)| (name.to_string(), ty.clone()))
            .collect()
    }

    fn with_binders<T>(&mut self, binders: &[VarPat], f: impl FnOnce(&mut Self) -> T) -> T {
        self.scope.push_scope();
        for binder in binders {
            self.scope.insert(binder.name.clone(), binder.ty.clone());
        }
        let result = f(self);
        self.scope.pop_scope();
        result
    }

    fn extract(&mut self, expr: &Expr, is_root: bool) -> Expr {
        if self.is_dec_arg_case(expr) {
            let params = self.captured_vars(expr);
            let (helper, call) =
                make_helper(self.env, self.decl, self.dec_param, params, expr.clone(), is_root);
            self.helpers.push(helper);
            return call;
        }

        let kind = match &expr.kind {
            ExprKind::Var(_) | ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => {
                return expr.clone();
            }
            ExprKind::App { func, arg } => ExprKind::App {
                func: Box::new(self.extract(func, false)),
                arg: Box::new(self.extract(arg, false)),
            },
            ExprKind::TypeApp { expr: inner, ty } => ExprKind::TypeApp {
                expr: Box::new(self.extract(inner, false)),
                ty: ty.clone(),
            },
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::If {
                cond: Box::new(self.extract(cond, false)),
                then_branch: Box::new(self.extract(then_branch, false)),
                else_branch: Box::new(self.extract(else_branch, false)),
            },
            ExprKind::Case { scrutinee, alts } => ExprKind::Case {
                scrutinee: Box::new(self.extract(scrutinee, false)),
                alts: alts
                    .iter()
                    .map(|alt| Alt {
                        pattern: alt.pattern.clone(),
                        rhs: self.with_binders(alt.pattern.binders(), |this| this.extract(&alt.rhs, false)),
                    })
                    .collect(),
            },
            ExprKind::Lambda { params, body } => ExprKind::Lambda {
                params: params.clone(),
                body: Box::new(self.with_binders(params, |this| this.extract(body, false))),
            },
            ExprKind::Let { binds, body } => {
                let vars: Vec<VarPat> = binds.iter().map(|b| b.var.clone()).collect();
                self.with_binders(&vars, |this| ExprKind::Let {
                    binds: binds
                        .iter()
                        .map(|b| Bind {
                            var: b.var.clone(),
                            rhs: this.extract(&b.rhs, false),
                        })
                        .collect(),
                    body: Box::new(this.extract(body, false)),
                })
            }
        };
        Expr {
            kind,
            span: expr.span,
            ty: expr.ty.clone(),
        }
    }
}
