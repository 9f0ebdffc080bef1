//! Capture-avoiding substitution.
//!
//! A [`Subst`] maps variables to expressions and type variables to types. It
//! is applied simultaneously: replacement expressions are never substituted
//! into again. Binders whose names occur free in a replacement that is used in
//! their scope are renamed to fresh names first.

use crate::ast::{Alt, Bind, Expr, ExprKind, Type, VarPat};
use crate::env::{substitute_type_vars, Environment};
use crate::free_vars::{free_type_vars, free_vars, occurs_free};
use indexmap::{IndexMap, IndexSet};
use log::trace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subst {
    exprs: IndexMap<String, Expr>,
    types: IndexMap<String, Type>,
}

impl Subst {
    pub fn new() -> Self {
        Self::default()
    }

    /// `[name := expr]`
    pub fn single(name: &str, expr: Expr) -> Self {
        let mut subst = Subst::new();
        subst.insert(name, expr);
        subst
    }

    /// `[name := ty]` for a type variable.
    pub fn single_type(name: &str, ty: Type) -> Self {
        let mut subst = Subst::new();
        subst.insert_type(name, ty);
        subst
    }

    /// Rename variables: `[old := new]` for each pair.
    pub fn renaming<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut subst = Subst::new();
        for (old, new) in pairs {
            subst.insert(old, Expr::var(new));
        }
        subst
    }

    pub fn insert(&mut self, name: &str, expr: Expr) {
        self.exprs.insert(name.to_string(), expr);
    }

    pub fn insert_type(&mut self, name: &str, ty: Type) {
        self.types.insert(name.to_string(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Expr> {
        self.exprs.get(name)
    }

    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty() && self.types.is_empty()
    }

    /// Composition: applying the result equals applying `self`, then `other`.
    pub fn compose(&self, env: &mut Environment, other: &Subst) -> Subst {
        let mut exprs = IndexMap::new();
        for (name, expr) in &self.exprs {
            exprs.insert(name.clone(), apply_subst(env, other, expr));
        }
        for (name, expr) in &other.exprs {
            exprs.entry(name.clone()).or_insert_with(|| expr.clone());
        }

        let mut types = IndexMap::new();
        for (name, ty) in &self.types {
            types.insert(name.clone(), other.apply_to_type(ty));
        }
        for (name, ty) in &other.types {
            types.entry(name.clone()).or_insert_with(|| ty.clone());
        }
        Subst { exprs, types }
    }

    /// Apply the type part of the substitution to a type.
    pub fn apply_to_type(&self, ty: &Type) -> Type {
        if self.types.is_empty() {
            return ty.clone();
        }
        let map: IndexMap<&str, Type> = self.types.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        substitute_type_vars(ty, &map)
    }

    fn apply_to_opt_type(&self, ty: &Option<Type>) -> Option<Type> {
        ty.as_ref().map(|ty| self.apply_to_type(ty))
    }

    /// The part of the substitution that can affect `exprs`.
    fn restrict_to(&self, exprs: &[&Expr]) -> Subst {
        let exprs_part = self
            .exprs
            .iter()
            .filter(|(name, _)| exprs.iter().any(|e| occurs_free(name, e)))
            .map(|(name, e)| (name.clone(), e.clone()))
            .collect();
        Subst {
            exprs: exprs_part,
            types: self.types.clone(),
        }
    }

    fn without(&self, names: &[&str]) -> Subst {
        let mut subst = self.clone();
        for name in names {
            subst.exprs.shift_remove(*name);
        }
        subst
    }

    fn replacement_free_vars(&self) -> IndexSet<String> {
        self.exprs.values().flat_map(free_vars).collect()
    }
}

/// Apply `subst` to `expr`, renaming binders where needed to avoid capture.
pub fn apply_subst(env: &mut Environment, subst: &Subst, expr: &Expr) -> Expr {
    let relevant = subst.restrict_to(&[expr]);
    let type_vars_affected = !relevant.types.is_empty() && {
        let used = free_type_vars(expr);
        relevant.types.keys().any(|tv| used.contains(tv))
    };
    if relevant.exprs.is_empty() && !type_vars_affected {
        return expr.clone();
    }
    Substituter { env }.subst_expr(&relevant, expr)
}

/// Apply a type-only substitution to every annotation and type application in `expr`.
pub fn apply_type_subst(env: &mut Environment, types: &IndexMap<String, Type>, expr: &Expr) -> Expr {
    let subst = Subst {
        exprs: IndexMap::new(),
        types: types.clone(),
    };
    apply_subst(env, &subst, expr)
}

struct Substituter<'a> {
    env: &'a mut Environment,
}

impl Substituter<'_> {
    fn subst_expr(&mut self, subst: &Subst, expr: &Expr) -> Expr {
        let ty = subst.apply_to_opt_type(&expr.ty);
        let kind = match &expr.kind {
            ExprKind::Var(name) => {
                if let Some(replacement) = subst.get(name) {
                    return replacement.clone();
                }
                ExprKind::Var(name.clone())
            }
            ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => {
                expr.kind.clone()
            }
            ExprKind::App { func, arg } => ExprKind::App {
                func: Box::new(self.subst_expr(subst, func)),
                arg: Box::new(self.subst_expr(subst, arg)),
            },
            ExprKind::TypeApp { expr: inner, ty } => ExprKind::TypeApp {
                expr: Box::new(self.subst_expr(subst, inner)),
                ty: subst.apply_to_type(ty),
            },
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::If {
                cond: Box::new(self.subst_expr(subst, cond)),
                then_branch: Box::new(self.subst_expr(subst, then_branch)),
                else_branch: Box::new(self.subst_expr(subst, else_branch)),
            },
            ExprKind::Case { scrutinee, alts } => ExprKind::Case {
                scrutinee: Box::new(self.subst_expr(subst, scrutinee)),
                alts: alts.iter().map(|alt| self.subst_alt(subst, alt)).collect(),
            },
            ExprKind::Lambda { params, body } => {
                let (inner, params) = self.enter_binders(subst, params, &[body.as_ref()]);
                ExprKind::Lambda {
                    params,
                    body: Box::new(self.subst_expr(&inner, body)),
                }
            }
            ExprKind::Let { binds, body } => {
                let vars: Vec<VarPat> = binds.iter().map(|b| b.var.clone()).collect();
                let mut scope: Vec<&Expr> = binds.iter().map(|b| &b.rhs).collect();
                scope.push(body.as_ref());
                let (inner, vars) = self.enter_binders(subst, &vars, &scope);
                let binds = vars
                    .into_iter()
                    .zip(binds)
                    .map(|(var, bind)| Bind {
                        var,
                        rhs: self.subst_expr(&inner, &bind.rhs),
                    })
                    .collect();
                ExprKind::Let {
                    binds,
                    body: Box::new(self.subst_expr(&inner, body)),
                }
            }
        };
        Expr {
            kind,
            span: expr.span,
            ty,
        }
    }

    fn subst_alt(&mut self, subst: &Subst, alt: &Alt) -> Alt {
        let (inner, binders) = self.enter_binders(subst, alt.pattern.binders(), &[&alt.rhs]);
        let mut pattern = alt.pattern.clone();
        for (slot, binder) in pattern.binders_mut().iter_mut().zip(binders) {
            *slot = binder;
        }
        Alt {
            pattern,
            rhs: self.subst_expr(&inner, &alt.rhs),
        }
    }

    /// Compute the substitution for the scope of `binders` and rename the
    /// binders that would capture a free variable of a used replacement.
    fn enter_binders(&mut self, subst: &Subst, binders: &[VarPat], scope: &[&Expr]) -> (Subst, Vec<VarPat>) {
        let names: Vec<&str> = binders.iter().map(|b| b.name.as_str()).collect();
        let mut inner = subst.without(&names).restrict_to(scope);
        let captured = inner.replacement_free_vars();

        let mut renamed = Vec::with_capacity(binders.len());
        for binder in binders {
            let mut binder = VarPat {
                ty: subst.apply_to_opt_type(&binder.ty),
                ..binder.clone()
            };
            if captured.contains(&binder.name) {
                let fresh = self.env.fresh_ident(&binder.name);
                trace!("subst: renaming binder {} to {} to avoid capture", binder.name, fresh);
                inner.insert(&binder.name, Expr::var(&fresh).with_span(binder.span).with_type(binder.ty.clone()));
                binder.name = fresh;
            }
            renamed.push(binder);
        }
        (inner, renamed)
    }
}
