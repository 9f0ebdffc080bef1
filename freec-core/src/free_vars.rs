//! Free variable analysis for IR expressions.
//!
//! Constructors are not variables and never appear in the results. All sets
//! are ordered by first occurrence so that passes built on top of them are
//! deterministic.

use crate::ast::{Expr, ExprKind, Type};
use indexmap::IndexSet;

/// Free variables of an expression.
pub fn free_vars(expr: &Expr) -> IndexSet<String> {
    let mut free = IndexSet::new();
    let mut bound = Vec::new();
    collect_free_vars(expr, &mut bound, &mut free);
    free
}

/// Free variables of several expressions that share one scope.
pub fn free_vars_of_all<'a>(exprs: impl IntoIterator<Item = &'a Expr>) -> IndexSet<String> {
    let mut free = IndexSet::new();
    for expr in exprs {
        free.extend(free_vars(expr));
    }
    free
}

/// Whether `name` occurs free in `expr`.
pub fn occurs_free(name: &str, expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Var(v) => v == name,
        ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => false,
        ExprKind::App { func, arg } => occurs_free(name, func) || occurs_free(name, arg),
        ExprKind::TypeApp { expr, .. } => occurs_free(name, expr),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => occurs_free(name, cond) || occurs_free(name, then_branch) || occurs_free(name, else_branch),
        ExprKind::Case { scrutinee, alts } => {
            occurs_free(name, scrutinee)
                || alts.iter().any(|alt| {
                    !alt.pattern.binders().iter().any(|b| b.name == name) && occurs_free(name, &alt.rhs)
                })
        }
        ExprKind::Lambda { params, body } => {
            !params.iter().any(|p| p.name == name) && occurs_free(name, body)
        }
        ExprKind::Let { binds, body } => {
            !binds.iter().any(|b| b.var.name == name)
                && (binds.iter().any(|b| occurs_free(name, &b.rhs)) || occurs_free(name, body))
        }
    }
}

fn collect_free_vars(expr: &Expr, bound: &mut Vec<String>, free: &mut IndexSet<String>) {
    match &expr.kind {
        ExprKind::Var(name) => {
            if !bound.contains(name) {
                free.insert(name.clone());
            }
        }
        ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => {}
        ExprKind::App { func, arg } => {
            collect_free_vars(func, bound, free);
            collect_free_vars(arg, bound, free);
        }
        ExprKind::TypeApp { expr, .. } => collect_free_vars(expr, bound, free),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            collect_free_vars(cond, bound, free);
            collect_free_vars(then_branch, bound, free);
            collect_free_vars(else_branch, bound, free);
        }
        ExprKind::Case { scrutinee, alts } => {
            collect_free_vars(scrutinee, bound, free);
            for alt in alts {
                let binders = alt.pattern.binders();
                bound.extend(binders.iter().map(|b| b.name.clone()));
                collect_free_vars(&alt.rhs, bound, free);
                bound.truncate(bound.len() - binders.len());
            }
        }
        ExprKind::Lambda { params, body } => {
            bound.extend(params.iter().map(|p| p.name.clone()));
            collect_free_vars(body, bound, free);
            bound.truncate(bound.len() - params.len());
        }
        ExprKind::Let { binds, body } => {
            bound.extend(binds.iter().map(|b| b.var.name.clone()));
            for bind in binds {
                collect_free_vars(&bind.rhs, bound, free);
            }
            collect_free_vars(body, bound, free);
            bound.truncate(bound.len() - binds.len());
        }
    }
}

/// Free type variables used in the type annotations and visible type
/// applications of an expression.
pub fn free_type_vars(expr: &Expr) -> IndexSet<String> {
    let mut vars = IndexSet::new();
    collect_type_vars(expr, &mut vars);
    vars
}

fn collect_type_vars(expr: &Expr, vars: &mut IndexSet<String>) {
    let mut add = |ty: &Option<Type>, vars: &mut IndexSet<String>| {
        if let Some(ty) = ty {
            vars.extend(ty.type_vars());
        }
    };
    add(&expr.ty, vars);
    match &expr.kind {
        ExprKind::Var(_) | ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => {}
        ExprKind::App { func, arg } => {
            collect_type_vars(func, vars);
            collect_type_vars(arg, vars);
        }
        ExprKind::TypeApp { expr, ty } => {
            collect_type_vars(expr, vars);
            vars.extend(ty.type_vars());
        }
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            collect_type_vars(cond, vars);
            collect_type_vars(then_branch, vars);
            collect_type_vars(else_branch, vars);
        }
        ExprKind::Case { scrutinee, alts } => {
            collect_type_vars(scrutinee, vars);
            for alt in alts {
                for binder in alt.pattern.binders() {
                    add(&binder.ty, vars);
                }
                collect_type_vars(&alt.rhs, vars);
            }
        }
        ExprKind::Lambda { params, body } => {
            for param in params {
                add(&param.ty, vars);
            }
            collect_type_vars(body, vars);
        }
        ExprKind::Let { binds, body } => {
            for bind in binds {
                add(&bind.var.ty, vars);
                collect_type_vars(&bind.rhs, vars);
            }
            collect_type_vars(body, vars);
        }
    }
}

/// Whether the expression uses `undefined` or `error` anywhere.
pub fn uses_partiality_markers(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Undefined | ExprKind::Error(_) => true,
        ExprKind::Var(_) | ExprKind::Con(_) | ExprKind::IntLit(_) => false,
        ExprKind::App { func, arg } => uses_partiality_markers(func) || uses_partiality_markers(arg),
        ExprKind::TypeApp { expr, .. } => uses_partiality_markers(expr),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            uses_partiality_markers(cond)
                || uses_partiality_markers(then_branch)
                || uses_partiality_markers(else_branch)
        }
        ExprKind::Case { scrutinee, alts } => {
            uses_partiality_markers(scrutinee) || alts.iter().any(|alt| uses_partiality_markers(&alt.rhs))
        }
        ExprKind::Lambda { body, .. } => uses_partiality_markers(body),
        ExprKind::Let { binds, body } => {
            binds.iter().any(|b| uses_partiality_markers(&b.rhs)) || uses_partiality_markers(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn test_free_vars_respects_binders() {
        // \x -> f x y
        let expr = lam(&["x"], app(var("f"), vec![var("x"), var("y")]));
        let free: Vec<_> = free_vars(&expr).into_iter().collect();
        assert_eq!(free, vec!["f".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_case_binders_scope_over_alternative_only() {
        // case xs of { Cons y ys -> g ys; Nil -> ys }
        let expr = case_of(
            var("xs"),
            vec![alt_con("Cons", &["y", "ys"], app(var("g"), vec![var("ys")])), alt_con("Nil", &[], var("ys"))],
        );
        assert!(occurs_free("ys", &expr));
        assert!(!occurs_free("y", &expr));
        let free: Vec<_> = free_vars(&expr).into_iter().collect();
        assert_eq!(free, vec!["xs".to_string(), "g".to_string(), "ys".to_string()]);
    }

    #[test]
    fn test_let_is_recursive() {
        // let go = \n -> go n in go z
        let expr = let_in(
            vec![bind("go", lam(&["n"], app(var("go"), vec![var("n")])))],
            app(var("go"), vec![var("z")]),
        );
        let free: Vec<_> = free_vars(&expr).into_iter().collect();
        assert_eq!(free, vec!["z".to_string()]);
        assert!(!occurs_free("go", &expr));
    }

    #[test]
    fn test_constructors_are_not_free_vars() {
        let expr = app(con("Cons"), vec![int(1), con("Nil")]);
        assert!(free_vars(&expr).is_empty());
    }

    #[test]
    fn test_partiality_markers() {
        assert!(uses_partiality_markers(&if_(var("c"), int(1), undefined())));
        assert!(uses_partiality_markers(&lam(&["x"], error("boom"))));
        assert!(!uses_partiality_markers(&app(var("f"), vec![int(1)])));
    }
}
