//! Builders for IR fragments used throughout the unit tests.

use crate::ast::*;

pub fn var(name: &str) -> Expr {
    Expr::var(name)
}

pub fn con(name: &str) -> Expr {
    Expr::con(name)
}

pub fn int(value: i64) -> Expr {
    Expr::int(value)
}

pub fn undefined() -> Expr {
    Expr::new(ExprKind::Undefined)
}

pub fn error(msg: &str) -> Expr {
    Expr::new(ExprKind::Error(msg.to_string()))
}

pub fn app(func: Expr, args: Vec<Expr>) -> Expr {
    Expr::app(func, args)
}

pub fn tapp(expr: Expr, tys: Vec<Type>) -> Expr {
    Expr::type_app(expr, tys)
}

/// Binary operator application: `op(lhs, "+", rhs)` is `(+) lhs rhs`.
pub fn op(lhs: Expr, name: &str, rhs: Expr) -> Expr {
    Expr::app(Expr::var(name), vec![lhs, rhs])
}

pub fn lam(params: &[&str], body: Expr) -> Expr {
    Expr::lambda(params.iter().map(|p| VarPat::new(p)).collect(), body)
}

pub fn if_(cond: Expr, then_branch: Expr, else_branch: Expr) -> Expr {
    Expr::if_then_else(cond, then_branch, else_branch)
}

pub fn case_of(scrutinee: Expr, alts: Vec<Alt>) -> Expr {
    Expr::case(scrutinee, alts)
}

pub fn alt_con(name: &str, vars: &[&str], rhs: Expr) -> Alt {
    Alt {
        pattern: Pattern::Con {
            name: name.to_string(),
            vars: vars.iter().map(|v| VarPat::new(v)).collect(),
        },
        rhs,
    }
}

pub fn alt_lit(value: i64, rhs: Expr) -> Alt {
    Alt {
        pattern: Pattern::Lit(value),
        rhs,
    }
}

pub fn alt_var(name: &str, rhs: Expr) -> Alt {
    Alt {
        pattern: Pattern::Var(VarPat::new(name)),
        rhs,
    }
}

pub fn alt_wild(rhs: Expr) -> Alt {
    Alt {
        pattern: Pattern::Wildcard,
        rhs,
    }
}

pub fn let_in(binds: Vec<Bind>, body: Expr) -> Expr {
    Expr::let_in(binds, body)
}

pub fn bind(name: &str, rhs: Expr) -> Bind {
    Bind {
        var: VarPat::new(name),
        rhs,
    }
}

pub fn tcon(name: &str) -> Type {
    Type::con(name)
}

pub fn tvar(name: &str) -> Type {
    Type::var(name)
}

pub fn list_of(elem: Type) -> Type {
    Type::app(Type::con("List"), vec![elem])
}

/// Untyped function declaration.
pub fn func(name: &str, args: &[&str], rhs: Expr) -> FuncDecl {
    FuncDecl {
        name: name.to_string(),
        span: Span::generated(),
        type_args: vec![],
        args: args.iter().map(|a| VarPat::new(a)).collect(),
        return_type: None,
        rhs,
    }
}

/// Function declaration with type arguments and annotated parameters.
pub fn typed_func(
    name: &str,
    type_args: &[&str],
    args: &[(&str, Type)],
    return_type: Type,
    rhs: Expr,
) -> FuncDecl {
    FuncDecl {
        name: name.to_string(),
        span: Span::generated(),
        type_args: type_args.iter().map(|t| TypeVarDecl::new(t)).collect(),
        args: args.iter().map(|(a, ty)| VarPat::typed(a, ty.clone())).collect(),
        return_type: Some(return_type),
        rhs,
    }
}

pub fn data(name: &str, type_args: &[&str], constructors: Vec<(&str, Vec<Type>)>) -> TypeDecl {
    TypeDecl::Data(DataDecl {
        name: name.to_string(),
        type_args: type_args.iter().map(|t| TypeVarDecl::new(t)).collect(),
        constructors: constructors
            .into_iter()
            .map(|(con, fields)| ConDecl {
                name: con.to_string(),
                fields,
                span: Span::generated(),
            })
            .collect(),
        span: Span::generated(),
    })
}

pub fn synonym(name: &str, type_args: &[&str], rhs: Type) -> TypeDecl {
    TypeDecl::Synonym(TypeSynDecl {
        name: name.to_string(),
        type_args: type_args.iter().map(|t| TypeVarDecl::new(t)).collect(),
        rhs,
        span: Span::generated(),
    })
}

/// `data List a = Nil | Cons a (List a)`
pub fn list_decl() -> TypeDecl {
    data(
        "List",
        &["a"],
        vec![("Nil", vec![]), ("Cons", vec![tvar("a"), list_of(tvar("a"))])],
    )
}

/// `len xs = case xs of { Nil -> 0; Cons y ys -> 1 + len ys }`
pub fn len_decl() -> FuncDecl {
    func(
        "len",
        &["xs"],
        case_of(
            var("xs"),
            vec![
                alt_con("Nil", &[], int(0)),
                alt_con("Cons", &["y", "ys"], op(int(1), "+", app(var("len"), vec![var("ys")]))),
            ],
        ),
    )
}

/// `fac n = case n of { 0 -> 1; _ -> n * fac (n - 1) }`
pub fn fac_decl() -> FuncDecl {
    func(
        "fac",
        &["n"],
        case_of(
            var("n"),
            vec![
                alt_lit(0, int(1)),
                alt_wild(op(var("n"), "*", app(var("fac"), vec![op(var("n"), "-", int(1))]))),
            ],
        ),
    )
}
