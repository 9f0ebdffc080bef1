//! Intermediate representation of a parsed, name-simplified source module.
//!
//! Expressions are curried: `f x y` is `App(App(f, x), y)`. Visible type
//! applications (`f @a`) are separate nodes so that the type arguments of
//! polymorphic functions can be passed through explicitly.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Source location span tracking (line, column) start and end positions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Span of compiler-generated code.
    pub fn generated() -> Self {
        Span::default()
    }

    /// Check if this is a generated/dummy span (all zeros)
    pub fn is_generated(&self) -> bool {
        self.start_line == 0 && self.start_col == 0 && self.end_line == 0 && self.end_col == 0
    }

    /// Merge two spans to create a span covering both
    pub fn merge(&self, other: &Span) -> Span {
        if self.is_generated() {
            return *other;
        }
        if other.is_generated() {
            return *self;
        }
        let (start_line, start_col) = if (self.start_line, self.start_col) <= (other.start_line, other.start_col)
        {
            (self.start_line, self.start_col)
        } else {
            (other.start_line, other.start_col)
        };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col) {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        Span {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}:{}..{}", self.start_line, self.start_col, self.end_col)
        } else {
            write!(f, "{}:{}..{}:{}", self.start_line, self.start_col, self.end_line, self.end_col)
        }
    }
}

// =============================================================================
// Types
// =============================================================================

/// A type expression as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Type variable: `a`
    Var(String),
    /// Type constructor: `Maybe`, `Integer`
    Con(String),
    /// Type application: `Maybe a`
    App(Box<Type>, Box<Type>),
    /// Function type: `a -> b`
    Func(Box<Type>, Box<Type>),
}

impl Type {
    pub fn var(name: &str) -> Type {
        Type::Var(name.to_string())
    }

    pub fn con(name: &str) -> Type {
        Type::Con(name.to_string())
    }

    /// Apply a type constructor to arguments: `app(List, [a])` is `List a`.
    pub fn app(head: Type, args: Vec<Type>) -> Type {
        args.into_iter().fold(head, |acc, arg| Type::App(Box::new(acc), Box::new(arg)))
    }

    /// Build `a1 -> ... -> an -> ret`.
    pub fn func(args: Vec<Type>, ret: Type) -> Type {
        args.into_iter().rev().fold(ret, |acc, arg| Type::Func(Box::new(arg), Box::new(acc)))
    }

    /// Split a type application into its head and arguments.
    pub fn split_app(&self) -> (&Type, Vec<&Type>) {
        let mut args = Vec::new();
        let mut current = self;
        while let Type::App(head, arg) = current {
            args.push(arg.as_ref());
            current = head;
        }
        args.reverse();
        (current, args)
    }

    /// Type variables in order of first occurrence.
    pub fn type_vars(&self) -> IndexSet<String> {
        let mut vars = IndexSet::new();
        self.collect(&mut vars, &mut IndexSet::new());
        vars
    }

    /// Type constructors in order of first occurrence.
    pub fn type_cons(&self) -> IndexSet<String> {
        let mut cons = IndexSet::new();
        self.collect(&mut IndexSet::new(), &mut cons);
        cons
    }

    fn collect(&self, vars: &mut IndexSet<String>, cons: &mut IndexSet<String>) {
        match self {
            Type::Var(name) => {
                vars.insert(name.clone());
            }
            Type::Con(name) => {
                cons.insert(name.clone());
            }
            Type::App(lhs, rhs) | Type::Func(lhs, rhs) => {
                lhs.collect(vars, cons);
                rhs.collect(vars, cons);
            }
        }
    }
}

// =============================================================================
// Patterns
// =============================================================================

/// A variable binder with an optional type annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarPat {
    pub name: String,
    #[serde(default)]
    pub ty: Option<Type>,
    #[serde(default)]
    pub span: Span,
}

impl VarPat {
    pub fn new(name: &str) -> Self {
        VarPat {
            name: name.to_string(),
            ty: None,
            span: Span::generated(),
        }
    }

    pub fn typed(name: &str, ty: Type) -> Self {
        VarPat {
            name: name.to_string(),
            ty: Some(ty),
            span: Span::generated(),
        }
    }

    pub fn to_expr(&self) -> Expr {
        Expr {
            kind: ExprKind::Var(self.name.clone()),
            span: self.span,
            ty: self.ty.clone(),
        }
    }
}

/// Pattern of a case alternative. Patterns are flat: constructor patterns bind
/// variables only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    Con { name: String, vars: Vec<VarPat> },
    Lit(i64),
    Var(VarPat),
    Wildcard,
}

impl Pattern {
    /// Variables bound by this pattern.
    pub fn binders(&self) -> &[VarPat] {
        match self {
            Pattern::Con { vars, .. } => vars,
            Pattern::Var(var) => std::slice::from_ref(var),
            Pattern::Lit(_) | Pattern::Wildcard => &[],
        }
    }

    pub fn binders_mut(&mut self) -> &mut [VarPat] {
        match self {
            Pattern::Con { vars, .. } => vars,
            Pattern::Var(var) => std::slice::from_mut(var),
            Pattern::Lit(_) | Pattern::Wildcard => &mut [],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alt {
    pub pattern: Pattern,
    pub rhs: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bind {
    pub var: VarPat,
    pub rhs: Expr,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(default)]
    pub span: Span,
    /// Type annotation, if known.
    #[serde(default)]
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Variable or function reference.
    Var(String),

    /// Data constructor.
    Con(String),

    /// Application: f x
    App { func: Box<Expr>, arg: Box<Expr> },

    /// Visible type application: f @t
    TypeApp { expr: Box<Expr>, ty: Type },

    /// Conditional: if cond then t else e
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// case scrutinee of { alts }
    Case { scrutinee: Box<Expr>, alts: Vec<Alt> },

    /// \x y -> body
    Lambda { params: Vec<VarPat>, body: Box<Expr> },

    /// Recursive let: binders scope over all right-hand sides and the body.
    Let { binds: Vec<Bind>, body: Box<Expr> },

    IntLit(i64),

    /// `undefined`
    Undefined,

    /// `error "message"`
    Error(String),
}

/// Argument in an application spine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Type(Type),
    Value(Expr),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            span: Span::generated(),
            ty: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_type(mut self, ty: Option<Type>) -> Self {
        self.ty = ty;
        self
    }

    pub fn var(name: &str) -> Self {
        Expr::new(ExprKind::Var(name.to_string()))
    }

    pub fn con(name: &str) -> Self {
        Expr::new(ExprKind::Con(name.to_string()))
    }

    pub fn int(value: i64) -> Self {
        Expr::new(ExprKind::IntLit(value))
    }

    /// Apply `func` to the given value arguments.
    pub fn app(func: Expr, args: Vec<Expr>) -> Self {
        args.into_iter().fold(func, |acc, arg| {
            let span = acc.span.merge(&arg.span);
            Expr::new(ExprKind::App {
                func: Box::new(acc),
                arg: Box::new(arg),
            })
            .with_span(span)
        })
    }

    /// Apply `expr` to the given types.
    pub fn type_app(expr: Expr, tys: Vec<Type>) -> Self {
        tys.into_iter().fold(expr, |acc, ty| {
            let span = acc.span;
            Expr::new(ExprKind::TypeApp {
                expr: Box::new(acc),
                ty,
            })
            .with_span(span)
        })
    }

    /// Apply `head` to a mixed sequence of type and value arguments.
    pub fn apply_args(head: Expr, args: Vec<Arg>) -> Self {
        args.into_iter().fold(head, |acc, arg| match arg {
            Arg::Type(ty) => Expr::type_app(acc, vec![ty]),
            Arg::Value(value) => Expr::app(acc, vec![value]),
        })
    }

    pub fn lambda(params: Vec<VarPat>, body: Expr) -> Self {
        if params.is_empty() {
            return body;
        }
        let span = body.span;
        Expr::new(ExprKind::Lambda {
            params,
            body: Box::new(body),
        })
        .with_span(span)
    }

    pub fn case(scrutinee: Expr, alts: Vec<Alt>) -> Self {
        Expr::new(ExprKind::Case {
            scrutinee: Box::new(scrutinee),
            alts,
        })
    }

    pub fn if_then_else(cond: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::new(ExprKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    pub fn let_in(binds: Vec<Bind>, body: Expr) -> Self {
        Expr::new(ExprKind::Let {
            binds,
            body: Box::new(body),
        })
    }

    /// Name of the variable if this expression is a plain variable reference.
    pub fn as_var(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Var(name) => Some(name),
            _ => None,
        }
    }

    /// Decompose an application spine into its head and arguments, outermost last.
    pub fn spine(&self) -> (&Expr, Vec<Arg>) {
        let mut args = Vec::new();
        let mut current = self;
        loop {
            match &current.kind {
                ExprKind::App { func, arg } => {
                    args.push(Arg::Value(arg.as_ref().clone()));
                    current = func;
                }
                ExprKind::TypeApp { expr, ty } => {
                    args.push(Arg::Type(ty.clone()));
                    current = expr;
                }
                _ => break,
            }
        }
        args.reverse();
        (current, args)
    }

    /// Value arguments of an application spine, without type arguments.
    pub fn value_args(&self) -> (&Expr, Vec<&Expr>) {
        let mut args = Vec::new();
        let mut current = self;
        loop {
            match &current.kind {
                ExprKind::App { func, arg } => {
                    args.push(arg.as_ref());
                    current = func;
                }
                ExprKind::TypeApp { expr, .. } => current = expr,
                _ => break,
            }
        }
        args.reverse();
        (current, args)
    }
}

// =============================================================================
// Declarations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeVarDecl {
    pub name: String,
    #[serde(default)]
    pub span: Span,
}

impl TypeVarDecl {
    pub fn new(name: &str) -> Self {
        TypeVarDecl {
            name: name.to_string(),
            span: Span::generated(),
        }
    }

    pub fn to_type(&self) -> Type {
        Type::Var(self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConDecl {
    pub name: String,
    pub fields: Vec<Type>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataDecl {
    pub name: String,
    pub type_args: Vec<TypeVarDecl>,
    pub constructors: Vec<ConDecl>,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSynDecl {
    pub name: String,
    pub type_args: Vec<TypeVarDecl>,
    pub rhs: Type,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDecl {
    Data(DataDecl),
    Synonym(TypeSynDecl),
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Data(d) => &d.name,
            TypeDecl::Synonym(s) => &s.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeDecl::Data(d) => d.span,
            TypeDecl::Synonym(s) => s.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    #[serde(default)]
    pub span: Span,
    #[serde(default)]
    pub type_args: Vec<TypeVarDecl>,
    pub args: Vec<VarPat>,
    #[serde(default)]
    pub return_type: Option<Type>,
    pub rhs: Expr,
}

impl FuncDecl {
    pub fn arg_names(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn type_arg_names(&self) -> Vec<String> {
        self.type_args.iter().map(|t| t.name.clone()).collect()
    }

    /// Types of the formal parameters as far as they are annotated.
    pub fn arg_types(&self) -> Vec<Option<Type>> {
        self.args.iter().map(|a| a.ty.clone()).collect()
    }
}

/// How a decreasing-argument pragma refers to the parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecArgRef {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pragma {
    /// `{-# FreeC f DECREASES ON x #-}`
    DecArg {
        function: String,
        arg: DecArgRef,
        #[serde(default)]
        span: Span,
    },
}

/// A module after parsing and name simplification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub type_decls: Vec<TypeDecl>,
    #[serde(default)]
    pub func_decls: Vec<FuncDecl>,
    #[serde(default)]
    pub pragmas: Vec<Pragma>,
}
