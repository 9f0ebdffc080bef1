//! Diagnostic formatting of the IR and of converted sentences.
//!
//! The output is close to the source syntax and meant for logs, test failures
//! and the driver's text output. Identifiers are printed either in the source
//! namespace (`f@0`) or in the target namespace (`f_0`).

use crate::ast::*;
use crate::fresh::to_target_ident;
use crate::sentence::{FixpointBody, Section, Sentence};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter, Write};

/// Namespace in which identifiers are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Namespace {
    #[default]
    Source,
    Target,
}

impl Namespace {
    pub fn ident(self, name: &str) -> String {
        match self {
            Namespace::Source => name.to_string(),
            Namespace::Target => to_target_ident(name),
        }
    }
}

fn is_operator(name: &str) -> bool {
    name.chars().next().is_some_and(|c| !c.is_alphanumeric() && c != '_')
}

// =============================================================================
// Types
// =============================================================================

pub fn format_type(ty: &Type) -> String {
    let mut out = String::new();
    let _ = write_type(&mut out, ty, 0);
    out
}

/// Precedence: 0 = top level, 1 = left of an arrow, 2 = type argument.
fn write_type(out: &mut String, ty: &Type, prec: usize) -> fmt::Result {
    match ty {
        Type::Var(name) | Type::Con(name) => write!(out, "{}", name),
        Type::App(..) => {
            let (head, args) = ty.split_app();
            if prec > 1 {
                write!(out, "(")?;
            }
            write_type(out, head, 2)?;
            for arg in args {
                write!(out, " ")?;
                write_type(out, arg, 2)?;
            }
            if prec > 1 {
                write!(out, ")")?;
            }
            Ok(())
        }
        Type::Func(arg, ret) => {
            if prec > 0 {
                write!(out, "(")?;
            }
            write_type(out, arg, 1)?;
            write!(out, " -> ")?;
            write_type(out, ret, 0)?;
            if prec > 0 {
                write!(out, ")")?;
            }
            Ok(())
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_type(self))
    }
}

// =============================================================================
// Expressions
// =============================================================================

pub fn format_expr(expr: &Expr, names: Namespace) -> String {
    let mut out = String::new();
    let _ = ExprWriter { out: &mut out, names }.write(expr, 0);
    out
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_expr(self, Namespace::Source))
    }
}

fn format_binder(binder: &VarPat, names: Namespace) -> String {
    match &binder.ty {
        Some(ty) => format!("({} :: {})", names.ident(&binder.name), format_type(ty)),
        None => names.ident(&binder.name),
    }
}

fn format_pattern(pattern: &Pattern, names: Namespace) -> String {
    match pattern {
        Pattern::Con { name, vars } => std::iter::once(names.ident(name))
            .chain(vars.iter().map(|v| format_binder(v, names)))
            .collect::<Vec<_>>()
            .join(" "),
        Pattern::Lit(value) => value.to_string(),
        Pattern::Var(v) => format_binder(v, names),
        Pattern::Wildcard => "_".to_string(),
    }
}

/// Precedence: 0 = top level, 1 = operand of an infix operator,
/// 2 = argument of an application.
struct ExprWriter<'a> {
    out: &'a mut String,
    names: Namespace,
}

impl ExprWriter<'_> {
    fn open(&mut self, parens: bool) -> fmt::Result {
        if parens { write!(self.out, "(") } else { Ok(()) }
    }

    fn close(&mut self, parens: bool) -> fmt::Result {
        if parens { write!(self.out, ")") } else { Ok(()) }
    }

    fn write_name(&mut self, name: &str) -> fmt::Result {
        let ident = self.names.ident(name);
        if is_operator(name) { write!(self.out, "({})", ident) } else { write!(self.out, "{}", ident) }
    }

    fn write(&mut self, expr: &Expr, prec: usize) -> fmt::Result {
        match &expr.kind {
            ExprKind::Var(name) | ExprKind::Con(name) => self.write_name(name),
            ExprKind::IntLit(value) => {
                let parens = *value < 0 && prec > 0;
                self.open(parens)?;
                write!(self.out, "{}", value)?;
                self.close(parens)
            }
            ExprKind::Undefined => write!(self.out, "undefined"),
            ExprKind::Error(msg) => {
                self.open(prec > 1)?;
                write!(self.out, "error {:?}", msg)?;
                self.close(prec > 1)
            }
            ExprKind::App { .. } | ExprKind::TypeApp { .. } => self.write_app(expr, prec),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.open(prec > 0)?;
                write!(self.out, "if ")?;
                self.write(cond, 0)?;
                write!(self.out, " then ")?;
                self.write(then_branch, 0)?;
                write!(self.out, " else ")?;
                self.write(else_branch, 0)?;
                self.close(prec > 0)
            }
            ExprKind::Case { scrutinee, alts } => {
                self.open(prec > 0)?;
                write!(self.out, "case ")?;
                self.write(scrutinee, 0)?;
                write!(self.out, " of {{ ")?;
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, "; ")?;
                    }
                    write!(self.out, "{} -> ", format_pattern(&alt.pattern, self.names))?;
                    self.write(&alt.rhs, 0)?;
                }
                write!(self.out, " }}")?;
                self.close(prec > 0)
            }
            ExprKind::Lambda { params, body } => {
                self.open(prec > 0)?;
                let params: Vec<String> = params.iter().map(|p| format_binder(p, self.names)).collect();
                write!(self.out, "\\{} -> ", params.join(" "))?;
                self.write(body, 0)?;
                self.close(prec > 0)
            }
            ExprKind::Let { binds, body } => {
                self.open(prec > 0)?;
                write!(self.out, "let {{ ")?;
                for (i, bind) in binds.iter().enumerate() {
                    if i > 0 {
                        write!(self.out, "; ")?;
                    }
                    write!(self.out, "{} = ", format_binder(&bind.var, self.names))?;
                    self.write(&bind.rhs, 0)?;
                }
                write!(self.out, " }} in ")?;
                self.write(body, 0)?;
                self.close(prec > 0)
            }
        }
    }

    fn write_app(&mut self, expr: &Expr, prec: usize) -> fmt::Result {
        let (head, args) = expr.spine();
        if let (Some(name), [Arg::Value(lhs), Arg::Value(rhs)]) = (head.as_var(), args.as_slice()) {
            if is_operator(name) {
                self.open(prec > 0)?;
                self.write(lhs, 1)?;
                write!(self.out, " {} ", self.names.ident(name))?;
                self.write(rhs, 1)?;
                return self.close(prec > 0);
            }
        }

        self.open(prec > 1)?;
        self.write(head, 2)?;
        for arg in &args {
            match arg {
                Arg::Type(ty) => {
                    write!(self.out, " @")?;
                    write_type(self.out, ty, 2)?;
                }
                Arg::Value(value) => {
                    write!(self.out, " ")?;
                    self.write(value, 2)?;
                }
            }
        }
        self.close(prec > 1)
    }
}

// =============================================================================
// Declarations and sentences
// =============================================================================

/// `name @a (x :: T) y :: R = rhs`
pub fn format_func_decl(decl: &FuncDecl, names: Namespace) -> String {
    let mut header = names.ident(&decl.name);
    for type_arg in &decl.type_args {
        header.push_str(&format!(" @{}", type_arg.name));
    }
    for arg in &decl.args {
        header.push(' ');
        header.push_str(&format_binder(arg, names));
    }
    if let Some(ty) = &decl.return_type {
        header.push_str(&format!(" :: {}", ty));
    }
    format!("{} = {}", header, format_expr(&decl.rhs, names))
}

pub fn format_data_decl(decl: &DataDecl, names: Namespace) -> String {
    let mut header = names.ident(&decl.name);
    for type_arg in &decl.type_args {
        header.push(' ');
        header.push_str(&type_arg.name);
    }
    let constructors: Vec<String> = decl
        .constructors
        .iter()
        .map(|con| {
            std::iter::once(names.ident(&con.name))
                .chain(con.fields.iter().map(|field| {
                    let mut out = String::new();
                    let _ = write_type(&mut out, field, 2);
                    out
                }))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    if constructors.is_empty() {
        header
    } else {
        format!("{} = {}", header, constructors.join(" | "))
    }
}

pub fn format_type_syn_decl(decl: &TypeSynDecl, names: Namespace) -> String {
    let mut header = names.ident(&decl.name);
    for type_arg in &decl.type_args {
        header.push(' ');
        header.push_str(&type_arg.name);
    }
    format!("{} = {}", header, decl.rhs)
}

pub fn format_sentence(sentence: &Sentence, names: Namespace) -> String {
    let mut formatter = SentenceFormatter::new(names);
    formatter.write_sentence(sentence);
    formatter.output
}

pub fn format_sentences(sentences: &[Sentence], names: Namespace) -> String {
    let mut formatter = SentenceFormatter::new(names);
    for sentence in sentences {
        formatter.write_sentence(sentence);
    }
    formatter.output
}

impl Display for Sentence {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_sentence(self, Namespace::Source))
    }
}

/// Line-oriented formatter for sentences; sections indent their contents.
struct SentenceFormatter {
    output: String,
    indent: usize,
    names: Namespace,
}

impl SentenceFormatter {
    fn new(names: Namespace) -> Self {
        SentenceFormatter {
            output: String::new(),
            indent: 0,
            names,
        }
    }

    fn write_line(&mut self, content: &str) {
        let indent = "  ".repeat(self.indent);
        let _ = writeln!(self.output, "{}{}", indent, content);
    }

    fn write_sentence(&mut self, sentence: &Sentence) {
        let names = self.names;
        match sentence {
            Sentence::Inductive(decls) => {
                for (i, decl) in decls.iter().enumerate() {
                    let keyword = if i == 0 { "data" } else { "with" };
                    self.write_line(&format!("{} {}", keyword, format_data_decl(decl, names)));
                }
            }
            Sentence::TypeSynonym(decl) => {
                self.write_line(&format!("type {}", format_type_syn_decl(decl, names)));
            }
            Sentence::Definition(decl) => {
                self.write_line(&format!("definition {}", format_func_decl(decl, names)));
            }
            Sentence::Fixpoint(bodies) => {
                for (i, body) in bodies.iter().enumerate() {
                    let keyword = if i == 0 { "fixpoint" } else { "with" };
                    self.write_line(&format!("{} {}", keyword, self.format_fixpoint_body(body)));
                }
            }
            Sentence::Section(section) => self.write_section(section),
        }
    }

    fn format_fixpoint_body(&self, body: &FixpointBody) -> String {
        format!(
            "{} {{struct {}}}",
            format_func_decl(&body.decl, self.names),
            self.names.ident(&body.decreasing_arg.name)
        )
    }

    fn write_section(&mut self, section: &Section) {
        let name = self.names.ident(&section.name);
        self.write_line(&format!("section {}", name));
        self.indent += 1;
        for type_var in &section.type_vars {
            self.write_line(&format!("variable @{}", type_var.name));
        }
        for var in &section.variables {
            self.write_line(&format!("variable {}", format_binder(var, self.names)));
        }
        for sentence in &section.sentences {
            self.write_sentence(sentence);
        }
        self.indent -= 1;
        self.write_line(&format!("end {}", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::DecArg;
    use crate::testing::*;

    #[test]
    fn test_format_types() {
        let ty = Type::func(vec![tvar("a"), list_of(Type::func(vec![tvar("a")], tvar("b")))], tvar("b"));
        assert_eq!(format_type(&ty), "a -> List (a -> b) -> b");
        let ty = Type::func(vec![Type::func(vec![tvar("a")], tvar("b"))], list_of(list_of(tvar("a"))));
        assert_eq!(format_type(&ty), "(a -> b) -> List (List a)");
    }

    #[test]
    fn test_format_infix_and_application() {
        let expr = op(var("n"), "*", app(var("fac"), vec![op(var("n"), "-", int(1))]));
        assert_eq!(format_expr(&expr, Namespace::Source), "n * fac (n - 1)");

        let expr = op(op(var("a"), "+", var("b")), "*", var("c"));
        assert_eq!(format_expr(&expr, Namespace::Source), "(a + b) * c");

        // Operators that are not applied to two arguments are sections.
        let expr = app(var("map"), vec![app(var("+"), vec![int(1)]), var("xs")]);
        assert_eq!(format_expr(&expr, Namespace::Source), "map ((+) 1) xs");
    }

    #[test]
    fn test_format_binders() {
        let expr = lam(
            &["x"],
            case_of(
                var("x"),
                vec![alt_con("Cons", &["y", "ys"], app(var("f"), vec![var("y")])), alt_wild(error("empty"))],
            ),
        );
        assert_eq!(
            format_expr(&expr, Namespace::Source),
            "\\x -> case x of { Cons y ys -> f y; _ -> error \"empty\" }"
        );

        let expr = app(tapp(var("id"), vec![list_of(tvar("a"))]), vec![let_in(vec![bind("k", int(-1))], var("k"))]);
        assert_eq!(format_expr(&expr, Namespace::Source), "id @(List a) (let { k = -1 } in k)");
    }

    #[test]
    fn test_fresh_names_in_both_namespaces() {
        let expr = app(var("fac_helper@0"), vec![var("n@1")]);
        assert_eq!(format_expr(&expr, Namespace::Source), "fac_helper@0 n@1");
        assert_eq!(format_expr(&expr, Namespace::Target), "fac_helper_0 n_1");
    }

    #[test]
    fn test_format_sentences() {
        let helper = func("len_helper@0", &["xs"], len_decl().rhs);
        let sentences = vec![
            Sentence::Section(Section {
                name: "len_section@0".to_string(),
                type_vars: vec![TypeVarDecl::new("a")],
                variables: vec![VarPat::typed("f", tvar("a"))],
                sentences: vec![Sentence::Fixpoint(vec![FixpointBody {
                    decl: helper,
                    decreasing_arg: DecArg {
                        index: 0,
                        name: "xs".to_string(),
                    },
                }])],
            }),
            Sentence::Definition(func("len", &["xs"], app(var("len_helper@0"), vec![var("xs")]))),
        ];
        let expected = "\
section len_section_0
  variable @a
  variable (f :: a)
  fixpoint len_helper_0 xs = case xs of { Nil -> 0; Cons y ys -> 1 + len ys } {struct xs}
end len_section_0
definition len xs = len_helper_0 xs
";
        assert_eq!(format_sentences(&sentences, Namespace::Target), expected);
    }

    #[test]
    fn test_format_type_declarations() {
        let TypeDecl::Data(list) = list_decl() else {
            panic!("expected a data declaration");
        };
        assert_eq!(
            format_sentence(&Sentence::Inductive(vec![list]), Namespace::Source),
            "data List a = Nil | Cons a (List a)\n"
        );
        let TypeDecl::Synonym(syn) = synonym("Pair", &["a"], Type::app(tcon("Tuple"), vec![tvar("a"), tvar("a")]))
        else {
            panic!("expected a type synonym");
        };
        assert_eq!(format_sentence(&Sentence::TypeSynonym(syn), Namespace::Source), "type Pair a = Tuple a a\n");
    }
}
