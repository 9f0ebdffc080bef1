//! Shared section for constant arguments.
//!
//! Parameters that every function of a recursive group passes along
//! unchanged become variables of a section. Inside the section the functions
//! are renamed, lose their constant parameters and are transformed with the
//! helper/main split. After the section each original function is defined
//! by applying its inner function to the section's type variables, the
//! constant arguments and its remaining arguments.

use super::decreasing::identify_decreasing_args;
use super::helpers::convert_rec_func_decls_with_helpers;
use crate::ast::{Alt, Arg, Bind, DecArgRef, Expr, ExprKind, FuncDecl, Span, Type, TypeVarDecl, VarPat};
use crate::bail_pragma_at;
use crate::env::{Environment, FuncEntry, ValueEntry, VarEntry};
use crate::error::Result;
use crate::fresh::root_prefix;
use crate::sentence::{Section, Sentence};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::collections::BTreeSet;

/// Transform a recursive group with a non-empty set of constant arguments.
///
/// Returns the section followed by one wrapper definition per function.
pub fn convert_rec_func_decls_with_section(
    env: &mut Environment,
    decls: &[FuncDecl],
    const_args: &BTreeSet<usize>,
) -> Result<Vec<Sentence>> {
    let variables = section_variables(decls, const_args);
    let type_vars: IndexSet<String> =
        variables.iter().filter_map(|v| v.ty.as_ref()).flat_map(|ty| ty.type_vars()).collect();

    let inner_names: IndexMap<String, String> =
        decls.iter().map(|d| (d.name.clone(), env.fresh_ident(&d.name))).collect();
    let section_name = env.fresh_ident(&format!("{}_section", root_prefix(&decls[0].name)));
    debug!(
        "section {} for [{}] with variables [{}]",
        section_name,
        inner_names.keys().map(String::as_str).collect::<Vec<_>>().join(", "),
        variables.iter().map(|v| v.name.as_str()).collect::<Vec<_>>().join(", ")
    );

    // Type argument positions of each function that become section type variables.
    let removed_type_args: IndexMap<String, BTreeSet<usize>> = decls
        .iter()
        .map(|d| {
            let positions = d
                .type_args
                .iter()
                .enumerate()
                .filter(|(_, t)| type_vars.contains(&t.name))
                .map(|(i, _)| i)
                .collect();
            (d.name.clone(), positions)
        })
        .collect();

    let mut reduced = Vec::with_capacity(decls.len());
    for decl in decls {
        let rewriter = CallRewriter {
            inner_names: &inner_names,
            const_args,
            removed_type_args: &removed_type_args,
        };
        let rhs = rewriter.rewrite(&decl.rhs, &mut decl.arg_names().iter().map(|a| a.to_string()).collect());
        reduced.push(FuncDecl {
            name: inner_names[&decl.name].clone(),
            span: decl.span,
            type_args: decl.type_args.iter().filter(|t| !type_vars.contains(&t.name)).cloned().collect(),
            args: decl
                .args
                .iter()
                .enumerate()
                .filter(|(i, _)| !const_args.contains(i))
                .map(|(_, a)| a.clone())
                .collect(),
            return_type: decl.return_type.clone(),
            rhs,
        });
    }

    // Section variables shadow module-level entries of the same name until the
    // section is closed.
    let mut shadowed = Vec::with_capacity(variables.len());
    for var in &variables {
        shadowed.push(env.shadow_value_entry(ValueEntry::Var(VarEntry {
            name: var.name.clone(),
            span: var.span,
            ty: var.ty.clone(),
        })));
    }
    for (decl, inner) in decls.iter().zip(&reduced) {
        register_inner_entry(env, decl, inner);
        translate_pragma(env, decl, inner, const_args)?;
    }
    let dec_args = identify_decreasing_args(env, &reduced)?;
    let inner_sentences = convert_rec_func_decls_with_helpers(env, &reduced, &dec_args)?;
    for (var, previous) in variables.iter().zip(shadowed) {
        env.unshadow_value_entry(&var.name, previous);
    }

    // Outside of the section the inner functions are abstracted over all
    // section type variables and variables.
    let section_type_args: Vec<String> = type_vars.iter().cloned().collect();
    for sentence in &inner_sentences {
        for func in sentence.func_decls() {
            close_over_section(env, func, &section_type_args, &variables);
        }
    }

    let section = Section {
        name: section_name,
        type_vars: type_vars.iter().map(|t| TypeVarDecl::new(t)).collect(),
        variables: variables.clone(),
        sentences: inner_sentences,
    };

    let mut sentences = vec![Sentence::Section(section)];
    for decl in decls {
        sentences.push(Sentence::Definition(make_wrapper(
            decl,
            &inner_names[&decl.name],
            &type_vars,
            const_args,
        )));
    }
    Ok(sentences)
}

/// The constant parameters. Each takes its type from the first declaration
/// that annotates it.
fn section_variables(decls: &[FuncDecl], const_args: &BTreeSet<usize>) -> Vec<VarPat> {
    const_args
        .iter()
        .map(|&p| {
            let first = &decls[0].args[p];
            VarPat {
                ty: decls.iter().find_map(|d| d.args[p].ty.clone()),
                ..first.clone()
            }
        })
        .collect()
}

fn register_inner_entry(env: &mut Environment, decl: &FuncDecl, inner: &FuncDecl) {
    let mut entry = FuncEntry::from_decl(inner);
    entry.needs_free_args = env.needs_free_args(&decl.name);
    entry.partial = env.is_partial(&decl.name);
    env.add_func_entry(entry);
}

/// Carry a decreasing-argument pragma of `decl` over to its inner function.
fn translate_pragma(
    env: &mut Environment,
    decl: &FuncDecl,
    inner: &FuncDecl,
    const_args: &BTreeSet<usize>,
) -> Result<()> {
    let Some(pragma) = env.dec_arg_pragma(&decl.name).cloned() else {
        return Ok(());
    };
    let index = match &pragma.arg {
        DecArgRef::Index(index) => Some(*index),
        DecArgRef::Name(name) => decl.args.iter().position(|a| &a.name == name),
    };
    let Some(index) = index.filter(|&i| i < decl.args.len()) else {
        bail_pragma_at!(pragma.span, "'{}' has no parameter {:?}", decl.name, pragma.arg);
    };
    if const_args.contains(&index) {
        bail_pragma_at!(
            pragma.span,
            "the decreasing argument '{}' of '{}' is passed unchanged by every recursive call",
            decl.args[index].name,
            decl.name
        );
    }
    let shifted = index - const_args.iter().filter(|&&c| c < index).count();
    env.add_dec_arg_pragma(&inner.name, DecArgRef::Index(shifted), pragma.span);
    Ok(())
}

/// Update the entry of a function defined inside the section to its type
/// after the section is closed.
fn close_over_section(env: &mut Environment, func: &FuncDecl, type_vars: &[String], variables: &[VarPat]) {
    if let Some(entry) = env.lookup_func_mut(&func.name) {
        entry.type_args = type_vars.iter().cloned().chain(entry.type_args.iter().cloned()).collect();
        entry.arg_types = variables.iter().map(|v| v.ty.clone()).chain(entry.arg_types.iter().cloned()).collect();
    }
    if let Some(dec_arg) = env.lookup_dec_arg(&func.name).cloned() {
        env.define_dec_arg(&func.name, dec_arg.index + variables.len(), &dec_arg.name);
    }
}

/// `f @a.. x.. = f_inner @sectionTypeVars.. constArgs.. @remainingTypeArgs.. remainingArgs..`
fn make_wrapper(decl: &FuncDecl, inner: &str, type_vars: &IndexSet<String>, const_args: &BTreeSet<usize>) -> FuncDecl {
    let mut args: Vec<Arg> = type_vars.iter().map(|t| Arg::Type(Type::Var(t.clone()))).collect();
    args.extend(const_args.iter().map(|&p| Arg::Value(decl.args[p].to_expr())));
    args.extend(
        decl.type_args.iter().filter(|t| !type_vars.contains(&t.name)).map(|t| Arg::Type(t.to_type())),
    );
    args.extend(
        decl.args
            .iter()
            .enumerate()
            .filter(|(i, _)| !const_args.contains(i))
            .map(|(_, a)| Arg::Value(a.to_expr())),
    );
    FuncDecl {
        rhs: Expr::apply_args(Expr::var(inner), args).with_span(decl.rhs.span),
        ..decl.clone()
    }
}

/// Renames calls to group members and drops their constant arguments.
struct CallRewriter<'a> {
    inner_names: &'a IndexMap<String, String>,
    const_args: &'a BTreeSet<usize>,
    removed_type_args: &'a IndexMap<String, BTreeSet<usize>>,
}

impl CallRewriter<'_> {
    fn is_group_ref(&self, name: &str, bound: &IndexSet<String>) -> bool {
        self.inner_names.contains_key(name) && !bound.contains(name)
    }

    fn rewrite_call(&self, callee: &str, span: Span, args: Vec<Arg>, bound: &mut IndexSet<String>) -> Expr {
        let removed_types = &self.removed_type_args[callee];
        let mut type_pos = 0;
        let mut value_pos = 0;
        let mut kept = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Type(ty) => {
                    if !removed_types.contains(&type_pos) {
                        kept.push(Arg::Type(ty));
                    }
                    type_pos += 1;
                }
                Arg::Value(value) => {
                    if !self.const_args.contains(&value_pos) {
                        kept.push(Arg::Value(self.rewrite(&value, bound)));
                    }
                    value_pos += 1;
                }
            }
        }
        Expr::apply_args(Expr::var(&self.inner_names[callee]).with_span(span), kept)
    }

    fn rewrite_scoped(&self, binders: &[VarPat], body: &Expr, bound: &mut IndexSet<String>) -> Expr {
        let added: Vec<String> = binders.iter().map(|b| b.name.clone()).filter(|n| bound.insert(n.clone())).collect();
        let result = self.rewrite(body, bound);
        for name in added {
            bound.shift_remove(&name);
        }
        result
    }

    fn rewrite(&self, expr: &Expr, bound: &mut IndexSet<String>) -> Expr {
        let kind = match &expr.kind {
            ExprKind::Var(name) if self.is_group_ref(name, bound) => {
                return self.rewrite_call(name, expr.span, vec![], bound).with_type(expr.ty.clone());
            }
            ExprKind::Var(_) | ExprKind::Con(_) | ExprKind::IntLit(_) | ExprKind::Undefined | ExprKind::Error(_) => {
                return expr.clone();
            }
            ExprKind::App { .. } | ExprKind::TypeApp { .. } => {
                let (head, args) = expr.spine();
                if let Some(name) = head.as_var().filter(|n| self.is_group_ref(n, bound)) {
                    return self.rewrite_call(name, head.span, args, bound).with_type(expr.ty.clone());
                }
                match &expr.kind {
                    ExprKind::App { func, arg } => ExprKind::App {
                        func: Box::new(self.rewrite(func, bound)),
                        arg: Box::new(self.rewrite(arg, bound)),
                    },
                    ExprKind::TypeApp { expr: inner, ty } => ExprKind::TypeApp {
                        expr: Box::new(self.rewrite(inner, bound)),
                        ty: ty.clone(),
                    },
                    _ => unreachable!(),
                }
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => ExprKind::If {
                cond: Box::new(self.rewrite(cond, bound)),
                then_branch: Box::new(self.rewrite(then_branch, bound)),
                else_branch: Box::new(self.rewrite(else_branch, bound)),
            },
            ExprKind::Case { scrutinee, alts } => ExprKind::Case {
                scrutinee: Box::new(self.rewrite(scrutinee, bound)),
                alts: alts
                    .iter()
                    .map(|alt| Alt {
                        pattern: alt.pattern.clone(),
                        rhs: self.rewrite_scoped(alt.pattern.binders(), &alt.rhs, bound),
                    })
                    .collect(),
            },
            ExprKind::Lambda { params, body } => ExprKind::Lambda {
                params: params.clone(),
                body: Box::new(self.rewrite_scoped(params, body, bound)),
            },
            ExprKind::Let { binds, body } => {
                let vars: Vec<VarPat> = binds.iter().map(|b| b.var.clone()).collect();
                let added: Vec<String> =
                    vars.iter().map(|v| v.name.clone()).filter(|n| bound.insert(n.clone())).collect();
                let kind = ExprKind::Let {
                    binds: binds
                        .iter()
                        .map(|b| Bind {
                            var: b.var.clone(),
                            rhs: self.rewrite(&b.rhs, bound),
                        })
                        .collect(),
                    body: Box::new(self.rewrite(body, bound)),
                };
                for name in added {
                    bound.shift_remove(&name);
                }
                kind
            }
        };
        Expr {
            kind,
            span: expr.span,
            ty: expr.ty.clone(),
        }
    }
}
