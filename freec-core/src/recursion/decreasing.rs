//! Identification of decreasing arguments.
//!
//! A parameter decreases if every recursive call passes, at its position, a
//! variable that was bound by a constructor pattern of a `case` on that
//! parameter (or, transitively, on such a variable). For mutually recursive
//! functions one parameter per function is chosen such that every call
//! within the group passes a sub-value of the caller's chosen parameter at
//! the callee's chosen position.

use super::calls::{collect_calls, collect_group_calls, CallSite};
use crate::ast::{DecArgRef, FuncDecl};
use crate::env::Environment;
use crate::error::Result;
use crate::{bail_pragma_at, err_dec_arg_at};
use itertools::Itertools;
use log::debug;

/// Parameter positions of `decl` that decrease at every direct self call.
/// Without self calls every position is a candidate.
pub fn decreasing_arg_candidates(decl: &FuncDecl) -> Vec<usize> {
    let calls = collect_calls(decl, &[decl.name.as_str()]);
    (0..decl.args.len()).filter(|&k| calls.iter().all(|call| call.decreases(k, k))).collect()
}

/// The decreasing argument of a directly recursive function, if there is
/// exactly one candidate.
pub fn find_decreasing_arg(decl: &FuncDecl) -> Option<usize> {
    match decreasing_arg_candidates(decl).as_slice() {
        [index] => Some(*index),
        _ => None,
    }
}

/// Resolve the decreasing-argument pragma of `decl`, if there is one.
pub fn pragma_dec_arg(env: &Environment, decl: &FuncDecl) -> Result<Option<usize>> {
    let Some(pragma) = env.dec_arg_pragma(&decl.name) else {
        return Ok(None);
    };
    let index = match &pragma.arg {
        DecArgRef::Index(index) => {
            if *index >= decl.args.len() {
                bail_pragma_at!(
                    pragma.span,
                    "'{}' has {} parameter(s), there is no parameter #{}",
                    decl.name,
                    decl.args.len(),
                    index
                );
            }
            *index
        }
        DecArgRef::Name(name) => match decl.args.iter().position(|a| &a.name == name) {
            Some(index) => index,
            None => bail_pragma_at!(pragma.span, "'{}' has no parameter named '{}'", decl.name, name),
        },
    };
    Ok(Some(index))
}

/// Identify the decreasing argument of every function of a recursive group.
///
/// Pragmas fix the choice for the functions they name. The result is in the
/// order of `decls`.
pub fn identify_decreasing_args(env: &Environment, decls: &[FuncDecl]) -> Result<Vec<usize>> {
    let names: Vec<&str> = decls.iter().map(|d| d.name.as_str()).collect();
    let pragmas = decls.iter().map(|d| pragma_dec_arg(env, d)).collect::<Result<Vec<_>>>()?;
    if let Some(fixed) = pragmas.iter().copied().collect::<Option<Vec<usize>>>() {
        debug!("decreasing arguments of [{}] given by pragmas: {:?}", names.join(", "), fixed);
        return Ok(fixed);
    }

    let calls: Vec<CallSite> = collect_group_calls(decls);
    let candidates: Vec<Vec<usize>> = decls
        .iter()
        .zip(&pragmas)
        .map(|(decl, pragma)| match pragma {
            Some(index) => vec![*index],
            None => decreasing_arg_candidates(decl),
        })
        .collect();

    let index_of = |name: &str| names.iter().position(|n| *n == name);
    let valid: Vec<Vec<usize>> = candidates
        .into_iter()
        .multi_cartesian_product()
        .filter(|choice| {
            calls.iter().all(|call| match (index_of(&call.caller), index_of(&call.callee)) {
                (Some(h), Some(g)) => call.decreases(choice[g], choice[h]),
                _ => true,
            })
        })
        .collect();

    match valid.as_slice() {
        [choice] => {
            debug!("decreasing arguments of [{}]: {:?}", names.join(", "), choice);
            Ok(choice.clone())
        }
        _ => {
            let problem = if valid.is_empty() { "could not identify" } else { "ambiguous" };
            let span = decls.first().map(|d| d.span).unwrap_or_default();
            Err(err_dec_arg_at!(
                span,
                "{} decreasing argument{} of {}; use a pragma such as \
                 `{{-# FreeC {} DECREASES ON <arg> #-}}` to specify {}",
                problem,
                if decls.len() > 1 { "s" } else { "" },
                names.iter().map(|n| format!("'{}'", n)).join(", "),
                names.first().copied().unwrap_or("<function>"),
                if decls.len() > 1 { "them" } else { "it" }
            ))
        }
    }
}
