//! Identification of constant arguments.
//!
//! A parameter position is constant in a recursive group if every function of
//! the group declares a parameter with the same name at that position and
//! every call within the group passes exactly that parameter along.

use super::calls::collect_group_calls;
use crate::ast::FuncDecl;
use log::debug;
use std::collections::BTreeSet;

/// Positions of the constant parameters of a recursive group.
pub fn identify_const_args(decls: &[FuncDecl]) -> BTreeSet<usize> {
    let Some(min_arity) = decls.iter().map(|d| d.args.len()).min() else {
        return BTreeSet::new();
    };
    let calls = collect_group_calls(decls);

    let const_args: BTreeSet<usize> = (0..min_arity)
        .filter(|&p| {
            let name = &decls[0].args[p].name;
            decls.iter().all(|d| &d.args[p].name == name)
        })
        .filter(|&p| calls.iter().all(|call| call.passes_param_unchanged(p)))
        .collect();

    if !const_args.is_empty() {
        debug!(
            "constant arguments of [{}]: {:?}",
            decls.iter().map(|d| d.name.as_str()).collect::<Vec<_>>().join(", "),
            const_args
        );
    }
    const_args
}
