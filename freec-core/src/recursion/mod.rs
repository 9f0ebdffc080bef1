//! Translation of recursive function groups into structurally recursive
//! fixpoints.

pub mod calls;
pub mod constant_args;
pub mod decreasing;
pub mod helpers;
pub mod shared_scope;

#[cfg(test)]
mod helpers_tests;
#[cfg(test)]
mod shared_scope_tests;

use crate::ast::FuncDecl;
use crate::env::Environment;
use crate::error::Result;
use crate::sentence::Sentence;
use constant_args::identify_const_args;
use decreasing::identify_decreasing_args;
use helpers::convert_rec_func_decls_with_helpers;
use log::debug;
use shared_scope::convert_rec_func_decls_with_section;

/// Transform a strongly connected group of function declarations.
///
/// Groups with constant arguments are placed in a section; all others are
/// split into helpers and main functions directly.
pub fn transform_recursive_group(env: &mut Environment, decls: &[FuncDecl]) -> Result<Vec<Sentence>> {
    let const_args = identify_const_args(decls);
    if const_args.is_empty() {
        let dec_args = identify_decreasing_args(env, decls)?;
        convert_rec_func_decls_with_helpers(env, decls, &dec_args)
    } else {
        debug!("using a section for {} function(s)", decls.len());
        convert_rec_func_decls_with_section(env, decls, &const_args)
    }
}
