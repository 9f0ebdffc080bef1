//! Conversion of a module into dependency-ordered sentences.
//!
//! Type declarations are converted first, then function declarations. Each
//! dependency component is converted inside an environment transaction, so a
//! failing component leaves no entries behind.

use crate::ast::{DataDecl, FuncDecl, Module, Pragma, TypeDecl, TypeSynDecl};
use crate::dependency::{group_dependencies, DependencyComponent, DependencyNode};
use crate::env::{Environment, FuncEntry};
use crate::error::{CompilerError, Result};
use crate::recursion::transform_recursive_group;
use crate::sentence::Sentence;
use crate::{bail_pragma_at, bail_type_cycle_at};
use indexmap::IndexSet;
use log::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Continue with later components after a component failed.
    pub keep_going: bool,
}

/// Sentences produced so far and the errors of components that failed.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    pub sentences: Vec<Sentence>,
    pub errors: Vec<CompilerError>,
}

impl Conversion {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Registration
// =============================================================================

/// Register a function entry for every declaration.
pub fn register_func_decls(env: &mut Environment, decls: &[FuncDecl]) {
    for decl in decls {
        env.add_func_entry(FuncEntry::from_decl(decl));
    }
}

/// Register the pragmas of a module. Pragmas must refer to functions of the module.
pub fn register_pragmas(env: &mut Environment, module: &Module) -> Result<()> {
    for pragma in &module.pragmas {
        match pragma {
            Pragma::DecArg { function, arg, span } => {
                if !module.func_decls.iter().any(|d| &d.name == function) {
                    bail_pragma_at!(*span, "'{}' is not a function of module '{}'", function, module.name);
                }
                if env.dec_arg_pragma(function).is_some() {
                    warn!("duplicate decreasing argument pragma for '{}', the last one wins", function);
                }
                env.add_dec_arg_pragma(function, arg.clone(), *span);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Components
// =============================================================================

/// Order declarations into components.
pub fn order_type_decls(decls: &[TypeDecl]) -> Vec<DependencyComponent<TypeDecl>> {
    group_dependencies(decls.to_vec())
}

pub fn order_func_decls(decls: &[FuncDecl]) -> Vec<DependencyComponent<FuncDecl>> {
    group_dependencies(decls.to_vec())
}

/// Convert the components in order, each inside a transaction.
pub fn convert_components<D: DependencyNode>(
    env: &mut Environment,
    components: &[DependencyComponent<D>],
    options: &ConvertOptions,
    conversion: &mut Conversion,
    convert: impl Fn(&mut Environment, &DependencyComponent<D>) -> Result<Vec<Sentence>>,
) -> Result<()> {
    for component in components {
        match env.transaction(|env| convert(env, component)) {
            Ok(sentences) => conversion.sentences.extend(sentences),
            Err(err) if options.keep_going => {
                warn!("skipping [{}]: {}", component.keys().join(", "), err);
                conversion.errors.push(err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Convert one component of type declarations and register its types.
pub fn convert_type_component(
    env: &mut Environment,
    component: &DependencyComponent<TypeDecl>,
) -> Result<Vec<Sentence>> {
    match component {
        DependencyComponent::NonRecursive(TypeDecl::Data(decl)) => {
            env.add_data_decl(decl);
            Ok(vec![Sentence::Inductive(vec![decl.clone()])])
        }
        DependencyComponent::NonRecursive(TypeDecl::Synonym(decl)) => {
            env.add_type_syn_decl(decl);
            Ok(vec![Sentence::TypeSynonym(decl.clone())])
        }
        DependencyComponent::Recursive(decls) => convert_recursive_types(env, decls),
    }
}

fn convert_recursive_types(env: &mut Environment, decls: &[TypeDecl]) -> Result<Vec<Sentence>> {
    let mut datas: Vec<&DataDecl> = vec![];
    let mut synonyms: Vec<&TypeSynDecl> = vec![];
    for decl in decls {
        match decl {
            TypeDecl::Data(d) => datas.push(d),
            TypeDecl::Synonym(s) => synonyms.push(s),
        }
    }
    let names = || decls.iter().map(|d| d.name()).collect::<Vec<_>>().join(", ");
    let Some(first) = decls.first() else {
        panic!("BUG: empty dependency component");
    };

    if datas.is_empty() {
        bail_type_cycle_at!(first.span(), "type synonyms {} depend on each other", names());
    }
    // Synonyms among themselves must still be acyclic.
    let synonym_decls: Vec<TypeDecl> = synonyms.iter().map(|s| TypeDecl::Synonym((*s).clone())).collect();
    if let Some(cycle) = group_dependencies(synonym_decls).into_iter().find(|c| c.is_recursive()) {
        let span = cycle.decls().first().map(|d| d.span()).unwrap_or(first.span());
        bail_type_cycle_at!(span, "type synonyms {} depend on each other", cycle.keys().join(", "));
    }

    // The synonyms are expanded in the data types of the component, since
    // they cannot be defined before them.
    let local: IndexSet<&str> = synonyms.iter().map(|s| s.name.as_str()).collect();
    for synonym in &synonyms {
        env.add_type_syn_decl(synonym);
    }
    let expanded: Vec<DataDecl> = datas
        .iter()
        .map(|data| {
            let mut data = (*data).clone();
            for con in &mut data.constructors {
                for field in &mut con.fields {
                    *field = env.expand_type_synonyms_where(field, &|name| local.contains(name));
                }
            }
            data
        })
        .collect();
    if !synonyms.is_empty() {
        debug!("expanded type synonyms [{}] in [{}]", local.iter().copied().collect::<Vec<_>>().join(", "), names());
    }
    for data in &expanded {
        env.add_data_decl(data);
    }

    let mut sentences = vec![Sentence::Inductive(expanded)];
    sentences.extend(synonyms.into_iter().map(|s| Sentence::TypeSynonym(s.clone())));
    Ok(sentences)
}

/// Convert one component of function declarations.
pub fn convert_func_component(
    env: &mut Environment,
    component: &DependencyComponent<FuncDecl>,
) -> Result<Vec<Sentence>> {
    match component {
        DependencyComponent::NonRecursive(decl) => Ok(vec![Sentence::Definition(decl.clone())]),
        DependencyComponent::Recursive(decls) => {
            debug!("converting recursive group [{}]", component.keys().join(", "));
            let span = decls.first().map(|d| d.span).unwrap_or_default();
            transform_recursive_group(env, decls).map_err(|err| err.with_span(span))
        }
    }
}
