//! The environment threaded through every analysis and transformation.
//!
//! It holds the entries registered for the current compilation unit, the
//! decreasing arguments of recursive helpers, the decreasing-argument
//! pragmas and the fresh name counters. Passes receive it as `&mut` and use
//! [`Environment::scoped`] or [`Environment::transaction`] when changes must
//! not outlive a sub-computation.

use crate::ast::{ConDecl, DataDecl, DecArgRef, FuncDecl, Span, Type, TypeSynDecl};
use crate::fresh::{to_target_ident, FreshNames};
use indexmap::IndexMap;
use log::trace;
use serde::{Deserialize, Serialize};

// =============================================================================
// Entries
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub name: String,
    pub span: Span,
    pub type_args: Vec<String>,
    pub constructors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSynEntry {
    pub name: String,
    pub span: Span,
    pub type_args: Vec<String>,
    pub rhs: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConEntry {
    pub name: String,
    pub span: Span,
    /// Name of the data type the constructor belongs to.
    pub data_type: String,
    pub field_types: Vec<Type>,
}

impl ConEntry {
    pub fn arity(&self) -> usize {
        self.field_types.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncEntry {
    pub name: String,
    pub span: Span,
    pub type_args: Vec<String>,
    /// Argument types; `None` where the type is not known yet.
    pub arg_types: Vec<Option<Type>>,
    pub return_type: Option<Type>,
    /// Whether the function takes the effect parameters of the monadic encoding.
    pub needs_free_args: bool,
    pub partial: bool,
}

impl FuncEntry {
    pub fn from_decl(decl: &FuncDecl) -> Self {
        FuncEntry {
            name: decl.name.clone(),
            span: decl.span,
            type_args: decl.type_arg_names(),
            arg_types: decl.arg_types(),
            return_type: decl.return_type.clone(),
            needs_free_args: true,
            partial: false,
        }
    }

    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    /// The full function type, if every part of it is known.
    pub fn func_type(&self) -> Option<Type> {
        let args = self.arg_types.iter().cloned().collect::<Option<Vec<_>>>()?;
        Some(Type::func(args, self.return_type.clone()?))
    }
}

/// A variable bound outside of any function, e.g. a section variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarEntry {
    pub name: String,
    pub span: Span,
    pub ty: Option<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeEntry {
    Data(DataEntry),
    Synonym(TypeSynEntry),
}

impl TypeEntry {
    pub fn name(&self) -> &str {
        match self {
            TypeEntry::Data(e) => &e.name,
            TypeEntry::Synonym(e) => &e.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueEntry {
    Con(ConEntry),
    Func(FuncEntry),
    Var(VarEntry),
}

impl ValueEntry {
    pub fn name(&self) -> &str {
        match self {
            ValueEntry::Con(e) => &e.name,
            ValueEntry::Func(e) => &e.name,
            ValueEntry::Var(e) => &e.name,
        }
    }
}

/// Decreasing argument of a recursive function: position and parameter name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecArg {
    pub index: usize,
    pub name: String,
}

/// A decreasing-argument pragma as registered for a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecArgPragma {
    pub arg: DecArgRef,
    pub span: Span,
}

// =============================================================================
// Environment
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Environment {
    types: IndexMap<String, TypeEntry>,
    values: IndexMap<String, ValueEntry>,
    dec_args: IndexMap<String, DecArg>,
    dec_arg_pragmas: IndexMap<String, DecArgPragma>,
    fresh: FreshNames,
}

/// Everything that scoped computations restore. Fresh counters are not part of it.
struct Snapshot {
    types: IndexMap<String, TypeEntry>,
    values: IndexMap<String, ValueEntry>,
    dec_args: IndexMap<String, DecArg>,
    dec_arg_pragmas: IndexMap<String, DecArgPragma>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    pub fn add_type_entry(&mut self, entry: TypeEntry) {
        trace!("env: add type entry {}", entry.name());
        self.types.insert(entry.name().to_string(), entry);
    }

    pub fn add_value_entry(&mut self, entry: ValueEntry) {
        trace!("env: add value entry {}", entry.name());
        self.values.insert(entry.name().to_string(), entry);
    }

    /// Register a data type and all of its constructors.
    pub fn add_data_decl(&mut self, decl: &DataDecl) {
        for ConDecl { name, fields, span } in &decl.constructors {
            self.add_value_entry(ValueEntry::Con(ConEntry {
                name: name.clone(),
                span: *span,
                data_type: decl.name.clone(),
                field_types: fields.clone(),
            }));
        }
        self.add_type_entry(TypeEntry::Data(DataEntry {
            name: decl.name.clone(),
            span: decl.span,
            type_args: decl.type_args.iter().map(|t| t.name.clone()).collect(),
            constructors: decl.constructors.iter().map(|c| c.name.clone()).collect(),
        }));
    }

    pub fn add_type_syn_decl(&mut self, decl: &TypeSynDecl) {
        self.add_type_entry(TypeEntry::Synonym(TypeSynEntry {
            name: decl.name.clone(),
            span: decl.span,
            type_args: decl.type_args.iter().map(|t| t.name.clone()).collect(),
            rhs: decl.rhs.clone(),
        }));
    }

    pub fn add_func_entry(&mut self, entry: FuncEntry) {
        self.add_value_entry(ValueEntry::Func(entry));
    }

    /// Register `entry` in place of the entry with the same name, which is returned.
    pub fn shadow_value_entry(&mut self, entry: ValueEntry) -> Option<ValueEntry> {
        trace!("env: shadow value entry {}", entry.name());
        self.values.insert(entry.name().to_string(), entry)
    }

    /// Undo [`Environment::shadow_value_entry`] for `name`.
    pub fn unshadow_value_entry(&mut self, name: &str, previous: Option<ValueEntry>) {
        match previous {
            Some(entry) => {
                self.values.insert(name.to_string(), entry);
            }
            None => {
                self.values.shift_remove(name);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn lookup_type(&self, name: &str) -> Option<&TypeEntry> {
        self.types.get(name)
    }

    pub fn lookup_value(&self, name: &str) -> Option<&ValueEntry> {
        self.values.get(name)
    }

    pub fn lookup_func(&self, name: &str) -> Option<&FuncEntry> {
        match self.values.get(name) {
            Some(ValueEntry::Func(entry)) => Some(entry),
            _ => None,
        }
    }

    pub fn lookup_func_mut(&mut self, name: &str) -> Option<&mut FuncEntry> {
        match self.values.get_mut(name) {
            Some(ValueEntry::Func(entry)) => Some(entry),
            _ => None,
        }
    }

    pub fn lookup_con(&self, name: &str) -> Option<&ConEntry> {
        match self.values.get(name) {
            Some(ValueEntry::Con(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Whether `name` is registered in either namespace.
    pub fn is_defined(&self, name: &str) -> bool {
        self.types.contains_key(name) || self.values.contains_key(name)
    }

    /// Whether some registered name is spelled `ident` in the target namespace.
    pub fn is_target_ident_used(&self, ident: &str) -> bool {
        self.types.keys().chain(self.values.keys()).any(|name| to_target_ident(name) == ident)
    }

    pub fn func_names(&self) -> impl Iterator<Item = &str> {
        self.values.values().filter_map(|entry| match entry {
            ValueEntry::Func(f) => Some(f.name.as_str()),
            _ => None,
        })
    }

    pub fn needs_free_args(&self, name: &str) -> bool {
        self.lookup_func(name).is_some_and(|f| f.needs_free_args)
    }

    pub fn is_partial(&self, name: &str) -> bool {
        self.lookup_func(name).is_some_and(|f| f.partial)
    }

    pub fn set_partial(&mut self, name: &str, partial: bool) {
        if let Some(entry) = self.lookup_func_mut(name) {
            entry.partial = partial;
        }
    }

    pub fn type_synonym(&self, name: &str) -> Option<&TypeSynEntry> {
        match self.types.get(name) {
            Some(TypeEntry::Synonym(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Expand all registered type synonyms in `ty`.
    pub fn expand_type_synonyms(&self, ty: &Type) -> Type {
        self.expand_type_synonyms_where(ty, &|_| true)
    }

    /// Expand the registered type synonyms accepted by `filter`. Applications
    /// of a synonym to the wrong number of arguments are left alone.
    pub fn expand_type_synonyms_where(&self, ty: &Type, filter: &dyn Fn(&str) -> bool) -> Type {
        let mut expanding = Vec::new();
        self.expand_in(ty, filter, &mut expanding)
    }

    fn expand_in(&self, ty: &Type, filter: &dyn Fn(&str) -> bool, expanding: &mut Vec<String>) -> Type {
        let (head, args) = ty.split_app();
        if let Type::Con(name) = head {
            if let Some(syn) = self.type_synonym(name) {
                if filter(name) && syn.type_args.len() == args.len() && !expanding.contains(name) {
                    let subst: IndexMap<&str, Type> = syn
                        .type_args
                        .iter()
                        .map(String::as_str)
                        .zip(args.iter().map(|arg| self.expand_in(arg, filter, expanding)))
                        .collect();
                    let rhs = substitute_type_vars(&syn.rhs, &subst);
                    expanding.push(name.clone());
                    let expanded = self.expand_in(&rhs, filter, expanding);
                    expanding.pop();
                    return expanded;
                }
            }
        }
        match ty {
            Type::Var(_) | Type::Con(_) => ty.clone(),
            Type::App(lhs, rhs) => Type::App(
                Box::new(self.expand_in(lhs, filter, expanding)),
                Box::new(self.expand_in(rhs, filter, expanding)),
            ),
            Type::Func(arg, ret) => Type::Func(
                Box::new(self.expand_in(arg, filter, expanding)),
                Box::new(self.expand_in(ret, filter, expanding)),
            ),
        }
    }

    // -------------------------------------------------------------------------
    // Decreasing arguments
    // -------------------------------------------------------------------------

    pub fn define_dec_arg(&mut self, func: &str, index: usize, name: &str) {
        trace!("env: decreasing argument of {} is #{} ({})", func, index, name);
        self.dec_args.insert(
            func.to_string(),
            DecArg {
                index,
                name: name.to_string(),
            },
        );
    }

    pub fn lookup_dec_arg(&self, func: &str) -> Option<&DecArg> {
        self.dec_args.get(func)
    }

    pub fn remove_dec_arg(&mut self, func: &str) -> Option<DecArg> {
        self.dec_args.shift_remove(func)
    }

    pub fn add_dec_arg_pragma(&mut self, func: &str, arg: DecArgRef, span: Span) {
        self.dec_arg_pragmas.insert(func.to_string(), DecArgPragma { arg, span });
    }

    pub fn dec_arg_pragma(&self, func: &str) -> Option<&DecArgPragma> {
        self.dec_arg_pragmas.get(func)
    }

    // -------------------------------------------------------------------------
    // Fresh identifiers
    // -------------------------------------------------------------------------

    /// Generate a fresh source identifier derived from `prefix`.
    ///
    /// The result is distinct from every name generated so far and from every
    /// registered name, in both the source and the target spelling. The name
    /// itself is not registered.
    pub fn fresh_ident(&mut self, prefix: &str) -> String {
        loop {
            let candidate = self.fresh.next_candidate(prefix);
            if !self.is_defined(&candidate) && !self.is_target_ident_used(&to_target_ident(&candidate)) {
                return candidate;
            }
            trace!("env: skipping fresh candidate {}", candidate);
        }
    }

    // -------------------------------------------------------------------------
    // Scopes
    // -------------------------------------------------------------------------

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            types: self.types.clone(),
            values: self.values.clone(),
            dec_args: self.dec_args.clone(),
            dec_arg_pragmas: self.dec_arg_pragmas.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.types = snapshot.types;
        self.values = snapshot.values;
        self.dec_args = snapshot.dec_args;
        self.dec_arg_pragmas = snapshot.dec_arg_pragmas;
    }

    /// Run `f` in a local scope. Entries and decreasing arguments registered
    /// by `f` are discarded afterwards, fresh name counters are kept.
    pub fn scoped<T>(&mut self, f: impl FnOnce(&mut Environment) -> T) -> T {
        let snapshot = self.snapshot();
        let result = f(self);
        self.restore(snapshot);
        result
    }

    /// Run `f` and keep its changes only if it succeeds.
    pub fn transaction<T, E>(
        &mut self,
        f: impl FnOnce(&mut Environment) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let snapshot = self.snapshot();
        let result = f(self);
        if result.is_err() {
            trace!("env: rolling back failed transaction");
            self.restore(snapshot);
        }
        result
    }
}

/// Replace type variables according to `subst`.
pub fn substitute_type_vars(ty: &Type, subst: &IndexMap<&str, Type>) -> Type {
    match ty {
        Type::Var(name) => subst.get(name.as_str()).cloned().unwrap_or_else(|| ty.clone()),
        Type::Con(_) => ty.clone(),
        Type::App(lhs, rhs) => {
            Type::App(Box::new(substitute_type_vars(lhs, subst)), Box::new(substitute_type_vars(rhs, subst)))
        }
        Type::Func(arg, ret) => {
            Type::Func(Box::new(substitute_type_vars(arg, subst)), Box::new(substitute_type_vars(ret, subst)))
        }
    }
}
