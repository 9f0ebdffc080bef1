//! Output of the conversion: top-level sentences in dependency order.

use crate::ast::{DataDecl, FuncDecl, TypeSynDecl, TypeVarDecl, VarPat};
use crate::env::DecArg;
use serde::{Deserialize, Serialize};

/// One function of a `Fixpoint` together with its decreasing argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixpointBody {
    pub decl: FuncDecl,
    pub decreasing_arg: DecArg,
}

/// A section with shared type variables and variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub type_vars: Vec<TypeVarDecl>,
    pub variables: Vec<VarPat>,
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentence {
    /// (Mutually recursive) data types.
    Inductive(Vec<DataDecl>),
    TypeSynonym(TypeSynDecl),
    /// A non-recursive function.
    Definition(FuncDecl),
    /// Structurally recursive functions.
    Fixpoint(Vec<FixpointBody>),
    Section(Section),
}

impl Sentence {
    /// Names of the functions and types defined by this sentence, including
    /// those defined inside a section.
    pub fn defined_names(&self) -> Vec<&str> {
        match self {
            Sentence::Inductive(decls) => decls.iter().map(|d| d.name.as_str()).collect(),
            Sentence::TypeSynonym(decl) => vec![decl.name.as_str()],
            Sentence::Definition(decl) => vec![decl.name.as_str()],
            Sentence::Fixpoint(bodies) => bodies.iter().map(|b| b.decl.name.as_str()).collect(),
            Sentence::Section(section) => section.sentences.iter().flat_map(|s| s.defined_names()).collect(),
        }
    }

    /// Function declarations defined by this sentence, including those inside a section.
    pub fn func_decls(&self) -> Vec<&FuncDecl> {
        match self {
            Sentence::Inductive(_) | Sentence::TypeSynonym(_) => vec![],
            Sentence::Definition(decl) => vec![decl],
            Sentence::Fixpoint(bodies) => bodies.iter().map(|b| &b.decl).collect(),
            Sentence::Section(section) => section.sentences.iter().flat_map(|s| s.func_decls()).collect(),
        }
    }
}
