//! Tests for sections over constant arguments.

use crate::ast::{DecArgRef, Expr, FuncDecl, Span, Type, TypeVarDecl, VarPat};
use crate::env::{DecArg, Environment};
use crate::error::CompilerError;
use crate::recursion::shared_scope::convert_rec_func_decls_with_section;
use crate::recursion::transform_recursive_group;
use crate::sentence::Sentence;
use crate::testing::*;
use std::collections::BTreeSet;

/// `case xs of { Nil -> Nil; Cons y ys -> Cons (f y) <rec> }`
fn map_body(rec: Expr) -> Expr {
    case_of(
        var("xs"),
        vec![
            alt_con("Nil", &[], con("Nil")),
            alt_con("Cons", &["y", "ys"], app(con("Cons"), vec![app(var("f"), vec![var("y")]), rec])),
        ],
    )
}

/// `mapL f xs = case xs of { Nil -> Nil; Cons y ys -> Cons (f y) (mapL f ys) }`
fn map_decl() -> FuncDecl {
    func("mapL", &["f", "xs"], map_body(app(var("mapL"), vec![var("f"), var("ys")])))
}

/// The same function with type arguments and annotations.
fn typed_map_decl() -> FuncDecl {
    typed_func(
        "mapL",
        &["a", "b"],
        &[("f", Type::func(vec![tvar("a")], tvar("b"))), ("xs", list_of(tvar("a")))],
        list_of(tvar("b")),
        map_body(app(
            tapp(var("mapL"), vec![tvar("a"), tvar("b")]),
            vec![var("f"), var("ys")],
        )),
    )
}

#[test]
fn test_section_over_constant_function_argument() {
    let mut env = Environment::new();
    let sentences = transform_recursive_group(&mut env, &[map_decl()]).unwrap();
    assert_eq!(sentences.len(), 2);

    let Sentence::Section(section) = &sentences[0] else {
        panic!("expected a section, got {:?}", sentences[0]);
    };
    assert_eq!(section.name, "mapL_section@0");
    assert!(section.type_vars.is_empty());
    assert_eq!(section.variables, vec![VarPat::new("f")]);

    let Sentence::Fixpoint(bodies) = &section.sentences[0] else {
        panic!("expected a fixpoint in the section");
    };
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0].decl,
        func("mapL_helper@0", &["xs"], map_body(app(var("mapL_helper@0"), vec![var("ys")])))
    );
    assert_eq!(
        bodies[0].decreasing_arg,
        DecArg {
            index: 0,
            name: "xs".to_string()
        }
    );
    assert_eq!(
        section.sentences[1],
        Sentence::Definition(func("mapL@0", &["xs"], app(var("mapL_helper@0"), vec![var("xs")])))
    );

    assert_eq!(
        sentences[1],
        Sentence::Definition(func("mapL", &["f", "xs"], app(var("mapL@0"), vec![var("f"), var("xs")])))
    );
}

#[test]
fn test_environment_after_section() {
    let mut env = Environment::new();
    transform_recursive_group(&mut env, &[map_decl()]).unwrap();

    // Section variables are local to the section.
    assert!(env.lookup_value("f").is_none());

    // Functions of the section take the section variables as leading arguments.
    let helper = env.lookup_func("mapL_helper@0").unwrap();
    assert_eq!(helper.arity(), 2);
    assert_eq!(env.lookup_dec_arg("mapL_helper@0").map(|d| d.index), Some(1));
    assert_eq!(env.lookup_func("mapL@0").unwrap().arity(), 2);
}

#[test]
fn test_section_type_variables() {
    let mut env = Environment::new();
    let sentences = transform_recursive_group(&mut env, &[typed_map_decl()]).unwrap();

    let Sentence::Section(section) = &sentences[0] else {
        panic!("expected a section");
    };
    assert_eq!(section.type_vars, vec![TypeVarDecl::new("a"), TypeVarDecl::new("b")]);
    assert_eq!(section.variables[0].ty, Some(Type::func(vec![tvar("a")], tvar("b"))));

    // Inside the section the functions have no type arguments left.
    for func in section.sentences.iter().flat_map(|s| s.func_decls()) {
        assert!(func.type_args.is_empty(), "{} still has type arguments", func.name);
    }
    let Sentence::Fixpoint(bodies) = &section.sentences[0] else {
        panic!("expected a fixpoint in the section");
    };
    assert_eq!(bodies[0].decl.rhs, map_body(app(var("mapL_helper@0"), vec![var("ys")])));

    // mapL @a @b f xs = mapL@0 @a @b f xs
    let Sentence::Definition(wrapper) = &sentences[1] else {
        panic!("expected a definition");
    };
    let f = var("f").with_type(Some(Type::func(vec![tvar("a")], tvar("b"))));
    let xs = var("xs").with_type(Some(list_of(tvar("a"))));
    assert_eq!(wrapper.rhs, app(tapp(var("mapL@0"), vec![tvar("a"), tvar("b")]), vec![f, xs]));
    assert_eq!(env.lookup_func("mapL_helper@0").unwrap().type_args, vec!["a", "b"]);
}

#[test]
fn test_pragma_is_translated_into_the_section() {
    let mut env = Environment::new();
    env.add_dec_arg_pragma("mapL", DecArgRef::Name("xs".to_string()), Span::generated());
    let sentences = convert_rec_func_decls_with_section(&mut env, &[map_decl()], &BTreeSet::from([0])).unwrap();
    assert!(matches!(sentences[0], Sentence::Section(_)));
    assert_eq!(
        env.dec_arg_pragma("mapL@0").map(|p| p.arg.clone()),
        Some(DecArgRef::Index(0))
    );
}

#[test]
fn test_pragma_on_constant_argument_is_an_error() {
    let mut env = Environment::new();
    env.add_dec_arg_pragma("mapL", DecArgRef::Index(0), Span::generated());
    let err = transform_recursive_group(&mut env, &[map_decl()]).unwrap_err();
    assert!(matches!(err, CompilerError::Pragma(..)));
}

#[test]
fn test_mutual_group_shares_one_section() {
    // g f xs = case xs of { Nil -> 0; Cons y ys -> h f ys }
    // h f xs = case xs of { Nil -> 1; Cons y ys -> g f ys }
    let body = |other: &str, base: i64| {
        case_of(
            var("xs"),
            vec![
                alt_con("Nil", &[], int(base)),
                alt_con("Cons", &["y", "ys"], app(var(other), vec![var("f"), var("ys")])),
            ],
        )
    };
    let decls = vec![func("g", &["f", "xs"], body("h", 0)), func("h", &["f", "xs"], body("g", 1))];

    let mut env = Environment::new();
    let sentences = transform_recursive_group(&mut env, &decls).unwrap();
    assert_eq!(sentences.len(), 3);
    let Sentence::Section(section) = &sentences[0] else {
        panic!("expected a section");
    };
    assert_eq!(section.name, "g_section@0");
    let names: Vec<&str> = section.sentences.iter().flat_map(|s| s.defined_names()).collect();
    assert_eq!(names, vec!["g_helper@0", "h_helper@0", "g@0", "h@0"]);
    assert_eq!(
        sentences[2],
        Sentence::Definition(func("h", &["f", "xs"], app(var("h@0"), vec![var("f"), var("xs")])))
    );
}
