//! Tests for the helper/main split of recursive functions.

use crate::ast::Type;
use crate::env::{DecArg, Environment};
use crate::recursion::helpers::{convert_rec_func_decls_with_helpers, transform_rec_func_decl};
use crate::sentence::Sentence;
use crate::testing::*;

fn dec_arg(index: usize, name: &str) -> DecArg {
    DecArg {
        index,
        name: name.to_string(),
    }
}

#[test]
fn test_root_case_becomes_helper() {
    let mut env = Environment::new();
    let (helpers, main) = transform_rec_func_decl(&mut env, &fac_decl(), 0).unwrap();

    assert_eq!(helpers.len(), 1);
    let helper = &helpers[0];
    assert_eq!(helper.name, "fac_helper@0");
    assert_eq!(helper.arg_names(), vec!["n"]);
    // The helper still calls the original function.
    assert_eq!(helper.rhs, fac_decl().rhs);

    assert_eq!(main.name, "fac");
    assert_eq!(main.rhs, app(var("fac_helper@0"), vec![var("n")]));
    assert_eq!(env.lookup_dec_arg("fac_helper@0"), Some(&dec_arg(0, "n")));
    assert!(env.lookup_func("fac_helper@0").is_some());
}

#[test]
fn test_helper_captures_enclosing_variables() {
    // f b xs = if b then 0 else case xs of { Nil -> 1; Cons y ys -> f b ys }
    let inner = case_of(
        var("xs"),
        vec![
            alt_con("Nil", &[], int(1)),
            alt_con("Cons", &["y", "ys"], app(var("f"), vec![var("b"), var("ys")])),
        ],
    );
    let decl = func("f", &["b", "xs"], if_(var("b"), int(0), inner.clone()));

    let mut env = Environment::new();
    let (helpers, main) = transform_rec_func_decl(&mut env, &decl, 1).unwrap();

    assert_eq!(helpers.len(), 1);
    assert_eq!(helpers[0].arg_names(), vec!["b", "xs"]);
    assert_eq!(helpers[0].rhs, inner);
    assert_eq!(helpers[0].return_type, None);
    assert_eq!(
        main.rhs,
        if_(var("b"), int(0), app(var("f_helper@0"), vec![var("b"), var("xs")]))
    );
    assert_eq!(env.lookup_dec_arg("f_helper@0"), Some(&dec_arg(1, "xs")));
}

#[test]
fn test_helper_only_captures_used_variables() {
    // f b xs = let k = 1 in case xs of { Nil -> k; Cons y ys -> f b ys }
    let inner = case_of(
        var("xs"),
        vec![
            alt_con("Nil", &[], var("k")),
            alt_con("Cons", &["y", "ys"], app(var("f"), vec![var("b"), var("ys")])),
        ],
    );
    let decl = func("f", &["b", "xs"], let_in(vec![bind("k", int(1))], inner));

    let mut env = Environment::new();
    let (helpers, _) = transform_rec_func_decl(&mut env, &decl, 1).unwrap();
    assert_eq!(helpers[0].arg_names(), vec!["b", "xs", "k"]);
    assert_eq!(env.lookup_dec_arg("f_helper@0"), Some(&dec_arg(1, "xs")));
}

#[test]
fn test_each_outermost_case_gets_a_helper() {
    // f b xs = if b then (case xs of {..}) else (case xs of {..})
    let branch = |base: i64| {
        case_of(
            var("xs"),
            vec![
                alt_con("Nil", &[], int(base)),
                alt_con("Cons", &["y", "ys"], app(var("f"), vec![var("b"), var("ys")])),
            ],
        )
    };
    let decl = func("f", &["b", "xs"], if_(var("b"), branch(0), branch(1)));

    let mut env = Environment::new();
    let (helpers, main) = transform_rec_func_decl(&mut env, &decl, 1).unwrap();
    let names: Vec<&str> = helpers.iter().map(|h| h.name.as_str()).collect();
    assert_eq!(names, vec!["f_helper@0", "f_helper@1"]);
    assert_eq!(
        main.rhs,
        if_(
            var("b"),
            app(var("f_helper@0"), vec![var("b"), var("xs")]),
            app(var("f_helper@1"), vec![var("b"), var("xs")])
        )
    );
}

#[test]
fn test_without_case_the_whole_body_is_the_helper() {
    // loop xs = loop xs
    let decl = func("loop", &["xs"], app(var("loop"), vec![var("xs")]));
    let mut env = Environment::new();
    let (helpers, main) = transform_rec_func_decl(&mut env, &decl, 0).unwrap();

    assert_eq!(helpers.len(), 1);
    assert_eq!(helpers[0].rhs, decl.rhs);
    assert_eq!(helpers[0].arg_names(), vec!["xs"]);
    assert_eq!(main.rhs, app(var("loop_helper@0"), vec![var("xs")]));
}

#[test]
fn test_case_on_shadowed_parameter_is_not_extracted() {
    // f xs = (\xs -> case xs of { Nil -> 0; Cons y ys -> f ys }) xs
    let body = app(
        lam(
            &["xs"],
            case_of(
                var("xs"),
                vec![
                    alt_con("Nil", &[], int(0)),
                    alt_con("Cons", &["y", "ys"], app(var("f"), vec![var("ys")])),
                ],
            ),
        ),
        vec![var("xs")],
    );
    let decl = func("f", &["xs"], body.clone());
    let mut env = Environment::new();
    let (helpers, _) = transform_rec_func_decl(&mut env, &decl, 0).unwrap();
    assert_eq!(helpers.len(), 1);
    assert_eq!(helpers[0].rhs, body);
}

#[test]
fn test_helper_inherits_types() {
    // len @a (xs :: List a) :: Integer = case xs of ...
    let decl = typed_func("len", &["a"], &[("xs", list_of(tvar("a")))], tcon("Integer"), len_decl().rhs);
    let mut env = Environment::new();
    let (helpers, main) = transform_rec_func_decl(&mut env, &decl, 0).unwrap();
    let helper = &helpers[0];
    assert_eq!(helper.type_arg_names(), vec!["a"]);
    assert_eq!(helper.args[0].ty, Some(list_of(tvar("a"))));
    assert_eq!(helper.return_type, Some(tcon("Integer")));
    assert_eq!(
        main.rhs,
        app(tapp(var("len_helper@0"), vec![Type::var("a")]), vec![var("xs").with_type(Some(list_of(tvar("a"))))])
    );
}

#[test]
fn test_mains_are_inlined_into_helpers() {
    let mut env = Environment::new();
    let sentences = convert_rec_func_decls_with_helpers(&mut env, &[fac_decl()], &[0]).unwrap();

    let expected_helper = func(
        "fac_helper@0",
        &["n"],
        case_of(
            var("n"),
            vec![
                alt_lit(0, int(1)),
                alt_wild(op(
                    var("n"),
                    "*",
                    app(var("fac_helper@0"), vec![op(var("n"), "-", int(1))]),
                )),
            ],
        ),
    );
    let expected_main = func("fac", &["n"], app(var("fac_helper@0"), vec![var("n")]));

    assert_eq!(sentences.len(), 2);
    match &sentences[0] {
        Sentence::Fixpoint(bodies) => {
            assert_eq!(bodies.len(), 1);
            assert_eq!(bodies[0].decl, expected_helper);
            assert_eq!(bodies[0].decreasing_arg, dec_arg(0, "n"));
        }
        other => panic!("expected a fixpoint, got {:?}", other),
    }
    assert_eq!(sentences[1], Sentence::Definition(expected_main));
    assert!(env.lookup_dec_arg("fac").is_none());
    assert!(env.lookup_dec_arg("fac_helper@0").is_some());
}

#[test]
fn test_mutual_helpers_call_each_other() {
    // isEven xs = case xs of { Nil -> True; Cons y ys -> isOdd ys }, isOdd alike
    let body = |other: &str, base: &str| {
        case_of(
            var("xs"),
            vec![
                alt_con("Nil", &[], con(base)),
                alt_con("Cons", &["y", "ys"], app(var(other), vec![var("ys")])),
            ],
        )
    };
    let decls = vec![
        func("isEven", &["xs"], body("isOdd", "True")),
        func("isOdd", &["xs"], body("isEven", "False")),
    ];
    let mut env = Environment::new();
    let sentences = convert_rec_func_decls_with_helpers(&mut env, &decls, &[0, 0]).unwrap();

    let Sentence::Fixpoint(bodies) = &sentences[0] else {
        panic!("expected a fixpoint");
    };
    let names: Vec<&str> = bodies.iter().map(|b| b.decl.name.as_str()).collect();
    assert_eq!(names, vec!["isEven_helper@0", "isOdd_helper@0"]);
    assert_eq!(bodies[0].decl.rhs, body("isOdd_helper@0", "True"));
    assert_eq!(bodies[1].decl.rhs, body("isEven_helper@0", "False"));
    assert_eq!(
        sentences[1],
        Sentence::Definition(func("isEven", &["xs"], app(var("isEven_helper@0"), vec![var("xs")])))
    );
}
