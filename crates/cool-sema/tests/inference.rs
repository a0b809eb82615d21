//! Integration tests for the fixed-point inference pass.
//!
//! Each test declares something as `AUTO_TYPE`, runs the full analysis,
//! and asserts that the declaration was rewritten to the expected concrete
//! type -- in the registry, in the tree, and in the inference log -- and
//! that re-running the pass changes nothing.

use cool_ast::{
    AttrDecl, BinaryOp, ClassDecl, Expr, ExprKind, Feature, Ident, LetBinding, Loc, MethodDecl,
    Param, Program,
};
use cool_sema::diagnostics::InferenceEntry;
use cool_sema::ty::{AUTO_TYPE, INT, OBJECT};
use cool_sema::{analyze, infer, SemaResult};

// ── Helpers ────────────────────────────────────────────────────────────

fn at(line: u32, col: u32) -> Loc {
    Loc::new(line, col)
}

fn ident(name: &str, line: u32, col: u32) -> Ident {
    Ident::new(name, at(line, col))
}

fn class(name: &str, features: Vec<Feature>, line: u32) -> ClassDecl {
    ClassDecl::new(ident(name, line, 7), None, features)
}

fn attr(name: &str, ty: &str, init: Option<Expr>, line: u32) -> Feature {
    Feature::Attr(AttrDecl::new(
        ident(name, line, 5),
        ident(ty, line, 8),
        init,
    ))
}

fn method(name: &str, params: Vec<(&str, &str)>, ret: &str, body: Expr, line: u32) -> Feature {
    Feature::Method(MethodDecl::new(
        ident(name, line, 5),
        params
            .into_iter()
            .map(|(n, t)| Param::new(ident(n, line, 10), ident(t, line, 14)))
            .collect(),
        ident(ret, line, 20),
        body,
    ))
}

fn add(left: Expr, right: Expr, line: u32) -> Expr {
    Expr::new(
        ExprKind::Binary {
            op: BinaryOp::Add,
            left: Box::new(left),
            right: Box::new(right),
        },
        at(line, 10),
    )
}

fn run(classes: Vec<ClassDecl>) -> (Program, SemaResult) {
    let mut program = Program::new(classes);
    let result = analyze(&mut program);
    (program, result)
}

/// Re-run the inference pass on an analyzed program and assert it is a
/// fixed point already.
fn assert_inference_settled(program: &mut Program, result: &mut SemaResult) {
    let changed = infer::infer_program(
        program,
        &mut result.registry,
        &mut result.scopes,
        &mut result.diagnostics,
        &mut result.inferences,
    );
    assert!(!changed, "inference resolved something on a settled program");
}

// ── Attribute inference ────────────────────────────────────────────────

/// An `AUTO_TYPE` attribute takes its initializer's type, producing
/// exactly one log entry; a further pass is a no-op.
#[test]
fn attribute_inferred_from_initializer() {
    let (mut program, mut result) = run(vec![class(
        "A",
        vec![attr("x", AUTO_TYPE, Some(Expr::int(5, at(2, 18))), 2)],
        1,
    )]);
    assert!(
        result.diagnostics.is_empty(),
        "got: {:?}",
        result.render_diagnostics()
    );
    assert_eq!(result.registry.get("A").unwrap().attribute("x").unwrap().ty, INT);
    assert_eq!(
        result.inferences,
        vec![InferenceEntry::Attribute {
            class: "A".into(),
            attribute: "x".into(),
            ty: INT.into(),
        }]
    );
    // The declaration in the tree was rewritten too.
    match &program.classes[0].features[0] {
        Feature::Attr(a) => assert_eq!(a.declared_ty.name, INT),
        Feature::Method(_) => unreachable!(),
    }
    assert_inference_settled(&mut program, &mut result);
    assert_eq!(result.inferences.len(), 1);
}

/// An `AUTO_TYPE` attribute with no initializer is settled by how the
/// methods use it.
#[test]
fn attribute_inferred_from_method_use() {
    let body = add(Expr::id("x", at(3, 5)), Expr::int(1, at(3, 9)), 3);
    let (_, result) = run(vec![class(
        "A",
        vec![
            attr("x", AUTO_TYPE, None, 2),
            method("f", vec![], INT, body, 3),
        ],
        1,
    )]);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.registry.get("A").unwrap().attribute("x").unwrap().ty, INT);
    assert_eq!(result.inferences.len(), 1);
}

/// A value assigned to an `AUTO_TYPE` attribute provides its lower bound.
#[test]
fn attribute_inferred_from_assignment() {
    let body = Expr::new(
        ExprKind::Assign {
            target: ident("x", 3, 5),
            value: Box::new(Expr::int(7, at(3, 10))),
        },
        at(3, 5),
    );
    let (_, result) = run(vec![class(
        "A",
        vec![
            attr("x", AUTO_TYPE, None, 2),
            method("f", vec![], OBJECT, body, 3),
        ],
        1,
    )]);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.registry.get("A").unwrap().attribute("x").unwrap().ty, INT);
}

// ── Parameter and return inference ─────────────────────────────────────

/// `f(x: AUTO_TYPE): Int { x + 1 }` -- the arithmetic use demands Int.
#[test]
fn parameter_inferred_from_use() {
    let body = add(Expr::id("x", at(2, 30)), Expr::int(1, at(2, 34)), 2);
    let (mut program, mut result) = run(vec![class(
        "A",
        vec![method("f", vec![("x", AUTO_TYPE)], INT, body, 2)],
        1,
    )]);
    assert!(result.diagnostics.is_empty());
    let m = result.registry.get("A").unwrap().method("f").unwrap();
    assert_eq!(m.param_types, vec![INT.to_string()]);
    assert_eq!(
        result.inferences,
        vec![InferenceEntry::Parameter {
            class: "A".into(),
            method: "f".into(),
            parameter: "x".into(),
            ty: INT.into(),
        }]
    );
    match &program.classes[0].features[0] {
        Feature::Method(m) => assert_eq!(m.params[0].ty.name, INT),
        Feature::Attr(_) => unreachable!(),
    }
    assert_inference_settled(&mut program, &mut result);
}

/// `f(): AUTO_TYPE { 1 }` -- the body's type flows into the return slot.
#[test]
fn return_type_inferred_from_body() {
    let (mut program, mut result) = run(vec![class(
        "A",
        vec![method("f", vec![], AUTO_TYPE, Expr::int(1, at(2, 25)), 2)],
        1,
    )]);
    assert!(result.diagnostics.is_empty());
    let m = result.registry.get("A").unwrap().method("f").unwrap();
    assert_eq!(m.return_type, INT);
    assert_eq!(
        result.inferences,
        vec![InferenceEntry::Return {
            class: "A".into(),
            method: "f".into(),
            ty: INT.into(),
        }]
    );
    match &program.classes[0].features[0] {
        Feature::Method(m) => assert_eq!(m.return_ty.name, INT),
        Feature::Attr(_) => unreachable!(),
    }
    assert_inference_settled(&mut program, &mut result);
}

/// A `SELF_TYPE` dispatch result resolves against the enclosing class
/// before flowing into the return slot.
#[test]
fn return_type_inferred_through_self_type_dispatch() {
    let body = Expr::new(
        ExprKind::SelfDispatch {
            method: ident("copy", 2, 25),
            args: vec![],
        },
        at(2, 25),
    );
    let (_, result) = run(vec![class(
        "A",
        vec![method("f", vec![], AUTO_TYPE, body, 2)],
        1,
    )]);
    assert!(result.diagnostics.is_empty());
    let m = result.registry.get("A").unwrap().method("f").unwrap();
    assert_eq!(m.return_type, "A");
}

// ── Let inference ──────────────────────────────────────────────────────

#[test]
fn let_variable_inferred_from_initializer() {
    let body = Expr::new(
        ExprKind::Let {
            bindings: vec![LetBinding::new(
                ident("x", 2, 9),
                ident(AUTO_TYPE, 2, 12),
                Some(Expr::int(5, at(2, 25))),
            )],
            body: Box::new(add(Expr::id("x", at(3, 5)), Expr::int(1, at(3, 9)), 3)),
        },
        at(2, 5),
    );
    let (program, result) = run(vec![class(
        "A",
        vec![method("f", vec![], INT, body, 2)],
        1,
    )]);
    assert!(result.diagnostics.is_empty());
    assert_eq!(
        result.inferences,
        vec![InferenceEntry::Variable {
            loc: at(2, 9),
            variable: "x".into(),
            ty: INT.into(),
        }]
    );
    // The binding in the tree was rewritten.
    match &program.classes[0].features[0] {
        Feature::Method(m) => match &m.body.kind {
            ExprKind::Let { bindings, .. } => {
                assert_eq!(bindings[0].declared_ty.name, INT);
            }
            _ => unreachable!(),
        },
        Feature::Attr(_) => unreachable!(),
    }
}

// ── Bound conflicts ────────────────────────────────────────────────────

/// A lower bound that violates the upper bound is reported once and the
/// slot stays unresolved.
#[test]
fn conflicting_bounds_report_once_and_stay_open() {
    let body = Expr::new(
        ExprKind::Block {
            body: vec![
                Expr::new(
                    ExprKind::Assign {
                        target: ident("x", 3, 7),
                        value: Box::new(Expr::string("s", at(3, 12))),
                    },
                    at(3, 7),
                ),
                add(Expr::id("x", at(4, 7)), Expr::int(1, at(4, 11)), 4),
            ],
        },
        at(3, 5),
    );
    let (_, result) = run(vec![class(
        "A",
        vec![
            attr("x", AUTO_TYPE, None, 2),
            method("f", vec![], INT, body, 3),
        ],
        1,
    )]);
    // Exactly one conflict diagnostic, no resolution, no log entry.
    assert_eq!(result.diagnostics.len(), 1);
    assert!(matches!(
        result.diagnostics[0].kind,
        cool_sema::error::SemaErrorKind::TypeMismatch { .. }
    ));
    assert_eq!(
        result.registry.get("A").unwrap().attribute("x").unwrap().ty,
        AUTO_TYPE
    );
    assert!(result.inferences.is_empty());
}

// ── Log rendering ──────────────────────────────────────────────────────

#[test]
fn inference_log_renders_owner_and_type() {
    let (_, result) = run(vec![class(
        "A",
        vec![attr("x", AUTO_TYPE, Some(Expr::int(5, at(2, 18))), 2)],
        1,
    )]);
    assert_eq!(
        result.render_inferences(),
        vec!["On class \"A\", attribute \"x\": type \"Int\"".to_string()]
    );
}
