//! Semantic analysis for Cool: a four-pass analyzer over the parsed
//! program tree.
//!
//! The passes run in a fixed order, each depending on invariants the
//! previous one established:
//!
//! 1. [`collect`]: register every class name.
//! 2. [`build`]: wire parent links and attach attribute/method signatures.
//! 3. [`check`]: annotate every expression with its static type, build
//!    the scope tree, and report every violation found.
//! 4. [`infer`]: propagate type bounds through the same tree until every
//!    resolvable `AUTO_TYPE` declaration has a concrete type, repeated to
//!    a fixed point.
//!
//! Failures never abort: each is recorded as a [`Diagnostic`] and the
//! offending node degrades to the poison type, so one error cannot hide
//! unrelated ones. The result carries the full type catalogue, the scope
//! tree, the ordered diagnostics, and the inference log.
//!
//! # Architecture
//!
//! - [`ty`]: class model (entities, signatures, the marker type names)
//! - [`registry`]: name-keyed type ownership, conformance, type union
//! - [`scope`]: scope tree shared by passes 3-4, inference slots
//! - [`builtins`]: built-in class seeding
//! - [`error`] / [`diagnostics`]: error kinds and their rendered forms

pub mod build;
pub mod builtins;
pub mod check;
pub mod collect;
pub mod diagnostics;
pub mod error;
pub mod infer;
pub mod registry;
pub mod scope;
pub mod ty;

use serde::Serialize;

use cool_ast::Program;

use crate::diagnostics::{Diagnostic, InferenceEntry};
use crate::registry::TypeRegistry;
use crate::scope::ScopeTree;

/// Everything semantic analysis produces besides the annotated tree
/// itself (which is mutated in place).
#[derive(Debug, Serialize)]
pub struct SemaResult {
    /// The populated type catalogue.
    pub registry: TypeRegistry,
    /// The scope tree built by the checker and reused by the inferer.
    pub scopes: ScopeTree,
    /// Every violation found, in detection order.
    pub diagnostics: Vec<Diagnostic>,
    /// One entry per resolved `AUTO_TYPE` declaration, in resolution
    /// order.
    pub inferences: Vec<InferenceEntry>,
}

impl SemaResult {
    /// Diagnostics as user-facing strings.
    pub fn render_diagnostics(&self) -> Vec<String> {
        diagnostics::render(&self.diagnostics)
    }

    /// The inference log as user-facing strings.
    pub fn render_inferences(&self) -> Vec<String> {
        diagnostics::render_inferences(&self.inferences)
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Analyze `program`: run all four passes, annotating the tree in place.
///
/// The inference pass is repeated until a full run resolves nothing; this
/// terminates because a resolved slot never reopens, bounding the number
/// of runs by the number of `AUTO_TYPE` declarations.
pub fn analyze(program: &mut Program) -> SemaResult {
    let mut diagnostics = Vec::new();
    let mut registry = TypeRegistry::new();
    builtins::register_builtins(&mut registry);

    collect::collect_types(program, &mut registry, &mut diagnostics);
    build::build_types(program, &mut registry, &mut diagnostics);
    let mut scopes = check::check_program(program, &mut registry, &mut diagnostics);

    let mut inferences = Vec::new();
    while infer::infer_program(
        program,
        &mut registry,
        &mut scopes,
        &mut diagnostics,
        &mut inferences,
    ) {}

    SemaResult {
        registry,
        scopes,
        diagnostics,
        inferences,
    }
}
