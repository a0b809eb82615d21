//! Declaration nodes: programs, classes, attributes, and methods.

use serde::Serialize;

use crate::expr::Expr;
use crate::loc::Loc;

/// A named occurrence in the source: a class name, a feature name, a
/// variable, or a declared type.
///
/// Declared-type identifiers are mutable on purpose: when the analyzer
/// infers a concrete type for a declaration written as `AUTO_TYPE`, it
/// overwrites `name` in place so the annotated tree shows the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub name: String,
    pub loc: Loc,
}

impl Ident {
    pub fn new(name: impl Into<String>, loc: Loc) -> Self {
        Ident { name: name.into(), loc }
    }
}

/// A whole program: the ordered list of class declarations.
#[derive(Debug, Clone, Serialize)]
pub struct Program {
    pub classes: Vec<ClassDecl>,
}

impl Program {
    pub fn new(classes: Vec<ClassDecl>) -> Self {
        Program { classes }
    }
}

/// A class declaration: name, optional parent name, ordered features.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    pub name: Ident,
    pub parent: Option<Ident>,
    pub features: Vec<Feature>,
}

impl ClassDecl {
    pub fn new(name: Ident, parent: Option<Ident>, features: Vec<Feature>) -> Self {
        ClassDecl { name, parent, features }
    }
}

/// A class member: an attribute or a method.
#[derive(Debug, Clone, Serialize)]
pub enum Feature {
    Attr(AttrDecl),
    Method(MethodDecl),
}

/// An attribute declaration with optional initializer.
#[derive(Debug, Clone, Serialize)]
pub struct AttrDecl {
    pub name: Ident,
    pub declared_ty: Ident,
    pub init: Option<Expr>,
}

impl AttrDecl {
    pub fn new(name: Ident, declared_ty: Ident, init: Option<Expr>) -> Self {
        AttrDecl { name, declared_ty, init }
    }
}

/// A method declaration: formal parameters, declared return type, body.
#[derive(Debug, Clone, Serialize)]
pub struct MethodDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_ty: Ident,
    pub body: Expr,
}

impl MethodDecl {
    pub fn new(name: Ident, params: Vec<Param>, return_ty: Ident, body: Expr) -> Self {
        MethodDecl { name, params, return_ty, body }
    }
}

/// A formal parameter of a method.
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub name: Ident,
    pub ty: Ident,
}

impl Param {
    pub fn new(name: Ident, ty: Ident) -> Self {
        Param { name, ty }
    }
}
