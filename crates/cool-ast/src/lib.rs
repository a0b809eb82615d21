//! Program-tree node types for the Cool semantic analyzer.
//!
//! This crate is the contract between the parsing front end and the
//! semantic analyzer: the parser produces a [`Program`] tree, the analyzer
//! walks it, annotates every expression with its resolved static type, and
//! rewrites declared-type identifiers that were left for inference.
//!
//! The tree is a closed set of node kinds -- declarations in [`item`],
//! expressions in [`expr`] -- so every analysis pass is an exhaustive match
//! and the compiler enforces that no node kind is forgotten.
//!
//! All nodes carry a [`Loc`] (source line and column) for diagnostics, and
//! derive `Serialize` so the annotated tree can be handed to a rendering
//! front end as structured data.

pub mod expr;
pub mod item;
pub mod loc;

pub use expr::{BinaryOp, CaseBranch, Expr, ExprKind, LetBinding, UnaryOp};
pub use item::{AttrDecl, ClassDecl, Feature, Ident, MethodDecl, Param, Program};
pub use loc::Loc;
