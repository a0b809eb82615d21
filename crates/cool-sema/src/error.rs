//! Semantic error kinds.
//!
//! Every detectable violation is one variant here. Kinds carry the names
//! involved, render to the user-facing message through `Display`, and are
//! wrapped with a source position by
//! [`Diagnostic`](crate::diagnostics::Diagnostic). No kind ever aborts a
//! pass: the traversal substitutes the poison type and keeps going.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SemaErrorKind {
    /// A class name was declared twice, or collides with a built-in.
    DuplicateType { name: String },
    /// A referenced type name is not registered.
    UnknownType { name: String },
    /// A class appears on its own parent chain.
    CyclicInheritance { name: String },
    /// A sealed type (built-in leaf or marker) was used as a parent.
    SealedParent { name: String },
    /// A method override changed its ancestor's signature.
    IllegalOverride {
        method: String,
        class: String,
        ancestor: String,
    },
    /// An expression's type does not conform to what its context expects.
    TypeMismatch { found: String, expected: String },
    /// Operands of a built-in operator have incompatible types.
    UndefinedOperation { left: String, right: String },
    /// Assignment to the reserved `self`.
    ReadOnlySelf,
    /// An identifier is not declared in the enclosing scope chain.
    UndefinedVariable {
        name: String,
        method: Option<String>,
    },
    /// The receiver's type defines no method of this name.
    UnknownMethod { method: String, ty: String },
    /// The call's argument count does not match the signature.
    UndispatchableMethod { method: String },
    /// `SELF_TYPE` or `AUTO_TYPE` used as a case-branch type.
    IllegalBranchType { name: String },
    /// `SELF_TYPE` or `AUTO_TYPE` used as a static dispatch target.
    IllegalDispatchType { name: String },
}

impl fmt::Display for SemaErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateType { name } => {
                write!(f, "Type \"{name}\" is already defined.")
            }
            Self::UnknownType { name } => write!(f, "Type \"{name}\" is not defined."),
            Self::CyclicInheritance { name } => {
                write!(f, "Type \"{name}\" forms a cyclic inheritance chain.")
            }
            Self::SealedParent { name } => {
                write!(f, "Type \"{name}\" cannot be inherited.")
            }
            Self::IllegalOverride {
                method,
                class,
                ancestor,
            } => write!(
                f,
                "Method \"{method}\" of \"{class}\" already defined in \"{ancestor}\" with a different signature."
            ),
            Self::TypeMismatch { found, expected } => {
                write!(f, "Cannot convert \"{found}\" into \"{expected}\".")
            }
            Self::UndefinedOperation { left, right } => {
                write!(f, "Operation is not defined between \"{left}\" and \"{right}\".")
            }
            Self::ReadOnlySelf => write!(f, "Variable \"self\" is read-only."),
            Self::UndefinedVariable { name, method } => match method {
                Some(m) => write!(f, "Variable \"{name}\" is not defined in \"{m}\"."),
                None => write!(f, "Variable \"{name}\" is not defined."),
            },
            Self::UnknownMethod { method, ty } => {
                write!(f, "Method \"{method}\" is not defined in \"{ty}\".")
            }
            Self::UndispatchableMethod { method } => {
                write!(f, "Method \"{method}\" cannot be dispatched.")
            }
            Self::IllegalBranchType { name } => {
                write!(f, "Type \"{name}\" cannot be used as a case branch type.")
            }
            Self::IllegalDispatchType { name } => {
                write!(f, "Type \"{name}\" cannot be used as the type of a dispatch.")
            }
        }
    }
}

impl std::error::Error for SemaErrorKind {}
