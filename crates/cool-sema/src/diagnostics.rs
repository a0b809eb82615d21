//! Diagnostic and inference-log records, and their rendered forms.
//!
//! Both lists are append-only and ordered by detection: the checker and
//! inferer push into the same diagnostics vector, and the front end
//! receives every entry -- nothing is deduplicated and no error stops a
//! later pass from running.

use std::fmt;

use serde::Serialize;

use cool_ast::Loc;

use crate::error::SemaErrorKind;

/// One reported violation: where, and what.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub loc: Loc,
    pub kind: SemaErrorKind,
}

impl Diagnostic {
    pub fn new(loc: Loc, kind: SemaErrorKind) -> Self {
        Diagnostic { loc, kind }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on {}: {}", self.loc, self.kind)
    }
}

/// Render diagnostics to their user-facing strings, in detection order.
pub fn render(diagnostics: &[Diagnostic]) -> Vec<String> {
    diagnostics.iter().map(|d| d.to_string()).collect()
}

/// One resolved `AUTO_TYPE` declaration, named by its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InferenceEntry {
    Attribute {
        class: String,
        attribute: String,
        ty: String,
    },
    Parameter {
        class: String,
        method: String,
        parameter: String,
        ty: String,
    },
    Return {
        class: String,
        method: String,
        ty: String,
    },
    Variable {
        loc: Loc,
        variable: String,
        ty: String,
    },
}

impl fmt::Display for InferenceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute { class, attribute, ty } => {
                write!(f, "On class \"{class}\", attribute \"{attribute}\": type \"{ty}\"")
            }
            Self::Parameter {
                class,
                method,
                parameter,
                ty,
            } => write!(
                f,
                "On method \"{method}\" of class \"{class}\", parameter \"{parameter}\": type \"{ty}\""
            ),
            Self::Return { class, method, ty } => {
                write!(f, "Return of method \"{method}\" in class \"{class}\": type \"{ty}\"")
            }
            Self::Variable { loc, variable, ty } => {
                write!(f, "On {loc}, variable \"{variable}\": type \"{ty}\"")
            }
        }
    }
}

/// Render the inference log to strings, in resolution order.
pub fn render_inferences(entries: &[InferenceEntry]) -> Vec<String> {
    entries.iter().map(|e| e.to_string()).collect()
}
