//! Class model: one [`TypeEntity`] per declared or built-in class.
//!
//! Type identity is the type name. Parent links, attribute types, and
//! method signatures all store names and are resolved through the
//! [`TypeRegistry`](crate::registry::TypeRegistry) on demand, so a class
//! can be wired up before the types it references have been built.

use serde::Serialize;

use crate::scope::InferenceSlot;

pub const OBJECT: &str = "Object";
pub const IO: &str = "IO";
pub const INT: &str = "Int";
pub const STRING: &str = "String";
pub const BOOL: &str = "Bool";

/// Placeholder resolved per use site to the enclosing or receiver class.
pub const SELF_TYPE: &str = "SELF_TYPE";
/// Placeholder for a declared type left to inference.
pub const AUTO_TYPE: &str = "AUTO_TYPE";
/// Poison type substituted after a failure; conforms to and from everything.
pub const ERROR: &str = "<error>";

/// Whether `name` is one of the pre-registered types the builder must not
/// re-wire from user declarations.
pub fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        OBJECT | IO | INT | STRING | BOOL | SELF_TYPE | AUTO_TYPE | ERROR
    )
}

/// Whether `name` is a placeholder that can never serve as an inference
/// bound.
pub fn is_placeholder(name: &str) -> bool {
    matches!(name, SELF_TYPE | AUTO_TYPE | ERROR)
}

/// Resolve `SELF_TYPE` against the class it appears in; any other name is
/// returned unchanged.
pub fn resolve_self_type(name: &str, class: &str) -> String {
    if name == SELF_TYPE {
        class.to_string()
    } else {
        name.to_string()
    }
}

/// An attribute: name and declared (or inferred) type name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub ty: String,
}

/// A method signature.
///
/// `return_slot` tracks inference bounds while the declared return type is
/// `AUTO_TYPE`; it is inert otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct Method {
    pub name: String,
    pub param_names: Vec<String>,
    pub param_types: Vec<String>,
    pub return_type: String,
    pub return_slot: InferenceSlot,
}

/// One class: parent link, ordered attributes, ordered methods, and the
/// `sealed` flag forbidding subclassing.
#[derive(Debug, Clone, Serialize)]
pub struct TypeEntity {
    pub name: String,
    pub parent: Option<String>,
    pub attributes: Vec<Attribute>,
    pub methods: Vec<Method>,
    pub sealed: bool,
}

impl TypeEntity {
    pub fn new(name: impl Into<String>) -> Self {
        TypeEntity {
            name: name.into(),
            parent: None,
            attributes: Vec::new(),
            methods: Vec::new(),
            sealed: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn method_mut(&mut self, name: &str) -> Option<&mut Method> {
        self.methods.iter_mut().find(|m| m.name == name)
    }

    /// Attach an attribute. The first declaration of a name wins;
    /// re-declarations are dropped (uniqueness is a convention the
    /// analyzer does not separately enforce).
    pub fn define_attribute(&mut self, name: &str, ty: &str) {
        if self.attribute(name).is_none() {
            self.attributes.push(Attribute {
                name: name.to_string(),
                ty: ty.to_string(),
            });
        }
    }

    /// Attach a method signature, replacing any previous one of the same
    /// name.
    pub fn define_method(
        &mut self,
        name: &str,
        param_names: Vec<String>,
        param_types: Vec<String>,
        return_type: &str,
    ) {
        let method = Method {
            name: name.to_string(),
            param_names,
            param_types,
            return_type: return_type.to_string(),
            return_slot: InferenceSlot::default(),
        };
        match self.method_mut(name) {
            Some(existing) => *existing = method,
            None => self.methods.push(method),
        }
    }
}
