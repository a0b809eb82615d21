//! Name-keyed registry owning every declared and built-in type.
//!
//! The registry is the single owner of all [`TypeEntity`] values; every
//! other structure refers to types by name and resolves them here. It also
//! hosts the two lattice operations the passes rely on: conformance (the
//! subtype relation) and type union (least common ancestor).
//!
//! Parent-chain walks are bounded by the registry size, so an inheritance
//! cycle that has not been severed yet can never hang a lookup.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::SemaErrorKind;
use crate::ty::{self, TypeEntity};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeRegistry {
    types: FxHashMap<String, TypeEntity>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, empty type under `name`.
    pub fn create_type(&mut self, name: &str) -> Result<&mut TypeEntity, SemaErrorKind> {
        if self.types.contains_key(name) {
            return Err(SemaErrorKind::DuplicateType {
                name: name.to_string(),
            });
        }
        Ok(self
            .types
            .entry(name.to_string())
            .or_insert_with(|| TypeEntity::new(name)))
    }

    /// Look up `name`, failing with `UnknownType` when absent.
    pub fn get_type(&self, name: &str) -> Result<&TypeEntity, SemaErrorKind> {
        self.types.get(name).ok_or_else(|| SemaErrorKind::UnknownType {
            name: name.to_string(),
        })
    }

    /// Register a pre-built entity (built-in seeding).
    pub fn add_type(&mut self, entity: TypeEntity) {
        self.types.insert(entity.name.clone(), entity);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TypeEntity> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypeEntity> {
        self.types.get_mut(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over every registered type, in no particular order.
    pub fn types(&self) -> impl Iterator<Item = &TypeEntity> {
        self.types.values()
    }

    /// The inheritance chain starting at `name` (inclusive). The walk is
    /// bounded by the registry size, so it terminates on cyclic chains.
    pub fn ancestors<'a>(&'a self, name: &str) -> Ancestors<'a> {
        Ancestors {
            registry: self,
            current: self.get(name).map(|e| e.name.as_str()),
            steps: 0,
        }
    }

    /// Reflexive, transitive conformance along the parent chain. The
    /// poison type conforms to and from everything, and so does
    /// `AUTO_TYPE` -- a not-yet-inferred expression must never be flagged.
    pub fn conforms_to(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sub == ty::ERROR || sup == ty::ERROR {
            return true;
        }
        if sub == ty::AUTO_TYPE || sup == ty::AUTO_TYPE {
            return true;
        }
        self.ancestors(sub).any(|t| t == sup)
    }

    /// Least common ancestor of `a` and `b`: the first type on `b`'s chain
    /// that also appears on `a`'s. Unrelated types meet at `Object`;
    /// placeholders absorb.
    pub fn type_union(&self, a: &str, b: &str) -> String {
        if a == b {
            return a.to_string();
        }
        if a == ty::ERROR || b == ty::ERROR {
            return ty::ERROR.to_string();
        }
        if a == ty::AUTO_TYPE || b == ty::AUTO_TYPE {
            return ty::AUTO_TYPE.to_string();
        }
        let left: Vec<&str> = self.ancestors(a).collect();
        for candidate in self.ancestors(b) {
            if left.contains(&candidate) {
                return candidate.to_string();
            }
        }
        ty::OBJECT.to_string()
    }

    /// Find `method` on `class` or the nearest ancestor defining it.
    /// Returns the defining class's name alongside the signature.
    pub fn lookup_method(&self, class: &str, method: &str) -> Option<(&str, &ty::Method)> {
        for ancestor in self.ancestors(class) {
            if let Some(entity) = self.get(ancestor) {
                if let Some(m) = entity.method(method) {
                    return Some((entity.name.as_str(), m));
                }
            }
        }
        None
    }

    /// Every attribute visible on `class`: inherited attributes first
    /// (root down), the class's own last.
    pub fn all_attributes(&self, class: &str) -> Vec<ty::Attribute> {
        let chain: Vec<&str> = self.ancestors(class).collect();
        chain
            .into_iter()
            .rev()
            .filter_map(|name| self.get(name))
            .flat_map(|entity| entity.attributes.iter().cloned())
            .collect()
    }
}

/// Iterator over an inheritance chain; see [`TypeRegistry::ancestors`].
pub struct Ancestors<'a> {
    registry: &'a TypeRegistry,
    current: Option<&'a str>,
    steps: usize,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let name = self.current?;
        if self.steps > self.registry.len() {
            return None;
        }
        self.steps += 1;
        self.current = self
            .registry
            .get(name)
            .and_then(|e| e.parent.as_deref());
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::register_builtins;
    use crate::ty::{AUTO_TYPE, BOOL, ERROR, INT, IO, OBJECT, SELF_TYPE, STRING};

    fn registry() -> TypeRegistry {
        let mut r = TypeRegistry::new();
        register_builtins(&mut r);
        r
    }

    #[test]
    fn create_then_duplicate() {
        let mut r = registry();
        assert!(r.create_type("A").is_ok());
        assert!(matches!(
            r.create_type("A"),
            Err(SemaErrorKind::DuplicateType { .. })
        ));
        assert!(matches!(
            r.create_type(INT),
            Err(SemaErrorKind::DuplicateType { .. })
        ));
    }

    #[test]
    fn get_unknown_type_fails() {
        let r = registry();
        assert!(matches!(
            r.get_type("Nope"),
            Err(SemaErrorKind::UnknownType { .. })
        ));
    }

    #[test]
    fn builtin_catalogue_is_seeded() {
        let r = registry();
        assert!(r.get(OBJECT).unwrap().method("abort").is_some());
        assert!(r.get(OBJECT).unwrap().method("copy").is_some());
        assert!(r.get(IO).unwrap().method("out_string").is_some());
        assert!(r.get(STRING).unwrap().method("substr").is_some());
        assert!(r.get(INT).unwrap().sealed);
        assert!(r.get(STRING).unwrap().sealed);
        assert!(r.get(BOOL).unwrap().sealed);
        assert!(!r.get(IO).unwrap().sealed);
        assert_eq!(r.get(IO).unwrap().parent.as_deref(), Some(OBJECT));
    }

    #[test]
    fn conformance_is_reflexive_and_transitive() {
        let mut r = registry();
        r.create_type("A").unwrap().parent = Some(IO.to_string());
        assert!(r.conforms_to("A", "A"));
        assert!(r.conforms_to("A", IO));
        assert!(r.conforms_to(IO, OBJECT));
        assert!(r.conforms_to("A", OBJECT));
        assert!(!r.conforms_to(OBJECT, "A"));
        assert!(!r.conforms_to(INT, STRING));
    }

    #[test]
    fn poison_conforms_both_ways() {
        let r = registry();
        assert!(r.conforms_to(ERROR, INT));
        assert!(r.conforms_to(INT, ERROR));
        assert!(r.conforms_to(AUTO_TYPE, BOOL));
        assert!(r.conforms_to(BOOL, AUTO_TYPE));
    }

    #[test]
    fn union_is_symmetric_and_idempotent() {
        let mut r = registry();
        r.create_type("A").unwrap().parent = Some(IO.to_string());
        r.create_type("B").unwrap().parent = Some(IO.to_string());
        assert_eq!(r.type_union("A", "A"), "A");
        assert_eq!(r.type_union("A", "B"), r.type_union("B", "A"));
        assert_eq!(r.type_union("A", "B"), IO);
        assert_eq!(r.type_union(INT, STRING), OBJECT);
    }

    #[test]
    fn union_is_an_upper_bound() {
        let mut r = registry();
        r.create_type("A").unwrap().parent = Some(IO.to_string());
        let u = r.type_union("A", INT);
        assert!(r.conforms_to("A", &u));
        assert!(r.conforms_to(INT, &u));
    }

    #[test]
    fn cyclic_chain_walks_terminate() {
        let mut r = registry();
        r.create_type("A").unwrap().parent = Some("B".to_string());
        r.create_type("B").unwrap().parent = Some("A".to_string());
        // Neither hangs nor conforms to Object while the cycle stands.
        assert!(!r.conforms_to("A", OBJECT));
        assert_eq!(r.type_union("A", INT), OBJECT);
    }

    #[test]
    fn method_lookup_walks_the_chain() {
        let mut r = registry();
        r.create_type("A").unwrap().parent = Some(IO.to_string());
        let (owner, m) = r.lookup_method("A", "out_int").unwrap();
        assert_eq!(owner, IO);
        assert_eq!(m.return_type, SELF_TYPE);
        let (owner, _) = r.lookup_method("A", "abort").unwrap();
        assert_eq!(owner, OBJECT);
        assert!(r.lookup_method("A", "missing").is_none());
    }

    #[test]
    fn inherited_attributes_come_first() {
        let mut r = registry();
        r.create_type("A").unwrap().define_attribute("x", INT);
        {
            let b = r.create_type("B").unwrap();
            b.parent = Some("A".to_string());
            b.define_attribute("y", STRING);
        }
        let attrs = r.all_attributes("B");
        let names: Vec<&str> = attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }
}
