//! Pass 2: parent wiring and member signatures.
//!
//! For each collected class this pass resolves the declared parent
//! (defaulting to `Object`), rejects sealed parents, and attaches every
//! attribute and method signature to the class's entity. A declared type
//! name that is not registered is reported and substituted with the
//! poison type so later passes can proceed.

use rustc_hash::FxHashSet;

use cool_ast::{ClassDecl, Feature, Ident, Program};

use crate::diagnostics::Diagnostic;
use crate::error::SemaErrorKind;
use crate::registry::TypeRegistry;
use crate::ty;

pub fn build_types(
    program: &Program,
    registry: &mut TypeRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // A re-declared class (or one colliding with a built-in) was already
    // reported by the collector; only its first declaration is built.
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for class in &program.classes {
        let name = class.name.name.as_str();
        if ty::is_reserved(name) || !seen.insert(name) {
            continue;
        }
        build_class(class, registry, diagnostics);
    }
}

fn build_class(class: &ClassDecl, registry: &mut TypeRegistry, diagnostics: &mut Vec<Diagnostic>) {
    let parent = match &class.parent {
        Some(parent) => match registry.get(&parent.name) {
            None => {
                diagnostics.push(Diagnostic::new(
                    parent.loc,
                    SemaErrorKind::UnknownType {
                        name: parent.name.clone(),
                    },
                ));
                ty::OBJECT.to_string()
            }
            Some(entity) if entity.sealed => {
                diagnostics.push(Diagnostic::new(
                    parent.loc,
                    SemaErrorKind::SealedParent {
                        name: parent.name.clone(),
                    },
                ));
                ty::OBJECT.to_string()
            }
            Some(_) => parent.name.clone(),
        },
        None => ty::OBJECT.to_string(),
    };

    if let Some(entity) = registry.get_mut(&class.name.name) {
        entity.parent = Some(parent);
    }

    for feature in &class.features {
        match feature {
            Feature::Attr(attr) => {
                let attr_ty = resolve_declared(&attr.declared_ty, registry, diagnostics);
                if let Some(entity) = registry.get_mut(&class.name.name) {
                    entity.define_attribute(&attr.name.name, &attr_ty);
                }
            }
            Feature::Method(method) => {
                let mut param_names = Vec::with_capacity(method.params.len());
                let mut param_types = Vec::with_capacity(method.params.len());
                for param in &method.params {
                    param_names.push(param.name.name.clone());
                    param_types.push(resolve_declared(&param.ty, registry, diagnostics));
                }
                let return_type = resolve_declared(&method.return_ty, registry, diagnostics);
                if let Some(entity) = registry.get_mut(&class.name.name) {
                    entity.define_method(&method.name.name, param_names, param_types, &return_type);
                }
            }
        }
    }
}

/// Resolve a declared type name, reporting `UnknownType` and substituting
/// the poison type when it is not registered.
fn resolve_declared(
    declared: &Ident,
    registry: &TypeRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) -> String {
    match registry.get_type(&declared.name) {
        Ok(entity) => entity.name.clone(),
        Err(kind) => {
            diagnostics.push(Diagnostic::new(declared.loc, kind));
            ty::ERROR.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::register_builtins;
    use crate::collect::collect_types;
    use cool_ast::{AttrDecl, Loc, MethodDecl, Param};

    fn at(line: u32) -> Loc {
        Loc::new(line, 3)
    }

    fn analyze_structure(program: &Program) -> (TypeRegistry, Vec<Diagnostic>) {
        let mut registry = TypeRegistry::new();
        register_builtins(&mut registry);
        let mut diagnostics = Vec::new();
        collect_types(program, &mut registry, &mut diagnostics);
        build_types(program, &mut registry, &mut diagnostics);
        (registry, diagnostics)
    }

    #[test]
    fn parent_defaults_to_object() {
        let program = Program::new(vec![ClassDecl::new(
            Ident::new("A", at(1)),
            None,
            vec![],
        )]);
        let (registry, diagnostics) = analyze_structure(&program);
        assert!(diagnostics.is_empty());
        assert_eq!(registry.get("A").unwrap().parent.as_deref(), Some(ty::OBJECT));
    }

    #[test]
    fn unknown_parent_is_reported_and_forced_to_object() {
        let program = Program::new(vec![ClassDecl::new(
            Ident::new("A", at(1)),
            Some(Ident::new("Ghost", at(1))),
            vec![],
        )]);
        let (registry, diagnostics) = analyze_structure(&program);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics[0].kind,
            SemaErrorKind::UnknownType { ref name } if name == "Ghost"
        ));
        assert_eq!(registry.get("A").unwrap().parent.as_deref(), Some(ty::OBJECT));
    }

    #[test]
    fn sealed_parent_is_rejected() {
        let program = Program::new(vec![ClassDecl::new(
            Ident::new("A", at(1)),
            Some(Ident::new(ty::INT, at(1))),
            vec![],
        )]);
        let (registry, diagnostics) = analyze_structure(&program);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics[0].kind,
            SemaErrorKind::SealedParent { ref name } if name == ty::INT
        ));
        assert_eq!(registry.get("A").unwrap().parent.as_deref(), Some(ty::OBJECT));
    }

    #[test]
    fn members_are_attached_with_resolved_types() {
        let program = Program::new(vec![ClassDecl::new(
            Ident::new("A", at(1)),
            None,
            vec![
                Feature::Attr(AttrDecl::new(
                    Ident::new("x", at(2)),
                    Ident::new(ty::INT, at(2)),
                    None,
                )),
                Feature::Method(MethodDecl::new(
                    Ident::new("f", at(3)),
                    vec![Param::new(
                        Ident::new("s", at(3)),
                        Ident::new(ty::STRING, at(3)),
                    )],
                    Ident::new(ty::BOOL, at(3)),
                    cool_ast::Expr::boolean(true, at(3)),
                )),
            ],
        )]);
        let (registry, diagnostics) = analyze_structure(&program);
        assert!(diagnostics.is_empty());
        let entity = registry.get("A").unwrap();
        assert_eq!(entity.attribute("x").unwrap().ty, ty::INT);
        let m = entity.method("f").unwrap();
        assert_eq!(m.param_names, vec!["s".to_string()]);
        assert_eq!(m.param_types, vec![ty::STRING.to_string()]);
        assert_eq!(m.return_type, ty::BOOL);
    }

    #[test]
    fn unknown_member_type_poisons_the_signature() {
        let program = Program::new(vec![ClassDecl::new(
            Ident::new("A", at(1)),
            None,
            vec![Feature::Attr(AttrDecl::new(
                Ident::new("x", at(2)),
                Ident::new("Ghost", at(2)),
                None,
            ))],
        )]);
        let (registry, diagnostics) = analyze_structure(&program);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(registry.get("A").unwrap().attribute("x").unwrap().ty, ty::ERROR);
    }
}
