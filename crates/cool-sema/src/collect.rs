//! Pass 1: class-name collection.
//!
//! Registers every declared class name before anything is resolved, so a
//! class may freely reference types declared later in the source. Parents
//! and members are wired by the builder pass.

use cool_ast::Program;

use crate::diagnostics::Diagnostic;
use crate::registry::TypeRegistry;

pub fn collect_types(
    program: &Program,
    registry: &mut TypeRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for class in &program.classes {
        if let Err(kind) = registry.create_type(&class.name.name) {
            diagnostics.push(Diagnostic::new(class.name.loc, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::register_builtins;
    use crate::error::SemaErrorKind;
    use cool_ast::{ClassDecl, Ident, Loc};

    fn program(names: &[&str]) -> Program {
        Program::new(
            names
                .iter()
                .enumerate()
                .map(|(i, n)| {
                    ClassDecl::new(Ident::new(*n, Loc::new(i as u32 + 1, 7)), None, vec![])
                })
                .collect(),
        )
    }

    #[test]
    fn registers_every_class_once() {
        let mut registry = TypeRegistry::new();
        register_builtins(&mut registry);
        let mut diagnostics = Vec::new();

        collect_types(&program(&["A", "B"]), &mut registry, &mut diagnostics);
        assert!(diagnostics.is_empty());
        assert!(registry.contains("A"));
        assert!(registry.contains("B"));
    }

    #[test]
    fn duplicate_and_builtin_collisions_are_reported() {
        let mut registry = TypeRegistry::new();
        register_builtins(&mut registry);
        let mut diagnostics = Vec::new();

        collect_types(&program(&["A", "A", "Int"]), &mut registry, &mut diagnostics);
        assert_eq!(diagnostics.len(), 2);
        assert!(matches!(
            diagnostics[0].kind,
            SemaErrorKind::DuplicateType { ref name } if name == "A"
        ));
        assert!(matches!(
            diagnostics[1].kind,
            SemaErrorKind::DuplicateType { ref name } if name == "Int"
        ));
    }
}
