//! Built-in type seeding.
//!
//! Registers the special markers and the five built-in classes with their
//! hard-wired method signatures. Runs once, before the collection pass, so
//! a user class colliding with a built-in name is reported as a duplicate.

use crate::registry::TypeRegistry;
use crate::ty::{TypeEntity, AUTO_TYPE, BOOL, ERROR, INT, IO, OBJECT, SELF_TYPE, STRING};

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Seed `registry` with the markers and built-in classes.
pub fn register_builtins(registry: &mut TypeRegistry) {
    // The markers are sealed so they can never appear as a parent.
    for marker in [SELF_TYPE, AUTO_TYPE, ERROR] {
        let mut entity = TypeEntity::new(marker);
        entity.sealed = true;
        registry.add_type(entity);
    }

    let mut object = TypeEntity::new(OBJECT);
    object.define_method("abort", vec![], vec![], OBJECT);
    object.define_method("type_name", vec![], vec![], STRING);
    object.define_method("copy", vec![], vec![], SELF_TYPE);
    registry.add_type(object);

    let mut io = TypeEntity::new(IO);
    io.parent = Some(OBJECT.to_string());
    io.define_method("out_string", strings(&["x"]), strings(&[STRING]), SELF_TYPE);
    io.define_method("out_int", strings(&["x"]), strings(&[INT]), SELF_TYPE);
    io.define_method("in_string", vec![], vec![], STRING);
    io.define_method("in_int", vec![], vec![], INT);
    registry.add_type(io);

    let mut int = TypeEntity::new(INT);
    int.parent = Some(OBJECT.to_string());
    int.sealed = true;
    registry.add_type(int);

    let mut string = TypeEntity::new(STRING);
    string.parent = Some(OBJECT.to_string());
    string.sealed = true;
    string.define_method("length", vec![], vec![], INT);
    string.define_method("concat", strings(&["s"]), strings(&[STRING]), STRING);
    string.define_method("substr", strings(&["i", "l"]), strings(&[INT, INT]), STRING);
    registry.add_type(string);

    let mut bool_ty = TypeEntity::new(BOOL);
    bool_ty.parent = Some(OBJECT.to_string());
    bool_ty.sealed = true;
    registry.add_type(bool_ty);
}
