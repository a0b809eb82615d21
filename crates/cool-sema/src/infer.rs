//! Pass 4: fixed-point bound propagation for `AUTO_TYPE` declarations.
//!
//! Re-walks the tree the checker annotated, reusing the checker's scope
//! tree positionally: the n-th construct visited here reads the n-th child
//! scope created there. Each expression is given the surrounding
//! construct's *expected* type (if any) on the way down and reports its
//! own static type on the way up:
//!
//! - an expected type at a use site tightens the slot's upper bound;
//! - an actual type flowing into a declaration (assignment, initializer,
//!   returned body) tightens the lower bound via type union.
//!
//! A slot resolves to its lower bound when the upper bound accepts it, or
//! to its upper bound alone; resolution rewrites the declaration in the
//! registry and the tree, logs one entry, and is permanent. The driver
//! repeats the pass until nothing changes, which terminates because
//! resolution is monotonic.

use cool_ast::{
    AttrDecl, BinaryOp, ClassDecl, Expr, ExprKind, Feature, MethodDecl, Program, UnaryOp,
};

use crate::diagnostics::{Diagnostic, InferenceEntry};
use crate::error::SemaErrorKind;
use crate::registry::TypeRegistry;
use crate::scope::{Resolution, ScopeId, ScopeTree};
use crate::ty::{self, Method};

/// Run one inference pass. Returns whether any slot resolved.
pub fn infer_program(
    program: &mut Program,
    registry: &mut TypeRegistry,
    scopes: &mut ScopeTree,
    diagnostics: &mut Vec<Diagnostic>,
    inferences: &mut Vec<InferenceEntry>,
) -> bool {
    let mut inferer = Inferer {
        registry,
        scopes,
        diagnostics,
        inferences,
        changed: false,
    };
    let root = inferer.scopes.root();
    let class_scopes = inferer.scopes.children(root).to_vec();
    for (class, scope) in program.classes.iter_mut().zip(class_scopes) {
        inferer.infer_class(class, scope);
    }
    inferer.changed
}

struct Inferer<'a> {
    registry: &'a mut TypeRegistry,
    scopes: &'a mut ScopeTree,
    diagnostics: &'a mut Vec<Diagnostic>,
    inferences: &'a mut Vec<InferenceEntry>,
    changed: bool,
}

impl Inferer<'_> {
    fn infer_class(&mut self, class: &mut ClassDecl, scope: ScopeId) {
        let class_name = class.name.name.clone();
        let children = self.scopes.children(scope).to_vec();
        for (feature, child) in class.features.iter_mut().zip(children) {
            match feature {
                Feature::Attr(attr) => self.infer_attr(attr, child, &class_name),
                Feature::Method(method) => self.infer_method(method, child, &class_name),
            }
        }

        // Attributes may have gathered bounds anywhere in the class's
        // methods; try them again once all features are done.
        let own_attrs: Vec<String> = self
            .registry
            .get(&class_name)
            .map(|e| e.attributes.iter().map(|a| a.name.clone()).collect())
            .unwrap_or_default();
        for attr_name in own_attrs {
            if let Some(resolved) = self.resolve_binding(scope, &attr_name) {
                self.commit_attr(class, &class_name, &attr_name, &resolved);
            }
        }
    }

    fn infer_attr(&mut self, attr: &mut AttrDecl, scope: ScopeId, class_name: &str) {
        let Some(init) = &mut attr.init else { return };
        let children = self.scopes.children(scope).to_vec();
        let Some(&init_scope) = children.first() else { return };

        let declared = self
            .registry
            .get(class_name)
            .and_then(|e| e.attribute(&attr.name.name))
            .map(|a| a.ty.clone())
            .unwrap_or_else(|| ty::ERROR.to_string());
        let expected = ty::resolve_self_type(&declared, class_name);
        let init_ty = self.infer_expr(init, init_scope, Some(&expected), class_name);

        self.add_lower_to(scope, &attr.name.name, &init_ty);
        if let Some(resolved) = self.resolve_binding(scope, &attr.name.name) {
            if let Some(a) = self
                .registry
                .get_mut(class_name)
                .and_then(|e| e.attribute_mut(&attr.name.name))
            {
                a.ty = resolved.clone();
            }
            attr.declared_ty.name = resolved.clone();
            self.inferences.push(InferenceEntry::Attribute {
                class: class_name.to_string(),
                attribute: attr.name.name.clone(),
                ty: resolved,
            });
        }
    }

    fn infer_method(&mut self, method: &mut MethodDecl, scope: ScopeId, class_name: &str) {
        let method_name = method.name.name.clone();
        let children = self.scopes.children(scope).to_vec();
        let Some(&body_scope) = children.first() else { return };

        let sig = self
            .registry
            .get(class_name)
            .and_then(|e| e.method(&method_name))
            .cloned();
        let return_type = sig
            .as_ref()
            .map(|s| s.return_type.clone())
            .unwrap_or_else(|| ty::ERROR.to_string());
        let expected = ty::resolve_self_type(&return_type, class_name);
        let body_ty = self.infer_expr(&mut method.body, body_scope, Some(&expected), class_name);

        for (i, param) in method.params.iter_mut().enumerate() {
            if let Some(resolved) = self.resolve_binding(scope, &param.name.name) {
                param.ty.name = resolved.clone();
                if let Some(m) = self
                    .registry
                    .get_mut(class_name)
                    .and_then(|e| e.method_mut(&method_name))
                {
                    if let Some(param_ty) = m.param_types.get_mut(i) {
                        *param_ty = resolved.clone();
                    }
                }
                self.inferences.push(InferenceEntry::Parameter {
                    class: class_name.to_string(),
                    method: method_name.clone(),
                    parameter: param.name.name.clone(),
                    ty: resolved,
                });
            }
        }

        // The body's type flows into the return slot.
        if return_type == ty::AUTO_TYPE {
            let Some(sig) = sig else { return };
            let mut slot = sig.return_slot;
            slot.add_lower(&body_ty, self.registry);
            let resolution = slot.try_resolve(self.registry);
            if let Some(m) = self
                .registry
                .get_mut(class_name)
                .and_then(|e| e.method_mut(&method_name))
            {
                m.return_slot = slot;
            }
            match resolution {
                Resolution::Resolved(resolved) => {
                    if let Some(m) = self
                        .registry
                        .get_mut(class_name)
                        .and_then(|e| e.method_mut(&method_name))
                    {
                        m.return_type = resolved.clone();
                    }
                    method.return_ty.name = resolved.clone();
                    self.changed = true;
                    self.inferences.push(InferenceEntry::Return {
                        class: class_name.to_string(),
                        method: method_name.clone(),
                        ty: resolved,
                    });
                }
                Resolution::Conflict { lower, upper } => {
                    self.diagnostics.push(Diagnostic::new(
                        method.return_ty.loc,
                        SemaErrorKind::TypeMismatch {
                            found: lower,
                            expected: upper,
                        },
                    ));
                }
                Resolution::Pending => {}
            }
        }
    }

    fn commit_attr(
        &mut self,
        class: &mut ClassDecl,
        class_name: &str,
        attr_name: &str,
        resolved: &str,
    ) {
        if let Some(a) = self
            .registry
            .get_mut(class_name)
            .and_then(|e| e.attribute_mut(attr_name))
        {
            a.ty = resolved.to_string();
        }
        for feature in &mut class.features {
            if let Feature::Attr(attr) = feature {
                if attr.name.name == attr_name {
                    attr.declared_ty.name = resolved.to_string();
                    break;
                }
            }
        }
        self.inferences.push(InferenceEntry::Attribute {
            class: class_name.to_string(),
            attribute: attr_name.to_string(),
            ty: resolved.to_string(),
        });
    }

    fn infer_expr(
        &mut self,
        expr: &mut Expr,
        scope: ScopeId,
        expected: Option<&str>,
        class: &str,
    ) -> String {
        let ty_name = self.infer_kind(&mut expr.kind, scope, expected, class);
        expr.static_ty = Some(ty_name.clone());
        ty_name
    }

    fn infer_kind(
        &mut self,
        kind: &mut ExprKind,
        scope: ScopeId,
        expected: Option<&str>,
        class: &str,
    ) -> String {
        let children = self.scopes.children(scope).to_vec();
        match kind {
            ExprKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let &[cond_scope, then_scope, else_scope] = children.as_slice() else {
                    return ty::ERROR.to_string();
                };
                self.infer_expr(condition, cond_scope, Some(ty::BOOL), class);
                let then_ty = self.infer_expr(then_body, then_scope, None, class);
                let else_ty = self.infer_expr(else_body, else_scope, None, class);
                let then_ty = ty::resolve_self_type(&then_ty, class);
                let else_ty = ty::resolve_self_type(&else_ty, class);
                self.registry.type_union(&then_ty, &else_ty)
            }

            ExprKind::While { condition, body } => {
                let &[cond_scope, body_scope] = children.as_slice() else {
                    return ty::ERROR.to_string();
                };
                self.infer_expr(condition, cond_scope, Some(ty::BOOL), class);
                self.infer_expr(body, body_scope, None, class);
                ty::OBJECT.to_string()
            }

            ExprKind::Block { body } => {
                let mut last = ty::ERROR.to_string();
                let count = body.len();
                for (i, (element, child)) in
                    body.iter_mut().zip(children.iter().copied()).enumerate()
                {
                    let exp = if i + 1 == count { expected } else { None };
                    last = self.infer_expr(element, child, exp, class);
                }
                last
            }

            ExprKind::Let { bindings, body } => {
                if children.is_empty() {
                    return ty::ERROR.to_string();
                }
                let binding_scopes = &children[..children.len() - 1];
                for (binding, &child) in bindings.iter_mut().zip(binding_scopes) {
                    if let Some(init) = &mut binding.init {
                        let var_expected = self
                            .scopes
                            .lookup_binding(scope, &binding.name.name)
                            .filter(|b| b.is_concrete())
                            .map(|b| b.declared.clone());
                        let init_ty =
                            self.infer_expr(init, child, var_expected.as_deref(), class);
                        self.add_lower_to(scope, &binding.name.name, &init_ty);
                        if let Some(resolved) = self.resolve_binding(scope, &binding.name.name) {
                            binding.declared_ty.name = resolved.clone();
                            self.inferences.push(InferenceEntry::Variable {
                                loc: binding.name.loc,
                                variable: binding.name.name.clone(),
                                ty: resolved,
                            });
                        }
                    }
                }
                let body_ty = match children.last() {
                    Some(&body_scope) => self.infer_expr(body, body_scope, expected, class),
                    None => ty::ERROR.to_string(),
                };
                // Bounds gathered inside the body may have settled a
                // binding the initializers could not.
                for binding in bindings.iter_mut() {
                    if let Some(resolved) = self.resolve_binding(scope, &binding.name.name) {
                        binding.declared_ty.name = resolved.clone();
                        self.inferences.push(InferenceEntry::Variable {
                            loc: binding.name.loc,
                            variable: binding.name.name.clone(),
                            ty: resolved,
                        });
                    }
                }
                body_ty
            }

            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                let Some((&scrutinee_scope, branch_scopes)) = children.split_first() else {
                    return ty::ERROR.to_string();
                };
                self.infer_expr(scrutinee, scrutinee_scope, None, class);
                let mut result: Option<String> = None;
                for (branch, &child) in branches.iter_mut().zip(branch_scopes) {
                    let branch_ty = self.infer_expr(&mut branch.body, child, None, class);
                    let branch_ty = ty::resolve_self_type(&branch_ty, class);
                    result = Some(match result {
                        None => branch_ty,
                        Some(acc) => self.registry.type_union(&acc, &branch_ty),
                    });
                }
                result.unwrap_or_else(|| ty::ERROR.to_string())
            }

            ExprKind::Assign { target, value } => {
                let Some(&value_scope) = children.first() else {
                    return ty::ERROR.to_string();
                };
                let target_ty = self
                    .scopes
                    .lookup_binding(scope, &target.name)
                    .filter(|b| b.is_concrete())
                    .map(|b| ty::resolve_self_type(&b.declared, class));
                let exp = match &target_ty {
                    Some(t) => Some(t.as_str()),
                    None => expected,
                };
                let value_ty = self.infer_expr(value, value_scope, exp, class);
                self.add_lower_to(scope, &target.name, &value_ty);
                value_ty
            }

            ExprKind::Unary { op, operand } => {
                let Some(&child) = children.first() else {
                    return ty::ERROR.to_string();
                };
                match op {
                    UnaryOp::Not => {
                        self.infer_expr(operand, child, Some(ty::BOOL), class);
                        ty::BOOL.to_string()
                    }
                    UnaryOp::Complement => {
                        self.infer_expr(operand, child, Some(ty::INT), class);
                        ty::INT.to_string()
                    }
                    UnaryOp::IsVoid => {
                        self.infer_expr(operand, child, None, class);
                        ty::BOOL.to_string()
                    }
                }
            }

            ExprKind::Binary { op, left, right } => {
                let &[left_scope, right_scope] = children.as_slice() else {
                    return ty::ERROR.to_string();
                };
                match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                        self.infer_expr(left, left_scope, Some(ty::INT), class);
                        self.infer_expr(right, right_scope, Some(ty::INT), class);
                        ty::INT.to_string()
                    }
                    BinaryOp::Less | BinaryOp::LessEq => {
                        self.infer_expr(left, left_scope, Some(ty::INT), class);
                        self.infer_expr(right, right_scope, Some(ty::INT), class);
                        ty::BOOL.to_string()
                    }
                    BinaryOp::Eq => {
                        // Each side expects the other's type; the right
                        // side sees the left's fresh annotation, the left
                        // the right's from the previous walk.
                        let prev_right = right.static_ty.clone();
                        let left_ty =
                            self.infer_expr(left, left_scope, prev_right.as_deref(), class);
                        self.infer_expr(right, right_scope, Some(&left_ty), class);
                        ty::BOOL.to_string()
                    }
                }
            }

            ExprKind::Dispatch {
                receiver,
                static_target,
                method,
                args,
            } => {
                let Some((&receiver_scope, arg_scopes)) = children.split_first() else {
                    return ty::ERROR.to_string();
                };
                let static_ty: Option<String> = static_target.as_ref().map(|t| {
                    if !self.registry.contains(&t.name)
                        || t.name == ty::SELF_TYPE
                        || t.name == ty::AUTO_TYPE
                    {
                        ty::ERROR.to_string()
                    } else {
                        t.name.clone()
                    }
                });
                let receiver_ty =
                    self.infer_expr(receiver, receiver_scope, static_ty.as_deref(), class);
                let receiver_ty = match static_ty {
                    Some(t) => t,
                    None => ty::resolve_self_type(&receiver_ty, class),
                };
                let sig = self
                    .registry
                    .lookup_method(&receiver_ty, &method.name)
                    .map(|(_, m)| m.clone());
                let result_ty = match &sig {
                    Some(s) if s.return_type == ty::SELF_TYPE => receiver_ty.clone(),
                    Some(s) => s.return_type.clone(),
                    None => ty::ERROR.to_string(),
                };
                self.infer_args(&sig, args, arg_scopes, class);
                result_ty
            }

            ExprKind::SelfDispatch { method, args } => {
                let sig = self
                    .registry
                    .lookup_method(class, &method.name)
                    .map(|(_, m)| m.clone());
                let result_ty = match &sig {
                    Some(s) if s.return_type == ty::SELF_TYPE => class.to_string(),
                    Some(s) => s.return_type.clone(),
                    None => ty::ERROR.to_string(),
                };
                self.infer_args(&sig, args, &children, class);
                result_ty
            }

            ExprKind::New { class: class_ident } => {
                if self.registry.contains(&class_ident.name) {
                    class_ident.name.clone()
                } else {
                    ty::ERROR.to_string()
                }
            }

            ExprKind::IntLit(_) => ty::INT.to_string(),
            ExprKind::StrLit(_) => ty::STRING.to_string(),
            ExprKind::BoolLit(_) => ty::BOOL.to_string(),

            ExprKind::Id(name) => {
                if let Some((binding_scope, idx)) = self.scopes.lookup(scope, name) {
                    let registry: &TypeRegistry = self.registry;
                    let binding = self.scopes.binding_mut(binding_scope, idx);
                    if let (Some(exp), Some(slot)) = (expected, binding.slot.as_mut()) {
                        slot.add_upper(exp, registry);
                    }
                    if binding.is_concrete() {
                        binding.declared.clone()
                    } else {
                        ty::AUTO_TYPE.to_string()
                    }
                } else {
                    ty::ERROR.to_string()
                }
            }
        }
    }

    /// Declared parameter types act as expectations for call arguments; a
    /// signature whose arity does not match (or no signature at all)
    /// still has every argument walked, expectation-free.
    fn infer_args(
        &mut self,
        sig: &Option<Method>,
        args: &mut [Expr],
        scopes: &[ScopeId],
        class: &str,
    ) {
        match sig {
            Some(s) if s.param_types.len() == args.len() => {
                for ((arg, &child), param_ty) in
                    args.iter_mut().zip(scopes).zip(&s.param_types)
                {
                    let exp = if param_ty == ty::AUTO_TYPE {
                        None
                    } else {
                        Some(param_ty.as_str())
                    };
                    self.infer_expr(arg, child, exp, class);
                }
            }
            _ => {
                for (arg, &child) in args.iter_mut().zip(scopes) {
                    self.infer_expr(arg, child, None, class);
                }
            }
        }
    }

    /// Record a type flowing into `name`'s slot, if it has one.
    fn add_lower_to(&mut self, scope: ScopeId, name: &str, ty_name: &str) {
        if let Some((binding_scope, idx)) = self.scopes.lookup(scope, name) {
            let registry: &TypeRegistry = self.registry;
            if let Some(slot) = self.scopes.binding_mut(binding_scope, idx).slot.as_mut() {
                slot.add_lower(ty_name, registry);
            }
        }
    }

    /// Try to resolve `name`'s slot. On success the binding's declared
    /// type is rewritten and the pass is marked changed; a bound conflict
    /// is reported once at the binding's location.
    fn resolve_binding(&mut self, scope: ScopeId, name: &str) -> Option<String> {
        let (binding_scope, idx) = self.scopes.lookup(scope, name)?;
        let registry: &TypeRegistry = self.registry;
        let binding = self.scopes.binding_mut(binding_scope, idx);
        let slot = binding.slot.as_mut()?;
        match slot.try_resolve(registry) {
            Resolution::Resolved(ty_name) => {
                binding.declared = ty_name.clone();
                self.changed = true;
                Some(ty_name)
            }
            Resolution::Conflict { lower, upper } => {
                let loc = binding.loc;
                self.diagnostics.push(Diagnostic::new(
                    loc,
                    SemaErrorKind::TypeMismatch {
                        found: lower,
                        expected: upper,
                    },
                ));
                None
            }
            Resolution::Pending => None,
        }
    }
}
