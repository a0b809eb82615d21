//! Pass 3: type checking and static-type annotation.
//!
//! One top-down traversal that builds the scope tree, assigns a static
//! type to every expression node, and reports every violation it finds.
//! A failure never stops the walk: the offending expression degrades to
//! the poison type and checking continues.
//!
//! Scope discipline: every sub-expression is visited in a fresh child of
//! the enclosing scope, created in a fixed order per node kind. The
//! inference pass re-walks those children positionally, so the creation
//! order here is part of the contract, not a detail.

use cool_ast::{
    AttrDecl, BinaryOp, ClassDecl, Expr, ExprKind, Feature, Ident, Loc, MethodDecl, Program,
    UnaryOp,
};

use crate::diagnostics::Diagnostic;
use crate::error::SemaErrorKind;
use crate::registry::TypeRegistry;
use crate::scope::{ScopeId, ScopeTree};
use crate::ty::{self, Method};

/// Run the checking pass, returning the scope tree it built.
pub fn check_program(
    program: &mut Program,
    registry: &mut TypeRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) -> ScopeTree {
    let mut scopes = ScopeTree::new();
    let mut checker = Checker {
        registry,
        scopes: &mut scopes,
        diagnostics,
    };
    let root = checker.scopes.root();
    for class in &mut program.classes {
        let class_scope = checker.scopes.create_child(root);
        checker.check_class(class, class_scope);
    }
    scopes
}

/// Traversal context threaded through the walk: the enclosing class and,
/// inside a method body, the method's name (used in diagnostics).
#[derive(Clone, Copy)]
struct Ctx<'a> {
    class: &'a str,
    method: Option<&'a str>,
}

struct Checker<'a> {
    registry: &'a mut TypeRegistry,
    scopes: &'a mut ScopeTree,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Checker<'_> {
    fn diag(&mut self, loc: Loc, kind: SemaErrorKind) {
        self.diagnostics.push(Diagnostic::new(loc, kind));
    }

    fn check_class(&mut self, class: &mut ClassDecl, scope: ScopeId) {
        let class_name = class.name.name.clone();
        self.sever_cycle(&class_name, class.name.loc);

        // Every attribute visible on the class, inherited ones included,
        // becomes a binding in the class scope.
        for attr in self.registry.all_attributes(&class_name) {
            self.scopes.define(scope, &attr.name, &attr.ty, class.name.loc);
        }

        let ctx = Ctx {
            class: &class_name,
            method: None,
        };
        for feature in &mut class.features {
            let child = self.scopes.create_child(scope);
            match feature {
                Feature::Attr(attr) => self.check_attr(attr, child, ctx),
                Feature::Method(method) => self.check_method(method, child, ctx),
            }
        }
    }

    /// Walk the class's parent chain; if the class reappears, report it
    /// and force the parent to `Object` so later walks terminate. The
    /// walk itself is bounded, so a cycle not passing through this class
    /// cannot hang it either (that cycle is severed when its own class is
    /// checked).
    fn sever_cycle(&mut self, class_name: &str, loc: Loc) {
        let limit = self.registry.len();
        let mut steps = 0;
        let mut current = self
            .registry
            .get(class_name)
            .and_then(|e| e.parent.clone());
        while let Some(parent) = current {
            if parent == class_name {
                self.diag(
                    loc,
                    SemaErrorKind::CyclicInheritance {
                        name: class_name.to_string(),
                    },
                );
                if let Some(entity) = self.registry.get_mut(class_name) {
                    entity.parent = Some(ty::OBJECT.to_string());
                }
                break;
            }
            steps += 1;
            if steps > limit {
                break;
            }
            current = self.registry.get(&parent).and_then(|e| e.parent.clone());
        }
    }

    fn check_attr(&mut self, attr: &mut AttrDecl, scope: ScopeId, ctx: Ctx<'_>) {
        let Some(init) = &mut attr.init else { return };
        let child = self.scopes.create_child(scope);
        let init_ty = self.check_expr(init, child, ctx);
        let declared = self
            .registry
            .get(ctx.class)
            .and_then(|e| e.attribute(&attr.name.name))
            .map(|a| a.ty.clone())
            .unwrap_or_else(|| ty::ERROR.to_string());
        let expected = ty::resolve_self_type(&declared, ctx.class);
        if !self.registry.conforms_to(&init_ty, &expected) {
            self.diag(
                init.loc,
                SemaErrorKind::TypeMismatch {
                    found: init_ty,
                    expected,
                },
            );
        }
    }

    fn check_method(&mut self, method: &mut MethodDecl, scope: ScopeId, ctx: Ctx<'_>) {
        let method_name = method.name.name.clone();
        let sig = self
            .registry
            .get(ctx.class)
            .and_then(|e| e.method(&method_name))
            .cloned();
        // The builder normally attached the signature; fall back to the
        // declaration itself when it did not (e.g. a class that collided
        // with a built-in name).
        let (param_types, return_type) = match &sig {
            Some(s) => (s.param_types.clone(), s.return_type.clone()),
            None => (
                method
                    .params
                    .iter()
                    .map(|p| self.declared_or_poison(&p.ty.name))
                    .collect(),
                self.declared_or_poison(&method.return_ty.name),
            ),
        };

        if let Some(s) = &sig {
            if let Some(parent) = self.registry.get(ctx.class).and_then(|e| e.parent.clone()) {
                let conflicting_ancestor = self
                    .registry
                    .lookup_method(&parent, &method_name)
                    .filter(|(_, inherited)| {
                        inherited.param_types != s.param_types
                            || inherited.return_type != s.return_type
                    })
                    .map(|(owner, _)| owner.to_string());
                if let Some(ancestor) = conflicting_ancestor {
                    self.diag(
                        method.name.loc,
                        SemaErrorKind::IllegalOverride {
                            method: method_name.clone(),
                            class: ctx.class.to_string(),
                            ancestor,
                        },
                    );
                }
            }
        }

        self.scopes.define(scope, "self", ctx.class, method.name.loc);
        for (i, param) in method.params.iter().enumerate() {
            let declared = param_types
                .get(i)
                .cloned()
                .unwrap_or_else(|| ty::ERROR.to_string());
            self.scopes.define(scope, &param.name.name, &declared, param.name.loc);
        }

        let inner = Ctx {
            class: ctx.class,
            method: Some(&method_name),
        };
        let body_scope = self.scopes.create_child(scope);
        let body_ty = self.check_expr(&mut method.body, body_scope, inner);
        let expected = ty::resolve_self_type(&return_type, ctx.class);
        if !self.registry.conforms_to(&body_ty, &expected) {
            self.diag(
                method.body.loc,
                SemaErrorKind::TypeMismatch {
                    found: body_ty,
                    expected,
                },
            );
        }
    }

    fn declared_or_poison(&self, name: &str) -> String {
        if self.registry.contains(name) {
            name.to_string()
        } else {
            ty::ERROR.to_string()
        }
    }

    fn check_expr(&mut self, expr: &mut Expr, scope: ScopeId, ctx: Ctx<'_>) -> String {
        let loc = expr.loc;
        let ty_name = match &mut expr.kind {
            ExprKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let cond_scope = self.scopes.create_child(scope);
                let cond_ty = self.check_expr(condition, cond_scope, ctx);
                if !self.registry.conforms_to(&cond_ty, ty::BOOL) {
                    self.diag(
                        condition.loc,
                        SemaErrorKind::TypeMismatch {
                            found: cond_ty,
                            expected: ty::BOOL.to_string(),
                        },
                    );
                }
                let then_scope = self.scopes.create_child(scope);
                let then_ty = self.check_expr(then_body, then_scope, ctx);
                let else_scope = self.scopes.create_child(scope);
                let else_ty = self.check_expr(else_body, else_scope, ctx);
                let then_ty = ty::resolve_self_type(&then_ty, ctx.class);
                let else_ty = ty::resolve_self_type(&else_ty, ctx.class);
                self.registry.type_union(&then_ty, &else_ty)
            }

            ExprKind::While { condition, body } => {
                let cond_scope = self.scopes.create_child(scope);
                let cond_ty = self.check_expr(condition, cond_scope, ctx);
                if !self.registry.conforms_to(&cond_ty, ty::BOOL) {
                    self.diag(
                        condition.loc,
                        SemaErrorKind::TypeMismatch {
                            found: cond_ty,
                            expected: ty::BOOL.to_string(),
                        },
                    );
                }
                let body_scope = self.scopes.create_child(scope);
                self.check_expr(body, body_scope, ctx);
                ty::OBJECT.to_string()
            }

            ExprKind::Block { body } => {
                let mut last = ty::ERROR.to_string();
                for element in body.iter_mut() {
                    let child = self.scopes.create_child(scope);
                    last = self.check_expr(element, child, ctx);
                }
                last
            }

            ExprKind::Let { bindings, body } => {
                for binding in bindings.iter_mut() {
                    let declared = match self.registry.get_type(&binding.declared_ty.name) {
                        Ok(entity) => entity.name.clone(),
                        Err(kind) => {
                            self.diag(binding.declared_ty.loc, kind);
                            ty::ERROR.to_string()
                        }
                    };
                    let var_ty = ty::resolve_self_type(&declared, ctx.class);
                    let child = self.scopes.create_child(scope);
                    if let Some(init) = &mut binding.init {
                        let init_ty = self.check_expr(init, child, ctx);
                        if !self.registry.conforms_to(&init_ty, &var_ty) {
                            self.diag(
                                init.loc,
                                SemaErrorKind::TypeMismatch {
                                    found: init_ty,
                                    expected: var_ty.clone(),
                                },
                            );
                        }
                    }
                    self.scopes.define(scope, &binding.name.name, &var_ty, binding.name.loc);
                }
                let body_scope = self.scopes.create_child(scope);
                self.check_expr(body, body_scope, ctx)
            }

            ExprKind::Case {
                scrutinee,
                branches,
            } => {
                let scrutinee_scope = self.scopes.create_child(scope);
                self.check_expr(scrutinee, scrutinee_scope, ctx);
                let mut result: Option<String> = None;
                for branch in branches.iter_mut() {
                    let name = branch.declared_ty.name.clone();
                    let declared = if !self.registry.contains(&name) {
                        self.diag(branch.declared_ty.loc, SemaErrorKind::UnknownType { name });
                        ty::ERROR.to_string()
                    } else if name == ty::SELF_TYPE || name == ty::AUTO_TYPE {
                        self.diag(
                            branch.declared_ty.loc,
                            SemaErrorKind::IllegalBranchType { name },
                        );
                        ty::ERROR.to_string()
                    } else {
                        name
                    };
                    let child = self.scopes.create_child(scope);
                    self.scopes.define(child, &branch.name.name, &declared, branch.name.loc);
                    let branch_ty = self.check_expr(&mut branch.body, child, ctx);
                    let branch_ty = ty::resolve_self_type(&branch_ty, ctx.class);
                    result = Some(match result {
                        None => branch_ty,
                        Some(acc) => self.registry.type_union(&acc, &branch_ty),
                    });
                }
                result.unwrap_or_else(|| ty::ERROR.to_string())
            }

            ExprKind::Assign { target, value } => {
                let value_scope = self.scopes.create_child(scope);
                let value_ty = self.check_expr(value, value_scope, ctx);
                match self.scopes.lookup_binding(scope, &target.name) {
                    Some(binding) => {
                        let declared = binding.declared.clone();
                        if target.name == "self" {
                            self.diag(loc, SemaErrorKind::ReadOnlySelf);
                        } else {
                            let expected = ty::resolve_self_type(&declared, ctx.class);
                            if !self.registry.conforms_to(&value_ty, &expected) {
                                self.diag(
                                    value.loc,
                                    SemaErrorKind::TypeMismatch {
                                        found: value_ty.clone(),
                                        expected,
                                    },
                                );
                            }
                        }
                    }
                    None => {
                        self.diag(
                            loc,
                            SemaErrorKind::UndefinedVariable {
                                name: target.name.clone(),
                                method: ctx.method.map(String::from),
                            },
                        );
                    }
                }
                value_ty
            }

            ExprKind::Unary { op, operand } => {
                let child = self.scopes.create_child(scope);
                let operand_ty = self.check_expr(operand, child, ctx);
                match op {
                    UnaryOp::Not => {
                        if !self.registry.conforms_to(&operand_ty, ty::BOOL) {
                            self.diag(
                                operand.loc,
                                SemaErrorKind::TypeMismatch {
                                    found: operand_ty,
                                    expected: ty::BOOL.to_string(),
                                },
                            );
                        }
                        ty::BOOL.to_string()
                    }
                    UnaryOp::Complement => {
                        if !self.registry.conforms_to(&operand_ty, ty::INT) {
                            self.diag(
                                operand.loc,
                                SemaErrorKind::TypeMismatch {
                                    found: operand_ty,
                                    expected: ty::INT.to_string(),
                                },
                            );
                        }
                        ty::INT.to_string()
                    }
                    UnaryOp::IsVoid => ty::BOOL.to_string(),
                }
            }

            ExprKind::Binary { op, left, right } => {
                let left_scope = self.scopes.create_child(scope);
                let left_ty = self.check_expr(left, left_scope, ctx);
                let right_scope = self.scopes.create_child(scope);
                let right_ty = self.check_expr(right, right_scope, ctx);
                match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                        if !self.registry.conforms_to(&left_ty, ty::INT)
                            || !self.registry.conforms_to(&right_ty, ty::INT)
                        {
                            self.diag(
                                loc,
                                SemaErrorKind::UndefinedOperation {
                                    left: left_ty,
                                    right: right_ty,
                                },
                            );
                        }
                        ty::INT.to_string()
                    }
                    BinaryOp::Less | BinaryOp::LessEq => {
                        if !self.registry.conforms_to(&left_ty, ty::INT)
                            || !self.registry.conforms_to(&right_ty, ty::INT)
                        {
                            self.diag(
                                loc,
                                SemaErrorKind::UndefinedOperation {
                                    left: left_ty,
                                    right: right_ty,
                                },
                            );
                        }
                        ty::BOOL.to_string()
                    }
                    BinaryOp::Eq => {
                        // A not-yet-inferred operand suppresses the check.
                        if left_ty != ty::AUTO_TYPE && right_ty != ty::AUTO_TYPE {
                            let mixed_primitive = [ty::INT, ty::STRING, ty::BOOL]
                                .iter()
                                .any(|prim| {
                                    self.registry.conforms_to(&left_ty, prim)
                                        ^ self.registry.conforms_to(&right_ty, prim)
                                });
                            if mixed_primitive {
                                self.diag(
                                    loc,
                                    SemaErrorKind::UndefinedOperation {
                                        left: left_ty,
                                        right: right_ty,
                                    },
                                );
                            }
                        }
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
                let receiver_scope = self.scopes.create_child(scope);
                let receiver_ty = self.check_expr(receiver, receiver_scope, ctx);
                let mut receiver_ty = ty::resolve_self_type(&receiver_ty, ctx.class);
                if let Some(target) = static_target {
                    let target_ty = if !self.registry.contains(&target.name) {
                        self.diag(
                            target.loc,
                            SemaErrorKind::UnknownType {
                                name: target.name.clone(),
                            },
                        );
                        ty::ERROR.to_string()
                    } else if target.name == ty::SELF_TYPE || target.name == ty::AUTO_TYPE {
                        self.diag(
                            target.loc,
                            SemaErrorKind::IllegalDispatchType {
                                name: target.name.clone(),
                            },
                        );
                        ty::ERROR.to_string()
                    } else {
                        target.name.clone()
                    };
                    if !self.registry.conforms_to(&receiver_ty, &target_ty) {
                        self.diag(
                            receiver.loc,
                            SemaErrorKind::TypeMismatch {
                                found: receiver_ty.clone(),
                                expected: target_ty.clone(),
                            },
                        );
                    }
                    receiver_ty = target_ty;
                }
                let sig = self
                    .registry
                    .lookup_method(&receiver_ty, &method.name)
                    .map(|(_, m)| m.clone());
                let result_ty = self.dispatch_result(&sig, &receiver_ty, method);
                let arg_info = self.check_args(args, scope, ctx);
                self.check_call_args(&sig, &arg_info, method);
                result_ty
            }

            ExprKind::SelfDispatch { method, args } => {
                let receiver_ty = ctx.class.to_string();
                let sig = self
                    .registry
                    .lookup_method(&receiver_ty, &method.name)
                    .map(|(_, m)| m.clone());
                let result_ty = self.dispatch_result(&sig, &receiver_ty, method);
                let arg_info = self.check_args(args, scope, ctx);
                self.check_call_args(&sig, &arg_info, method);
                result_ty
            }

            ExprKind::New { class } => match self.registry.get_type(&class.name) {
                Ok(entity) => entity.name.clone(),
                Err(kind) => {
                    self.diag(class.loc, kind);
                    ty::ERROR.to_string()
                }
            },

            ExprKind::IntLit(_) => ty::INT.to_string(),
            ExprKind::StrLit(_) => ty::STRING.to_string(),
            ExprKind::BoolLit(_) => ty::BOOL.to_string(),

            ExprKind::Id(name) => match self.scopes.lookup_binding(scope, name) {
                Some(binding) => binding.declared.clone(),
                None => {
                    self.diag(
                        loc,
                        SemaErrorKind::UndefinedVariable {
                            name: name.clone(),
                            method: ctx.method.map(String::from),
                        },
                    );
                    ty::ERROR.to_string()
                }
            },
        };
        expr.static_ty = Some(ty_name.clone());
        ty_name
    }

    /// The call's type: the receiver's static type when the signature
    /// returns `SELF_TYPE`, the declared return type otherwise. A missing
    /// method on a non-poison receiver is reported here.
    fn dispatch_result(
        &mut self,
        sig: &Option<Method>,
        receiver_ty: &str,
        method: &Ident,
    ) -> String {
        match sig {
            Some(s) if s.return_type == ty::SELF_TYPE => receiver_ty.to_string(),
            Some(s) => s.return_type.clone(),
            None => {
                if receiver_ty != ty::ERROR {
                    self.diag(
                        method.loc,
                        SemaErrorKind::UnknownMethod {
                            method: method.name.clone(),
                            ty: receiver_ty.to_string(),
                        },
                    );
                }
                ty::ERROR.to_string()
            }
        }
    }

    /// Arguments are always visited, signature or not, so the scope shape
    /// stays the same for the inference pass.
    fn check_args(
        &mut self,
        args: &mut [Expr],
        scope: ScopeId,
        ctx: Ctx<'_>,
    ) -> Vec<(String, Loc)> {
        let mut info = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            let child = self.scopes.create_child(scope);
            let arg_ty = self.check_expr(arg, child, ctx);
            info.push((arg_ty, arg.loc));
        }
        info
    }

    fn check_call_args(
        &mut self,
        sig: &Option<Method>,
        args: &[(String, Loc)],
        method: &Ident,
    ) {
        let Some(sig) = sig else { return };
        if sig.param_types.len() != args.len() {
            self.diag(
                method.loc,
                SemaErrorKind::UndispatchableMethod {
                    method: method.name.clone(),
                },
            );
            return;
        }
        for ((arg_ty, arg_loc), param_ty) in args.iter().zip(&sig.param_types) {
            if !self.registry.conforms_to(arg_ty, param_ty) {
                self.diag(
                    *arg_loc,
                    SemaErrorKind::TypeMismatch {
                        found: arg_ty.clone(),
                        expected: param_ty.clone(),
                    },
                );
            }
        }
    }
}
