//! Scope tree and inference slots.
//!
//! The checking pass builds one scope per visited construct -- class body,
//! feature, method body, every sub-expression -- as an ordered child of the
//! enclosing scope. The inference pass then re-walks the tree positionally:
//! the n-th construct visited by the checker owns the n-th child, so both
//! passes see the same bindings without re-deriving the structure. That
//! ordered-child invariant is what makes the `children` list normative
//! rather than incidental.
//!
//! Bindings whose declared type is `AUTO_TYPE` carry an [`InferenceSlot`]
//! tracking the bounds observed for them.

use serde::Serialize;

use cool_ast::Loc;

use crate::registry::TypeRegistry;
use crate::ty;

/// Index of a scope in the [`ScopeTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScopeId(u32);

impl ScopeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One declared name: its declared (or since-inferred) type and, when the
/// declaration was `AUTO_TYPE`, the slot collecting its bounds.
#[derive(Debug, Clone, Serialize)]
pub struct Binding {
    pub name: String,
    pub declared: String,
    pub loc: Loc,
    pub slot: Option<InferenceSlot>,
}

impl Binding {
    fn new(name: &str, declared: &str, loc: Loc) -> Self {
        let slot = (declared == ty::AUTO_TYPE).then(InferenceSlot::default);
        Binding {
            name: name.to_string(),
            declared: declared.to_string(),
            loc,
            slot,
        }
    }

    /// Whether the binding's type is concrete: either it was declared
    /// concrete, or its slot has resolved.
    pub fn is_concrete(&self) -> bool {
        self.slot.as_ref().map_or(true, |s| s.resolved)
    }
}

#[derive(Debug, Clone, Serialize)]
struct Scope {
    parent: Option<ScopeId>,
    locals: Vec<Binding>,
    children: Vec<ScopeId>,
}

/// Arena of scopes, rooted at a single program-level scope.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                parent: None,
                locals: Vec::new(),
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Append a new child to `parent` and return its id. Children keep
    /// creation order.
    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            locals: Vec::new(),
            children: Vec::new(),
        });
        self.scopes[parent.index()].children.push(id);
        id
    }

    /// Declare `name` in `scope`. Declaration order is preserved.
    pub fn define(&mut self, scope: ScopeId, name: &str, declared: &str, loc: Loc) {
        self.scopes[scope.index()]
            .locals
            .push(Binding::new(name, declared, loc));
    }

    /// Find `name` starting at `scope` and walking parents outward.
    /// Within one scope the most recent declaration shadows earlier ones.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, usize)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if let Some(idx) = s.locals.iter().rposition(|b| b.name == name) {
                return Some((id, idx));
            }
            current = s.parent;
        }
        None
    }

    pub fn lookup_binding(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.lookup(scope, name).map(|(s, i)| self.binding(s, i))
    }

    pub fn binding(&self, scope: ScopeId, idx: usize) -> &Binding {
        &self.scopes[scope.index()].locals[idx]
    }

    pub fn binding_mut(&mut self, scope: ScopeId, idx: usize) -> &mut Binding {
        &mut self.scopes[scope.index()].locals[idx]
    }

    pub fn locals(&self, scope: ScopeId) -> &[Binding] {
        &self.scopes[scope.index()].locals
    }

    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.scopes[scope.index()].children
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of [`InferenceSlot::try_resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The slot just resolved to this type name.
    Resolved(String),
    /// The lower bound does not conform to the upper bound; reported once,
    /// the slot stays open.
    Conflict { lower: String, upper: String },
    /// Nothing to do yet (no bounds, or already resolved earlier).
    Pending,
}

/// Bound-tracking cell for one `AUTO_TYPE` declaration.
///
/// The lower bound is the least common ancestor of every type observed
/// flowing into the declaration; the upper bound is the most specific type
/// demanded by any context it was used in. Resolution is monotonic: once
/// `resolved` is set the slot never reopens.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InferenceSlot {
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub resolved: bool,
    conflict_reported: bool,
}

impl InferenceSlot {
    /// Record a type flowing into the declaration (assignment, initializer,
    /// returned value). Multiple observations combine via type union.
    pub fn add_lower(&mut self, ty_name: &str, registry: &TypeRegistry) {
        if self.resolved || ty::is_placeholder(ty_name) {
            return;
        }
        self.lower = Some(match self.lower.take() {
            None => ty_name.to_string(),
            Some(existing) => registry.type_union(&existing, ty_name),
        });
    }

    /// Record a type demanded by a use site. A more specific demand
    /// narrows the bound; an unrelated one leaves the first demand in
    /// place.
    pub fn add_upper(&mut self, ty_name: &str, registry: &TypeRegistry) {
        if self.resolved || ty::is_placeholder(ty_name) {
            return;
        }
        match &self.upper {
            None => self.upper = Some(ty_name.to_string()),
            Some(existing) => {
                if registry.conforms_to(ty_name, existing) {
                    self.upper = Some(ty_name.to_string());
                }
            }
        }
    }

    /// Resolve if possible: the lower bound wins when the upper bound
    /// accepts it; an upper bound alone is used as-is. A conflicting pair
    /// is surfaced exactly once and leaves the slot open.
    pub fn try_resolve(&mut self, registry: &TypeRegistry) -> Resolution {
        if self.resolved {
            return Resolution::Pending;
        }
        match (&self.lower, &self.upper) {
            (Some(lower), Some(upper)) if !registry.conforms_to(lower, upper) => {
                if self.conflict_reported {
                    Resolution::Pending
                } else {
                    self.conflict_reported = true;
                    Resolution::Conflict {
                        lower: lower.clone(),
                        upper: upper.clone(),
                    }
                }
            }
            (Some(lower), _) => {
                self.resolved = true;
                Resolution::Resolved(lower.clone())
            }
            (None, Some(upper)) => {
                self.resolved = true;
                Resolution::Resolved(upper.clone())
            }
            (None, None) => Resolution::Pending,
        }
    }
}
