use super::runtime_error::{RuntimeError, unbound};
use crate::lang::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A lexical scope in a parent chain.
///
/// `Context` is a cheap shared handle: cloning it yields another handle to the
/// same scope. A scope lives as long as the longest-lived process or child
/// context holding it.
#[derive(Clone)]
pub struct Context {
    scope: Rc<Scope>,
}

struct Scope {
    parent: Option<Context>,
    // Created on the first local write.
    local: RefCell<Option<HashMap<String, Value>>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A root scope with no locals.
    pub fn new() -> Self {
        Self::from_parts(None, None)
    }

    /// A root scope seeded from a plain table of bindings.
    pub fn with_locals(locals: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self::from_parts(None, Some(locals.into_iter().collect()))
    }

    fn from_parts(parent: Option<Context>, local: Option<HashMap<String, Value>>) -> Self {
        Context {
            scope: Rc::new(Scope {
                parent,
                local: RefCell::new(local),
            }),
        }
    }

    /// A new scope parented to this one, pre-populated with `locals`.
    pub fn child(&self, locals: impl IntoIterator<Item = (String, Value)>) -> Context {
        Self::from_parts(Some(self.clone()), Some(locals.into_iter().collect()))
    }

    /// A new empty scope parented to this one. Every process gets one.
    pub fn nested(&self) -> Context {
        Self::from_parts(Some(self.clone()), None)
    }

    pub fn parent(&self) -> Option<&Context> {
        self.scope.parent.as_ref()
    }

    /// Number of ancestors above this scope.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut target = self;
        while let Some(parent) = target.parent() {
            depth += 1;
            target = parent;
        }
        depth
    }

    pub fn ptr_eq(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.scope, &other.scope)
    }

    /// Whether this scope binds `id` locally.
    pub fn defines(&self, id: &str) -> bool {
        self.scope
            .local
            .borrow()
            .as_ref()
            .is_some_and(|local| local.contains_key(id))
    }

    /// Local-only lookup; never consults ancestors.
    pub fn value(&self, id: &str) -> Option<Value> {
        self.scope
            .local
            .borrow()
            .as_ref()
            .and_then(|local| local.get(id).cloned())
    }

    /// Nearest binding of `id`, walking outward from this scope.
    pub fn get(&self, id: &str) -> Option<Value> {
        self.owner(id).and_then(|target| target.value(id))
    }

    /// Writes into this scope's own locals regardless of ancestor bindings
    /// (the language's `let`).
    pub fn declare(&self, id: &str, value: Value) {
        self.scope
            .local
            .borrow_mut()
            .get_or_insert_with(HashMap::new)
            .insert(id.to_string(), value);
    }

    /// Overwrites the nearest existing binding of `id`.
    ///
    /// When no scope in the chain binds `id`, the definition lands in the
    /// outermost scope, which makes it a global. Use [`Context::assign`] when
    /// that fallback is not wanted.
    pub fn set(&self, id: &str, value: Value) {
        let target = self.owner(id).unwrap_or_else(|| self.outermost());
        target.declare(id, value);
    }

    /// Overwrites the nearest existing binding of `id`, failing if none exists.
    pub fn assign(&self, id: &str, value: Value) -> Result<(), RuntimeError> {
        match self.owner(id) {
            Some(target) => {
                target.declare(id, value);
                Ok(())
            }
            None => Err(unbound(id)),
        }
    }

    fn owner(&self, id: &str) -> Option<&Context> {
        let mut target = self;
        loop {
            if target.defines(id) {
                return Some(target);
            }
            target = target.parent()?;
        }
    }

    fn outermost(&self) -> &Context {
        let mut target = self;
        while let Some(parent) = target.parent() {
            target = parent;
        }
        target
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let local = self.scope.local.borrow();
        let mut keys: Vec<&String> = local.iter().flat_map(|m| m.keys()).collect();
        keys.sort();
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .field("locals", &keys)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::runtime_error::ErrorKind;

    fn locals(pairs: &[(&str, i64)]) -> Vec<(String, Value)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::Integer(*v)))
            .collect()
    }

    #[test]
    fn test_get_walks_to_nearest_binding() {
        let root = Context::with_locals(locals(&[("x", 1), ("y", 2)]));
        let mid = root.child(locals(&[("x", 10)]));
        let leaf = mid.nested();

        assert_eq!(leaf.get("x"), Some(Value::Integer(10)));
        assert_eq!(leaf.get("y"), Some(Value::Integer(2)));
        assert_eq!(leaf.get("z"), None);
    }

    #[test]
    fn test_value_is_local_only() {
        let root = Context::with_locals(locals(&[("x", 1)]));
        let leaf = root.nested();
        assert_eq!(leaf.value("x"), None);
        assert_eq!(root.value("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn test_declare_shadows_ancestor() {
        let root = Context::with_locals(locals(&[("x", 1)]));
        let leaf = root.nested();

        leaf.declare("x", Value::Integer(5));

        assert_eq!(leaf.get("x"), Some(Value::Integer(5)));
        assert_eq!(root.get("x"), Some(Value::Integer(1)));
    }

    #[test]
    fn test_set_overwrites_nearest_existing_binding() {
        let root = Context::with_locals(locals(&[("x", 1)]));
        let mid = root.child(locals(&[("x", 2)]));
        let leaf = mid.nested();

        leaf.set("x", Value::Integer(3));

        assert_eq!(mid.value("x"), Some(Value::Integer(3)));
        assert_eq!(root.value("x"), Some(Value::Integer(1)));
        assert!(!leaf.defines("x"));
    }

    #[test]
    fn test_set_unbound_defines_in_outermost_scope() {
        let root = Context::new();
        let leaf = root.nested().nested();

        leaf.set("tempo", Value::Integer(120));

        assert_eq!(root.value("tempo"), Some(Value::Integer(120)));
        assert_eq!(leaf.value("tempo"), None);
    }

    #[test]
    fn test_assign_requires_existing_binding() {
        let root = Context::with_locals(locals(&[("x", 1)]));
        let leaf = root.nested();

        leaf.assign("x", Value::Integer(7)).unwrap();
        assert_eq!(root.value("x"), Some(Value::Integer(7)));

        let err = leaf.assign("missing", Value::Integer(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unbound);
        assert_eq!(root.value("missing"), None);
    }

    #[test]
    fn test_shared_handles_see_each_others_writes() {
        let root = Context::new();
        let alias = root.clone();
        alias.declare("a", Value::Bool(true));
        assert!(root.ptr_eq(&alias));
        assert_eq!(root.get("a"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_depth() {
        let root = Context::new();
        assert_eq!(root.depth(), 0);
        assert_eq!(root.nested().child(Vec::new()).depth(), 2);
    }
}
