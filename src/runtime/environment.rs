use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

struct ScopeNode {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Scope>,
}

/// One lexical scope in a render's scope chain.
///
/// Cloning a `Scope` clones the handle, not the bindings: both handles see
/// the same variables. A scope stays alive while a handle to it or to one of
/// its children exists, so dropping a loop body's scope never touches the
/// enclosing scope's bindings.
#[derive(Clone)]
pub struct Scope(Rc<ScopeNode>);

/// Returned by [`Scope::assign`] when no scope in the chain declares the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound;

impl Default for Scope {
    fn default() -> Self {
        Self::root()
    }
}

impl Scope {
    pub fn root() -> Self {
        Self(Rc::new(ScopeNode {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Self {
        Self(Rc::new(ScopeNode {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Inserts or overwrites `name` in this scope only.
    pub fn declare(&self, name: &str, value: Value) {
        self.0
            .bindings
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.0.bindings.borrow().get(name) {
                return Some(value.clone());
            }
            scope = current.parent();
        }
        None
    }

    /// Updates the nearest existing binding of `name` in place.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), NotFound> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(slot) = current.0.bindings.borrow_mut().get_mut(name) {
                *slot = value;
                return Ok(());
            }
            scope = current.parent();
        }
        Err(NotFound)
    }

    pub fn is_declared_here(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut scope = self.parent();
        while let Some(current) = scope {
            depth += 1;
            scope = current.parent();
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_lookup() {
        let scope = Scope::root();
        scope.declare("x", Value::Int(42));
        assert_eq!(scope.lookup("x"), Some(Value::Int(42)));
        assert_eq!(scope.lookup("y"), None);
    }

    #[test]
    fn child_shadows_parent_until_dropped() {
        let root = Scope::root();
        root.declare("x", Value::Int(1));
        {
            let child = root.child();
            child.declare("x", Value::Int(2));
            assert_eq!(child.lookup("x"), Some(Value::Int(2)));
            assert_eq!(root.lookup("x"), Some(Value::Int(1)));
        }
        assert_eq!(root.lookup("x"), Some(Value::Int(1)));
    }

    #[test]
    fn assign_updates_nearest_binding() {
        let root = Scope::root();
        root.declare("x", Value::Int(1));
        let middle = root.child();
        middle.declare("x", Value::Int(2));
        let inner = middle.child();

        assert_eq!(inner.assign("x", Value::Int(3)), Ok(()));
        assert_eq!(middle.lookup("x"), Some(Value::Int(3)));
        assert_eq!(root.lookup("x"), Some(Value::Int(1)));
        assert!(!inner.is_declared_here("x"));
    }

    #[test]
    fn assign_without_declaration_fails() {
        let root = Scope::root();
        let child = root.child();
        assert_eq!(child.assign("missing", Value::Nil), Err(NotFound));
        assert_eq!(root.lookup("missing"), None);
    }

    #[test]
    fn siblings_do_not_see_each_other() {
        let root = Scope::root();
        let first = root.child();
        first.declare("local", Value::Bool(true));
        let second = root.child();
        assert_eq!(second.lookup("local"), None);
        assert_eq!(second.depth(), 1);
    }
}
