//! Lexically scoped variable environments
//!
//! Scopes form a parent chain of shared references so closures keep their
//! defining scope alive and observe later mutations, matching JavaScript
//! semantics.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

pub type ScopeRef = Rc<RefCell<Scope>>;

/// One scope frame with a link to its enclosing scope
#[derive(Debug, Default)]
pub struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<ScopeRef>,
}

impl Scope {
    /// Create a new root scope
    pub fn root() -> ScopeRef {
        Rc::new(RefCell::new(Scope::default()))
    }

    /// Create a child scope of `parent`
    pub fn child(parent: &ScopeRef) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Define a variable in this scope (shadowing outer bindings)
    pub fn define(&mut self, name: &str, value: Value) {
        self.vars.insert(name.to_string(), value);
    }
}

/// Look up a variable, walking the scope chain from innermost to outermost
pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
    let mut current = Some(Rc::clone(scope));
    while let Some(frame) = current {
        let frame = frame.borrow();
        if let Some(value) = frame.vars.get(name) {
            return Some(value.clone());
        }
        current = frame.parent.clone();
    }
    None
}

/// Assign to an existing variable, walking the scope chain.
/// Returns false if no binding with that name exists.
pub fn assign(scope: &ScopeRef, name: &str, value: Value) -> bool {
    let mut current = Some(Rc::clone(scope));
    while let Some(frame) = current {
        let mut borrowed = frame.borrow_mut();
        if borrowed.vars.contains_key(name) {
            borrowed.vars.insert(name.to_string(), value);
            return true;
        }
        current = borrowed.parent.clone();
    }
    false
}

/// Define a variable in the given scope frame
pub fn define(scope: &ScopeRef, name: &str, value: Value) {
    scope.borrow_mut().define(name, value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_chain() {
        let root = Scope::root();
        define(&root, "a", Value::Number(1.0));

        let child = Scope::child(&root);
        assert!(matches!(lookup(&child, "a"), Some(Value::Number(n)) if n == 1.0));
        assert!(lookup(&child, "b").is_none());
    }

    #[test]
    fn test_shadowing() {
        let root = Scope::root();
        define(&root, "a", Value::Number(1.0));

        let child = Scope::child(&root);
        define(&child, "a", Value::Number(2.0));

        assert!(matches!(lookup(&child, "a"), Some(Value::Number(n)) if n == 2.0));
        assert!(matches!(lookup(&root, "a"), Some(Value::Number(n)) if n == 1.0));
    }

    #[test]
    fn test_assign_updates_outer_binding() {
        let root = Scope::root();
        define(&root, "a", Value::Number(1.0));

        let child = Scope::child(&root);
        assert!(assign(&child, "a", Value::Number(5.0)));
        assert!(matches!(lookup(&root, "a"), Some(Value::Number(n)) if n == 5.0));

        assert!(!assign(&child, "missing", Value::Null));
    }
}
