//=============================================
// nekoscript/interpreter/scope.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lexical environments
// Objective: Parent-pointer scope chain used for globals, module bodies,
//            blocks and function invocations
//=============================================

use super::value::{Bindings, Value};
use std::cell::RefCell;
use std::rc::Rc;

/// One lexical scope. Lookups walk outward through `parent`.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: RefCell<Bindings>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn global() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(Bindings::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|parent| parent.contains(name))
    }

    /// Rebind the nearest existing `name`. Returns false when unbound.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    pub fn merge(&self, bindings: &Bindings) {
        let mut local = self.bindings.borrow_mut();
        for (name, value) in bindings {
            local.insert(name.clone(), value.clone());
        }
    }

    /// Bindings declared directly in this scope.
    pub fn local_bindings(&self) -> Bindings {
        self.bindings.borrow().clone()
    }

    pub fn local_names(&self) -> Vec<String> {
        self.bindings.borrow().keys().cloned().collect()
    }
}
