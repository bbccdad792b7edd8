//! A generic stack of lexical frames shared by the interpreter, type
//! checker, and IR generator. Each carries a different payload (a
//! runtime [`crate::interpreter::Value`], a [`crate::types::Type`], or an
//! [`crate::ir::IrVar`]) through the same shape: `set` binds in the
//! innermost frame, `get` searches outward, `get_local` stays innermost,
//! and `find_scope_index` locates the owning frame for assignment.
//!
//! Block lifetimes are strictly nested, so a plain vector of frames with
//! push/pop on entry/exit is sufficient; there is no need for a linked
//! structure with shared ownership.

use std::collections::HashMap;

pub struct Scope<T> {
    frames: Vec<HashMap<String, T>>,
}

impl<T> Scope<T> {
    pub fn new() -> Self {
        Scope {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
        debug_assert!(!self.frames.is_empty(), "popped the root scope frame");
    }

    /// Binds `name` in the innermost frame, shadowing any outer binding.
    pub fn set(&mut self, name: impl Into<String>, value: T) {
        self.frames
            .last_mut()
            .expect("scope always has at least one frame")
            .insert(name.into(), value);
    }

    /// Searches innermost-out.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Searches only the innermost frame.
    pub fn get_local(&self, name: &str) -> Option<&T> {
        self.frames.last().and_then(|frame| frame.get(name))
    }

    /// Rebinds `name` in the frame that currently owns it, searching
    /// innermost-out. Returns `false` if `name` is unbound anywhere.
    pub fn assign(&mut self, name: &str, value: T) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if frame.contains_key(name) {
                frame.insert(name.to_string(), value);
                return true;
            }
        }
        false
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Scope::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_searches_innermost_out() {
        let mut scope: Scope<i32> = Scope::new();
        scope.set("x", 1);
        scope.push();
        assert_eq!(scope.get("x"), Some(&1));
        scope.set("x", 2);
        assert_eq!(scope.get("x"), Some(&2));
        assert_eq!(scope.get_local("x"), Some(&2));
        scope.pop();
        assert_eq!(scope.get("x"), Some(&1));
    }

    #[test]
    fn get_local_does_not_see_outer_frames() {
        let mut scope: Scope<i32> = Scope::new();
        scope.set("x", 1);
        scope.push();
        assert_eq!(scope.get_local("x"), None);
    }

    #[test]
    fn assign_mutates_the_owning_frame() {
        let mut scope: Scope<i32> = Scope::new();
        scope.set("x", 1);
        scope.push();
        assert!(scope.assign("x", 99));
        scope.pop();
        assert_eq!(scope.get("x"), Some(&99));
    }

    #[test]
    fn assign_to_unbound_name_fails() {
        let mut scope: Scope<i32> = Scope::new();
        assert!(!scope.assign("missing", 1));
    }
}
