//! Environment frames. Frames live in the heap so that the collector can
//! reclaim a frame together with the closures that captured it; the chain is
//! walked through parent handles.

use std::collections::HashMap;

use crate::interpreter::heap::{Frame, Handle, Heap, Object};
use crate::interpreter::symbol::Sym;
use crate::interpreter::value::Value;

pub fn new_root(heap: &mut Heap) -> Handle {
    heap.insert(Object::Env(Frame {
        parent: None,
        values: HashMap::new(),
    }))
}

pub fn new_child(heap: &mut Heap, parent: Handle) -> Handle {
    heap.insert(Object::Env(Frame {
        parent: Some(parent),
        values: HashMap::new(),
    }))
}

fn frame(heap: &Heap, env: Handle) -> &Frame {
    match heap.get(env) {
        Object::Env(frame) => frame,
        _ => unreachable!("environment handle does not point at a frame"),
    }
}

fn frame_mut(heap: &mut Heap, env: Handle) -> &mut Frame {
    match heap.get_mut(env) {
        Object::Env(frame) => frame,
        _ => unreachable!("environment handle does not point at a frame"),
    }
}

/// Bind or overwrite `name` in the current frame, shadowing any binding in
/// an enclosing scope.
pub fn define(heap: &mut Heap, env: Handle, name: Sym, value: Value) {
    frame_mut(heap, env).values.insert(name, value);
}

/// Overwrite the nearest existing binding, walking parents. Returns false
/// when no scope binds `name`; the caller owns the diagnostic since it knows
/// the spelling.
pub fn set(heap: &mut Heap, mut env: Handle, name: Sym, value: Value) -> bool {
    loop {
        let frame = frame_mut(heap, env);
        if let Some(slot) = frame.values.get_mut(&name) {
            *slot = value;
            return true;
        }
        match frame.parent {
            Some(parent) => env = parent,
            None => return false,
        }
    }
}

pub fn get(heap: &Heap, mut env: Handle, name: Sym) -> Option<Value> {
    loop {
        let frame = frame(heap, env);
        if let Some(&value) = frame.values.get(&name) {
            return Some(value);
        }
        env = frame.parent?;
    }
}
