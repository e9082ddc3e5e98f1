use std::collections::HashMap;
use std::fs::File;

use tracing::debug;

use crate::interpreter::symbol::Sym;
use crate::interpreter::value::Value;

/// Index of a slot in the heap. Handles are only ever minted by
/// [`Heap::insert`] and stay valid until a collection proves the slot
/// unreachable.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Handle(u32);

impl Handle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Everything that lives in a heap slot. Environment frames are ordinary
/// heap objects: closures keep frames alive and frames keep values alive, so
/// the cyclic closure/environment/value graph is collected as one.
pub enum Object {
    Str(String),
    Pair(Value, Value),
    Vector(Vec<Value>),
    Procedure(Procedure),
    InputPort(Port),
    OutputPort(Port),
    Env(Frame),
}

pub enum Procedure {
    /// A built-in, identified by the name it is dispatched under.
    Native(&'static str),
    /// A closure: formal names, the body as a list of forms, and the frame
    /// captured at construction.
    Closure {
        formals: Vec<Sym>,
        body: Value,
        env: Handle,
    },
}

pub enum Port {
    Stdin,
    Stdout,
    /// A file-backed port. `None` once closed; closing again is a no-op.
    File(Option<File>),
}

impl Port {
    pub fn close(&mut self) {
        if let Port::File(file) = self {
            file.take();
        }
    }
}

/// One link of the lexical environment chain.
pub struct Frame {
    pub parent: Option<Handle>,
    pub values: HashMap<Sym, Value>,
}

struct Slot {
    object: Option<Object>,
    mark: bool,
}

/// Slab heap with a free list. Allocation hands out slot indices; a
/// mark-sweep pass reclaims whatever the roots no longer reach. Collection
/// happens only at safe points (between top-level forms), so the evaluator
/// never has to root its temporaries.
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    allocated: u64,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GcStats {
    pub collected: usize,
    pub remaining: usize,
}

impl Heap {
    pub fn new() -> Heap {
        Heap {
            slots: Vec::new(),
            free: Vec::new(),
            allocated: 0,
        }
    }

    pub fn insert(&mut self, object: Object) -> Handle {
        self.allocated += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                debug_assert!(slot.object.is_none());
                slot.object = Some(object);
                slot.mark = false;
                Handle(index)
            }
            None => {
                self.slots.push(Slot {
                    object: Some(object),
                    mark: false,
                });
                Handle((self.slots.len() - 1) as u32)
            }
        }
    }

    pub fn get(&self, handle: Handle) -> &Object {
        self.slots[handle.index()]
            .object
            .as_ref()
            .expect("dangling heap handle")
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut Object {
        self.slots[handle.index()]
            .object
            .as_mut()
            .expect("dangling heap handle")
    }

    /// Number of live cells.
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Total allocations since startup.
    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn cons(&mut self, car: Value, cdr: Value) -> Value {
        Value::Pair(self.insert(Object::Pair(car, cdr)))
    }

    pub fn new_string(&mut self, string: String) -> Value {
        Value::Str(self.insert(Object::Str(string)))
    }

    pub fn new_vector(&mut self, elements: Vec<Value>) -> Value {
        Value::Vector(self.insert(Object::Vector(elements)))
    }

    pub fn pair(&self, handle: Handle) -> (Value, Value) {
        match self.get(handle) {
            Object::Pair(car, cdr) => (*car, *cdr),
            _ => unreachable!("pair handle does not point at a pair"),
        }
    }

    pub fn string(&self, handle: Handle) -> &str {
        match self.get(handle) {
            Object::Str(string) => string,
            _ => unreachable!("string handle does not point at a string"),
        }
    }

    pub fn string_mut(&mut self, handle: Handle) -> &mut String {
        match self.get_mut(handle) {
            Object::Str(string) => string,
            _ => unreachable!("string handle does not point at a string"),
        }
    }

    pub fn vector(&self, handle: Handle) -> &[Value] {
        match self.get(handle) {
            Object::Vector(elements) => elements,
            _ => unreachable!("vector handle does not point at a vector"),
        }
    }

    pub fn vector_mut(&mut self, handle: Handle) -> &mut Vec<Value> {
        match self.get_mut(handle) {
            Object::Vector(elements) => elements,
            _ => unreachable!("vector handle does not point at a vector"),
        }
    }

    pub fn procedure(&self, handle: Handle) -> &Procedure {
        match self.get(handle) {
            Object::Procedure(procedure) => procedure,
            _ => unreachable!("procedure handle does not point at a procedure"),
        }
    }

    pub fn input_port_mut(&mut self, handle: Handle) -> &mut Port {
        match self.get_mut(handle) {
            Object::InputPort(port) => port,
            _ => unreachable!("input port handle does not point at an input port"),
        }
    }

    pub fn output_port_mut(&mut self, handle: Handle) -> &mut Port {
        match self.get_mut(handle) {
            Object::OutputPort(port) => port,
            _ => unreachable!("output port handle does not point at an output port"),
        }
    }

    /// Stop-the-world mark-sweep. Marks everything reachable from `roots`
    /// with an explicit worklist (no native recursion, so list depth cannot
    /// overflow the host stack), then sweeps every unmarked slot. Dropping a
    /// swept object releases whatever it owns: string and vector storage,
    /// and the file behind a port.
    pub fn collect(&mut self, roots: impl IntoIterator<Item = Handle>) -> GcStats {
        let mut pending: Vec<Handle> = roots.into_iter().collect();

        while let Some(handle) = pending.pop() {
            let slot = &mut self.slots[handle.index()];
            if slot.mark {
                continue;
            }
            slot.mark = true;
            match slot.object.as_ref().expect("dangling heap handle") {
                Object::Str(_) | Object::InputPort(_) | Object::OutputPort(_) => {}
                Object::Pair(car, cdr) => {
                    trace_value(&mut pending, *car);
                    trace_value(&mut pending, *cdr);
                }
                Object::Vector(elements) => {
                    for element in elements {
                        trace_value(&mut pending, *element);
                    }
                }
                Object::Procedure(Procedure::Native(_)) => {}
                Object::Procedure(Procedure::Closure { body, env, .. }) => {
                    trace_value(&mut pending, *body);
                    pending.push(*env);
                }
                Object::Env(frame) => {
                    if let Some(parent) = frame.parent {
                        pending.push(parent);
                    }
                    for value in frame.values.values() {
                        trace_value(&mut pending, *value);
                    }
                }
            }
        }

        let mut collected = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.mark {
                slot.mark = false;
            } else if slot.object.is_some() {
                slot.object = None;
                self.free.push(index as u32);
                collected += 1;
            }
        }

        let remaining = self.live();
        debug!(collected, remaining, "garbage collected");
        GcStats {
            collected,
            remaining,
        }
    }
}

fn trace_value(pending: &mut Vec<Handle>, value: Value) {
    if let Some(handle) = value.handle() {
        pending.push(handle);
    }
}
