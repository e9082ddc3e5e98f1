//! The interpreter facade: one `Interpreter` owns the heap, the symbol
//! table, the root environment and the standard ports, and drives the
//! read-eval-collect cycle for top-level code.

pub mod builtins;
pub mod env;
pub mod error;
pub mod eval;
pub mod heap;
pub mod print;
pub mod symbol;
pub mod value;

#[cfg(test)]
mod tests;

use std::fs;

use crate::reader::parser::Node;
use crate::reader::{lexer, parser};
use crate::runtime_error;

use self::error::RuntimeError;
use self::heap::{GcStats, Handle, Heap, Object, Port, Procedure};
use self::print::Printed;
use self::symbol::SymbolTable;
use self::value::Value;

pub struct Interpreter {
    pub heap: Heap,
    pub symbols: SymbolTable,
    root: Handle,
    pub(crate) stdin_port: Handle,
    pub(crate) stdout_port: Handle,
}

impl Interpreter {
    pub fn new() -> Interpreter {
        let mut heap = Heap::new();
        let mut symbols = SymbolTable::new();
        let root = env::new_root(&mut heap);
        for &name in builtins::NAMES {
            let procedure =
                Value::Procedure(heap.insert(Object::Procedure(Procedure::Native(name))));
            env::define(&mut heap, root, symbols.intern(name), procedure);
        }
        let stdin_port = heap.insert(Object::InputPort(Port::Stdin));
        let stdout_port = heap.insert(Object::OutputPort(Port::Stdout));
        Interpreter {
            heap,
            symbols,
            root,
            stdin_port,
            stdout_port,
        }
    }

    pub fn root(&self) -> Handle {
        self.root
    }

    /// Read source text into heap-allocated data, ready to evaluate (or to
    /// hand to user code: the datum tree is ordinary language data).
    pub fn parse(&mut self, source: &str) -> Result<Vec<Value>, RuntimeError> {
        let tokens = match lexer::tokenize(source) {
            Ok(tokens) => tokens,
            Err(error) => runtime_error!("{}", error),
        };
        let nodes = match parser::parse(&tokens) {
            Ok(nodes) => nodes,
            Err(error) => runtime_error!("{}", error),
        };
        Ok(nodes
            .iter()
            .map(|node| self.value_from_node(node))
            .collect())
    }

    fn value_from_node(&mut self, node: &Node) -> Value {
        match node {
            Node::Identifier(name) => Value::Symbol(self.symbols.intern(name)),
            Node::Boolean(b) => Value::Boolean(*b),
            Node::Character(c) => Value::Character(*c),
            Node::Number(n) => Value::Number(*n),
            Node::String(s) => {
                let string = s.clone();
                self.heap.new_string(string)
            }
            Node::List(items) => {
                let values = self.values_from_nodes(items);
                self.list_from_vec(values)
            }
            Node::DottedList(items, tail) => {
                let values = self.values_from_nodes(items);
                let tail = self.value_from_node(tail);
                self.list_with_tail(values, tail)
            }
            Node::Vector(items) => {
                let values = self.values_from_nodes(items);
                self.heap.new_vector(values)
            }
        }
    }

    fn values_from_nodes(&mut self, nodes: &[Node]) -> Vec<Value> {
        nodes
            .iter()
            .map(|node| self.value_from_node(node))
            .collect()
    }

    /// Evaluate a single form in the root environment.
    pub fn eval(&mut self, form: Value) -> Result<Value, RuntimeError> {
        eval::eval(self, form, self.root)
    }

    /// Evaluate every top-level form in `source`, handing each result to
    /// `sink` before the safe-point collection that follows it. Forms not
    /// yet evaluated are kept as collection roots. On error the collection
    /// still runs before the error propagates to the caller.
    pub fn run_with<F>(&mut self, source: &str, mut sink: F) -> Result<(), RuntimeError>
    where
        F: FnMut(&Interpreter, Value),
    {
        let forms = self.parse(source)?;
        for (index, &form) in forms.iter().enumerate() {
            match self.eval(form) {
                Ok(value) => {
                    sink(self, value);
                    self.collect_with(&forms[index + 1..], &[value]);
                }
                Err(error) => {
                    self.collect_with(&forms[index + 1..], &[]);
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    /// Evaluate `source` and return the value of its last top-level form.
    pub fn run(&mut self, source: &str) -> Result<Value, RuntimeError> {
        let mut last = Value::Unspecified;
        self.run_with(source, |_, value| last = value)?;
        Ok(last)
    }

    /// Read and evaluate a file without printing and without collecting:
    /// this runs nested inside an evaluation (the `load` built-in), where
    /// safe points do not occur.
    pub fn load_file(&mut self, path: &str) -> Result<(), RuntimeError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(_) => runtime_error!("Error opening file {}", path),
        };
        let forms = self.parse(&source)?;
        for &form in &forms {
            self.eval(form)?;
        }
        Ok(())
    }

    /// Run a collection with only the permanent roots.
    pub fn collect(&mut self) -> GcStats {
        self.collect_with(&[], &[])
    }

    fn collect_with(&mut self, pending: &[Value], extras: &[Value]) -> GcStats {
        let roots = std::iter::once(self.root)
            .chain([self.stdin_port, self.stdout_port])
            .chain(
                pending
                    .iter()
                    .chain(extras.iter())
                    .filter_map(|value| value.handle()),
            );
        self.heap.collect(roots)
    }

    pub fn write_string(&self, value: Value) -> String {
        Printed {
            interp: self,
            value,
            human: false,
        }
        .to_string()
    }

    pub fn display_string(&self, value: Value) -> String {
        Printed {
            interp: self,
            value,
            human: true,
        }
        .to_string()
    }

    /// Collect the elements of a proper list into a host vector.
    pub fn list_elements(&self, list: Value) -> Result<Vec<Value>, RuntimeError> {
        let mut items = Vec::new();
        let mut rest = list;
        loop {
            match rest {
                Value::Nil => return Ok(items),
                Value::Pair(handle) => {
                    let (car, cdr) = self.heap.pair(handle);
                    items.push(car);
                    rest = cdr;
                }
                other => runtime_error!("proper list expected, got {}", other.type_name()),
            }
        }
    }

    pub fn list_from_vec(&mut self, items: Vec<Value>) -> Value {
        self.list_with_tail(items, Value::Nil)
    }

    pub fn list_with_tail(&mut self, items: Vec<Value>, tail: Value) -> Value {
        items
            .into_iter()
            .rev()
            .fold(tail, |tail, item| self.heap.cons(item, tail))
    }
}

impl Default for Interpreter {
    fn default() -> Interpreter {
        Interpreter::new()
    }
}
