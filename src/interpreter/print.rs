//! External representations. `write` produces re-readable text (quoted
//! strings, `#\` characters); `display` produces human output. Values do
//! not know their heap, so printing goes through a borrowing adapter.

use std::fmt;

use crate::interpreter::heap::Procedure;
use crate::interpreter::value::Value;
use crate::interpreter::Interpreter;

pub struct Printed<'a> {
    pub interp: &'a Interpreter,
    pub value: Value,
    /// `display` semantics when true, `write` semantics when false.
    pub human: bool,
}

impl fmt::Display for Printed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_value(f, self.interp, self.value, self.human)
    }
}

fn write_value(
    f: &mut fmt::Formatter,
    interp: &Interpreter,
    value: Value,
    human: bool,
) -> fmt::Result {
    match value {
        Value::Nil => write!(f, "()"),
        Value::Unspecified => write!(f, "#<unspecified>"),
        Value::Boolean(b) => write!(f, "#{}", if b { "t" } else { "f" }),
        Value::Number(n) => write!(f, "{}", n),
        Value::Character(c) if human => write!(f, "{}", c),
        Value::Character(' ') => write!(f, "#\\space"),
        Value::Character('\n') => write!(f, "#\\newline"),
        Value::Character(c) => write!(f, "#\\{}", c),
        Value::Symbol(sym) => write!(f, "{}", interp.symbols.name(sym)),
        Value::Str(handle) => {
            let string = interp.heap.string(handle);
            if human {
                write!(f, "{}", string)
            } else {
                write!(f, "\"")?;
                for c in string.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        _ => write!(f, "{}", c)?,
                    }
                }
                write!(f, "\"")
            }
        }
        Value::Pair(handle) => {
            // flatten the spine; a non-pair tail prints dotted
            write!(f, "(")?;
            let mut handle = handle;
            loop {
                let (car, cdr) = interp.heap.pair(handle);
                write_value(f, interp, car, human)?;
                match cdr {
                    Value::Nil => break,
                    Value::Pair(next) => {
                        write!(f, " ")?;
                        handle = next;
                    }
                    other => {
                        write!(f, " . ")?;
                        write_value(f, interp, other, human)?;
                        break;
                    }
                }
            }
            write!(f, ")")
        }
        Value::Vector(handle) => {
            write!(f, "#(")?;
            for (i, &element) in interp.heap.vector(handle).iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write_value(f, interp, element, human)?;
            }
            write!(f, ")")
        }
        Value::Procedure(handle) => match interp.heap.procedure(handle) {
            Procedure::Native(name) => write!(f, "#<procedure:{}>", name),
            Procedure::Closure { .. } => write!(f, "#<procedure>"),
        },
        Value::InputPort(handle) => write!(f, "#<input port {}>", handle.index()),
        Value::OutputPort(handle) => write!(f, "#<output port {}>", handle.index()),
    }
}
