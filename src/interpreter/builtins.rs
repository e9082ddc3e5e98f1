//! Native procedures. Every built-in shares the signature
//! `fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>` and
//! receives its arguments already evaluated; the `nth*` accessors keep the
//! 1-based numbering and diagnostics of the calling convention.

use std::fs::File;
use std::io::{self, Write as IoWrite};

use crate::interpreter::error::RuntimeError;
use crate::interpreter::eval;
use crate::interpreter::heap::{Handle, Object, Port};
use crate::interpreter::symbol::Sym;
use crate::interpreter::value::{is_whole, Value};
use crate::interpreter::Interpreter;
use crate::runtime_error;

macro_rules! builtins {
    ($(($name:literal, $function:ident)),* $(,)?) => {
        /// Names registered in the root environment at startup.
        pub const NAMES: &[&str] = &[$($name),*];

        /// Dispatch a built-in by the name it was registered under.
        pub fn primitive(
            interp: &mut Interpreter,
            name: &str,
            args: &[Value],
        ) -> Result<Value, RuntimeError> {
            match name {
                $($name => $function(interp, args),)*
                _ => runtime_error!("Unknown primitive: {}", name),
            }
        }
    };
}

builtins! {
    ("eqv?", eqv_q),
    ("eq?", eq_q),
    ("equal?", equal_q),
    ("number?", number_q),
    ("complex?", always_false),
    ("real?", number_q),
    ("rational?", always_false),
    ("integer?", integer_q),
    ("+", add),
    ("*", mul),
    ("-", sub),
    ("/", div),
    ("modulo", modulo),
    ("exact?", exact_q),
    ("inexact?", inexact_q),
    ("=", num_equal),
    ("<", less),
    (">", greater),
    ("<=", less_equal),
    (">=", greater_equal),
    ("zero?", zero_q),
    ("positive?", positive_q),
    ("negative?", negative_q),
    ("odd?", odd_q),
    ("even?", even_q),
    ("min", min),
    ("max", max),
    ("not", not),
    ("boolean?", boolean_q),
    ("pair?", pair_q),
    ("cons", cons),
    ("car", car),
    ("cdr", cdr),
    ("set-car!", set_car),
    ("set-cdr!", set_cdr),
    ("null?", null_q),
    ("list?", list_q),
    ("list", list),
    ("length", length),
    ("append", append),
    ("char?", char_q),
    ("char->integer", char_to_integer),
    ("integer->char", integer_to_char),
    ("string?", string_q),
    ("make-string", make_string),
    ("string-length", string_length),
    ("string-ref", string_ref),
    ("string-set!", string_set),
    ("vector?", vector_q),
    ("make-vector", make_vector),
    ("vector", vector),
    ("vector-length", vector_length),
    ("vector-ref", vector_ref),
    ("vector->list", vector_to_list),
    ("list->vector", list_to_vector),
    ("vector-set!", vector_set),
    ("vector-fill!", vector_fill),
    ("symbol?", symbol_q),
    ("symbol->string", symbol_to_string),
    ("string->symbol", string_to_symbol),
    ("procedure?", procedure_q),
    ("apply", apply),
    ("close-input-port", close_input_port),
    ("close-output-port", close_output_port),
    ("open-input-file", open_input_file),
    ("open-output-file", open_output_file),
    ("input-port?", input_port_q),
    ("output-port?", output_port_q),
    ("current-input-port", current_input_port),
    ("current-output-port", current_output_port),
    ("write", write),
    ("display", display),
    ("newline", newline),
    ("write-char", write_char),
    ("load", load),
    ("error", error),
}

// argument accessors, indexed from 1 for the first argument

fn nth(args: &[Value], n: usize) -> Result<Value, RuntimeError> {
    match args.get(n - 1) {
        Some(&value) => Ok(value),
        None => runtime_error!("Too few parameters passed ({} expected)", n),
    }
}

fn nth_optional(args: &[Value], n: usize) -> Option<Value> {
    args.get(n - 1).copied()
}

fn nth_number(args: &[Value], n: usize) -> Result<f64, RuntimeError> {
    match nth(args, n)? {
        Value::Number(x) => Ok(x),
        other => runtime_error!("number expected, got {}", other.type_name()),
    }
}

fn nth_integer(args: &[Value], n: usize) -> Result<i64, RuntimeError> {
    let x = nth_number(args, n)?;
    if !is_whole(x) {
        runtime_error!("Not an integer");
    }
    Ok(x as i64)
}

fn nth_pair(args: &[Value], n: usize) -> Result<Handle, RuntimeError> {
    match nth(args, n)? {
        Value::Pair(handle) => Ok(handle),
        other => runtime_error!("pair expected, got {}", other.type_name()),
    }
}

fn nth_string(args: &[Value], n: usize) -> Result<Handle, RuntimeError> {
    match nth(args, n)? {
        Value::Str(handle) => Ok(handle),
        other => runtime_error!("string expected, got {}", other.type_name()),
    }
}

fn nth_vector(args: &[Value], n: usize) -> Result<Handle, RuntimeError> {
    match nth(args, n)? {
        Value::Vector(handle) => Ok(handle),
        other => runtime_error!("vector expected, got {}", other.type_name()),
    }
}

fn nth_symbol(args: &[Value], n: usize) -> Result<Sym, RuntimeError> {
    match nth(args, n)? {
        Value::Symbol(sym) => Ok(sym),
        other => runtime_error!("symbol expected, got {}", other.type_name()),
    }
}

fn nth_character(args: &[Value], n: usize) -> Result<char, RuntimeError> {
    match nth(args, n)? {
        Value::Character(c) => Ok(c),
        other => runtime_error!("character expected, got {}", other.type_name()),
    }
}

fn nth_input_port(args: &[Value], n: usize) -> Result<Handle, RuntimeError> {
    match nth(args, n)? {
        Value::InputPort(handle) => Ok(handle),
        other => runtime_error!("input port expected, got {}", other.type_name()),
    }
}

fn type_predicate(args: &[Value], test: fn(Value) -> bool) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(test(nth(args, 1)?)))
}

// equivalence

/// `eq?`: content equality for atoms, handle identity for heap objects.
pub fn eq(a: Value, b: Value) -> bool {
    a == b
}

/// `eqv?`: `eq?` plus string comparison by content.
pub fn eqv(interp: &Interpreter, a: Value, b: Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => interp.heap.string(x) == interp.heap.string(y),
        _ => false,
    }
}

/// `equal?`: structural recursion into pairs and vectors. May diverge on
/// cyclic structure.
pub fn equal(interp: &Interpreter, a: Value, b: Value) -> bool {
    if eqv(interp, a, b) {
        return true;
    }
    match (a, b) {
        (Value::Pair(x), Value::Pair(y)) => {
            let (x_car, x_cdr) = interp.heap.pair(x);
            let (y_car, y_cdr) = interp.heap.pair(y);
            equal(interp, x_car, y_car) && equal(interp, x_cdr, y_cdr)
        }
        (Value::Vector(x), Value::Vector(y)) => {
            let xs = interp.heap.vector(x);
            let ys = interp.heap.vector(y);
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys.iter())
                    .all(|(&a, &b)| equal(interp, a, b))
        }
        _ => false,
    }
}

fn eq_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(eq(nth(args, 1)?, nth(args, 2)?)))
}

fn eqv_q(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(eqv(interp, nth(args, 1)?, nth(args, 2)?)))
}

fn equal_q(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(equal(interp, nth(args, 1)?, nth(args, 2)?)))
}

// numbers

fn number_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Number(_)))
}

fn integer_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Number(n) if is_whole(n)))
}

/// Stands in for the numeric predicates that can never hold with a
/// doubles-only tower (`complex?`, `rational?`).
fn always_false(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    nth(args, 1)?;
    Ok(Value::Boolean(false))
}

fn exact_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    nth_number(args, 1)?;
    Ok(Value::Boolean(false))
}

fn inexact_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    nth_number(args, 1)?;
    Ok(Value::Boolean(true))
}

fn add(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut sum = 0.0;
    for n in 1..=args.len() {
        sum += nth_number(args, n)?;
    }
    Ok(Value::Number(sum))
}

fn mul(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut product = 1.0;
    for n in 1..=args.len() {
        product *= nth_number(args, n)?;
    }
    Ok(Value::Number(product))
}

fn sub(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let first = nth_number(args, 1)?;
    if args.len() == 1 {
        return Ok(Value::Number(-first));
    }
    let mut result = first;
    for n in 2..=args.len() {
        result -= nth_number(args, n)?;
    }
    Ok(Value::Number(result))
}

fn div(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let first = nth_number(args, 1)?;
    if args.len() == 1 {
        return Ok(Value::Number(1.0 / first));
    }
    let mut result = first;
    for n in 2..=args.len() {
        result /= nth_number(args, n)?;
    }
    Ok(Value::Number(result))
}

fn modulo(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let a = nth_number(args, 1)?;
    let b = nth_number(args, 2)?;
    Ok(Value::Number(a % b))
}

fn comparison(args: &[Value], compare: fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    if args.len() < 2 {
        runtime_error!("Too few parameters passed (2 expected)");
    }
    let mut previous = nth_number(args, 1)?;
    for n in 2..=args.len() {
        let next = nth_number(args, n)?;
        if !compare(previous, next) {
            return Ok(Value::Boolean(false));
        }
        previous = next;
    }
    Ok(Value::Boolean(true))
}

fn num_equal(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    comparison(args, |a, b| a == b)
}

fn less(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    comparison(args, |a, b| a < b)
}

fn greater(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    comparison(args, |a, b| a > b)
}

fn less_equal(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    comparison(args, |a, b| a <= b)
}

fn greater_equal(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    comparison(args, |a, b| a >= b)
}

fn zero_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(nth_number(args, 1)? == 0.0))
}

fn positive_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(nth_number(args, 1)? > 0.0))
}

fn negative_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(nth_number(args, 1)? < 0.0))
}

fn odd_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(nth_integer(args, 1)? & 1 == 1))
}

fn even_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(nth_integer(args, 1)? & 1 == 0))
}

fn min(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut result = nth_number(args, 1)?;
    for n in 2..=args.len() {
        result = result.min(nth_number(args, n)?);
    }
    Ok(Value::Number(result))
}

fn max(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut result = nth_number(args, 1)?;
    for n in 2..=args.len() {
        result = result.max(nth_number(args, n)?);
    }
    Ok(Value::Number(result))
}

// booleans

fn not(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(nth(args, 1)?.is_false()))
}

fn boolean_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Boolean(_)))
}

// pairs and lists

fn pair_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Pair(_)))
}

fn null_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| v == Value::Nil)
}

fn cons(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let car = nth(args, 1)?;
    let cdr = nth(args, 2)?;
    Ok(interp.heap.cons(car, cdr))
}

fn car(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(interp.heap.pair(nth_pair(args, 1)?).0)
}

fn cdr(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(interp.heap.pair(nth_pair(args, 1)?).1)
}

fn set_car(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_pair(args, 1)?;
    let value = nth(args, 2)?;
    match interp.heap.get_mut(handle) {
        Object::Pair(car, _) => *car = value,
        _ => unreachable!("pair handle does not point at a pair"),
    }
    Ok(Value::Pair(handle))
}

fn set_cdr(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_pair(args, 1)?;
    let value = nth(args, 2)?;
    match interp.heap.get_mut(handle) {
        Object::Pair(_, cdr) => *cdr = value,
        _ => unreachable!("pair handle does not point at a pair"),
    }
    Ok(Value::Pair(handle))
}

fn list_q(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut value = nth(args, 1)?;
    loop {
        match value {
            Value::Nil => return Ok(Value::Boolean(true)),
            Value::Pair(handle) => value = interp.heap.pair(handle).1,
            _ => return Ok(Value::Boolean(false)),
        }
    }
}

fn list(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(interp.list_from_vec(args.to_vec()))
}

fn length(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut value = nth(args, 1)?;
    let mut count = 0.0;
    loop {
        match value {
            Value::Nil => return Ok(Value::Number(count)),
            Value::Pair(handle) => {
                count += 1.0;
                value = interp.heap.pair(handle).1;
            }
            other => runtime_error!("pair expected, got {}", other.type_name()),
        }
    }
}

fn append(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut items = Vec::new();
    for &arg in args {
        items.extend(interp.list_elements(arg)?);
    }
    Ok(interp.list_from_vec(items))
}

// characters

fn char_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Character(_)))
}

fn char_to_integer(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Number(nth_character(args, 1)? as u32 as f64))
}

fn integer_to_char(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let k = nth_integer(args, 1)?;
    match u32::try_from(k).ok().and_then(char::from_u32) {
        Some(c) => Ok(Value::Character(c)),
        None => runtime_error!("integer is not a valid character code"),
    }
}

// strings

fn string_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Str(_)))
}

fn make_string(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let k = nth_integer(args, 1)?;
    if k < 0 {
        runtime_error!("positive integer length required");
    }
    let fill = match nth_optional(args, 2) {
        Some(Value::Character(c)) => c,
        Some(other) => runtime_error!("character expected, got {}", other.type_name()),
        None => '\0',
    };
    let string: String = std::iter::repeat(fill).take(k as usize).collect();
    Ok(interp.heap.new_string(string))
}

fn string_length(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_string(args, 1)?;
    Ok(Value::Number(interp.heap.string(handle).chars().count() as f64))
}

fn string_ref(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_string(args, 1)?;
    let k = nth_integer(args, 2)?;
    if k < 0 {
        runtime_error!("k is not a valid index of the given string");
    }
    match interp.heap.string(handle).chars().nth(k as usize) {
        Some(c) => Ok(Value::Character(c)),
        None => runtime_error!("k is not a valid index of the given string"),
    }
}

fn string_set(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_string(args, 1)?;
    let k = nth_integer(args, 2)?;
    let c = nth_character(args, 3)?;
    if k < 0 {
        runtime_error!("invalid string index");
    }
    let string = interp.heap.string_mut(handle);
    let (start, old) = match string.char_indices().nth(k as usize) {
        Some((start, old)) => (start, old),
        None => runtime_error!("invalid string index"),
    };
    let mut buffer = [0u8; 4];
    string.replace_range(start..start + old.len_utf8(), c.encode_utf8(&mut buffer));
    Ok(Value::Str(handle))
}

// vectors

fn vector_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Vector(_)))
}

fn make_vector(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let k = nth_integer(args, 1)?;
    if k < 0 {
        runtime_error!("positive integer length required");
    }
    // without a fill, slots stay uninitialized until vector-set!
    let fill = nth_optional(args, 2).unwrap_or(Value::Unspecified);
    Ok(interp.heap.new_vector(vec![fill; k as usize]))
}

fn vector(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(interp.heap.new_vector(args.to_vec()))
}

fn vector_length(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_vector(args, 1)?;
    Ok(Value::Number(interp.heap.vector(handle).len() as f64))
}

fn vector_ref(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_vector(args, 1)?;
    let k = nth_integer(args, 2)?;
    let elements = interp.heap.vector(handle);
    if k < 0 || k as usize >= elements.len() {
        runtime_error!("Invalid vector index");
    }
    match elements[k as usize] {
        Value::Unspecified => runtime_error!("Cannot access uninitialized vector"),
        value => Ok(value),
    }
}

fn vector_set(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_vector(args, 1)?;
    let k = nth_integer(args, 2)?;
    let value = nth(args, 3)?;
    let elements = interp.heap.vector_mut(handle);
    if k < 0 || k as usize >= elements.len() {
        runtime_error!("Invalid vector index");
    }
    elements[k as usize] = value;
    Ok(value)
}

fn vector_to_list(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_vector(args, 1)?;
    let items = interp.heap.vector(handle).to_vec();
    Ok(interp.list_from_vec(items))
}

fn list_to_vector(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = interp.list_elements(nth(args, 1)?)?;
    Ok(interp.heap.new_vector(items))
}

fn vector_fill(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_vector(args, 1)?;
    let fill = nth(args, 2)?;
    for slot in interp.heap.vector_mut(handle) {
        *slot = fill;
    }
    Ok(fill)
}

// symbols

fn symbol_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Symbol(_)))
}

fn symbol_to_string(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let name = interp.symbols.name(nth_symbol(args, 1)?).to_string();
    Ok(interp.heap.new_string(name))
}

fn string_to_symbol(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let text = interp.heap.string(nth_string(args, 1)?).to_string();
    Ok(Value::Symbol(interp.symbols.intern(&text)))
}

// control

fn procedure_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::Procedure(_)))
}

/// `(apply proc arg ... args)`: the final argument is a list of the
/// remaining actual arguments.
fn apply(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    if args.len() < 2 {
        runtime_error!("Too few parameters passed (2 expected)");
    }
    let procedure = nth(args, 1)?;
    let mut call_args = args[1..args.len() - 1].to_vec();
    call_args.extend(interp.list_elements(args[args.len() - 1])?);
    eval::apply(interp, procedure, call_args)
}

// ports

fn input_port_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::InputPort(_)))
}

fn output_port_q(_interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    type_predicate(args, |v| matches!(v, Value::OutputPort(_)))
}

fn current_input_port(interp: &mut Interpreter, _args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::InputPort(interp.stdin_port))
}

fn current_output_port(interp: &mut Interpreter, _args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::OutputPort(interp.stdout_port))
}

fn open_input_file(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = interp.heap.string(nth_string(args, 1)?).to_string();
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(_) => runtime_error!("Error opening file: {}", path),
    };
    let handle = interp.heap.insert(Object::InputPort(Port::File(Some(file))));
    Ok(Value::InputPort(handle))
}

fn open_output_file(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = interp.heap.string(nth_string(args, 1)?).to_string();
    let file = match File::create(&path) {
        Ok(file) => file,
        Err(_) => runtime_error!("Error opening file: {}", path),
    };
    let handle = interp
        .heap
        .insert(Object::OutputPort(Port::File(Some(file))));
    Ok(Value::OutputPort(handle))
}

fn close_input_port(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = nth_input_port(args, 1)?;
    interp.heap.input_port_mut(handle).close();
    Ok(Value::Unspecified)
}

fn close_output_port(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let handle = match nth(args, 1)? {
        Value::OutputPort(handle) => handle,
        other => runtime_error!("output port expected, got {}", other.type_name()),
    };
    interp.heap.output_port_mut(handle).close();
    Ok(Value::Unspecified)
}

/// The output port named at argument `n`, defaulting to the current output
/// port when the argument is absent.
fn output_port(interp: &Interpreter, args: &[Value], n: usize) -> Result<Handle, RuntimeError> {
    match nth_optional(args, n) {
        Some(Value::OutputPort(handle)) => Ok(handle),
        Some(other) => runtime_error!("output port expected, got {}", other.type_name()),
        None => Ok(interp.stdout_port),
    }
}

fn port_write(interp: &mut Interpreter, port: Handle, text: &str) -> Result<(), RuntimeError> {
    match interp.heap.output_port_mut(port) {
        Port::Stdout => {
            print!("{}", text);
            io::stdout().flush().ok();
            Ok(())
        }
        Port::File(Some(file)) => match file.write_all(text.as_bytes()) {
            Ok(()) => Ok(()),
            Err(error) => runtime_error!("Error writing to port: {}", error),
        },
        Port::File(None) => runtime_error!("port is closed"),
        Port::Stdin => unreachable!("output port backed by stdin"),
    }
}

fn write(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let value = nth(args, 1)?;
    let port = output_port(interp, args, 2)?;
    let text = interp.write_string(value);
    port_write(interp, port, &text)?;
    Ok(Value::Unspecified)
}

fn display(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let value = nth(args, 1)?;
    let port = output_port(interp, args, 2)?;
    let text = interp.display_string(value);
    port_write(interp, port, &text)?;
    Ok(Value::Unspecified)
}

fn newline(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let port = output_port(interp, args, 1)?;
    port_write(interp, port, "\n")?;
    Ok(Value::Unspecified)
}

fn write_char(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let c = nth_character(args, 1)?;
    let port = output_port(interp, args, 2)?;
    port_write(interp, port, c.encode_utf8(&mut [0u8; 4]))?;
    Ok(Value::Unspecified)
}

// system interface

fn load(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let path = interp.heap.string(nth_string(args, 1)?).to_string();
    interp.load_file(&path)?;
    Ok(Value::Boolean(true))
}

fn error(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let first = nth(args, 1)?;
    let mut message = interp.display_string(first);
    for &extra in &args[1..] {
        message.push(' ');
        message.push_str(&interp.display_string(extra));
    }
    Err(RuntimeError { message })
}
