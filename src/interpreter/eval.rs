//! The tree-walking evaluator. Tail positions are handled by rewriting the
//! `(expr, env)` pair of the main loop instead of recursing, so iterative
//! procedures run in constant native stack.

use phf::phf_map;

use crate::interpreter::builtins;
use crate::interpreter::env;
use crate::interpreter::error::RuntimeError;
use crate::interpreter::heap::{Handle, Object, Procedure};
use crate::interpreter::symbol::Sym;
use crate::interpreter::value::Value;
use crate::interpreter::Interpreter;
use crate::runtime_error;

/// Special forms are recognized by name before any operand is evaluated.
/// They are not first-class values and cannot be shadowed, so procedures are
/// always applied to already-evaluated arguments.
#[derive(Copy, Clone, PartialEq, Debug)]
enum SpecialForm {
    Quote,
    Lambda,
    If,
    Set,
    Cond,
    Case,
    And,
    Or,
    Let,
    LetStar,
    Begin,
    Define,
    Quasiquote,
}

static SPECIAL_FORMS: phf::Map<&'static str, SpecialForm> = phf_map! {
    "quote" => SpecialForm::Quote,
    "lambda" => SpecialForm::Lambda,
    "if" => SpecialForm::If,
    "set!" => SpecialForm::Set,
    "cond" => SpecialForm::Cond,
    "case" => SpecialForm::Case,
    "and" => SpecialForm::And,
    "or" => SpecialForm::Or,
    "let" => SpecialForm::Let,
    "let*" => SpecialForm::LetStar,
    "begin" => SpecialForm::Begin,
    "define" => SpecialForm::Define,
    "quasiquote" => SpecialForm::Quasiquote,
};

/// What a dispatched form wants the evaluator loop to do next: either a
/// finished value, or a sub-form to restart the loop on (a tail position).
enum Flow {
    Done(Value),
    Tail(Value, Handle),
}

pub fn eval(interp: &mut Interpreter, expr: Value, env: Handle) -> Result<Value, RuntimeError> {
    let mut expr = expr;
    let mut env = env;
    loop {
        match expr {
            Value::Symbol(name) => {
                return match env::get(&interp.heap, env, name) {
                    Some(value) => Ok(value),
                    None => runtime_error!(
                        "reference to undefined identifier: {}",
                        interp.symbols.name(name)
                    ),
                };
            }
            Value::Pair(handle) => {
                let (head, operands) = interp.heap.pair(handle);

                let form = match head {
                    Value::Symbol(name) => SPECIAL_FORMS.get(interp.symbols.name(name)).copied(),
                    _ => None,
                };
                let flow = match form {
                    Some(form) => special(interp, form, operands, env)?,
                    None => {
                        let procedure = eval(interp, head, env)?;
                        let args = eval_operands(interp, operands, env)?;
                        tail_apply(interp, procedure, args)?
                    }
                };
                match flow {
                    Flow::Done(value) => return Ok(value),
                    Flow::Tail(next_expr, next_env) => {
                        expr = next_expr;
                        env = next_env;
                    }
                }
            }
            Value::Nil => runtime_error!("missing procedure in expression"),
            _ => return Ok(expr),
        }
    }
}

/// Apply outside a tail position, on behalf of built-ins such as `apply`.
pub fn apply(
    interp: &mut Interpreter,
    procedure: Value,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    match tail_apply(interp, procedure, args)? {
        Flow::Done(value) => Ok(value),
        Flow::Tail(expr, env) => eval(interp, expr, env),
    }
}

fn eval_operands(
    interp: &mut Interpreter,
    operands: Value,
    env: Handle,
) -> Result<Vec<Value>, RuntimeError> {
    let mut args = Vec::new();
    for operand in interp.list_elements(operands)? {
        args.push(eval(interp, operand, env)?);
    }
    Ok(args)
}

fn tail_apply(
    interp: &mut Interpreter,
    procedure: Value,
    args: Vec<Value>,
) -> Result<Flow, RuntimeError> {
    let handle = match procedure {
        Value::Procedure(handle) => handle,
        other => runtime_error!("procedure expected, got {}", other.type_name()),
    };
    match interp.heap.procedure(handle) {
        Procedure::Native(name) => {
            let name = *name;
            Ok(Flow::Done(builtins::primitive(interp, name, &args)?))
        }
        Procedure::Closure {
            formals,
            body,
            env: captured,
        } => {
            let formals = formals.clone();
            let body = *body;
            let captured = *captured;
            if formals.len() != args.len() {
                runtime_error!(
                    "Must supply exactly {} arguments to function, got {}",
                    formals.len(),
                    args.len()
                );
            }
            let child = env::new_child(&mut interp.heap, captured);
            for (name, value) in formals.into_iter().zip(args) {
                env::define(&mut interp.heap, child, name, value);
            }
            let forms = interp.list_elements(body)?;
            eval_sequence(interp, &forms, child)
        }
    }
}

/// Evaluate all but the last form, then hand the last one back as the tail.
fn eval_sequence(
    interp: &mut Interpreter,
    forms: &[Value],
    env: Handle,
) -> Result<Flow, RuntimeError> {
    match forms.split_last() {
        None => Ok(Flow::Done(Value::Unspecified)),
        Some((&last, init)) => {
            for &form in init {
                eval(interp, form, env)?;
            }
            Ok(Flow::Tail(last, env))
        }
    }
}

fn special(
    interp: &mut Interpreter,
    form: SpecialForm,
    operands: Value,
    env: Handle,
) -> Result<Flow, RuntimeError> {
    match form {
        SpecialForm::Quote => {
            let args = interp.list_elements(operands)?;
            if args.len() != 1 {
                runtime_error!("quote expects a single datum");
            }
            Ok(Flow::Done(args[0]))
        }
        SpecialForm::Lambda => {
            let (formals, body) = match operands {
                Value::Pair(handle) => interp.heap.pair(handle),
                _ => runtime_error!("Must provide at least two arguments to lambda"),
            };
            Ok(Flow::Done(make_closure(interp, formals, body, env)?))
        }
        SpecialForm::If => special_if(interp, operands, env),
        SpecialForm::Set => special_set(interp, operands, env),
        SpecialForm::Cond => special_cond(interp, operands, env),
        SpecialForm::Case => special_case(interp, operands, env),
        SpecialForm::And => special_and(interp, operands, env),
        SpecialForm::Or => special_or(interp, operands, env),
        SpecialForm::Let => special_let(interp, operands, env, false),
        SpecialForm::LetStar => special_let(interp, operands, env, true),
        SpecialForm::Begin => {
            let forms = interp.list_elements(operands)?;
            eval_sequence(interp, &forms, env)
        }
        SpecialForm::Define => special_define(interp, operands, env),
        SpecialForm::Quasiquote => {
            let args = interp.list_elements(operands)?;
            if args.len() != 1 {
                runtime_error!("quasiquote expects a single template");
            }
            Ok(Flow::Done(quasiquote(interp, args[0], env)?))
        }
    }
}

fn special_if(interp: &mut Interpreter, operands: Value, env: Handle) -> Result<Flow, RuntimeError> {
    let forms = interp.list_elements(operands)?;
    if forms.len() < 2 || forms.len() > 3 {
        runtime_error!("if expects a test and one or two branches");
    }
    let test = eval(interp, forms[0], env)?;
    if test.is_false() {
        match forms.get(2) {
            Some(&alternate) => Ok(Flow::Tail(alternate, env)),
            None => Ok(Flow::Done(Value::Unspecified)),
        }
    } else {
        Ok(Flow::Tail(forms[1], env))
    }
}

fn special_set(
    interp: &mut Interpreter,
    operands: Value,
    env: Handle,
) -> Result<Flow, RuntimeError> {
    let forms = interp.list_elements(operands)?;
    if forms.len() != 2 {
        runtime_error!("set! expects a name and an expression");
    }
    let name = symbol_or_error(forms[0])?;
    let value = eval(interp, forms[1], env)?;
    if !env::set(&mut interp.heap, env, name, value) {
        runtime_error!("No binding for {} in any scope.", interp.symbols.name(name));
    }
    Ok(Flow::Done(Value::Unspecified))
}

fn special_define(
    interp: &mut Interpreter,
    operands: Value,
    env: Handle,
) -> Result<Flow, RuntimeError> {
    let (target, rest) = match operands {
        Value::Pair(handle) => interp.heap.pair(handle),
        _ => runtime_error!("Must provide at least two arguments to define"),
    };
    match target {
        Value::Symbol(name) => {
            let exprs = interp.list_elements(rest)?;
            if exprs.len() != 1 {
                runtime_error!("define expects a single expression after the name");
            }
            let value = eval(interp, exprs[0], env)?;
            env::define(&mut interp.heap, env, name, value);
        }
        // (define (name formals...) body...)
        Value::Pair(handle) => {
            let (name_value, formals) = interp.heap.pair(handle);
            let name = symbol_or_error(name_value)?;
            let procedure = make_closure(interp, formals, rest, env)?;
            env::define(&mut interp.heap, env, name, procedure);
        }
        _ => runtime_error!("symbol or pair expected as parameter 1 to define"),
    }
    Ok(Flow::Done(Value::Unspecified))
}

fn make_closure(
    interp: &mut Interpreter,
    formals: Value,
    body: Value,
    env: Handle,
) -> Result<Value, RuntimeError> {
    let mut names = Vec::new();
    for formal in interp.list_elements(formals)? {
        names.push(symbol_or_error(formal)?);
    }
    if interp.list_elements(body)?.is_empty() {
        runtime_error!("No expression in body");
    }
    let handle = interp.heap.insert(Object::Procedure(Procedure::Closure {
        formals: names,
        body,
        env,
    }));
    Ok(Value::Procedure(handle))
}

fn special_let(
    interp: &mut Interpreter,
    operands: Value,
    env: Handle,
    sequential: bool,
) -> Result<Flow, RuntimeError> {
    let (bindings, body) = match operands {
        Value::Pair(handle) => interp.heap.pair(handle),
        _ => runtime_error!("Must provide at least two arguments to let"),
    };
    let body_forms = interp.list_elements(body)?;
    if body_forms.is_empty() {
        runtime_error!("No expression in body");
    }
    let child = env::new_child(&mut interp.heap, env);
    for binding in interp.list_elements(bindings)? {
        let parts = interp.list_elements(binding)?;
        if parts.len() != 2 {
            runtime_error!("let binding must be a (name expression) pair");
        }
        let name = symbol_or_error(parts[0])?;
        // let* sees the bindings made so far; let evaluates in the outer scope
        let init_env = if sequential { child } else { env };
        let value = eval(interp, parts[1], init_env)?;
        env::define(&mut interp.heap, child, name, value);
    }
    eval_sequence(interp, &body_forms, child)
}

fn special_cond(
    interp: &mut Interpreter,
    operands: Value,
    env: Handle,
) -> Result<Flow, RuntimeError> {
    for clause in interp.list_elements(operands)? {
        let parts = interp.list_elements(clause)?;
        let (&test, exprs) = match parts.split_first() {
            Some(split) => split,
            None => runtime_error!("cond clause must contain a test"),
        };
        let value = if is_else(interp, test) {
            Value::Boolean(true)
        } else {
            eval(interp, test, env)?
        };
        if value.is_false() {
            continue;
        }
        // a clause with no expressions yields the test's value
        return if exprs.is_empty() {
            Ok(Flow::Done(value))
        } else {
            eval_sequence(interp, exprs, env)
        };
    }
    Ok(Flow::Done(Value::Unspecified))
}

fn special_case(
    interp: &mut Interpreter,
    operands: Value,
    env: Handle,
) -> Result<Flow, RuntimeError> {
    let parts = interp.list_elements(operands)?;
    let (&key_expr, clauses) = match parts.split_first() {
        Some(split) => split,
        None => runtime_error!("case expects a key expression"),
    };
    let key = eval(interp, key_expr, env)?;
    for &clause in clauses {
        let clause_parts = interp.list_elements(clause)?;
        let (&datums, exprs) = match clause_parts.split_first() {
            Some(split) => split,
            None => runtime_error!("case clause must contain a datum list"),
        };
        let matched = if is_else(interp, datums) {
            true
        } else {
            let candidates = interp.list_elements(datums)?;
            candidates
                .iter()
                .any(|&datum| builtins::eqv(interp, key, datum))
        };
        if matched {
            return eval_sequence(interp, exprs, env);
        }
    }
    Ok(Flow::Done(Value::Unspecified))
}

fn special_and(
    interp: &mut Interpreter,
    operands: Value,
    env: Handle,
) -> Result<Flow, RuntimeError> {
    let forms = interp.list_elements(operands)?;
    match forms.split_last() {
        None => Ok(Flow::Done(Value::Boolean(true))),
        Some((&last, init)) => {
            for &form in init {
                let value = eval(interp, form, env)?;
                if value.is_false() {
                    return Ok(Flow::Done(value));
                }
            }
            Ok(Flow::Tail(last, env))
        }
    }
}

fn special_or(interp: &mut Interpreter, operands: Value, env: Handle) -> Result<Flow, RuntimeError> {
    let forms = interp.list_elements(operands)?;
    match forms.split_last() {
        None => Ok(Flow::Done(Value::Boolean(false))),
        Some((&last, init)) => {
            for &form in init {
                let value = eval(interp, form, env)?;
                if value.is_true() {
                    return Ok(Flow::Done(value));
                }
            }
            Ok(Flow::Tail(last, env))
        }
    }
}

/// Structural copy of a template: `(unquote E)` becomes the evaluated `E`,
/// `(unquote-splicing E)` must evaluate to a proper list whose elements are
/// spliced into the surrounding spine.
fn quasiquote(
    interp: &mut Interpreter,
    template: Value,
    env: Handle,
) -> Result<Value, RuntimeError> {
    let handle = match template {
        Value::Pair(handle) => handle,
        _ => return Ok(template),
    };

    if let Some(expr) = unquote_form(interp, template, "unquote")? {
        return eval(interp, expr, env);
    }

    let (head, rest) = interp.heap.pair(handle);

    if let Some(expr) = unquote_form(interp, head, "unquote-splicing")? {
        let spliced = eval(interp, expr, env)?;
        let items = interp
            .list_elements(spliced)
            .map_err(|_| RuntimeError {
                message: "unquote-splicing expects a list".to_string(),
            })?;
        let tail = quasiquote(interp, rest, env)?;
        return Ok(interp.list_with_tail(items, tail));
    }

    let new_head = quasiquote(interp, head, env)?;
    let new_rest = quasiquote(interp, rest, env)?;
    Ok(interp.heap.cons(new_head, new_rest))
}

fn unquote_form(
    interp: &Interpreter,
    value: Value,
    name: &str,
) -> Result<Option<Value>, RuntimeError> {
    if let Value::Pair(handle) = value {
        let (head, rest) = interp.heap.pair(handle);
        if let Value::Symbol(sym) = head {
            if interp.symbols.name(sym) == name {
                let args = interp.list_elements(rest)?;
                if args.len() != 1 {
                    runtime_error!("{} expects a single expression", name);
                }
                return Ok(Some(args[0]));
            }
        }
    }
    Ok(None)
}

fn is_else(interp: &Interpreter, value: Value) -> bool {
    matches!(value, Value::Symbol(sym) if interp.symbols.name(sym) == "else")
}

fn symbol_or_error(value: Value) -> Result<Sym, RuntimeError> {
    match value {
        Value::Symbol(sym) => Ok(sym),
        other => runtime_error!("symbol expected, got {}", other.type_name()),
    }
}
