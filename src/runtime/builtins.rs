//! The core command library.
//!
//! Stack effects are written `( before -- after )`. Conditions use
//! [`Value::is_truthy`]; control commands schedule work on the process's
//! operations stack instead of recursing.

use super::commands::Commands;
use super::process::Process;
use super::runtime_error::{ErrorKind, RuntimeError, type_error, unbound};
use super::scheduler::Fork;
use crate::lang::{Instr, Program, Value};

/// Stack, arithmetic, scope, time, control and process commands.
pub fn core() -> Commands {
    Commands::new()
        // Stack
        .with("dup", dup)
        .with("drop", |p: &mut Process| p.pop().map(|_| ()))
        .with("swap", swap)
        .with("over", over)
        .with("rot", rot)
        .with("clear", |p: &mut Process| {
            p.stack_mut().clear();
            Ok(())
        })
        .with("depth", |p: &mut Process| {
            let depth = p.stack().len() as i64;
            p.push(Value::Integer(depth));
            Ok(())
        })
        // Arithmetic
        .with("add", |p: &mut Process| {
            numeric_binop(p, i64::checked_add, |a, b| a + b, "add")
        })
        .with("sub", |p: &mut Process| {
            numeric_binop(p, i64::checked_sub, |a, b| a - b, "subtract")
        })
        .with("mul", |p: &mut Process| {
            numeric_binop(p, i64::checked_mul, |a, b| a * b, "multiply")
        })
        .with("div", div)
        .with("mod", modulo)
        .with("neg", neg)
        .with("abs", abs)
        .with("min", |p: &mut Process| {
            numeric_binop(p, |a, b| Some(a.min(b)), f64::min, "min")
        })
        .with("max", |p: &mut Process| {
            numeric_binop(p, |a, b| Some(a.max(b)), f64::max, "max")
        })
        .with("eq", |p: &mut Process| {
            let b = p.pop()?;
            let a = p.pop()?;
            p.push(Value::Bool(a == b));
            Ok(())
        })
        .with("lt", |p: &mut Process| numeric_compare(p, |a, b| a < b))
        .with("gt", |p: &mut Process| numeric_compare(p, |a, b| a > b))
        .with("not", |p: &mut Process| {
            let a = p.pop()?;
            p.push(Value::Bool(!a.is_truthy()));
            Ok(())
        })
        .alias("+", "add")
        .alias("-", "sub")
        .alias("*", "mul")
        .alias("/", "div")
        .alias("%", "mod")
        .alias("=", "eq")
        .alias("<", "lt")
        .alias(">", "gt")
        // Pitch and pattern helpers
        .with("mtof", mtof)
        .with("wrap", wrap)
        .with("len", len)
        .with("nth", nth)
        // Scope
        .with("let", |p: &mut Process| {
            let (name, value) = pop_binding(p)?;
            p.context().declare(&name, value);
            Ok(())
        })
        .with("set", |p: &mut Process| {
            let (name, value) = pop_binding(p)?;
            p.context().assign(&name, value)
        })
        .with("global", |p: &mut Process| {
            let (name, value) = pop_binding(p)?;
            p.context().set(&name, value);
            Ok(())
        })
        .with("get", |p: &mut Process| {
            let name = p.pop_string()?;
            let value = p.context().get(&name).ok_or_else(|| unbound(&name))?;
            p.push(value);
            Ok(())
        })
        // Time
        .with("wait", |p: &mut Process| {
            let beats = p.pop_number()?;
            p.wait(beats);
            Ok(())
        })
        .with("sync", |p: &mut Process| {
            let period = p
                .context()
                .get("pulse")
                .and_then(|v| v.as_number())
                .unwrap_or(1.0);
            p.sync(period);
            Ok(())
        })
        .with("now", |p: &mut Process| {
            let time = p.time();
            p.push(Value::Float(time));
            Ok(())
        })
        .with("rate", |p: &mut Process| {
            let rate = p.pop_number()?;
            p.set_rate(rate);
            Ok(())
        })
        // Control
        .with("call", |p: &mut Process| {
            let body = p.pop_program()?;
            p.push_program(body);
            Ok(())
        })
        .with("quote", quote)
        .with("times", times)
        .with("if", |p: &mut Process| {
            let else_branch = p.pop_program()?;
            let then_branch = p.pop_program()?;
            let condition = p.pop()?;
            if condition.is_truthy() {
                p.push_program(then_branch);
            } else {
                p.push_program(else_branch);
            }
            Ok(())
        })
        .with("when", |p: &mut Process| {
            let then_branch = p.pop_program()?;
            let condition = p.pop()?;
            if condition.is_truthy() {
                p.push_program(then_branch);
            }
            Ok(())
        })
        .with("loop", |p: &mut Process| {
            let body = p.pop_program()?;
            p.push_program(repeat(&body, None));
            Ok(())
        })
        // Processes
        .with("fork", |p: &mut Process| {
            let body = p.pop_program()?;
            let name = p.fork(Fork::new(body));
            p.push(Value::String(name));
            Ok(())
        })
        .with("stop", |p: &mut Process| {
            let name = p.pop_string()?;
            p.stop(&name);
            Ok(())
        })
        .with("halt", |p: &mut Process| {
            p.clear_operations();
            Ok(())
        })
        .with("name", |p: &mut Process| {
            let name = p.name().to_string();
            p.push(Value::String(name));
            Ok(())
        })
        .with("print", |p: &mut Process| {
            let value = p.pop()?;
            println!("{}", value);
            Ok(())
        })
}

// ───────────────────────────── Stack ─────────────────────────────────────

fn dup(p: &mut Process) -> Result<(), RuntimeError> {
    let a = p.pop()?;
    p.push(a.clone());
    p.push(a);
    Ok(())
}

fn swap(p: &mut Process) -> Result<(), RuntimeError> {
    let b = p.pop()?;
    let a = p.pop()?;
    p.push(b);
    p.push(a);
    Ok(())
}

fn over(p: &mut Process) -> Result<(), RuntimeError> {
    let b = p.pop()?;
    let a = p.pop()?;
    p.push(a.clone());
    p.push(b);
    p.push(a);
    Ok(())
}

fn rot(p: &mut Process) -> Result<(), RuntimeError> {
    let c = p.pop()?;
    let b = p.pop()?;
    let a = p.pop()?;
    p.push(b);
    p.push(c);
    p.push(a);
    Ok(())
}

// ─────────────────────────── Arithmetic ──────────────────────────────────

/// Apply a binary numeric operation. Two integers stay exact through
/// `int_op`; anything involving a float goes through `float_op`.
fn numeric_binop(
    p: &mut Process,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
    op_name: &str,
) -> Result<(), RuntimeError> {
    let b = p.pop()?;
    let a = p.pop()?;
    let result = match (&a, &b) {
        (Value::Integer(x), Value::Integer(y)) => match int_op(*x, *y) {
            Some(r) => Value::Integer(r),
            None => return Err(overflow(op_name, &a, &b)),
        },
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Value::Float(float_op(x, y)),
            _ => {
                return Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!("cannot {} {} and {}", op_name, a, b),
                ));
            }
        },
    };
    p.push(result);
    Ok(())
}

fn overflow(op_name: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::Arithmetic,
        format!("integer overflow: cannot {} {} and {}", op_name, a, b),
    )
}

fn unary_overflow(op_name: &str, n: i64) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::Arithmetic,
        format!("integer overflow: cannot {} {}", op_name, n),
    )
}

fn numeric_compare(p: &mut Process, op: impl Fn(f64, f64) -> bool) -> Result<(), RuntimeError> {
    let b = p.pop()?;
    let a = p.pop()?;
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => {
            p.push(Value::Bool(op(x, y)));
            Ok(())
        }
        _ => Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!("cannot compare {} and {}", a, b),
        )),
    }
}

fn div(p: &mut Process) -> Result<(), RuntimeError> {
    let b = p.pop()?;
    let a = p.pop()?;
    let result = match (&a, &b) {
        (Value::Integer(_), Value::Integer(0)) => {
            return Err(RuntimeError::new(ErrorKind::Arithmetic, "division by zero"));
        }
        (Value::Integer(x), Value::Integer(y)) => match x.checked_div(*y) {
            Some(r) => Value::Integer(r),
            None => return Err(overflow("divide", &a, &b)),
        },
        _ => match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => Value::Float(x / y),
            _ => {
                return Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!("cannot divide {} and {}", a, b),
                ));
            }
        },
    };
    p.push(result);
    Ok(())
}

fn modulo(p: &mut Process) -> Result<(), RuntimeError> {
    let b = p.pop_int()?;
    let a = p.pop_int()?;
    if b == 0 {
        return Err(RuntimeError::new(ErrorKind::Arithmetic, "modulo by zero"));
    }
    let r = a
        .checked_rem(b)
        .ok_or_else(|| overflow("take modulo of", &Value::Integer(a), &Value::Integer(b)))?;
    p.push(Value::Integer(r));
    Ok(())
}

fn neg(p: &mut Process) -> Result<(), RuntimeError> {
    let result = match p.pop()? {
        Value::Integer(n) => match n.checked_neg() {
            Some(r) => Value::Integer(r),
            None => return Err(unary_overflow("negate", n)),
        },
        Value::Float(n) => Value::Float(-n),
        other => return Err(type_error("number", &other)),
    };
    p.push(result);
    Ok(())
}

fn abs(p: &mut Process) -> Result<(), RuntimeError> {
    let result = match p.pop()? {
        Value::Integer(n) => match n.checked_abs() {
            Some(r) => Value::Integer(r),
            None => return Err(unary_overflow("take abs of", n)),
        },
        Value::Float(n) => Value::Float(n.abs()),
        other => return Err(type_error("number", &other)),
    };
    p.push(result);
    Ok(())
}

/// `( pitch -- hz )` MIDI note number to frequency, A4 = 440 Hz.
fn mtof(p: &mut Process) -> Result<(), RuntimeError> {
    let pitch = p.pop_number()?;
    p.push(Value::Float(440.0 * 2f64.powf((pitch - 69.0) / 12.0)));
    Ok(())
}

/// `( n m -- n' )` Euclidean remainder, never negative for positive `m`.
fn wrap(p: &mut Process) -> Result<(), RuntimeError> {
    let m = p.pop_int()?;
    let n = p.pop_int()?;
    if m == 0 {
        return Err(RuntimeError::new(ErrorKind::Arithmetic, "wrap by zero"));
    }
    let r = n
        .checked_rem_euclid(m)
        .ok_or_else(|| overflow("wrap", &Value::Integer(n), &Value::Integer(m)))?;
    p.push(Value::Integer(r));
    Ok(())
}

fn pop_list(p: &mut Process) -> Result<Vec<Value>, RuntimeError> {
    match p.pop()? {
        Value::List(items) => Ok(items),
        other => Err(type_error("list", &other)),
    }
}

fn len(p: &mut Process) -> Result<(), RuntimeError> {
    let items = pop_list(p)?;
    p.push(Value::Integer(items.len() as i64));
    Ok(())
}

/// `( list i -- x )` Cycles through the list, so any index is valid.
fn nth(p: &mut Process) -> Result<(), RuntimeError> {
    let index = p.pop_int()?;
    let mut items = pop_list(p)?;
    if items.is_empty() {
        return Err(RuntimeError::new(ErrorKind::OutOfRange, "nth of empty list"));
    }
    let i = index.rem_euclid(items.len() as i64) as usize;
    p.push(items.swap_remove(i));
    Ok(())
}

// ───────────────────────────── Scope ─────────────────────────────────────

/// `( name value -- )`
fn pop_binding(p: &mut Process) -> Result<(String, Value), RuntimeError> {
    let value = p.pop()?;
    let name = p.pop_string()?;
    Ok((name, value))
}

// ──────────────────────────── Control ────────────────────────────────────

/// Push the next pending instruction as data instead of running it.
fn quote(p: &mut Process) -> Result<(), RuntimeError> {
    let body = match p.take_op() {
        Some(Instr::SubProgram(body)) => body,
        Some(instr) => Program::from([instr]),
        None => {
            return Err(RuntimeError::new(
                ErrorKind::StackUnderflow,
                "nothing to quote",
            ));
        }
    };
    p.push(Value::Program(body));
    Ok(())
}

/// `( n program -- )`
fn times(p: &mut Process) -> Result<(), RuntimeError> {
    let body = p.pop_program()?;
    let n = p.pop_int()?;
    if n < 0 {
        return Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            "times expects non-negative integer",
        ));
    }
    if n > 0 {
        p.push_program(repeat(&body, Some(n - 1)));
    }
    Ok(())
}

/// One iteration of `body` followed by the command that schedules the next:
/// `@times` with the remaining count, or `@loop` forever.
fn repeat(body: &Program, remaining: Option<i64>) -> Program {
    let mut items = vec![Instr::SubProgram(body.clone())];
    match remaining {
        Some(0) => {}
        Some(n) => items.extend([
            Instr::Literal(Value::Integer(n)),
            Instr::Literal(Value::Program(body.clone())),
            Instr::command("times"),
        ]),
        None => items.extend([
            Instr::Literal(Value::Program(body.clone())),
            Instr::command("loop"),
        ]),
    }
    items.into()
}
