//! Value to text.
//!
//! Readable output re-reads to an equal value; display output prints strings
//! raw. Functions and atoms have no readable syntax.

use std::fmt::{self, Write};

use crate::value::Value;

/// Render a value. With `readable` set, strings are quoted and escaped.
pub fn print(value: &Value, readable: bool) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_value(&mut out, value, readable);
    out
}

/// Render the elements of a list separated by `separator`
pub fn print_joined(items: &Value, readable: bool, separator: &str) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        let _ = write_value(&mut out, &item, readable);
    }
    out
}

/// Work left while rendering. Aggregates are unfolded onto an explicit stack,
/// so nesting depth does not consume native stack.
enum Pending {
    Value(Value),
    /// Elements after the first, then the closing delimiter
    Rest { items: Value, close: char },
    Close(char),
}

pub fn write_value<W: Write>(w: &mut W, value: &Value, readable: bool) -> fmt::Result {
    let mut stack = vec![Pending::Value(value.clone())];
    while let Some(next) = stack.pop() {
        match next {
            Pending::Value(Value::Cons(cell)) => {
                open_sequence(w, &mut stack, Value::Cons(cell), '(', ')')?
            }
            Pending::Value(Value::Vector(items)) => {
                open_sequence(w, &mut stack, (*items).clone(), '[', ']')?
            }
            Pending::Value(Value::Map(entries)) => {
                open_sequence(w, &mut stack, (*entries).clone(), '{', '}')?
            }
            Pending::Value(Value::Atom(cell)) => {
                w.write_str("(atom ")?;
                stack.push(Pending::Close(')'));
                stack.push(Pending::Value(cell.borrow().clone()));
            }
            Pending::Value(scalar) => write_scalar(w, &scalar, readable)?,
            Pending::Rest { items, close } => match items {
                Value::Nil => w.write_char(close)?,
                Value::Cons(cell) => {
                    w.write_char(' ')?;
                    stack.push(Pending::Rest { items: cell.cdr.clone(), close });
                    stack.push(Pending::Value(cell.car.clone()));
                }
                tail => {
                    w.write_str(" . ")?;
                    stack.push(Pending::Close(close));
                    stack.push(Pending::Value(tail));
                }
            },
            Pending::Close(close) => w.write_char(close)?,
        }
    }
    Ok(())
}

fn open_sequence<W: Write>(
    w: &mut W,
    stack: &mut Vec<Pending>,
    items: Value,
    open: char,
    close: char,
) -> fmt::Result {
    w.write_char(open)?;
    match items {
        Value::Cons(cell) => {
            stack.push(Pending::Rest { items: cell.cdr.clone(), close });
            stack.push(Pending::Value(cell.car.clone()));
            Ok(())
        }
        _ => w.write_char(close),
    }
}

fn write_scalar<W: Write>(w: &mut W, value: &Value, readable: bool) -> fmt::Result {
    match value {
        Value::Nil => w.write_str("nil"),
        Value::Bool(b) => write!(w, "{b}"),
        Value::Int(n) => write!(w, "{n}"),
        Value::Str(s) if readable => write_escaped(w, s),
        Value::Str(s) => w.write_str(s),
        Value::Symbol(s) => write!(w, "{s}"),
        Value::Keyword(s) => write!(w, ":{s}"),
        Value::Lambda(_) => w.write_str("#<function>"),
        Value::Builtin(b) => write!(w, "#<builtin {}>", b.name),
        Value::Cons(_) | Value::Vector(_) | Value::Map(_) | Value::Atom(_) => {
            write_value(w, value, readable)
        }
    }
}

fn write_escaped<W: Write>(w: &mut W, s: &str) -> fmt::Result {
    w.write_char('"')?;
    for c in s.chars() {
        match c {
            '\n' => w.write_str("\\n")?,
            '\t' => w.write_str("\\t")?,
            '\r' => w.write_str("\\r")?,
            '\\' => w.write_str("\\\\")?,
            '"' => w.write_str("\\\"")?,
            c => w.write_char(c)?,
        }
    }
    w.write_char('"')
}
