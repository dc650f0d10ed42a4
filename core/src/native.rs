//! Native function utilities and helpers
//!
//! Argument destructuring and value extraction shared by the built-in
//! primitives. Every helper reports failures with the primitive's name.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interner::Symbol;
use crate::value::{Value, list_len, list_to_array};

// ============================================================================
// Argument Helpers
// ============================================================================

/// Exactly `N` arguments
pub fn exact_args<const N: usize>(name: &str, args: &Value) -> Result<[Value; N]> {
    list_to_array(args).ok_or_else(|| Error::arity(name, N.to_string(), list_len(args)))
}

/// At least `min` arguments; returns the count
pub fn min_args(name: &str, args: &Value, min: usize) -> Result<usize> {
    let count = list_len(args);
    if count < min {
        return Err(Error::arity(name, format!("at least {min}"), count));
    }
    Ok(count)
}

/// First argument and the remaining argument list
pub fn split_first(name: &str, args: &Value) -> Result<(Value, Value)> {
    match args {
        Value::Cons(cell) => Ok((cell.car.clone(), cell.cdr.clone())),
        _ => Err(Error::arity(name, "at least 1", 0)),
    }
}

// ============================================================================
// Value Extraction Helpers
// ============================================================================

pub fn extract_int(name: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Int(n) => Ok(*n),
        _ => Err(Error::type_error(name, "integer", value)),
    }
}

pub fn extract_string(name: &str, value: &Value) -> Result<Rc<str>> {
    match value {
        Value::Str(s) => Ok(Rc::clone(s)),
        _ => Err(Error::type_error(name, "string", value)),
    }
}

/// Element chain of a list or vector (`nil` counts as empty)
pub fn extract_sequence(name: &str, value: &Value) -> Result<Value> {
    value
        .as_sequence()
        .cloned()
        .ok_or_else(|| Error::type_error(name, "list or vector", value))
}

/// Entry chain of a hash-map (`nil` counts as empty)
pub fn extract_map(name: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Map(entries) => Ok((**entries).clone()),
        Value::Nil => Ok(Value::Nil),
        _ => Err(Error::type_error(name, "hash-map", value)),
    }
}

pub fn extract_atom(name: &str, value: &Value) -> Result<Rc<RefCell<Value>>> {
    match value {
        Value::Atom(cell) => Ok(Rc::clone(cell)),
        _ => Err(Error::type_error(name, "atom", value)),
    }
}

/// Name of a string, symbol or keyword
pub fn extract_name(name: &str, value: &Value) -> Result<Symbol> {
    match value {
        Value::Str(s) => Ok(Symbol::new(s)),
        Value::Symbol(s) | Value::Keyword(s) => Ok(*s),
        _ => Err(Error::type_error(name, "string or symbol", value)),
    }
}

// ============================================================================
// Construction Helpers
// ============================================================================

pub fn make_bool(b: bool) -> Value {
    Value::Bool(b)
}
