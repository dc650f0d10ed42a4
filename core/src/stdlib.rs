//! Standard library native functions
//!
//! The primitives installed into a top-level environment. Each takes the
//! evaluated argument list and the calling environment.

use std::io::{self, Write};
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::eval;
use crate::interner::Symbol;
use crate::native::{
    exact_args, extract_atom, extract_int, extract_map, extract_name, extract_sequence,
    extract_string, make_bool, min_args, split_first,
};
use crate::printer::print_joined;
use crate::reader::Reader;
use crate::value::{
    BuiltinFn, ListIter, MapEntries, Value, cons, list_len, map_assoc, map_get, map_remove,
    values_equal,
};

const BUILTINS: &[(&str, BuiltinFn)] = &[
    // arithmetic
    ("+", add),
    ("-", sub),
    ("*", mul),
    ("/", div),
    ("=", equal),
    ("<", less),
    (">", greater),
    ("<=", less_equal),
    (">=", greater_equal),
    // sequences
    ("list", list),
    ("list?", is_list),
    ("vector", vector),
    ("vector?", is_vector),
    ("vec", vec),
    ("sequential?", is_sequential),
    ("cons", cons_fn),
    ("car", first),
    ("cdr", rest),
    ("first", first),
    ("rest", rest),
    ("nth", nth),
    ("concat", concat),
    ("empty?", is_empty),
    ("count", count),
    // hash-maps
    ("hash-map", hash_map),
    ("map?", is_map),
    ("get", get),
    ("assoc", assoc),
    ("dissoc", dissoc),
    ("contains?", contains),
    ("keys", keys),
    ("vals", vals),
    // predicates and constructors
    ("not", not),
    ("nil?", is_nil),
    ("true?", is_true),
    ("false?", is_false),
    ("symbol?", is_symbol),
    ("keyword?", is_keyword),
    ("string?", is_string),
    ("number?", is_number),
    ("fn?", is_fn),
    ("atom?", is_atom),
    ("symbol", symbol),
    ("keyword", keyword),
    // atoms
    ("atom", atom),
    ("deref", deref),
    ("reset!", reset),
    ("swap!", swap),
    // strings and printing
    ("pr-str", pr_str),
    ("str", str_fn),
    ("prn", prn),
    ("println", println),
    ("read-string", read_string),
    // evaluation
    ("eval", eval_fn),
    ("apply", apply),
    ("map", map),
    ("throw", throw),
];

/// Install every primitive into `env`
pub fn register(env: &Environment) {
    for &(name, func) in BUILTINS {
        env.set(Symbol::new(name), Value::builtin(name, func));
    }
}

/// A fresh top-level environment holding every primitive
pub fn standard_env() -> Rc<Environment> {
    let env = Environment::new();
    register(&env);
    env
}

// ============================================================================
// Arithmetic
// ============================================================================

fn add(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    ListIter::new(args)
        .try_fold(0i64, |acc, value| {
            acc.checked_add(extract_int("+", &value)?)
                .ok_or(Error::Overflow("+"))
        })
        .map(Value::Int)
}

fn sub(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let (first, others) = split_first("-", args)?;
    let start = extract_int("-", &first)?;
    if others.is_nil() {
        return start.checked_neg().map(Value::Int).ok_or(Error::Overflow("-"));
    }
    ListIter::new(&others)
        .try_fold(start, |acc, value| {
            acc.checked_sub(extract_int("-", &value)?)
                .ok_or(Error::Overflow("-"))
        })
        .map(Value::Int)
}

fn mul(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    ListIter::new(args)
        .try_fold(1i64, |acc, value| {
            acc.checked_mul(extract_int("*", &value)?)
                .ok_or(Error::Overflow("*"))
        })
        .map(Value::Int)
}

/// Truncating integer division
fn div(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    min_args("/", args, 2)?;
    let (first, others) = split_first("/", args)?;
    ListIter::new(&others)
        .try_fold(extract_int("/", &first)?, |acc, value| {
            match extract_int("/", &value)? {
                0 => Err(Error::DivisionByZero),
                divisor => acc.checked_div(divisor).ok_or(Error::Overflow("/")),
            }
        })
        .map(Value::Int)
}

fn compare(name: &'static str, args: &Value, op: fn(i64, i64) -> bool) -> Result<Value> {
    min_args(name, args, 2)?;
    let (first, others) = split_first(name, args)?;
    let mut prev = extract_int(name, &first)?;
    let mut holds = true;
    for value in ListIter::new(&others) {
        let next = extract_int(name, &value)?;
        holds = holds && op(prev, next);
        prev = next;
    }
    Ok(make_bool(holds))
}

fn less(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    compare("<", args, |a, b| a < b)
}

fn greater(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    compare(">", args, |a, b| a > b)
}

fn less_equal(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    compare("<=", args, |a, b| a <= b)
}

fn greater_equal(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    compare(">=", args, |a, b| a >= b)
}

fn equal(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    min_args("=", args, 2)?;
    let (first, others) = split_first("=", args)?;
    let mut prev = first;
    for value in ListIter::new(&others) {
        if !values_equal(&prev, &value) {
            return Ok(make_bool(false));
        }
        prev = value;
    }
    Ok(make_bool(true))
}

// ============================================================================
// Sequences
// ============================================================================

fn list(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    Ok(args.clone())
}

fn vector(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    Ok(Value::vector(args.clone()))
}

fn vec(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [seq] = exact_args("vec", args)?;
    Ok(Value::vector(extract_sequence("vec", &seq)?))
}

/// Prepend onto a list or vector; the result is always a proper list
fn cons_fn(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [head, tail] = exact_args("cons", args)?;
    let tail = extract_sequence("cons", &tail)?;
    Ok(cons(head, tail))
}

fn first(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [seq] = exact_args("first", args)?;
    match extract_sequence("first", &seq)? {
        Value::Cons(cell) => Ok(cell.car.clone()),
        _ => Ok(Value::Nil),
    }
}

fn rest(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [seq] = exact_args("rest", args)?;
    match extract_sequence("rest", &seq)? {
        Value::Cons(cell) => Ok(cell.cdr.clone()),
        _ => Ok(Value::Nil),
    }
}

fn nth(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [seq, index] = exact_args("nth", args)?;
    let items = extract_sequence("nth", &seq)?;
    let index = extract_int("nth", &index)?;
    let out_of_range = Error::IndexOutOfRange { name: "nth", index };
    let position = usize::try_from(index).map_err(|_| out_of_range.clone())?;
    ListIter::new(&items).nth(position).ok_or(out_of_range)
}

fn concat(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let parts: Value = ListIter::new(args)
        .map(|part| extract_sequence("concat", &part))
        .collect::<Result<Value>>()?;
    Ok(ListIter::new(&parts)
        .flat_map(|part| ListIter::new(&part))
        .collect())
}

fn is_empty(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [value] = exact_args("empty?", args)?;
    match value {
        Value::Nil => Ok(make_bool(true)),
        Value::Cons(_) => Ok(make_bool(false)),
        Value::Vector(items) | Value::Map(items) => Ok(make_bool(items.is_nil())),
        other => Err(Error::type_error("empty?", "collection", &other)),
    }
}

fn count(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [value] = exact_args("count", args)?;
    let n = match &value {
        Value::Nil => 0,
        Value::Cons(_) => list_len(&value),
        Value::Vector(items) => list_len(items),
        Value::Map(entries) => list_len(entries) / 2,
        Value::Str(s) => s.chars().count(),
        other => return Err(Error::type_error("count", "collection", other)),
    };
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| Error::Overflow("count"))
}

// ============================================================================
// Hash-maps
// ============================================================================

fn assoc_pairs(name: &str, entries: Value, pairs: &Value) -> Result<Value> {
    let n = list_len(pairs);
    if n % 2 != 0 {
        return Err(Error::arity(name, "an even number of key/value", n));
    }
    Ok(MapEntries::new(pairs).fold(entries, |acc, (key, value)| map_assoc(&acc, key, value)))
}

fn hash_map(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    assoc_pairs("hash-map", Value::Nil, args).map(Value::map)
}

fn get(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [map, key] = exact_args("get", args)?;
    let entries = extract_map("get", &map)?;
    Ok(map_get(&entries, &key).unwrap_or_default())
}

fn assoc(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let (map, pairs) = split_first("assoc", args)?;
    let entries = extract_map("assoc", &map)?;
    assoc_pairs("assoc", entries, &pairs).map(Value::map)
}

fn dissoc(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let (map, keys) = split_first("dissoc", args)?;
    let entries = extract_map("dissoc", &map)?;
    let remaining = ListIter::new(&keys).fold(entries, |acc, key| map_remove(&acc, &key));
    Ok(Value::map(remaining))
}

fn contains(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [map, key] = exact_args("contains?", args)?;
    let entries = extract_map("contains?", &map)?;
    Ok(make_bool(map_get(&entries, &key).is_some()))
}

fn keys(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [map] = exact_args("keys", args)?;
    let entries = extract_map("keys", &map)?;
    Ok(MapEntries::new(&entries).map(|(key, _)| key).collect())
}

fn vals(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [map] = exact_args("vals", args)?;
    let entries = extract_map("vals", &map)?;
    Ok(MapEntries::new(&entries).map(|(_, value)| value).collect())
}

// ============================================================================
// Predicates and Constructors
// ============================================================================

macro_rules! predicate {
    ($func:ident, $name:literal, $pattern:pat) => {
        fn $func(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
            let [value] = exact_args($name, args)?;
            Ok(make_bool(matches!(value, $pattern)))
        }
    };
}

predicate!(is_list, "list?", Value::Nil | Value::Cons(_));
predicate!(is_vector, "vector?", Value::Vector(_));
predicate!(is_sequential, "sequential?", Value::Nil | Value::Cons(_) | Value::Vector(_));
predicate!(is_map, "map?", Value::Map(_));
predicate!(is_nil, "nil?", Value::Nil);
predicate!(is_true, "true?", Value::Bool(true));
predicate!(is_false, "false?", Value::Bool(false));
predicate!(is_symbol, "symbol?", Value::Symbol(_));
predicate!(is_keyword, "keyword?", Value::Keyword(_));
predicate!(is_string, "string?", Value::Str(_));
predicate!(is_number, "number?", Value::Int(_));
predicate!(is_fn, "fn?", Value::Lambda(_) | Value::Builtin(_));
predicate!(is_atom, "atom?", Value::Atom(_));

fn not(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [value] = exact_args("not", args)?;
    Ok(make_bool(!value.is_truthy()))
}

fn symbol(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [name] = exact_args("symbol", args)?;
    Ok(Value::Symbol(Symbol::new(&extract_string("symbol", &name)?)))
}

fn keyword(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [name] = exact_args("keyword", args)?;
    Ok(Value::Keyword(extract_name("keyword", &name)?))
}

// ============================================================================
// Atoms
// ============================================================================

fn atom(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [value] = exact_args("atom", args)?;
    Ok(Value::atom(value))
}

fn deref(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [target] = exact_args("deref", args)?;
    let cell = extract_atom("deref", &target)?;
    let value = cell.borrow().clone();
    Ok(value)
}

fn reset(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [target, value] = exact_args("reset!", args)?;
    let cell = extract_atom("reset!", &target)?;
    *cell.borrow_mut() = value.clone();
    Ok(value)
}

/// `(swap! a f x y)` stores `(f @a x y)`
fn swap(args: &Value, env: &Rc<Environment>) -> Result<Value> {
    min_args("swap!", args, 2)?;
    let (target, rest) = split_first("swap!", args)?;
    let cell = extract_atom("swap!", &target)?;
    let (func, extra) = split_first("swap!", &rest)?;
    // The function may deref the same atom, so no borrow is held across it.
    let current = cell.borrow().clone();
    let updated = eval::apply(&func, &cons(current, extra), env)?;
    *cell.borrow_mut() = updated.clone();
    Ok(updated)
}

// ============================================================================
// Strings and Printing
// ============================================================================

fn pr_str(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    Ok(Value::string(print_joined(args, true, " ")))
}

fn str_fn(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    Ok(Value::string(print_joined(args, false, "")))
}

fn write_line(name: &str, text: &str) -> Result<Value> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{text}").map_err(|e| Error::Io(format!("{name}: I/O error: {e}")))?;
    handle
        .flush()
        .map_err(|e| Error::Io(format!("{name}: I/O error: {e}")))?;
    Ok(Value::Nil)
}

fn prn(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    write_line("prn", &print_joined(args, true, " "))
}

fn println(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    write_line("println", &print_joined(args, false, " "))
}

/// Reads the first form; text holding no form reads as `nil`
fn read_string(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [text] = exact_args("read-string", args)?;
    let text = extract_string("read-string", &text)?;
    Ok(Reader::new(&text).next_form()?.unwrap_or_default())
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluates in the top-level environment, not the caller's scope
fn eval_fn(args: &Value, env: &Rc<Environment>) -> Result<Value> {
    let [form] = exact_args("eval", args)?;
    eval::eval(form, &env.root())
}

/// `(apply f a b [c d])` calls `(f a b c d)`
fn apply(args: &Value, env: &Rc<Environment>) -> Result<Value> {
    let (func, rest) = split_first("apply", args)?;
    let n = list_len(&rest);
    let call_args = match ListIter::new(&rest).last() {
        None => Value::Nil,
        Some(last) => {
            let spread = extract_sequence("apply", &last)?;
            ListIter::new(&rest)
                .take(n - 1)
                .chain(ListIter::new(&spread))
                .collect()
        }
    };
    eval::apply(&func, &call_args, env)
}

fn map(args: &Value, env: &Rc<Environment>) -> Result<Value> {
    let [func, seq] = exact_args("map", args)?;
    let items = extract_sequence("map", &seq)?;
    ListIter::new(&items)
        .map(|item| eval::apply(&func, &cons(item, Value::Nil), env))
        .collect()
}

fn throw(args: &Value, _env: &Rc<Environment>) -> Result<Value> {
    let [value] = exact_args("throw", args)?;
    Err(Error::Thrown(value))
}
