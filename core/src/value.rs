use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::error::Result;
use crate::interner::Symbol;
use crate::printer;

// ============================================================================
// Core Type System
// ============================================================================

/// A two-slot pair. Every list, binding chain and aggregate is built from these.
#[derive(Clone)]
pub struct ConsCell {
    pub car: Value,
    pub cdr: Value,
}

// Unlink uniquely owned children onto a worklist so that dropping a long or
// deeply nested structure does not recurse once per level.
impl Drop for ConsCell {
    fn drop(&mut self) {
        if !owns_children(&self.car) && !owns_children(&self.cdr) {
            return;
        }
        let mut pending = vec![
            std::mem::take(&mut self.car),
            std::mem::take(&mut self.cdr),
        ];
        while let Some(value) = pending.pop() {
            match value {
                Value::Cons(cell) => {
                    if let Ok(mut cell) = Rc::try_unwrap(cell) {
                        pending.push(std::mem::take(&mut cell.car));
                        pending.push(std::mem::take(&mut cell.cdr));
                    }
                }
                Value::Vector(items) | Value::Map(items) => {
                    if let Ok(items) = Rc::try_unwrap(items) {
                        pending.push(items);
                    }
                }
                _ => {}
            }
        }
    }
}

fn owns_children(value: &Value) -> bool {
    matches!(value, Value::Cons(_) | Value::Vector(_) | Value::Map(_))
}

/// A user-defined function: parameter list, unevaluated body, captured scope.
pub struct LambdaCell {
    /// Proper list of symbols, optionally `& rest` at the end
    pub params: Value,
    pub body: Value,
    pub env: Rc<Environment>,
}

impl fmt::Debug for LambdaCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaCell")
            .field("params", &self.params)
            .field("body", &self.body)
            .field("env", &"<environment>")
            .finish()
    }
}

/// Native function type: evaluated argument list and the calling environment.
pub type BuiltinFn = fn(&Value, &Rc<Environment>) -> Result<Value>;

#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Symbol(Symbol),
    Keyword(Symbol),
    Cons(Rc<ConsCell>),
    /// Element list (Nil or a proper pair chain)
    Vector(Rc<Value>),
    /// Flat `k1 v1 k2 v2 ...` pair chain
    Map(Rc<Value>),
    /// Mutable box
    Atom(Rc<RefCell<Value>>),
    Lambda(Rc<LambdaCell>),
    Builtin(Builtin),
}

impl Value {
    pub fn symbol(name: &str) -> Self {
        Value::Symbol(Symbol::new(name))
    }

    pub fn keyword(name: &str) -> Self {
        Value::Keyword(Symbol::new(name))
    }

    pub fn string(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn vector(items: Value) -> Self {
        Value::Vector(Rc::new(items))
    }

    /// A hash-map from a flat entry chain; a repeated key keeps its last value
    pub fn map(entries: Value) -> Self {
        let unique = MapEntries::new(&entries)
            .fold(Value::Nil, |acc, (key, value)| map_assoc(&acc, key, value));
        Value::Map(Rc::new(unique))
    }

    pub fn atom(value: Value) -> Self {
        Value::Atom(Rc::new(RefCell::new(value)))
    }

    pub fn builtin(name: &'static str, func: BuiltinFn) -> Self {
        Value::Builtin(Builtin { name, func })
    }

    /// Everything except `nil` and `false` is true
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Element chain of a list or vector
    pub fn as_sequence(&self) -> Option<&Value> {
        match self {
            Value::Nil | Value::Cons(_) => Some(self),
            Value::Vector(items) => Some(items),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::Cons(_) => "list",
            Value::Vector(_) => "vector",
            Value::Map(_) => "hash-map",
            Value::Atom(_) => "atom",
            Value::Lambda(_) | Value::Builtin(_) => "function",
        }
    }

    /// Iterate the elements of a list, vector or hash-map chain
    pub fn iter(&self) -> ListIter {
        match self {
            Value::Vector(items) | Value::Map(items) => ListIter::new(items),
            _ => ListIter::new(self),
        }
    }
}

// ============================================================================
// Equality
// ============================================================================

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        compare(self, other, Equality::Structural)
    }
}

/// Language-level `=`: like `==`, except lists and vectors with equal
/// elements compare equal. Both ignore hash-map entry order.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    compare(a, b, Equality::Language)
}

#[derive(Clone, Copy)]
enum Equality {
    Structural,
    Language,
}

// Pending pairs live on an explicit stack, so neither long nor deeply nested
// structures recurse.
fn compare(a: &Value, b: &Value, mode: Equality) -> bool {
    let mut pending = vec![(a.clone(), b.clone())];
    while let Some((a, b)) = pending.pop() {
        let (a, b) = match mode {
            Equality::Language => (sequence_chain(a), sequence_chain(b)),
            Equality::Structural => (a, b),
        };
        match (&a, &b) {
            (Value::Cons(x), Value::Cons(y)) => {
                if !Rc::ptr_eq(x, y) {
                    pending.push((x.cdr.clone(), y.cdr.clone()));
                    pending.push((x.car.clone(), y.car.clone()));
                }
            }
            (Value::Vector(x), Value::Vector(y)) => {
                pending.push(((**x).clone(), (**y).clone()));
            }
            (Value::Map(x), Value::Map(y)) => {
                if list_len(x) != list_len(y) {
                    return false;
                }
                for (key, value) in MapEntries::new(x) {
                    match map_get(y, &key) {
                        Some(other) => pending.push((value, other)),
                        None => return false,
                    }
                }
            }
            _ => {
                if !scalars_equal(&a, &b) {
                    return false;
                }
            }
        }
    }
    true
}

/// A vector compares as its element chain under `=`
fn sequence_chain(value: Value) -> Value {
    match value {
        Value::Vector(items) => (*items).clone(),
        other => other,
    }
}

fn scalars_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        (Value::Keyword(a), Value::Keyword(b)) => a == b,
        (Value::Atom(a), Value::Atom(b)) => Rc::ptr_eq(a, b),
        (Value::Lambda(a), Value::Lambda(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => {
            a.name == b.name && std::ptr::fn_addr_eq(a.func, b.func)
        }
        _ => false,
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        printer::write_value(f, self, true)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        printer::write_value(f, self, true)
    }
}

// ============================================================================
// Primitive Operations
// ============================================================================

pub fn cons(car: Value, cdr: Value) -> Value {
    Value::Cons(Rc::new(ConsCell { car, cdr }))
}

/// Build a proper list from a fixed set of values
pub fn list<const N: usize>(items: [Value; N]) -> Value {
    items.into_iter().collect()
}

/// Number of pairs along the cdr chain
pub fn list_len(list: &Value) -> usize {
    ListIter::new(list).count()
}

pub fn reverse(list: &Value) -> Value {
    ListIter::new(list).fold(Value::Nil, |acc, item| cons(item, acc))
}

/// Copy the pairs of `front` onto `back`, sharing `back`
pub fn append(front: &Value, back: Value) -> Value {
    ListIter::new(&reverse(front)).fold(back, |acc, item| cons(item, acc))
}

/// Destructure a proper list of exactly `N` elements
pub fn list_to_array<const N: usize>(list: &Value) -> Option<[Value; N]> {
    let mut out: [Value; N] = std::array::from_fn(|_| Value::Nil);
    let mut iter = ListIter::new(list);
    for slot in out.iter_mut() {
        *slot = iter.next()?;
    }
    match iter.next() {
        Some(_) => None,
        None => Some(out),
    }
}

/// Iterator over the cars of a pair chain. Stops at the first non-pair tail.
pub struct ListIter {
    current: Value,
}

impl ListIter {
    pub fn new(list: &Value) -> Self {
        ListIter {
            current: list.clone(),
        }
    }
}

impl Iterator for ListIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (item, rest) = match &self.current {
            Value::Cons(cell) => (cell.car.clone(), cell.cdr.clone()),
            _ => return None,
        };
        self.current = rest;
        Some(item)
    }
}

// Builds in reverse, then flips, so no native buffer is involved.
impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let reversed = iter
            .into_iter()
            .fold(Value::Nil, |acc, item| cons(item, acc));
        reverse(&reversed)
    }
}

// ============================================================================
// Hash-map chains
// ============================================================================

/// Iterator over `(key, value)` entries of a flat map chain
pub struct MapEntries {
    inner: ListIter,
}

impl MapEntries {
    pub fn new(entries: &Value) -> Self {
        MapEntries {
            inner: ListIter::new(entries),
        }
    }
}

impl Iterator for MapEntries {
    type Item = (Value, Value);

    fn next(&mut self) -> Option<(Value, Value)> {
        let key = self.inner.next()?;
        let value = self.inner.next().unwrap_or_default();
        Some((key, value))
    }
}

pub fn map_get(entries: &Value, key: &Value) -> Option<Value> {
    MapEntries::new(entries).find_map(|(k, v)| (k == *key).then_some(v))
}

pub fn map_remove(entries: &Value, key: &Value) -> Value {
    MapEntries::new(entries)
        .filter(|(k, _)| k != key)
        .flat_map(|(k, v)| [k, v])
        .collect()
}

/// Replace or append an entry; new keys go to the end
pub fn map_assoc(entries: &Value, key: Value, value: Value) -> Value {
    let without = map_remove(entries, &key);
    append(&without, list([key, value]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(n: i64) -> Value {
        (1..=n).map(Value::Int).collect()
    }

    #[test]
    fn test_collect_preserves_order() {
        assert_eq!(ints(3).to_string(), "(1 2 3)");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn test_list_and_vector_equality() {
        let as_list = ints(3);
        let as_vector = Value::vector(ints(3));
        assert_ne!(as_list, as_vector);
        assert!(values_equal(&as_list, &as_vector));
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a = Value::map(list([
            Value::keyword("a"),
            Value::Int(1),
            Value::keyword("b"),
            Value::Int(2),
        ]));
        let b = Value::map(list([
            Value::keyword("b"),
            Value::Int(2),
            Value::keyword("a"),
            Value::Int(1),
        ]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_map_assoc_replaces() {
        let entries = list([Value::keyword("a"), Value::Int(1)]);
        let entries = map_assoc(&entries, Value::keyword("a"), Value::Int(2));
        assert_eq!(list_len(&entries), 2);
        assert_eq!(map_get(&entries, &Value::keyword("a")), Some(Value::Int(2)));
    }

    #[test]
    fn test_list_to_array_checks_length() {
        assert!(list_to_array::<2>(&ints(2)).is_some());
        assert!(list_to_array::<2>(&ints(3)).is_none());
        assert!(list_to_array::<2>(&ints(1)).is_none());
    }

    #[test]
    fn test_append_shares_tail() {
        let joined = append(&ints(2), ints(1));
        assert_eq!(joined.to_string(), "(1 2 1)");
    }

    #[test]
    fn test_dropping_long_list_does_not_overflow() {
        let long = ints(1_000_000);
        assert_eq!(list_len(&long), 1_000_000);
        drop(long);
    }

    /// `depth` lists each holding the previous one as its only element
    fn nested(depth: usize) -> Value {
        (0..depth).fold(Value::Nil, |acc, _| list([acc]))
    }

    #[test]
    fn test_dropping_deeply_nested_value_does_not_overflow() {
        let deep = Value::vector(nested(500_000));
        drop(deep);
    }

    #[test]
    fn test_deeply_nested_values_compare_iteratively() {
        let a = nested(500_000);
        let b = nested(500_000);
        assert_eq!(a, b);
        assert!(values_equal(&a, &b));
        assert_ne!(a, nested(499_999));
    }

    #[test]
    fn test_map_keeps_last_duplicate() {
        let entries = list([
            Value::keyword("a"),
            Value::Int(1),
            Value::keyword("b"),
            Value::Int(2),
            Value::keyword("a"),
            Value::Int(3),
        ]);
        let map = Value::map(entries);
        assert_eq!(map.to_string(), "{:b 2 :a 3}");
        assert_eq!(map, map.clone());
        assert!(values_equal(&map, &map));
    }

    #[test]
    fn test_builtins_compare_by_function() {
        fn one(_: &Value, _: &Rc<Environment>) -> Result<Value> {
            Ok(Value::Int(1))
        }
        fn two(_: &Value, _: &Rc<Environment>) -> Result<Value> {
            Ok(Value::Int(2))
        }
        assert_eq!(Value::builtin("f", one), Value::builtin("f", one));
        assert_ne!(Value::builtin("f", one), Value::builtin("f", two));
    }

    #[test]
    fn test_atoms_compare_by_identity() {
        let a = Value::atom(Value::Int(1));
        let b = Value::atom(Value::Int(1));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
