//! Environment for variable bindings
//!
//! Each scope keeps its bindings as a pair chain of `(symbol . value)` cells,
//! newest first, plus a shared link to the enclosing scope. Lookup is a linear
//! scan of each frame, walking outwards.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::interner::Symbol;
use crate::value::{ListIter, Value, cons, list_len};

thread_local! {
    static VARIADIC_MARKER: Symbol = Symbol::new("&");
}

/// The symbol that introduces a rest parameter
pub fn variadic_marker() -> Symbol {
    VARIADIC_MARKER.with(|marker| *marker)
}

pub struct Environment {
    bindings: RefCell<Value>,
    outer: Option<Rc<Environment>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("bindings", &list_len(&self.bindings.borrow()))
            .field("has_outer", &self.outer.is_some())
            .finish()
    }
}

impl Environment {
    /// Create a new, empty top-level environment
    pub fn new() -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(Value::Nil),
            outer: None,
        })
    }

    /// Create an empty scope whose lookups fall through to `outer`
    pub fn with_outer(outer: &Rc<Environment>) -> Rc<Self> {
        Rc::new(Environment {
            bindings: RefCell::new(Value::Nil),
            outer: Some(Rc::clone(outer)),
        })
    }

    /// Scope for a closure call: parameters bound positionally to `args`.
    ///
    /// A `& rest` parameter takes whatever arguments remain, possibly none.
    pub fn bind(outer: &Rc<Environment>, params: &Value, args: &Value) -> Result<Rc<Self>> {
        let env = Environment::with_outer(outer);
        let marker = variadic_marker();
        let mut params_iter = ListIter::new(params);
        let mut remaining = args.clone();

        while let Some(param) = params_iter.next() {
            let Value::Symbol(name) = param else {
                return Err(Error::type_error("fn*", "symbol parameter", &param));
            };
            if name == marker {
                return match params_iter.next() {
                    Some(Value::Symbol(rest)) => {
                        env.set(rest, remaining);
                        Ok(env)
                    }
                    _ => Err(Error::bad_form("fn*", "'&' must be followed by one symbol")),
                };
            }
            let next = match &remaining {
                Value::Cons(cell) => {
                    env.set(name, cell.car.clone());
                    cell.cdr.clone()
                }
                _ => return Err(arity_error(params, args)),
            };
            remaining = next;
        }

        if remaining.is_nil() {
            Ok(env)
        } else {
            Err(arity_error(params, args))
        }
    }

    /// Bind `symbol` in this scope, shadowing any earlier binding of it here
    pub fn set(&self, symbol: Symbol, value: Value) -> Value {
        let mut bindings = self.bindings.borrow_mut();
        let chain = std::mem::take(&mut *bindings);
        *bindings = cons(cons(Value::Symbol(symbol), value.clone()), chain);
        value
    }

    /// The innermost environment that binds `symbol`
    pub fn find(self: &Rc<Self>, symbol: Symbol) -> Option<Rc<Environment>> {
        let mut env = Rc::clone(self);
        loop {
            if env.lookup_local(symbol).is_some() {
                return Some(env);
            }
            let outer = Rc::clone(env.outer.as_ref()?);
            env = outer;
        }
    }

    /// Look up a variable, walking up the outer chain
    pub fn get(&self, symbol: Symbol) -> Result<Value> {
        let mut env = self;
        loop {
            if let Some(value) = env.lookup_local(symbol) {
                return Ok(value);
            }
            match &env.outer {
                Some(outer) => env = outer.as_ref(),
                None => return Err(Error::UnboundSymbol(symbol.name())),
            }
        }
    }

    /// The outermost environment of the chain
    pub fn root(self: &Rc<Self>) -> Rc<Environment> {
        let mut env = Rc::clone(self);
        while let Some(outer) = env.outer.clone() {
            env = outer;
        }
        env
    }

    fn lookup_local(&self, symbol: Symbol) -> Option<Value> {
        ListIter::new(&self.bindings.borrow()).find_map(|binding| match binding {
            Value::Cons(cell) => match cell.car {
                Value::Symbol(name) if name == symbol => Some(cell.cdr.clone()),
                _ => None,
            },
            _ => None,
        })
    }
}

fn arity_error(params: &Value, args: &Value) -> Error {
    let marker = variadic_marker();
    let required = ListIter::new(params)
        .take_while(|p| !matches!(p, Value::Symbol(s) if *s == marker))
        .count();
    let variadic = ListIter::new(params).any(|p| matches!(p, Value::Symbol(s) if s == marker));
    let expected = if variadic {
        format!("at least {required}")
    } else {
        required.to_string()
    };
    Error::arity("fn*", expected, list_len(args))
}
