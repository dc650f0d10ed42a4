//! Evaluator
//!
//! `eval` is a loop over `(ast, env)`. Special forms and closure application
//! that end in tail position hand back the next `(ast, env)` instead of
//! recursing, so tail-recursive programs run in constant stack.

use std::rc::Rc;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::environment::{Environment, variadic_marker};
use crate::error::{Error, Result};
use crate::interner::Symbol;
use crate::value::{LambdaCell, ListIter, Value, cons, list, list_len, list_to_array};

// ============================================================================
// Special forms
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialForm {
    Def,
    Let,
    If,
    Fn,
    Do,
    Quote,
    Quasiquote,
    QuasiquoteExpand,
    Unquote,
    SpliceUnquote,
}

impl SpecialForm {
    const ALL: [SpecialForm; 10] = [
        SpecialForm::Def,
        SpecialForm::Let,
        SpecialForm::If,
        SpecialForm::Fn,
        SpecialForm::Do,
        SpecialForm::Quote,
        SpecialForm::Quasiquote,
        SpecialForm::QuasiquoteExpand,
        SpecialForm::Unquote,
        SpecialForm::SpliceUnquote,
    ];

    fn name(self) -> &'static str {
        match self {
            SpecialForm::Def => "def!",
            SpecialForm::Let => "let*",
            SpecialForm::If => "if",
            SpecialForm::Fn => "fn*",
            SpecialForm::Do => "do",
            SpecialForm::Quote => "quote",
            SpecialForm::Quasiquote => "quasiquote",
            SpecialForm::QuasiquoteExpand => "quasiquoteexpand",
            SpecialForm::Unquote => "unquote",
            SpecialForm::SpliceUnquote => "splice-unquote",
        }
    }

    fn lookup(symbol: Symbol) -> Option<SpecialForm> {
        static TABLE: Lazy<FxHashMap<Symbol, SpecialForm>> = Lazy::new(|| {
            SpecialForm::ALL
                .into_iter()
                .map(|form| (Symbol::new(form.name()), form))
                .collect()
        });
        TABLE.get(&symbol).copied()
    }

    fn symbol(self) -> Value {
        Value::symbol(self.name())
    }
}

/// Outcome of one dispatch step
enum Step {
    Done(Value),
    TailCall(Value, Rc<Environment>),
}

// ============================================================================
// Evaluator
// ============================================================================

pub fn eval(ast: Value, env: &Rc<Environment>) -> Result<Value> {
    let mut ast = ast;
    let mut env = Rc::clone(env);

    loop {
        let cell = match &ast {
            Value::Symbol(symbol) => return env.get(*symbol),
            Value::Vector(items) => return Ok(Value::vector(eval_each(items, &env)?)),
            Value::Map(entries) => return Ok(Value::map(eval_each(entries, &env)?)),
            Value::Cons(cell) => Rc::clone(cell),
            // Everything else, including the empty list, evaluates to itself
            _ => return Ok(ast.clone()),
        };

        let special = match &cell.car {
            Value::Symbol(head) => SpecialForm::lookup(*head),
            _ => None,
        };

        if let Some(form) = special {
            match eval_special(form, &cell.cdr, &env)? {
                Step::Done(value) => return Ok(value),
                Step::TailCall(next_ast, next_env) => {
                    ast = next_ast;
                    env = next_env;
                    continue;
                }
            }
        }

        let evaluated = eval_each(&ast, &env)?;
        let Value::Cons(call) = evaluated else {
            return Ok(Value::Nil);
        };
        match &call.car {
            Value::Lambda(lambda) => {
                trace!(args = list_len(&call.cdr), "applying closure");
                env = Environment::bind(&lambda.env, &lambda.params, &call.cdr)?;
                ast = lambda.body.clone();
            }
            Value::Builtin(builtin) => return (builtin.func)(&call.cdr, &env),
            other => return Err(Error::NotAFunction(other.to_string())),
        }
    }
}

/// Call a function value with an already evaluated argument list.
///
/// Used by primitives that take functions; closure bodies are evaluated with
/// a nested `eval`.
pub fn apply(func: &Value, args: &Value, env: &Rc<Environment>) -> Result<Value> {
    match func {
        Value::Lambda(lambda) => {
            let call_env = Environment::bind(&lambda.env, &lambda.params, args)?;
            eval(lambda.body.clone(), &call_env)
        }
        Value::Builtin(builtin) => (builtin.func)(args, env),
        other => Err(Error::NotAFunction(other.to_string())),
    }
}

/// Evaluate each element of a chain in order, keeping the structure
fn eval_each(items: &Value, env: &Rc<Environment>) -> Result<Value> {
    ListIter::new(items).map(|item| eval(item, env)).collect()
}

fn eval_special(form: SpecialForm, args: &Value, env: &Rc<Environment>) -> Result<Step> {
    match form {
        SpecialForm::Def => eval_def(args, env),
        SpecialForm::Let => eval_let(args, env),
        SpecialForm::If => eval_if(args, env),
        SpecialForm::Fn => eval_fn(args, env),
        SpecialForm::Do => eval_do(args, env),
        SpecialForm::Quote => {
            let [arg] = form_args(form, args)?;
            Ok(Step::Done(arg))
        }
        SpecialForm::Quasiquote => {
            let [template] = form_args(form, args)?;
            Ok(Step::TailCall(quasiquote(&template)?, Rc::clone(env)))
        }
        SpecialForm::QuasiquoteExpand => {
            let [template] = form_args(form, args)?;
            Ok(Step::Done(quasiquote(&template)?))
        }
        SpecialForm::Unquote | SpecialForm::SpliceUnquote => {
            Err(Error::MisplacedUnquote(form.name()))
        }
    }
}

fn form_args<const N: usize>(form: SpecialForm, args: &Value) -> Result<[Value; N]> {
    list_to_array(args).ok_or_else(|| {
        Error::bad_form(
            form.name(),
            format!("expected {N} argument(s), got {}", list_len(args)),
        )
    })
}

fn eval_def(args: &Value, env: &Rc<Environment>) -> Result<Step> {
    let [name, expr] = form_args(SpecialForm::Def, args)?;
    let Value::Symbol(symbol) = name else {
        return Err(Error::type_error("def!", "symbol", &name));
    };
    // Nothing is bound unless evaluation succeeds.
    let value = eval(expr, env)?;
    debug!(%symbol, "def!");
    Ok(Step::Done(env.set(symbol, value)))
}

/// Each binding opens its own scope on top of the previous one, so a closure
/// created in one binding keeps seeing the scope it was created in.
fn eval_let(args: &Value, env: &Rc<Environment>) -> Result<Step> {
    let Value::Cons(cell) = args else {
        return Err(Error::bad_form("let*", "missing bindings"));
    };
    let Some(bindings) = cell.car.as_sequence() else {
        return Err(Error::type_error("let*", "binding list", &cell.car));
    };

    let mut scope = Rc::clone(env);
    let mut pairs = ListIter::new(bindings);
    while let Some(name) = pairs.next() {
        let Value::Symbol(symbol) = name else {
            return Err(Error::type_error("let*", "symbol", &name));
        };
        let Some(expr) = pairs.next() else {
            return Err(Error::bad_form("let*", "odd number of binding forms"));
        };
        let value = eval(expr, &scope)?;
        scope = Environment::with_outer(&scope);
        scope.set(symbol, value);
    }
    if Rc::ptr_eq(&scope, env) {
        scope = Environment::with_outer(env);
    }

    Ok(Step::TailCall(body_form(&cell.cdr), scope))
}

fn eval_if(args: &Value, env: &Rc<Environment>) -> Result<Step> {
    let mut parts = ListIter::new(args);
    let (Some(condition), Some(then_branch)) = (parts.next(), parts.next()) else {
        return Err(Error::bad_form("if", "expected condition and branch"));
    };
    let else_branch = parts.next();
    if parts.next().is_some() {
        return Err(Error::bad_form("if", "too many branches"));
    }

    if eval(condition, env)?.is_truthy() {
        Ok(Step::TailCall(then_branch, Rc::clone(env)))
    } else {
        match else_branch {
            Some(branch) => Ok(Step::TailCall(branch, Rc::clone(env))),
            None => Ok(Step::Done(Value::Nil)),
        }
    }
}

fn eval_fn(args: &Value, env: &Rc<Environment>) -> Result<Step> {
    let Value::Cons(cell) = args else {
        return Err(Error::bad_form("fn*", "missing parameter list"));
    };
    let Some(params) = cell.car.as_sequence() else {
        return Err(Error::type_error("fn*", "parameter list", &cell.car));
    };
    check_params(params)?;

    Ok(Step::Done(Value::Lambda(Rc::new(LambdaCell {
        params: params.clone(),
        body: body_form(&cell.cdr),
        env: Rc::clone(env),
    }))))
}

fn check_params(params: &Value) -> Result<()> {
    let marker = variadic_marker();
    let mut iter = ListIter::new(params);
    while let Some(param) = iter.next() {
        match param {
            Value::Symbol(s) if s == marker => {
                return match (iter.next(), iter.next()) {
                    (Some(Value::Symbol(_)), None) => Ok(()),
                    _ => Err(Error::bad_form("fn*", "'&' must be followed by one symbol")),
                };
            }
            Value::Symbol(_) => {}
            other => return Err(Error::type_error("fn*", "symbol parameter", &other)),
        }
    }
    Ok(())
}

fn eval_do(args: &Value, env: &Rc<Environment>) -> Result<Step> {
    let mut rest = args.clone();
    loop {
        let next = match &rest {
            Value::Cons(cell) if cell.cdr.is_nil() => {
                return Ok(Step::TailCall(cell.car.clone(), Rc::clone(env)));
            }
            Value::Cons(cell) => {
                eval(cell.car.clone(), env)?;
                cell.cdr.clone()
            }
            _ => return Ok(Step::Done(Value::Nil)),
        };
        rest = next;
    }
}

/// A body of several forms runs as an implicit `do`
fn body_form(forms: &Value) -> Value {
    match forms {
        Value::Cons(cell) if cell.cdr.is_nil() => cell.car.clone(),
        Value::Cons(_) => cons(SpecialForm::Do.symbol(), forms.clone()),
        _ => Value::Nil,
    }
}

// ============================================================================
// Quasiquote
// ============================================================================

/// Expand a quasiquote template into code that builds it.
///
/// Nested `quasiquote` forms raise the depth and `unquote`/`splice-unquote`
/// lower it; only those at depth zero are substituted.
pub fn quasiquote(template: &Value) -> Result<Value> {
    expand(template, 0)
}

fn expand(form: &Value, depth: usize) -> Result<Value> {
    match form {
        Value::Cons(_) => {
            if let Some(arg) = wrapped(form, SpecialForm::Unquote)? {
                return match depth {
                    0 => Ok(arg),
                    _ => Ok(rebuild(SpecialForm::Unquote, expand(&arg, depth - 1)?)),
                };
            }
            if let Some(arg) = wrapped(form, SpecialForm::SpliceUnquote)? {
                return match depth {
                    0 => Err(Error::bad_form(
                        "splice-unquote",
                        "must appear inside a list",
                    )),
                    _ => Ok(rebuild(
                        SpecialForm::SpliceUnquote,
                        expand(&arg, depth - 1)?,
                    )),
                };
            }
            if let Some(arg) = wrapped(form, SpecialForm::Quasiquote)? {
                return Ok(rebuild(SpecialForm::Quasiquote, expand(&arg, depth + 1)?));
            }
            expand_list(form, depth)
        }
        Value::Vector(items) => Ok(list([Value::symbol("vec"), expand_list(items, depth)?])),
        _ => Ok(quoted(form.clone())),
    }
}

/// Right fold over the elements: `(cons e acc)` or, for a splice at depth
/// zero, `(concat spliced acc)`.
fn expand_list(items: &Value, depth: usize) -> Result<Value> {
    let mut reversed = Value::Nil;
    let mut current = items.clone();
    let tail = loop {
        let next = match &current {
            Value::Cons(cell) => {
                reversed = cons(cell.car.clone(), reversed);
                cell.cdr.clone()
            }
            tail => break tail.clone(),
        };
        current = next;
    };

    let mut acc = match tail {
        Value::Nil => Value::Nil,
        tail => quoted(tail),
    };
    for element in ListIter::new(&reversed) {
        if depth == 0 {
            if let Some(spliced) = wrapped(&element, SpecialForm::SpliceUnquote)? {
                acc = list([Value::symbol("concat"), spliced, acc]);
                continue;
            }
        }
        acc = list([Value::symbol("cons"), expand(&element, depth)?, acc]);
    }
    Ok(acc)
}

/// The argument of `(head arg)`, if `form` is headed by `head`
fn wrapped(form: &Value, head: SpecialForm) -> Result<Option<Value>> {
    let Value::Cons(cell) = form else {
        return Ok(None);
    };
    match &cell.car {
        Value::Symbol(s) if SpecialForm::lookup(*s) == Some(head) => {
            let [arg] = form_args(head, &cell.cdr)?;
            Ok(Some(arg))
        }
        _ => Ok(None),
    }
}

/// Code that rebuilds `(head <expansion>)`
fn rebuild(head: SpecialForm, expansion: Value) -> Value {
    list([
        Value::symbol("cons"),
        quoted(head.symbol()),
        list([Value::symbol("cons"), expansion, Value::Nil]),
    ])
}

fn quoted(form: Value) -> Value {
    list([SpecialForm::Quote.symbol(), form])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read;
    use crate::stdlib::standard_env;

    fn eval_str(input: &str) -> Result<Value> {
        let env = standard_env();
        eval(read(input)?, &env)
    }

    fn expand_str(input: &str) -> String {
        quasiquote(&read(input).unwrap()).unwrap().to_string()
    }

    #[test]
    fn test_self_evaluating() {
        assert_eq!(eval_str("42"), Ok(Value::Int(42)));
        assert_eq!(eval_str("\"s\""), Ok(Value::string("s")));
        assert_eq!(eval_str(":k"), Ok(Value::keyword("k")));
        assert_eq!(eval_str("()"), Ok(Value::Nil));
    }

    #[test]
    fn test_vector_elements_evaluated() {
        assert_eq!(eval_str("[1 (+ 1 1)]").unwrap().to_string(), "[1 2]");
        assert_eq!(eval_str("{:a (+ 1 2)}").unwrap().to_string(), "{:a 3}");
    }

    #[test]
    fn test_expand_atoms_are_quoted() {
        assert_eq!(expand_str("x"), "(quote x)");
        assert_eq!(expand_str("1"), "(quote 1)");
    }

    #[test]
    fn test_expand_unquote() {
        assert_eq!(expand_str("(unquote x)"), "x");
        assert_eq!(
            expand_str("(a (unquote b))"),
            "(cons (quote a) (cons b nil))"
        );
    }

    #[test]
    fn test_expand_splice() {
        assert_eq!(
            expand_str("(a (splice-unquote xs) b)"),
            "(cons (quote a) (concat xs (cons (quote b) nil)))"
        );
    }

    #[test]
    fn test_expand_vector() {
        assert_eq!(expand_str("[(unquote x)]"), "(vec (cons x nil))");
    }

    #[test]
    fn test_expand_nested_keeps_inner_unquote() {
        assert_eq!(
            expand_str("(quasiquote (unquote x))"),
            "(cons (quote quasiquote) (cons (cons (quote unquote) (cons (quote x) nil)) nil))"
        );
    }

    #[test]
    fn test_splice_outside_list_errors() {
        assert!(quasiquote(&read("(splice-unquote x)").unwrap()).is_err());
    }

    #[test]
    fn test_unquote_outside_quasiquote() {
        assert_eq!(
            eval_str("(unquote 1)"),
            Err(Error::MisplacedUnquote("unquote"))
        );
        assert_eq!(
            eval_str("(splice-unquote (list 1))"),
            Err(Error::MisplacedUnquote("splice-unquote"))
        );
    }

    #[test]
    fn test_malformed_forms() {
        assert!(matches!(eval_str("(def! 1 2)"), Err(Error::Type { .. })));
        assert!(matches!(eval_str("(if)"), Err(Error::BadForm { .. })));
        assert!(matches!(eval_str("(quote a b)"), Err(Error::BadForm { .. })));
        assert!(matches!(eval_str("(let* (a) a)"), Err(Error::BadForm { .. })));
        assert!(matches!(eval_str("(fn* (a &) a)"), Err(Error::BadForm { .. })));
    }

    #[test]
    fn test_not_a_function() {
        assert_eq!(eval_str("(1 2)"), Err(Error::NotAFunction("1".to_string())));
    }
}
