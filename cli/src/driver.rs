//! Script loading and the filesystem primitives

use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use cellar::native::{exact_args, extract_string};
use cellar::{Environment, Symbol, Value, eval, read, read_all, standard_env};
use tracing::debug;

/// `load-file` is defined in the language itself on top of `slurp`
const LOAD_FILE: &str =
    r#"(def! load-file (fn* (f) (eval (read-string (str "(do " (slurp f) "\nnil)")))))"#;

/// Reads a whole file into a string
fn slurp(args: &Value, _env: &Rc<Environment>) -> cellar::Result<Value> {
    let [path] = exact_args("slurp", args)?;
    let path = extract_string("slurp", &path)?;
    debug!(path = %path, "slurp");
    fs::read_to_string(&*path)
        .map(Value::string)
        .map_err(|e| cellar::Error::Io(format!("slurp: {path}: {e}")))
}

/// Interpreter errors hold `Rc` values, so they cross into `anyhow` as text
fn lisp_error(e: cellar::Error) -> anyhow::Error {
    anyhow!("{e}")
}

/// Top-level environment with the standard primitives, `slurp`,
/// `load-file` and `*ARGV*` bound to `argv`
pub fn prepare_env(argv: &[String]) -> Result<Rc<Environment>> {
    let env = standard_env();
    env.set(Symbol::new("slurp"), Value::builtin("slurp", slurp));
    env.set(
        Symbol::new("*ARGV*"),
        argv.iter().map(Value::string).collect(),
    );
    let definition = read(LOAD_FILE).map_err(lisp_error)?;
    eval(definition, &env).map_err(lisp_error)?;
    Ok(env)
}

/// Evaluate every form in `source`; the value of the last one, if any
pub fn eval_forms(source: &str, env: &Rc<Environment>) -> cellar::Result<Option<Value>> {
    let mut last = None;
    for form in read_all(source)?.iter() {
        last = Some(eval(form, env)?);
    }
    Ok(last)
}

pub fn eval_source(source: &str, env: &Rc<Environment>) -> Result<Option<Value>> {
    eval_forms(source, env).map_err(lisp_error)
}

/// Run a script file: its forms are evaluated in order as one `do`
pub fn load_file(path: &Path, env: &Rc<Environment>) -> Result<()> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    debug!(path = %path.display(), bytes = text.len(), "loading file");
    read(&format!("(do {text}\nnil)"))
        .and_then(|program| eval(program, env))
        .map(drop)
        .map_err(lisp_error)
        .with_context(|| format!("while loading '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_is_bound() {
        let env = prepare_env(&["one".to_string(), "two".to_string()]).unwrap();
        let argv = eval_source("*ARGV*", &env).unwrap().unwrap();
        assert_eq!(argv.to_string(), "(\"one\" \"two\")");
    }

    #[test]
    fn test_empty_argv_is_empty_list() {
        let env = prepare_env(&[]).unwrap();
        let argv = eval_source("*ARGV*", &env).unwrap().unwrap();
        assert_eq!(argv, Value::Nil);
    }

    #[test]
    fn test_eval_forms_returns_last() {
        let env = prepare_env(&[]).unwrap();
        let last = eval_forms("(def! a 2) (* a 21)", &env).unwrap();
        assert_eq!(last, Some(Value::Int(42)));
        assert_eq!(eval_forms("  ; nothing\n", &env).unwrap(), None);
    }

    #[test]
    fn test_slurp_missing_file() {
        let env = prepare_env(&[]).unwrap();
        let err = eval_forms("(slurp \"/definitely/not/here\")", &env).unwrap_err();
        assert!(matches!(err, cellar::Error::Io(_)));
    }
}
