//! Interactive Read-Eval-Print Loop with rustyline

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Result;
use cellar::{Environment, print};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::driver::eval_forms;

const PROMPT: &str = "user> ";
const CONTINUATION_PROMPT: &str = "  ... ";

/// What to do with the text typed so far
#[derive(Debug, PartialEq)]
pub enum Outcome {
    /// The forms ran; printed value of the last one, if there was one
    Printed(Option<String>),
    /// The reader wants more input before anything can run
    NeedMore,
    /// Reading or evaluation failed
    Failed(String),
}

/// Evaluate one REPL entry, which may span several lines
pub fn evaluate(buffer: &str, env: &Rc<Environment>) -> Outcome {
    match eval_forms(buffer, env) {
        Ok(last) => Outcome::Printed(last.map(|value| print(&value, true))),
        Err(e) if e.is_incomplete() => Outcome::NeedMore,
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

pub fn run(env: &Rc<Environment>, history: Option<PathBuf>) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(path) = &history {
        // A missing history file just means a first session
        let _ = rl.load_history(path);
    }

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() {
            PROMPT
        } else {
            CONTINUATION_PROMPT
        };
        match rl.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');
                if buffer.trim().is_empty() {
                    buffer.clear();
                    continue;
                }

                match evaluate(&buffer, env) {
                    Outcome::NeedMore => continue,
                    Outcome::Printed(Some(text)) => println!("{text}"),
                    Outcome::Printed(None) => {}
                    Outcome::Failed(message) => eprintln!("Error: {message}"),
                }
                rl.add_history_entry(buffer.trim_end())?;
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }

    if let Some(path) = &history
        && let Err(e) = rl.save_history(path)
    {
        warn!(path = %path.display(), error = %e, "could not save history");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::prepare_env;

    #[test]
    fn test_complete_entry_prints_last_value() {
        let env = prepare_env(&[]).unwrap();
        assert_eq!(
            evaluate("(def! x 3)\n(* x x)\n", &env),
            Outcome::Printed(Some("9".to_string()))
        );
    }

    #[test]
    fn test_open_form_needs_more_input() {
        let env = prepare_env(&[]).unwrap();
        assert_eq!(evaluate("(+ 1\n", &env), Outcome::NeedMore);
        assert_eq!(evaluate("(+ 1\n 2)\n", &env), Outcome::Printed(Some("3".into())));
        assert_eq!(evaluate("\"abc\n", &env), Outcome::NeedMore);
    }

    #[test]
    fn test_errors_do_not_end_the_session() {
        let env = prepare_env(&[]).unwrap();
        assert_eq!(
            evaluate("(undefined)\n", &env),
            Outcome::Failed("'undefined' not found".to_string())
        );
        assert_eq!(evaluate(")\n", &env), Outcome::Failed("parse error: unexpected ')'".into()));
        assert_eq!(evaluate("(+ 2 2)", &env), Outcome::Printed(Some("4".into())));
    }

    #[test]
    fn test_comment_only_entry_prints_nothing() {
        let env = prepare_env(&[]).unwrap();
        assert_eq!(evaluate("; just a note\n", &env), Outcome::Printed(None));
    }
}
