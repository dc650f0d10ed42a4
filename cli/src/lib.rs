//! Cellar command-line driver
//!
//! Runs a script, a single `--eval` expression or the interactive REPL on
//! top of the core interpreter, and adds the primitives that touch the
//! filesystem.

pub mod config;
pub mod driver;
pub mod repl;

pub use config::Cli;
pub use driver::{eval_source, load_file, prepare_env};

use anyhow::Result;

/// Dispatch on the parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let env = prepare_env(&cli.args)?;

    if let Some(source) = &cli.eval {
        if let Some(value) = eval_source(source, &env)? {
            println!("{}", cellar::print(&value, true));
        }
        return Ok(());
    }

    match &cli.file {
        Some(path) => load_file(path, &env),
        None => repl::run(&env, cli.history_path()),
    }
}
