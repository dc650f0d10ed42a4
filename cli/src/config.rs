//! Command-line configuration

use std::path::PathBuf;

use clap::Parser;

const HISTORY_FILE: &str = ".cellar_history";

#[derive(Parser, Debug)]
#[command(name = "cellar")]
#[command(version, about = "A small Lisp built from pairs")]
pub struct Cli {
    /// Script to run; without one the REPL starts
    pub file: Option<PathBuf>,

    /// Arguments made available to the script as *ARGV*
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Evaluate EXPR, print the last result and exit
    #[arg(short, long, value_name = "EXPR", conflicts_with = "file")]
    pub eval: Option<String>,

    /// REPL history file
    #[arg(long, env = "CELLAR_HISTORY", value_name = "PATH")]
    pub history: Option<PathBuf>,

    /// Do not read or write REPL history
    #[arg(long, conflicts_with = "history")]
    pub no_history: bool,
}

impl Cli {
    /// Where REPL history lives, if anywhere
    pub fn history_path(&self) -> Option<PathBuf> {
        if self.no_history {
            return None;
        }
        self.history
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(HISTORY_FILE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_with_arguments() {
        let cli = Cli::try_parse_from(["cellar", "script.clr", "a", "--flag"]).unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("script.clr")));
        assert_eq!(cli.args, vec!["a".to_string(), "--flag".to_string()]);
        assert!(cli.eval.is_none());
    }

    #[test]
    fn test_eval_flag() {
        let cli = Cli::try_parse_from(["cellar", "-e", "(+ 1 2)"]).unwrap();
        assert_eq!(cli.eval.as_deref(), Some("(+ 1 2)"));
        assert!(cli.file.is_none());
    }

    #[test]
    fn test_history_override() {
        let cli = Cli::try_parse_from(["cellar", "--history", "/tmp/h"]).unwrap();
        assert_eq!(cli.history_path(), Some(PathBuf::from("/tmp/h")));

        let cli = Cli::try_parse_from(["cellar", "--no-history"]).unwrap();
        assert_eq!(cli.history_path(), None);
    }
}
