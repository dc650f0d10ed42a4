use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

fn script(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

// Run a script with arguments; stdout on success, stderr on failure
fn run_script(content: &str, args: &[&str]) -> Result<String, String> {
    let file = script(content);
    let output = Command::new(env!("CARGO_BIN_EXE_cellar"))
        .arg(file.path())
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .map_err(|e| e.to_string())?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

fn run_eval(expr: &str) -> Result<String, String> {
    let output = Command::new(env!("CARGO_BIN_EXE_cellar"))
        .args(["--eval", expr])
        .env("RUST_LOG", "off")
        .output()
        .map_err(|e| e.to_string())?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        Err(String::from_utf8_lossy(&output.stderr).trim().to_string())
    }
}

#[test]
fn test_script_output() {
    let result = run_script(
        r#"
;; factorial
(def! fact (fn* (n) (if (<= n 1) 1 (* n (fact (- n 1))))))
(println "fact 5 =" (fact 5))
(prn (list 1 "two" :three))
"#,
        &[],
    );
    assert_eq!(
        result,
        Ok("fact 5 = 120\n(1 \"two\" :three)".to_string())
    );
}

#[test]
fn test_script_prints_nothing_by_itself() {
    assert_eq!(run_script("(+ 1 2)\n(def! x 5)", &[]), Ok(String::new()));
}

#[test]
fn test_argv() {
    let result = run_script("(prn *ARGV*)", &["a", "-b", "c d"]);
    assert_eq!(result, Ok("(\"a\" \"-b\" \"c d\")".to_string()));
}

#[test]
fn test_script_error_exits_with_failure() {
    let result = run_script("(println \"before\")\n(car 1)\n(println \"after\")", &[]);
    let stderr = result.unwrap_err();
    assert!(stderr.contains("first: expected list or vector, got integer 1"));
}

#[test]
fn test_unbalanced_script_fails() {
    let stderr = run_script("(def! x (+ 1 2)", &[]).unwrap_err();
    assert!(stderr.contains("parse error"));
}

#[test]
fn test_missing_script_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_cellar"))
        .arg("/no/such/script.clr")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

#[test]
fn test_load_file_from_script() {
    let library = script("(def! square (fn* (x) (* x x)))\n");
    let path = library.path().to_string_lossy().replace('\\', "\\\\");
    let result = run_script(&format!("(load-file \"{path}\")\n(prn (square 12))"), &[]);
    assert_eq!(result, Ok("144".to_string()));
}

#[test]
fn test_slurp() {
    let data = script("hello\nworld");
    let path = data.path().to_string_lossy().replace('\\', "\\\\");
    assert_eq!(
        run_eval(&format!("(slurp \"{path}\")")),
        Ok("\"hello\\nworld\"".to_string())
    );
}

#[test]
fn test_eval_flag_prints_last_result() {
    assert_eq!(run_eval("(def! x 6) (* x 7)"), Ok("42".to_string()));
    assert_eq!(run_eval("`(1 ~@(list 2 3))"), Ok("(1 2 3)".to_string()));
    assert!(run_eval("(/ 1 0)").unwrap_err().contains("division by zero"));
}
