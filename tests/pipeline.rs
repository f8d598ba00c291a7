use shell_pipeline::{Environment, InputSource, Interpreter, ShellConfig, ShellError};
use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

fn shell_binary() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_shell_pipeline"));
    cmd.env("RUST_LOG", "off");
    cmd
}

/// Runs `-c <line>` with `stdin` on the real standard input.
fn run_binary(line: &str, stdin: &str) -> (i32, String) {
    let mut child = shell_binary()
        .args(["-c", line])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn shell");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8(output.stdout).unwrap(),
    )
}

fn interpreter() -> Interpreter {
    let env = Environment::from_entries(["PATH=/usr/bin:/bin"]);
    Interpreter::new(env, ShellConfig::default())
}

fn run_lines(sh: &mut Interpreter, lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let mut out = Vec::new();
            let input = InputSource::buffered(Cursor::new(Vec::new()));
            sh.run_line(line, input, &mut out).expect("line runs");
            String::from_utf8(out).unwrap()
        })
        .collect()
}

#[test]
fn live_input_passes_through_cat_chain() {
    let (code, out) = run_binary("cat - | cat - | cat -", "TOP SECRET");
    assert_eq!(code, 0);
    assert_eq!(out, "TOP SECRET");
}

#[test]
fn live_input_is_consumed_by_first_stage() {
    let (code, out) = run_binary("cat - | echo \"TOP SECRET\"", "ignored\nentirely\n");
    assert_eq!(code, 0);
    assert_eq!(out, "TOP SECRET\n");
}

#[test]
fn scripted_repl_runs_each_line_once() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script");
    std::fs::write(&script, "cat\nhello\necho after\n").unwrap();

    let output = shell_binary()
        .args(["--prompt", "", "--no-history"])
        .stdin(std::fs::File::open(&script).unwrap())
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);

    // The shell had already read the whole script when `cat` started, so
    // `cat` sees end-of-file and every line is executed by the shell.
    assert!(!stdout.contains("hello"), "stdout: {stdout:?}");
    assert!(!stdout.contains("echo after"), "stdout: {stdout:?}");
    assert_eq!(stdout.matches("after").count(), 1, "stdout: {stdout:?}");
    assert!(stderr.contains("hello: command not found"), "stderr: {stderr:?}");
}

#[test]
fn failed_line_is_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("script");
    std::fs::write(&script, "missing-command-for-report\n").unwrap();

    let output = shell_binary()
        .env_remove("RUST_LOG")
        .args(["--prompt", "", "--no-history"])
        .stdin(std::fs::File::open(&script).unwrap())
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("missing-command-for-report").count(), 1, "{stderr:?}");
}

#[test]
fn exit_code_becomes_process_status() {
    assert_eq!(run_binary("exit 3", "").0, 3);
    assert_eq!(run_binary("echo x | grep y", "").0, 1);
}

#[test]
fn unknown_command_fails_the_line() {
    let output = shell_binary()
        .args(["-c", "no-such-command-anywhere"])
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no-such-command-anywhere: command not found"));
}

#[test]
fn variables_persist_across_lines() {
    let mut sh = interpreter();
    let out = run_lines(
        &mut sh,
        &[
            "VAR=value VARSP='value with spaces'\n",
            "echo $VAR\"SP\"\n",
            "echo '$VARSP' \"$VARSP\"\n",
            "ONCE=1 echo \"[$ONCE]\"\n",
            "echo \"[$ONCE]\"\n",
        ],
    );
    assert_eq!(out[1], "valueSP\n");
    assert_eq!(out[2], "$VARSP value with spaces\n");
    assert_eq!(out[3], "[]\n");
    assert_eq!(out[4], "[]\n");
}

#[test]
fn quoted_pipe_is_an_argument() {
    let mut sh = interpreter();
    let out = run_lines(&mut sh, &["echo a '|' b \\| c\n"]);
    assert_eq!(out[0], "a | b | c\n");
}

#[test]
fn files_flow_through_builtins_and_externals() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "alpha\nbeta\ngamma\n").unwrap();

    let mut sh = interpreter();
    let cd = format!("cd '{}'\n", dir.path().display());
    let out = run_lines(
        &mut sh,
        &[
            cd.as_str(),
            "cat notes.txt | grep a | wc\n",
            "ls | sh -c 'tr a-z A-Z'\n",
            "cd /\n",
        ],
    );
    assert_eq!(out[1], "3 3 17\n");
    assert_eq!(out[2], "NOTES.TXT\n");
}

#[test]
fn exit_stops_with_code() {
    let mut sh = interpreter();
    let mut out = Vec::new();
    let res = sh.run_line("exit 9\n", InputSource::Inherited, &mut out);
    assert!(matches!(res, Err(ShellError::Exit(9))));
}
