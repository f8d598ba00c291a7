use crate::command::ExitCode;
use crate::env::CommandEnvironment;
use anyhow::{Context, Result};
use argh::{EarlyExit, FromArgs};
use regex::{Regex, RegexBuilder};
use std::borrow::Cow;
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Body of a built-in command.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`). The body reads
/// the standard input it is given and writes to the given standard output; it
/// must not care whether the input is the live terminal or a buffer.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Parses the arguments that follow the command name.
    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], args)
    }

    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode>;
}

/// Parses and runs a builtin.
///
/// Usage errors and failures of the body are reported on stderr and turned
/// into a non-zero status; only a failure to write that report is an error.
pub(crate) fn run<T: BuiltinCommand>(
    argv: &[String],
    stdin: &mut dyn Read,
    stdout: &mut dyn Write,
    env: &mut CommandEnvironment<'_>,
) -> io::Result<ExitCode> {
    let args: Vec<&str> = argv.iter().skip(1).map(String::as_str).collect();
    let cmd = match T::parse(&args) {
        Ok(cmd) => cmd,
        Err(EarlyExit { output, status }) => {
            return if status.is_ok() {
                stdout.write_all(output.as_bytes())?;
                Ok(0)
            } else {
                io::stderr().write_all(output.as_bytes())?;
                Ok(2)
            };
        }
    };
    let code = match cmd.execute(stdin, stdout, env) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(command = T::name(), error = %e, "builtin failed");
            writeln!(io::stderr(), "{e:#}")?;
            1
        }
    };
    stdout.flush()?;
    Ok(code)
}

/// Lets `-` through argh as a positional argument.
///
/// Only for commands without switches: everything after the leading `--` is
/// positional.
fn with_stdin_marker<'a>(args: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(args.len() + 1);
    out.push("--");
    out.extend_from_slice(args);
    out
}

fn resolve(env: &CommandEnvironment<'_>, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        env.working_dir().join(path)
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.working_dir().to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME environment variable.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory. Defaults to $HOME when omitted.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode> {
        let target = match self.target {
            Some(t) if !t.is_empty() => t,
            _ => match env.get("HOME") {
                Some(home) if !home.is_empty() => home.to_string(),
                _ => anyhow::bail!("cd: no target and HOME not set"),
            },
        };

        let new_dir = resolve(env, &target);
        let canonical = fs::canonicalize(&new_dir)
            .with_context(|| format!("cd: can't canonicalize {}", new_dir.display()))?;

        std::env::set_current_dir(&canonical)
            .with_context(|| format!("cd: can't chdir to {}", canonical.display()))?;
        env.change_dir(canonical);
        Ok(0)
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// list directory contents, one entry per line
pub struct Ls {
    #[argh(switch, short = 'a')]
    /// do not ignore entries starting with `.`
    pub all: bool,

    #[argh(positional, greedy)]
    /// directories to list; defaults to the current directory
    pub dirs: Vec<String>,
}

impl Ls {
    fn list(&self, dir: &Path, stdout: &mut dyn Write) -> Result<()> {
        let mut names = fs::read_dir(dir)
            .with_context(|| format!("ls: cannot access {}", dir.display()))?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<io::Result<Vec<_>>>()?;
        names.retain(|n| self.all || !n.starts_with('.'));
        names.sort();
        for name in names {
            writeln!(stdout, "{name}")?;
        }
        Ok(())
    }
}

impl BuiltinCommand for Ls {
    fn name() -> &'static str {
        "ls"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode> {
        if self.dirs.is_empty() {
            self.list(&env.working_dir(), stdout)?;
            return Ok(0);
        }
        let with_headers = self.dirs.len() > 1;
        for (i, dir) in self.dirs.iter().enumerate() {
            if with_headers {
                if i > 0 {
                    writeln!(stdout)?;
                }
                writeln!(stdout, "{dir}:")?;
            }
            self.list(&resolve(env, dir), stdout)?;
        }
        Ok(0)
    }
}

struct Counts {
    lines: usize,
    words: usize,
    bytes: usize,
}

impl Counts {
    fn of(data: &[u8]) -> Self {
        let text = String::from_utf8_lossy(data);
        Self {
            lines: data.iter().filter(|&&b| b == b'\n').count(),
            words: text.split_whitespace().count(),
            bytes: data.len(),
        }
    }
}

#[derive(argh::FromArgs)]
/// count lines, words and bytes
pub struct WC {
    #[argh(positional, greedy)]
    /// files to count; `-` or nothing reads standard input
    pub files: Vec<String>,
}

impl BuiltinCommand for WC {
    fn name() -> &'static str {
        "wc"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], &with_stdin_marker(args))
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode> {
        if self.files.is_empty() {
            let mut buf = Vec::new();
            stdin.read_to_end(&mut buf)?;
            let c = Counts::of(&buf);
            writeln!(stdout, "{} {} {}", c.lines, c.words, c.bytes)?;
            return Ok(0);
        }
        for fname in &self.files {
            let data = if fname == "-" {
                let mut buf = Vec::new();
                stdin.read_to_end(&mut buf)?;
                buf
            } else {
                fs::read(resolve(env, fname)).with_context(|| format!("wc: {fname}"))?
            };
            let c = Counts::of(&data);
            writeln!(stdout, "{} {} {} {}", c.lines, c.words, c.bytes, fname)?;
        }
        Ok(0)
    }
}

#[derive(argh::FromArgs)]
/// print file(s) to stdout
pub struct Cat {
    #[argh(positional, greedy)]
    /// files to print; `-` or nothing copies standard input
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::name()], &with_stdin_marker(args))
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode> {
        if self.files.is_empty() {
            io::copy(stdin, stdout)?;
            return Ok(0);
        }
        for fname in &self.files {
            if fname == "-" {
                io::copy(stdin, stdout)?;
                continue;
            }
            let mut f =
                fs::File::open(resolve(env, fname)).with_context(|| format!("cat: {fname}"))?;
            io::copy(&mut f, stdout)?;
        }
        Ok(0)
    }
}

#[derive(argh::FromArgs)]
/// print lines matching a pattern
pub struct Grep {
    #[argh(positional)]
    /// the pattern to search for (a regular expression)
    pub pattern: String,

    #[argh(positional, greedy)]
    /// files to search. If none provided, reads from stdin.
    pub files: Vec<String>,

    #[argh(switch, short = 'w')]
    /// match only whole words (using non-word characters as boundaries)
    pub word_regexp: bool,

    #[argh(switch, short = 'i')]
    /// ignore case distinctions
    pub ignore_case: bool,

    #[argh(option, short = 'A', default = "0")]
    /// print NUM lines of trailing context after matching lines
    pub after_context: usize,
}

impl Grep {
    fn regex(&self) -> Result<Regex> {
        let pattern: Cow<'_, str> = if self.word_regexp {
            format!(r"\b({})\b", self.pattern).into()
        } else {
            self.pattern.as_str().into()
        };
        RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .with_context(|| format!("grep: invalid regex pattern: {pattern}"))
    }

    /// Prints matching lines plus trailing context. Returns whether anything matched.
    fn search(
        &self,
        reader: &mut dyn Read,
        stdout: &mut dyn Write,
        prefix: Option<&str>,
        re: &Regex,
    ) -> Result<bool> {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        let mut context_left = 0usize;
        let mut last_printed: Option<usize> = None;
        let mut matched = false;
        let mut index = 0usize;

        while reader.read_line(&mut line)? > 0 {
            let is_match = re.is_match(line.trim_end_matches('\n'));
            if is_match || context_left > 0 {
                if self.after_context > 0 && last_printed.is_some_and(|p| index > p + 1) {
                    stdout.write_all(b"--\n")?;
                }
                if let Some(prefix) = prefix {
                    write!(stdout, "{prefix}:")?;
                }
                stdout.write_all(line.as_bytes())?;
                if !line.ends_with('\n') {
                    writeln!(stdout)?;
                }
                last_printed = Some(index);
            }
            if is_match {
                matched = true;
                context_left = self.after_context;
            } else {
                context_left = context_left.saturating_sub(1);
            }
            line.clear();
            index += 1;
        }
        Ok(matched)
    }
}

impl BuiltinCommand for Grep {
    fn name() -> &'static str {
        "grep"
    }

    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> Result<ExitCode> {
        let re = self.regex()?;

        if self.files.is_empty() {
            let matched = self.search(stdin, stdout, None, &re)?;
            return Ok(if matched { 0 } else { 1 });
        }

        let mut matched = false;
        let mut failed = false;
        for fname in &self.files {
            let result = fs::File::open(resolve(env, fname))
                .map_err(anyhow::Error::from)
                .and_then(|mut f| self.search(&mut f, stdout, Some(fname), &re));
            match result {
                Ok(m) => matched |= m,
                Err(e) => {
                    writeln!(io::stderr(), "grep: {fname}: {e}")?;
                    failed = true;
                }
            }
        }
        Ok(match (failed, matched) {
            (true, _) => 2,
            (false, true) => 0,
            (false, false) => 1,
        })
    }
}
