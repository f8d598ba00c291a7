use crate::command::ExitCode;
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::executor::execute_command;
use crate::expander::expand;
use crate::io_adapters::InputSource;
use crate::parser::{self, Command};
use crate::tokenizer::{self, Status, Tokenizer};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Cursor, Write};

/// A line-oriented shell: reads command lines and runs their pipelines.
///
/// The interpreter owns the global [`Environment`]; every command gets a
/// short-lived view of it, and only assignment-only lines and `cd` write to
/// it.
///
/// Example
/// ```
/// use shell_pipeline::{Environment, InputSource, Interpreter, ShellConfig};
/// let mut sh = Interpreter::new(Environment::new(), ShellConfig::default());
/// let mut out = Vec::new();
/// sh.run_line("GREETING=hello\n", InputSource::Inherited, &mut out).unwrap();
/// sh.run_line("echo $GREETING world\n", InputSource::Inherited, &mut out).unwrap();
/// assert_eq!(out, b"hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    config: ShellConfig,
    last_status: ExitCode,
}

impl Default for Interpreter {
    /// An interpreter over the process environment with default settings.
    fn default() -> Self {
        Self::new(Environment::load(), ShellConfig::default())
    }
}

impl Interpreter {
    pub fn new(env: Environment, config: ShellConfig) -> Self {
        Self {
            env,
            config,
            last_status: 0,
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Status of the most recently completed line.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Runs the configured one-shot command, or the interactive loop.
    pub fn run(&mut self) -> anyhow::Result<ExitCode> {
        match self.config.command.clone() {
            Some(line) => {
                let line = format!("{line}\n");
                let mut stdout = io::stdout();
                let code = match self.run_line(&line, InputSource::Inherited, &mut stdout) {
                    Ok(code) | Err(ShellError::Exit(code)) => code,
                    Err(e) => {
                        eprintln!("{e}");
                        1
                    }
                };
                stdout.flush()?;
                Ok(code)
            }
            None => self.repl(),
        }
    }

    /// Runs one complete command line.
    ///
    /// Variables are expanded once, against the environment as it is at the
    /// start of the line, before the pipeline is split into commands.
    pub fn run_line(
        &mut self,
        line: &str,
        input: InputSource<'_>,
        out: &mut dyn Write,
    ) -> ShellResult<ExitCode> {
        let (status, tokens) = tokenizer::tokenize(line)?;
        if status == Status::Waiting {
            return Err(ShellError::Incomplete);
        }
        let tokens = expand(&tokens, &self.env);
        let pipeline = parser::parse(&tokens);
        let code = self.execute_pipeline(&pipeline, input, out)?;
        self.last_status = code;
        Ok(code)
    }

    /// Runs the stages of a pipeline one after another.
    ///
    /// The first stage reads `input`, the last writes to `out`; every stage
    /// in between reads the complete output of its predecessor from memory.
    /// The pipeline's status is the status of its last stage.
    pub fn execute_pipeline(
        &mut self,
        pipeline: &[Command],
        input: InputSource<'_>,
        out: &mut dyn Write,
    ) -> ShellResult<ExitCode> {
        let Some((last, init)) = pipeline.split_last() else {
            return Ok(0);
        };

        let mut input = input;
        for (stage, command) in init.iter().enumerate() {
            let mut buffer = Vec::new();
            let code = execute_command(command, &mut self.env, &mut input, &mut buffer)?;
            tracing::trace!(stage, code, bytes = buffer.len(), "stage finished");
            input = InputSource::buffered(Cursor::new(buffer));
        }
        execute_command(last, &mut self.env, &mut input, out)
    }

    /// Interactive read-eval-print loop.
    ///
    /// Errors are printed and the loop goes on; `exit` and end-of-file stop
    /// it. Returns the status the process should exit with.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        let mut rl = DefaultEditor::new()?;

        loop {
            let Some(line) = self.read_command(&mut rl)? else {
                return Ok(self.last_status);
            };
            if line.trim().is_empty() {
                continue;
            }
            if !self.config.no_history {
                rl.add_history_entry(line.trim_end())?;
            }

            let mut stdout = io::stdout();
            match self.run_line(&line, InputSource::Inherited, &mut stdout) {
                Ok(_) => {}
                Err(ShellError::Exit(code)) => return Ok(code),
                Err(e) => {
                    tracing::debug!(error = %e, "line failed");
                    eprintln!("{e}");
                    self.last_status = 1;
                }
            }
            stdout.flush()?;
        }
    }

    /// Reads lines until they form a complete command.
    ///
    /// Returns `None` at end-of-file. An interrupt drops the partial input.
    fn read_command(&self, rl: &mut DefaultEditor) -> anyhow::Result<Option<String>> {
        let mut tokenizer = Tokenizer::new();
        let mut text = String::new();

        loop {
            let prompt = if text.is_empty() {
                &self.config.prompt
            } else {
                &self.config.continuation_prompt
            };
            match rl.readline(prompt) {
                Ok(mut line) => {
                    line.push('\n');
                    tokenizer.update(&line)?;
                    text.push_str(&line);
                    if tokenizer.status() == Status::Done {
                        return Ok(Some(text));
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tokenizer = Tokenizer::new();
                    text.clear();
                }
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(err.into()),
            }
        }
    }
}
