//! Command dispatch and detached execution.
//!
//! Every command is routed to a [`Handler`] by name. Built-ins that consume
//! standard input and all external programs run in a forked child wired up
//! through two [`Channel`]s:
//!
//! ```text
//!             child stdin               child stdout
//! parent ──▶ [ Channel ] ──▶ child ──▶ [ Channel ] ──▶ parent ──▶ out
//! ```

use crate::channel::{Channel, Direction};
use crate::command::{BuiltinKind, ExitCode, Placement};
use crate::env::{CommandEnvironment, Environment};
use crate::error::{ShellError, ShellResult};
use crate::external::ExternalCommand;
use crate::io_adapters::InputSource;
use crate::parser::Command;
use nix::errno::Errno;
use nix::libc::{STDIN_FILENO, STDOUT_FILENO};
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, fork};
use std::fs::File;
use std::io::{self, Write};
use std::mem::ManuallyDrop;
use std::os::fd::FromRawFd;
use std::thread;

/// Status of a child that could not set itself up or exec its program.
pub const CHILD_SETUP_FAILURE: ExitCode = 126;

/// What runs a command with a given name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// A line with assignments only, e.g. `FOO=bar`.
    Assignment,
    Exit,
    Builtin(BuiltinKind),
    External,
}

impl Handler {
    pub fn select(name: &str) -> Self {
        match name {
            "" => Handler::Assignment,
            "exit" => Handler::Exit,
            _ => BuiltinKind::from_name(name).map_or(Handler::External, Handler::Builtin),
        }
    }
}

/// The part of a detached command that runs inside the child.
enum Body {
    Builtin(BuiltinKind),
    External(ExternalCommand),
}

/// Runs one command, reading `input` and writing its standard output to `out`.
///
/// Returns the command's exit status. A non-zero status is not an error;
/// errors are reserved for failures of the shell itself (command not found,
/// failed system calls) and for `exit`, which is reported as
/// [`ShellError::Exit`].
pub fn execute_command(
    command: &Command,
    env: &mut Environment,
    input: &mut InputSource<'_>,
    out: &mut dyn Write,
) -> ShellResult<ExitCode> {
    let handler = Handler::select(command.name());
    tracing::debug!(command = command.name(), ?handler, "dispatch");

    match handler {
        Handler::Assignment => {
            for a in command.assignments() {
                env.set(a.name.clone(), a.value.clone());
            }
            Ok(0)
        }
        Handler::Exit => Err(ShellError::Exit(parse_exit_code(command.args())?)),
        Handler::Builtin(kind) => {
            let mut cmd_env = CommandEnvironment::with_assignments(env, command.assignments());
            match kind.placement() {
                Placement::InProcess => {
                    let mut stdin = input.reader();
                    Ok(kind.run(command.words(), &mut stdin, out, &mut cmd_env)?)
                }
                Placement::Detached => {
                    run_detached(Body::Builtin(kind), command, &mut cmd_env, input, out)
                }
            }
        }
        Handler::External => {
            let mut cmd_env = CommandEnvironment::with_assignments(env, command.assignments());
            let external = ExternalCommand::resolve(command, &cmd_env)?;
            run_detached(Body::External(external), command, &mut cmd_env, input, out)
        }
    }
}

fn parse_exit_code(args: &[String]) -> ShellResult<ExitCode> {
    match args {
        [] => Ok(0),
        [code] => code
            .parse()
            .map_err(|_| ShellError::InvalidArgument(format!("exit: {code}: numeric argument required"))),
        _ => Err(ShellError::InvalidArgument("exit: too many arguments".into())),
    }
}

fn run_detached(
    body: Body,
    command: &Command,
    env: &mut CommandEnvironment<'_>,
    input: &mut InputSource<'_>,
    out: &mut dyn Write,
) -> ShellResult<ExitCode> {
    let mut child_stdin = Channel::open()?;
    let mut child_stdout = Channel::open()?;

    // SAFETY: the child only sets up descriptors, runs the command body and
    // leaves through `_exit`, never returning into the caller's frames.
    match unsafe { fork() }.map_err(ShellError::os("fork"))? {
        ForkResult::Child => {
            let code = match run_child(&body, command, env, input, &mut child_stdin, &mut child_stdout)
            {
                Ok(code) => code,
                Err(e) => {
                    let _ = writeln!(io::stderr(), "{}: {e}", command.name());
                    CHILD_SETUP_FAILURE
                }
            };
            // SAFETY: terminates the child without running the parent's
            // atexit handlers or flushing buffers it inherited.
            unsafe { nix::libc::_exit(code) }
        }
        ForkResult::Parent { child } => {
            tracing::debug!(command = command.name(), pid = child.as_raw(), "forked");
            let collected = collect_output(input, child_stdin, child_stdout, out);
            let code = reap(child)?;
            collected?;
            if code != 0 {
                tracing::debug!(command = command.name(), code, "child exited with failure");
            }
            Ok(code)
        }
    }
}

/// Parent side: feed the child's stdin and copy its stdout into `out`.
///
/// Feeding happens on a scoped helper thread so that neither side can fill
/// its pipe and block the other. The write end is closed as soon as the input
/// is exhausted; draining continues until the child closes its stdout.
fn collect_output(
    input: &mut InputSource<'_>,
    mut child_stdin: Channel,
    mut child_stdout: Channel,
    out: &mut dyn Write,
) -> ShellResult<()> {
    child_stdin.register(Direction::Write)?;
    child_stdout.register(Direction::Read)?;

    thread::scope(|s| -> ShellResult<()> {
        let feeder = s.spawn(move || -> ShellResult<u64> {
            let fed = feed(input, &mut child_stdin)?;
            child_stdin.close_write_end()?;
            Ok(fed)
        });

        let drained = child_stdout
            .read_end()
            .map_err(ShellError::from)
            .and_then(|reader| Ok(io::copy(reader, out)?));
        // Closing our read end unblocks a child still writing, which in turn
        // stops reading its input and releases the feeder.
        drop(child_stdout);

        let fed = feeder
            .join()
            .map_err(|_| io::Error::other("input feeder panicked"))??;
        let drained = drained?;
        tracing::trace!(fed, drained, "pipes closed");
        out.flush()?;
        Ok(())
    })
}

fn feed(input: &mut InputSource<'_>, channel: &mut Channel) -> ShellResult<u64> {
    match input.flush_to_channel(channel) {
        // The child exited without reading everything it was given.
        Err(ShellError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
            tracing::debug!("child closed its input early");
            Ok(0)
        }
        other => other,
    }
}

fn reap(child: Pid) -> ShellResult<ExitCode> {
    loop {
        match waitpid(child, None) {
            Ok(status) => return Ok(exit_code(status)),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(ShellError::os("waitpid")(e)),
        }
    }
}

/// Maps a wait status to a shell exit code, `128 + N` for death by signal N.
fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, signal, _) => 128 + signal as ExitCode,
        _ => -1,
    }
}

/// Child side: wire both channels to fd 0 and fd 1, then run the body.
fn run_child(
    body: &Body,
    command: &Command,
    env: &mut CommandEnvironment<'_>,
    input: &mut InputSource<'_>,
    child_stdin: &mut Channel,
    child_stdout: &mut Channel,
) -> ShellResult<ExitCode> {
    child_stdin.register(Direction::Read)?;
    input.bind_as_child_stdin(child_stdin)?;

    child_stdout.register(Direction::Write)?;
    nix::unistd::dup2(child_stdout.write_fd()?, STDOUT_FILENO)
        .map_err(ShellError::os("dup2 stdout"))?;

    match body {
        Body::Builtin(kind) => {
            // Read fd 0 itself: `io::stdin()` may hold bytes the parent
            // already buffered, and those belong to the parent.
            // SAFETY: fd 0 is open for the life of the child and the
            // `ManuallyDrop` never closes it.
            let mut stdin = ManuallyDrop::new(unsafe { File::from_raw_fd(STDIN_FILENO) });
            Ok(kind.run(command.words(), &mut *stdin, child_stdout.write_end()?, env)?)
        }
        Body::External(external) => {
            // Ignored signals survive `execve`; programs expect the default.
            // SAFETY: resetting to the default disposition installs no handler.
            unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }
                .map_err(ShellError::os("signal"))?;
            match external.exec() {
                Ok(never) => match never {},
                Err(e) => Err(ShellError::os("execve")(e)),
            }
        }
    }
}
