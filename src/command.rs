use crate::builtin::{self, Cat, Cd, Echo, Grep, Ls, Pwd, WC};
use crate::env::CommandEnvironment;
use std::io::{self, Read, Write};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Where a command's body runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Inside a forked child, wired through channels.
    Detached,
    /// Inside the shell process itself.
    InProcess,
}

/// The built-in commands known to the shell at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Echo,
    Cat,
    Pwd,
    Wc,
    Grep,
    Ls,
    Cd,
}

impl BuiltinKind {
    pub const ALL: [BuiltinKind; 7] = [
        BuiltinKind::Echo,
        BuiltinKind::Cat,
        BuiltinKind::Pwd,
        BuiltinKind::Wc,
        BuiltinKind::Grep,
        BuiltinKind::Ls,
        BuiltinKind::Cd,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Echo => "echo",
            BuiltinKind::Cat => "cat",
            BuiltinKind::Pwd => "pwd",
            BuiltinKind::Wc => "wc",
            BuiltinKind::Grep => "grep",
            BuiltinKind::Ls => "ls",
            BuiltinKind::Cd => "cd",
        }
    }

    /// Commands that drain standard input run detached: reading the live
    /// terminal to exhaustion inside the shell would leave it at end-of-file.
    /// `cd` has to run in-process so the new directory is visible afterwards.
    pub fn placement(self) -> Placement {
        match self {
            BuiltinKind::Cat | BuiltinKind::Wc | BuiltinKind::Grep => Placement::Detached,
            BuiltinKind::Echo | BuiltinKind::Pwd | BuiltinKind::Ls | BuiltinKind::Cd => {
                Placement::InProcess
            }
        }
    }

    /// Parses `argv` for this built-in and runs it.
    pub fn run(
        self,
        argv: &[String],
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut CommandEnvironment<'_>,
    ) -> io::Result<ExitCode> {
        match self {
            BuiltinKind::Echo => builtin::run::<Echo>(argv, stdin, stdout, env),
            BuiltinKind::Cat => builtin::run::<Cat>(argv, stdin, stdout, env),
            BuiltinKind::Pwd => builtin::run::<Pwd>(argv, stdin, stdout, env),
            BuiltinKind::Wc => builtin::run::<WC>(argv, stdin, stdout, env),
            BuiltinKind::Grep => builtin::run::<Grep>(argv, stdin, stdout, env),
            BuiltinKind::Ls => builtin::run::<Ls>(argv, stdin, stdout, env),
            BuiltinKind::Cd => builtin::run::<Cd>(argv, stdin, stdout, env),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in BuiltinKind::ALL {
            assert_eq!(BuiltinKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BuiltinKind::from_name("exit"), None);
        assert_eq!(BuiltinKind::from_name("ECHO"), None);
    }

    #[test]
    fn stdin_consumers_are_detached() {
        let detached: Vec<_> = BuiltinKind::ALL
            .into_iter()
            .filter(|k| k.placement() == Placement::Detached)
            .map(BuiltinKind::name)
            .collect();
        assert_eq!(detached, vec!["cat", "wc", "grep"]);
    }
}
