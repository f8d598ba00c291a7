//! Error types for the shell core.

use crate::command::ExitCode;
use thiserror::Error;

/// Result type alias for shell core operations.
pub type ShellResult<T> = Result<T, ShellError>;

/// Invariant violations inside the pushdown lexer.
///
/// These come from broken grammar wiring, never from user input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LexerError {
    #[error("lexer: character pushed before a token was started")]
    TokenNotStarted,

    #[error("lexer: token started while another one is open")]
    TokenAlreadyStarted,

    #[error("lexer: attempt to pop the zero state")]
    StackUnderflow,
}

/// Misuse of a [`Channel`](crate::channel::Channel).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel: direction already registered")]
    DirectionAlreadySet,

    #[error("channel: {0} end used from the wrong direction")]
    WrongDirection(&'static str),

    #[error("channel: {0} end already closed")]
    AlreadyClosed(&'static str),
}

/// Errors reported at command or line granularity.
#[derive(Error, Debug)]
pub enum ShellError {
    /// `exit` was executed. Not really an error: terminates the loop.
    #[error("exit with code {0}")]
    Exit(ExitCode),

    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// The line ended inside a quote or right after a backslash.
    #[error("unexpected end of input")]
    Incomplete,

    #[error(transparent)]
    Lexer(#[from] LexerError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// A failed system call (pipe, fork, dup2, wait).
    #[error("{context}: {source}")]
    Os {
        context: &'static str,
        #[source]
        source: nix::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellError {
    pub(crate) fn os(context: &'static str) -> impl FnOnce(nix::Error) -> Self {
        move |source| ShellError::Os { context, source }
    }
}
