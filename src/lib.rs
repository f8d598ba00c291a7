//! A small line-oriented shell core.
//!
//! Input flows through a fixed sequence of stages:
//!
//! 1. the [`tokenizer`] splits raw text into annotated tokens, tracking quotes
//!    and escapes with a pushdown lexer;
//! 2. the [`expander`] substitutes `$NAME` references against the global
//!    [`Environment`];
//! 3. the [`parser`] groups tokens into a pipeline of commands with leading
//!    `NAME=VALUE` assignments;
//! 4. the [`Interpreter`] runs the pipeline stage by stage, either in-process
//!    or in a forked child connected through [`channel::Channel`]s.
//!
//! Built-in commands are parsed with [`argh`]; everything else is looked up in
//! `PATH` and started with `execve`.

mod builtin;
pub mod channel;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod expander;
pub mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod tokenizer;

pub use config::ShellConfig;
pub use env::{CommandEnvironment, Environment};
pub use error::{ShellError, ShellResult};
pub use interpreter::Interpreter;
pub use io_adapters::InputSource;
