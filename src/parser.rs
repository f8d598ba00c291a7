use crate::env::Assignment;
use crate::lexer::Token;

/// A simple command: leading assignments, then the command name and its arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    assignments: Vec<Assignment>,
    words: Vec<String>,
}

impl Command {
    /// Builds a command from its words.
    ///
    /// A maximal prefix of `NAME=VALUE` words becomes the assignment list. The
    /// first word that is not an assignment starts the command line, and every
    /// later word is kept verbatim even if it looks like `NAME=VALUE`.
    pub fn new(words: Vec<String>) -> Self {
        let mut words = words.into_iter().peekable();
        let mut assignments = Vec::new();
        while let Some(a) = words.peek().and_then(|w| Assignment::parse(w)) {
            assignments.push(a);
            words.next();
        }
        Self {
            assignments,
            words: words.collect(),
        }
    }

    /// The command name, empty when the command is assignments only.
    pub fn name(&self) -> &str {
        self.words.first().map(String::as_str).unwrap_or_default()
    }

    /// The whole command line, name included (`argv`).
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Arguments after the command name.
    pub fn args(&self) -> &[String] {
        self.words.get(1..).unwrap_or_default()
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }
}

/// Commands connected by `|`, in execution order.
pub type Pipeline = Vec<Command>;

/// Groups expanded tokens into a pipeline.
///
/// Only a token that is a single bare `|` separates commands; quoted or
/// escaped bars are ordinary words. A trailing separator produces no empty
/// command.
pub fn parse(tokens: &[Token]) -> Pipeline {
    let mut pipeline = Vec::new();
    let mut words = Vec::new();
    for token in tokens {
        if token.is_pipe() {
            pipeline.push(Command::new(std::mem::take(&mut words)));
        } else {
            words.push(token.render());
        }
    }
    if !words.is_empty() {
        pipeline.push(Command::new(words));
    }
    pipeline
}
