//! Shell word tokenization on top of the pushdown lexer.

use crate::error::LexerError;
use crate::lexer::{AnnotatedChar, Control, Grammar, PushdownLexer, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    /// Between words.
    Zero,
    Word,
    SingleQuote,
    DoubleQuote,
    /// Right after a backslash.
    Escape,
    /// Emits a single `|` token.
    Pipe,
}

/// Shell words: whitespace separation, quotes, backslash escapes and `|`.
pub struct ShellGrammar;

impl Grammar for ShellGrammar {
    type State = ShellState;

    fn zero(&self) -> ShellState {
        ShellState::Zero
    }

    fn step(
        &self,
        state: ShellState,
        c: char,
        ctl: &mut Control<'_, ShellState>,
    ) -> Result<(), LexerError> {
        match state {
            ShellState::Zero => {
                if c == '|' {
                    ctl.push_and_delegate(ShellState::Pipe);
                } else if !c.is_whitespace() {
                    ctl.start_token()?;
                    ctl.push_and_delegate(ShellState::Word);
                }
            }
            ShellState::Word => match c {
                '\\' => ctl.push(ShellState::Escape),
                '\'' => {
                    ctl.push_char(AnnotatedChar::boundary())?;
                    ctl.push(ShellState::SingleQuote);
                }
                '"' => {
                    ctl.push_char(AnnotatedChar::boundary())?;
                    ctl.push(ShellState::DoubleQuote);
                }
                '|' => {
                    ctl.end_token()?;
                    ctl.pop()?;
                    ctl.push_and_delegate(ShellState::Pipe);
                }
                c if c.is_whitespace() => {
                    ctl.end_token()?;
                    ctl.pop_and_delegate()?;
                }
                c => ctl.push_char(AnnotatedChar::plain(c))?,
            },
            ShellState::SingleQuote => {
                if c == '\'' {
                    ctl.push_char(AnnotatedChar::boundary())?;
                    ctl.pop()?;
                } else {
                    ctl.push_char(AnnotatedChar::single_quoted(c))?;
                }
            }
            ShellState::DoubleQuote => match c {
                '\\' => ctl.push(ShellState::Escape),
                '"' => {
                    ctl.push_char(AnnotatedChar::boundary())?;
                    ctl.pop()?;
                }
                c => ctl.push_char(AnnotatedChar::plain(c))?,
            },
            ShellState::Escape => {
                // An escaped line break joins the lines without a character.
                if c != '\n' {
                    ctl.push_char(AnnotatedChar::escaped(c))?;
                }
                ctl.pop()?;
            }
            ShellState::Pipe => {
                ctl.start_token()?;
                ctl.push_char(AnnotatedChar::plain(c))?;
                ctl.end_token()?;
                ctl.pop()?;
            }
        }
        Ok(())
    }
}

/// Whether the tokenizer needs more input to finish the current command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Waiting,
    Done,
}

/// Splits shell input into tokens, possibly across several input chunks.
///
/// Input is expected to end with whitespace (usually a newline); otherwise the
/// last word stays open and [`Tokenizer::status`] reports [`Status::Waiting`].
pub struct Tokenizer {
    lexer: PushdownLexer<ShellGrammar>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            lexer: PushdownLexer::new(ShellGrammar),
        }
    }

    pub fn update(&mut self, chunk: &str) -> Result<(), LexerError> {
        self.lexer.update(chunk)
    }

    pub fn status(&self) -> Status {
        if self.lexer.at_zero() {
            Status::Done
        } else {
            Status::Waiting
        }
    }

    pub fn tokens(&self) -> &[Token] {
        self.lexer.tokens()
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.lexer.into_tokens()
    }
}

/// Tokenizes one complete chunk of input.
pub fn tokenize(input: &str) -> Result<(Status, Vec<Token>), LexerError> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.update(input)?;
    Ok((tokenizer.status(), tokenizer.into_tokens()))
}
