//! A grammar-agnostic pushdown lexer.
//!
//! The lexer keeps an explicit stack of states. Every input character is handed
//! to the state on top of the stack, which reacts through a [`Control`] handle:
//! it may push or pop states, ask for the same character to be re-dispatched to
//! the new top of the stack (delegation), and build tokens out of
//! [`AnnotatedChar`]s. The concrete grammar lives in a [`Grammar`] impl, so the
//! same engine serves both shell words and `PATH` splitting.

use crate::error::LexerError;
use std::fmt;

/// Whether a character was quoted by a backslash (or by single quotes).
///
/// Two equal characters with different escape status are different for every
/// later stage: an escaped `|` is text, an unescaped one is a pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escape {
    Escaped,
    Unescaped,
}

/// Which later processing a character opts out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ignore {
    /// Plain character, nothing is skipped.
    Nothing,
    /// Came from inside single quotes: variable expansion must skip it.
    SuppressVariables,
    /// Zero-width boundary marker placed at quote open/close points.
    ///
    /// Renders to nothing, but stops variable-name scanning.
    PurelyStructural,
}

/// A character together with the lexical context it was read in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotatedChar {
    pub ch: char,
    pub escape: Escape,
    pub ignore: Ignore,
}

impl AnnotatedChar {
    /// An unescaped character with no ignore tag.
    pub fn plain(ch: char) -> Self {
        Self {
            ch,
            escape: Escape::Unescaped,
            ignore: Ignore::Nothing,
        }
    }

    /// A backslash-escaped character.
    pub fn escaped(ch: char) -> Self {
        Self {
            ch,
            escape: Escape::Escaped,
            ignore: Ignore::Nothing,
        }
    }

    /// A character read between single quotes.
    pub fn single_quoted(ch: char) -> Self {
        Self {
            ch,
            escape: Escape::Escaped,
            ignore: Ignore::SuppressVariables,
        }
    }

    /// The zero-width quote boundary marker.
    pub fn boundary() -> Self {
        Self {
            ch: '\0',
            escape: Escape::Unescaped,
            ignore: Ignore::PurelyStructural,
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.ignore == Ignore::PurelyStructural
    }

    /// True for an unescaped character without any ignore tag.
    pub fn is_bare(&self) -> bool {
        self.escape == Escape::Unescaped && self.ignore == Ignore::Nothing
    }
}

/// A maximal unit of input: a word or a lone pipe symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    chars: Vec<AnnotatedChar>,
}

impl Token {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, c: AnnotatedChar) {
        self.chars.push(c);
    }

    pub fn chars(&self) -> &[AnnotatedChar] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// A token that is exactly one bare `|` character.
    pub fn is_pipe(&self) -> bool {
        matches!(self.chars.as_slice(), [c] if c.ch == '|' && c.is_bare())
    }

    /// Flattens the token to text, dropping boundary markers.
    pub fn render(&self) -> String {
        self.chars
            .iter()
            .filter(|c| !c.is_boundary())
            .map(|c| c.ch)
            .collect()
    }
}

impl FromIterator<AnnotatedChar> for Token {
    fn from_iter<I: IntoIterator<Item = AnnotatedChar>>(iter: I) -> Self {
        Self {
            chars: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A set of lexer states and the rules that connect them.
pub trait Grammar {
    type State: Copy + PartialEq + fmt::Debug;

    /// The bottom-of-stack state the lexer starts in.
    fn zero(&self) -> Self::State;

    /// Reacts to one character while `state` is on top of the stack.
    fn step(
        &self,
        state: Self::State,
        c: char,
        ctl: &mut Control<'_, Self::State>,
    ) -> Result<(), LexerError>;
}

/// The handle a state uses to drive the lexer.
pub struct Control<'a, S> {
    stack: &'a mut Vec<S>,
    builder: &'a mut TokenBuilder,
    delegate: bool,
}

impl<S> Control<'_, S> {
    pub fn push(&mut self, state: S) {
        self.stack.push(state);
    }

    /// Pushes `state` and hands it the current character as well.
    pub fn push_and_delegate(&mut self, state: S) {
        self.stack.push(state);
        self.delegate = true;
    }

    pub fn pop(&mut self) -> Result<(), LexerError> {
        // The zero state is never popped.
        if self.stack.len() <= 1 {
            return Err(LexerError::StackUnderflow);
        }
        self.stack.pop();
        Ok(())
    }

    /// Pops the current state and hands the current character to the state below.
    pub fn pop_and_delegate(&mut self) -> Result<(), LexerError> {
        self.pop()?;
        self.delegate = true;
        Ok(())
    }

    pub fn push_char(&mut self, c: AnnotatedChar) -> Result<(), LexerError> {
        self.builder.push_char(c)
    }

    pub fn start_token(&mut self) -> Result<(), LexerError> {
        self.builder.start()
    }

    pub fn end_token(&mut self) -> Result<(), LexerError> {
        self.builder.end()
    }

    pub fn token_started(&self) -> bool {
        self.builder.current.is_some()
    }
}

#[derive(Debug, Default)]
struct TokenBuilder {
    current: Option<Token>,
    done: Vec<Token>,
}

impl TokenBuilder {
    fn push_char(&mut self, c: AnnotatedChar) -> Result<(), LexerError> {
        match self.current.as_mut() {
            Some(token) => {
                token.push(c);
                Ok(())
            }
            None => Err(LexerError::TokenNotStarted),
        }
    }

    fn start(&mut self) -> Result<(), LexerError> {
        if self.current.is_some() {
            return Err(LexerError::TokenAlreadyStarted);
        }
        self.current = Some(Token::new());
        Ok(())
    }

    fn end(&mut self) -> Result<(), LexerError> {
        let token = self.current.take().ok_or(LexerError::TokenNotStarted)?;
        self.done.push(token);
        Ok(())
    }
}

/// Runs a [`Grammar`] over a character stream.
pub struct PushdownLexer<G: Grammar> {
    grammar: G,
    stack: Vec<G::State>,
    builder: TokenBuilder,
}

impl<G: Grammar> PushdownLexer<G> {
    pub fn new(grammar: G) -> Self {
        let stack = vec![grammar.zero()];
        Self {
            grammar,
            stack,
            builder: TokenBuilder::default(),
        }
    }

    /// The state on top of the stack.
    pub fn current_state(&self) -> G::State {
        // The stack always holds at least the zero state.
        self.stack[self.stack.len() - 1]
    }

    /// True when only the zero state is left.
    pub fn at_zero(&self) -> bool {
        self.stack.len() == 1
    }

    pub fn update_char(&mut self, c: char) -> Result<(), LexerError> {
        let mut delegate = true;
        while delegate {
            let state = self.current_state();
            let mut ctl = Control {
                stack: &mut self.stack,
                builder: &mut self.builder,
                delegate: false,
            };
            self.grammar.step(state, c, &mut ctl)?;
            delegate = ctl.delegate;
        }
        Ok(())
    }

    pub fn update(&mut self, input: &str) -> Result<(), LexerError> {
        input.chars().try_for_each(|c| self.update_char(c))
    }

    /// Tokens completed so far.
    pub fn tokens(&self) -> &[Token] {
        &self.builder.done
    }

    pub fn into_tokens(self) -> Vec<Token> {
        self.builder.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits on commas, nothing else.
    struct Commas;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum CommaState {
        Zero,
        Item,
    }

    impl Grammar for Commas {
        type State = CommaState;

        fn zero(&self) -> CommaState {
            CommaState::Zero
        }

        fn step(
            &self,
            state: CommaState,
            c: char,
            ctl: &mut Control<'_, CommaState>,
        ) -> Result<(), LexerError> {
            match (state, c) {
                (CommaState::Zero, ',') => Ok(()),
                (CommaState::Zero, _) => {
                    ctl.start_token()?;
                    ctl.push_and_delegate(CommaState::Item);
                    Ok(())
                }
                (CommaState::Item, ',') => {
                    ctl.end_token()?;
                    ctl.pop_and_delegate()
                }
                (CommaState::Item, c) => ctl.push_char(AnnotatedChar::plain(c)),
            }
        }
    }

    /// Appends before starting a token.
    struct Broken;

    impl Grammar for Broken {
        type State = ();

        fn zero(&self) {}

        fn step(&self, _: (), c: char, ctl: &mut Control<'_, ()>) -> Result<(), LexerError> {
            ctl.push_char(AnnotatedChar::plain(c))
        }
    }

    fn rendered(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(Token::render).collect()
    }

    #[test]
    fn delegation_reprocesses_the_same_character() {
        let mut lexer = PushdownLexer::new(Commas);
        lexer.update("ab,,c,").unwrap();
        assert_eq!(rendered(lexer.tokens()), vec!["ab", "c"]);
        assert!(lexer.at_zero());
    }

    #[test]
    fn unfinished_token_is_not_reported() {
        let mut lexer = PushdownLexer::new(Commas);
        lexer.update("ab,cd").unwrap();
        assert_eq!(rendered(lexer.tokens()), vec!["ab"]);
        assert_eq!(lexer.current_state(), CommaState::Item);
    }

    #[test]
    fn push_before_start_is_an_error() {
        let mut lexer = PushdownLexer::new(Broken);
        assert!(matches!(
            lexer.update_char('x'),
            Err(LexerError::TokenNotStarted)
        ));
    }

    #[test]
    fn boundary_chars_do_not_render() {
        let token: Token = [
            AnnotatedChar::boundary(),
            AnnotatedChar::plain('a'),
            AnnotatedChar::boundary(),
            AnnotatedChar::escaped('b'),
        ]
        .into_iter()
        .collect();
        assert_eq!(token.render(), "ab");
        assert_eq!(token.len(), 4);
    }

    #[test]
    fn only_a_bare_bar_is_a_pipe() {
        let bare: Token = [AnnotatedChar::plain('|')].into_iter().collect();
        let escaped: Token = [AnnotatedChar::escaped('|')].into_iter().collect();
        let quoted: Token = [
            AnnotatedChar::boundary(),
            AnnotatedChar::plain('|'),
            AnnotatedChar::boundary(),
        ]
        .into_iter()
        .collect();
        assert!(bare.is_pipe());
        assert!(!escaped.is_pipe());
        assert!(!quoted.is_pipe());
    }
}
