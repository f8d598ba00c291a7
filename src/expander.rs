//! `$NAME` substitution over annotated tokens.

use crate::env::{Environment, is_name_char};
use crate::lexer::{AnnotatedChar, Escape, Ignore, Token};

fn opens_variable(c: &AnnotatedChar) -> bool {
    c.ch == '$' && c.escape == Escape::Unescaped && c.ignore != Ignore::SuppressVariables
}

fn continues_name(c: &AnnotatedChar) -> bool {
    is_name_char(c.ch) && c.is_bare()
}

fn splice(out: &mut Token, env: &Environment, name: &str) {
    for ch in env.get(name).unwrap_or_default().chars() {
        out.push(AnnotatedChar::plain(ch));
    }
}

/// Expands one token.
///
/// Quote boundary markers and single-quoted characters never continue a
/// name, so `$VAR"SP"` looks up `VAR` and `'$VAR'` is left alone.
pub fn expand_token(token: &Token, env: &Environment) -> Token {
    let mut out = Token::new();
    let mut name: Option<String> = None;

    for c in token.chars() {
        match name.as_mut() {
            Some(n) if continues_name(c) => n.push(c.ch),
            Some(n) => {
                splice(&mut out, env, n);
                if opens_variable(c) {
                    n.clear();
                } else {
                    name = None;
                    out.push(*c);
                }
            }
            None if opens_variable(c) => name = Some(String::new()),
            None => out.push(*c),
        }
    }
    if let Some(n) = name {
        splice(&mut out, env, &n);
    }
    out
}

/// Expands every token of a line against `env`.
///
/// This runs once per line, before the line is split into commands, so
/// assignments made earlier on the same line are not visible yet.
pub fn expand(tokens: &[Token], env: &Environment) -> Vec<Token> {
    tokens.iter().map(|t| expand_token(t, env)).collect()
}
