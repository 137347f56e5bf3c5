//! Deterministic shell-word tokenizer: whitespace-separated tokens outside
//! quotes, backslash escapes the next byte; single quotes suppress all
//! escaping, double quotes still honor backslash; adjacent quoted runs
//! concatenate into one token. No teacher equivalent; implemented directly
//! from the tokenization rules.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShellwordsError {
    #[error("unterminated quote")]
    UnterminatedQuote,
    #[error("trailing backslash with no following byte")]
    TrailingBackslash,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Delimiting,
    Unquoted,
    Single,
    Double,
}

/// Splits `input` into shell-style tokens. Returns an empty vector for
/// empty (or all-whitespace) input.
pub fn split(input: &str) -> Result<Vec<String>, ShellwordsError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = State::Delimiting;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Delimiting => {
                if c == ' ' || c == '\t' {
                    continue;
                }
                state = State::Unquoted;
                handle_unquoted_char(c, &mut chars, &mut current, &mut state)?;
            }
            State::Unquoted => {
                if c == ' ' || c == '\t' {
                    tokens.push(std::mem::take(&mut current));
                    state = State::Delimiting;
                    continue;
                }
                handle_unquoted_char(c, &mut chars, &mut current, &mut state)?;
            }
            State::Single => {
                if c == '\'' {
                    state = State::Unquoted;
                } else {
                    current.push(c);
                }
            }
            State::Double => {
                if c == '"' {
                    state = State::Unquoted;
                } else if c == '\\' {
                    match chars.next() {
                        Some(next) => current.push(next),
                        None => return Err(ShellwordsError::TrailingBackslash),
                    }
                } else {
                    current.push(c);
                }
            }
        }
    }

    match state {
        State::Single | State::Double => Err(ShellwordsError::UnterminatedQuote),
        State::Unquoted => {
            tokens.push(current);
            Ok(tokens)
        }
        State::Delimiting => Ok(tokens),
    }
}

fn handle_unquoted_char(
    c: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    current: &mut String,
    state: &mut State,
) -> Result<(), ShellwordsError> {
    match c {
        '\'' => {
            *state = State::Single;
        }
        '"' => {
            *state = State::Double;
        }
        '\\' => match chars.next() {
            Some(next) => current.push(next),
            None => return Err(ShellwordsError::TrailingBackslash),
        },
        other => current.push(other),
    }
    Ok(())
}
