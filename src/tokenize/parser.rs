// src/tokenize/parser.rs

//! Assemble lexer tokens into pipeline stages.

use crate::tokenize::lexer::Token;
use crate::types::{Argv, Pipeline};

/// Group `tokens` into argument vectors separated by [`Token::Pipe`].
///
/// A [`Token::Assign`] glues the previous word and the following word into
/// `key=value`; a missing side becomes the empty string. The result always
/// has at least one stage, possibly empty.
pub fn parse(tokens: Vec<Token>) -> Pipeline {
    let mut stages = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut tokens = tokens.into_iter().peekable();

    while let Some(token) = tokens.next() {
        match token {
            Token::Word(word) => current.push(word),
            Token::Assign => {
                let key = current.pop().unwrap_or_default();
                let value = match tokens.next_if(|t| matches!(t, Token::Word(_))) {
                    Some(Token::Word(value)) => value,
                    _ => String::new(),
                };
                current.push(format!("{key}={value}"));
            }
            Token::Pipe => stages.push(Argv::from(std::mem::take(&mut current))),
        }
    }
    stages.push(Argv::from(current));

    Pipeline::new(stages)
}
