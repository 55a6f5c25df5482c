// src/tokenize/mod.rs

//! Shell-like command parsing.
//!
//! This is deliberately not a shell: there is no redirection, expansion or
//! globbing. It only understands:
//!
//! - word splitting and quoting, according to a [`LexMode`],
//! - `|` as a stage separator,
//! - an unquoted `=` standing alone (or, in POSIX mode, at a word edge),
//!   glued onto its neighbours (`x = 1`, `x= 1` and `x =1` all give `x=1`).
//!
//! - [`lexer`] turns text into [`Token`]s.
//! - [`parser`] groups tokens into a [`Pipeline`].

pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, Token};

use crate::types::{CommandLine, LexMode, Pipeline};

/// Parse `text` into a pipeline of at least one (possibly empty) stage.
///
/// Never fails; malformed quoting degrades to best-effort word boundaries.
pub fn tokenize(text: &str, mode: LexMode) -> Pipeline {
    parser::parse(Lexer::new(mode).tokens(text))
}

/// Resolve a [`CommandLine`] into the pipeline to execute.
///
/// Text is tokenized; an argument list is a single stage as given.
pub fn expand(command: &CommandLine, mode: LexMode) -> Pipeline {
    match command {
        CommandLine::Text(text) => tokenize(text, mode),
        CommandLine::Argv(argv) => Pipeline::single(argv.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Argv;

    #[test]
    fn echo_grep_is_two_stages() {
        let p = tokenize("echo hello | grep hello", LexMode::Posix);
        assert_eq!(
            p.stages(),
            &[Argv::new(["echo", "hello"]), Argv::new(["grep", "hello"])]
        );
    }

    #[test]
    fn assignment_argument_stays_one_word() {
        for text in ["foo x=1", "foo x = 1", "foo x= 1", "foo x =1"] {
            let p = tokenize(text, LexMode::Posix);
            assert_eq!(p.stages(), &[Argv::new(["foo", "x=1"])], "input: {text}");
        }
    }

    #[test]
    fn argv_commands_are_not_split() {
        let cmd = CommandLine::from(["echo", "a", "|", "b"]);
        let p = expand(&cmd, LexMode::Posix);
        assert_eq!(p.len(), 1);
        assert_eq!(p.stages()[0].len(), 4);
    }

    #[test]
    fn modes_disagree_on_quotes() {
        let text = r#"type "C:\My Files\a.txt""#;
        let posix = tokenize(text, LexMode::Posix);
        let windows = tokenize(text, LexMode::Windows);
        assert_eq!(posix.stages()[0].args(), &[r"C:\My Files\a.txt".to_string()]);
        assert_eq!(
            windows.stages()[0].args(),
            &[r#""C:\My Files\a.txt""#.to_string()]
        );
    }
}
