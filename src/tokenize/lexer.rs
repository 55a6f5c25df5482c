// src/tokenize/lexer.rs

//! Character-level word splitting.
//!
//! The lexer never fails: an unterminated quote is closed by end of input and
//! a trailing lone backslash is kept as a literal character.

use std::iter::Peekable;
use std::str::Chars;

use crate::types::LexMode;

/// A lexical unit of a command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    /// An unquoted `|`.
    Pipe,
    /// An unquoted `=` standing alone, or (POSIX) at either edge of a word.
    Assign,
}

/// Splits command text into [`Token`]s according to a fixed [`LexMode`].
#[derive(Debug, Clone, Copy)]
pub struct Lexer {
    mode: LexMode,
}

impl Lexer {
    pub fn new(mode: LexMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> LexMode {
        self.mode
    }

    pub fn tokens(&self, text: &str) -> Vec<Token> {
        match self.mode {
            LexMode::Posix => lex_posix(text),
            LexMode::Windows => lex_windows(text),
        }
    }
}

/// Accumulates the word currently being built.
#[derive(Default)]
struct WordBuf {
    text: String,
    /// Something (possibly an empty quoted string) has been seen.
    started: bool,
    /// Part of the word came from quoting or escaping.
    quoted: bool,
    /// The last character pushed was an unquoted `=`.
    trailing_assign: bool,
}

impl WordBuf {
    fn push(&mut self, c: char) {
        self.started = true;
        self.trailing_assign = false;
        self.text.push(c);
    }

    /// Mark the start of a quoted section.
    fn open_quote(&mut self) {
        self.started = true;
        self.quoted = true;
        self.trailing_assign = false;
    }

    fn finish(&mut self, out: &mut Vec<Token>) {
        if !self.started {
            return;
        }
        let word = std::mem::take(self);
        if !word.quoted && word.text == "=" {
            out.push(Token::Assign);
        } else if word.trailing_assign {
            let mut text = word.text;
            text.pop();
            out.push(Token::Word(text));
            out.push(Token::Assign);
        } else {
            out.push(Token::Word(word.text));
        }
    }
}

fn lex_posix(text: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut word = WordBuf::default();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => word.finish(&mut out),
            '|' => {
                word.finish(&mut out);
                out.push(Token::Pipe);
            }
            // `=1` and `x=` split off their `=` like a standalone one.
            '=' if !word.started => out.push(Token::Assign),
            '=' => {
                word.push('=');
                word.trailing_assign = true;
            }
            '\'' => {
                word.open_quote();
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    word.text.push(c);
                }
            }
            '"' => {
                word.open_quote();
                read_double_quoted(&mut chars, &mut word.text);
            }
            '\\' => match chars.next() {
                // Escaped newline is a line continuation.
                Some('\n') => {}
                Some(escaped) => {
                    word.quoted = true;
                    word.push(escaped);
                }
                None => word.push('\\'),
            },
            c => word.push(c),
        }
    }
    word.finish(&mut out);
    out
}

/// Consume up to and including the closing `"`.
///
/// Inside double quotes a backslash only escapes `"`, `\`, `$`, `` ` `` and
/// newline; before any other character it is kept.
fn read_double_quoted(chars: &mut Peekable<Chars<'_>>, buf: &mut String) {
    while let Some(c) = chars.next() {
        match c {
            '"' => return,
            '\\' => match chars.peek().copied() {
                Some('\n') => {
                    chars.next();
                }
                Some(e @ ('"' | '\\' | '$' | '`')) => {
                    chars.next();
                    buf.push(e);
                }
                _ => buf.push('\\'),
            },
            c => buf.push(c),
        }
    }
}

fn lex_windows(text: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let mut word = WordBuf::default();
    let mut quotes = 0usize;
    let mut pending_space = false;

    for c in text.chars() {
        let open = quotes % 2 == 1;

        if c.is_whitespace() {
            if open {
                // Continuation: the next word is glued on with one space.
                pending_space = true;
            } else {
                word.finish(&mut out);
                quotes = 0;
            }
            continue;
        }

        if pending_space {
            word.text.push(' ');
            pending_space = false;
        }

        match c {
            '|' if !open => {
                word.finish(&mut out);
                quotes = 0;
                out.push(Token::Pipe);
            }
            '"' => {
                quotes += 1;
                word.quoted = true;
                word.push(c);
            }
            c => word.push(c),
        }
    }
    word.finish(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[Token]) -> Vec<&str> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Word(w) => w.as_str(),
                Token::Pipe => "|",
                Token::Assign => "=",
            })
            .collect()
    }

    fn posix(text: &str) -> Vec<Token> {
        Lexer::new(LexMode::Posix).tokens(text)
    }

    fn windows(text: &str) -> Vec<Token> {
        Lexer::new(LexMode::Windows).tokens(text)
    }

    #[test]
    fn posix_splits_on_whitespace_and_pipes() {
        let toks = posix("  echo   hello|grep -i 'he llo' ");
        assert_eq!(
            toks,
            vec![
                Token::Word("echo".into()),
                Token::Word("hello".into()),
                Token::Pipe,
                Token::Word("grep".into()),
                Token::Word("-i".into()),
                Token::Word("he llo".into()),
            ]
        );
    }

    #[test]
    fn posix_strips_quotes_and_handles_escapes() {
        assert_eq!(words(&posix(r#"a"b c"d"#)), vec!["ab cd"]);
        assert_eq!(words(&posix(r#""say \"hi\"""#)), vec![r#"say "hi""#]);
        assert_eq!(words(&posix(r#""a\nb""#)), vec![r"a\nb"]);
        assert_eq!(words(&posix(r"one\ word")), vec!["one word"]);
        assert_eq!(words(&posix(r"'no \escape'")), vec![r"no \escape"]);
        assert_eq!(words(&posix("a\\\nb")), vec!["ab"]);
    }

    #[test]
    fn posix_keeps_empty_quoted_words() {
        assert_eq!(words(&posix(r#"printf '' "" x"#)), vec!["printf", "", "", "x"]);
    }

    #[test]
    fn posix_unterminated_quotes_close_at_end() {
        assert_eq!(words(&posix(r#"echo "open ended"#)), vec!["echo", "open ended"]);
        assert_eq!(words(&posix("echo 'still open")), vec!["echo", "still open"]);
        assert_eq!(words(&posix(r"trailing\")), vec![r"trailing\"]);
    }

    #[test]
    fn unquoted_equals_at_word_edges_is_assign() {
        assert_eq!(posix("x = 1")[1], Token::Assign);
        assert_eq!(posix("x '=' 1")[1], Token::Word("=".into()));
        assert_eq!(posix(r"x \= 1")[1], Token::Word("=".into()));
        assert_eq!(posix("x=1"), vec![Token::Word("x=1".into())]);
        assert_eq!(words(&posix("x= 1")), vec!["x", "=", "1"]);
        assert_eq!(words(&posix("x =1")), vec!["x", "=", "1"]);
        assert_eq!(posix("x'='"), vec![Token::Word("x=".into())]);
        assert_eq!(posix(r"x\=")[0], Token::Word("x=".into()));
    }

    #[test]
    fn windows_only_splits_standalone_equals() {
        assert_eq!(words(&windows("x= 1")), vec!["x=", "1"]);
        assert_eq!(windows("x = 1")[1], Token::Assign);
    }

    #[test]
    fn quoted_pipe_is_a_word() {
        assert_eq!(words(&posix("echo '|' \\|")), vec!["echo", "|", "|"]);
        assert_eq!(posix("echo '|'")[1], Token::Word("|".into()));
    }

    #[test]
    fn windows_keeps_backslashes_and_quotes() {
        assert_eq!(
            words(&windows(r"C:\tools\grep.exe -n C:/x.txt")),
            vec![r"C:\tools\grep.exe", "-n", "C:/x.txt"]
        );
        assert_eq!(words(&windows(r#"echo "hi""#)), vec!["echo", r#""hi""#]);
    }

    #[test]
    fn windows_odd_quotes_glue_following_words() {
        assert_eq!(
            words(&windows(r#""C:\Program   Files\app.exe" /q"#)),
            vec![r#""C:\Program Files\app.exe""#, "/q"]
        );
        assert_eq!(words(&windows(r#"echo "a | b" | more"#)), vec!["echo", r#""a | b""#, "|", "more"]);
    }

    #[test]
    fn windows_unterminated_quote_runs_to_end() {
        assert_eq!(words(&windows(r#"echo "a b  "#)), vec!["echo", r#""a b"#]);
    }
}
