//! Minimal line-level lexer.
//!
//! The segmenter does not need a token stream, only the signals a tokenizer
//! would give it: whether a physical line leaves the source inside an open
//! bracket, an open string literal, or an explicit backslash continuation,
//! and whether the line contains a token the lexer must reject. Scanning is
//! incremental; one [`ScanState`] is threaded across the physical lines of a
//! file.

use crate::core::{Error, Result};

/// Lexing state carried across physical lines.
#[derive(Debug, Default, Clone)]
pub struct ScanState {
    /// Open triple-quoted string, by quote character.
    triple: Option<char>,
    /// Single-quoted string continued over a backslash-newline.
    single: Option<char>,
    /// Nesting depth across `(`/`[`/`{`.
    depth: usize,
    /// Trailing `\` outside any string.
    continuation: bool,
}

impl ScanState {
    /// True while a logical line cannot end at the current position.
    pub fn is_open(&self) -> bool {
        self.triple.is_some() || self.single.is_some() || self.depth > 0 || self.continuation
    }

    /// Consume one physical line (trailing newline included, if any).
    pub fn scan_line(&mut self, line: &str, lineno: usize) -> Result<()> {
        self.continuation = false;
        let content = line.trim_end_matches(['\n', '\r']);
        let chars: Vec<char> = content.chars().collect();
        let mut i = 0usize;

        if let Some(q) = self.single {
            match scan_string_tail(&chars, 0, q) {
                StringEnd::Closed(next) => {
                    self.single = None;
                    i = next;
                }
                StringEnd::Continued => return Ok(()),
                StringEnd::Unterminated => {
                    return Err(Error::parse(lineno, "unterminated string literal"))
                }
            }
        }

        while i < chars.len() {
            if let Some(q) = self.triple {
                match find_triple_close(&chars, i, q) {
                    Some(next) => {
                        self.triple = None;
                        i = next;
                        continue;
                    }
                    None => return Ok(()),
                }
            }

            let c = chars[i];
            match c {
                '#' => return Ok(()),
                '\'' | '"' => {
                    if chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c) {
                        self.triple = Some(c);
                        i += 3;
                    } else {
                        match scan_string_tail(&chars, i + 1, c) {
                            StringEnd::Closed(next) => i = next,
                            StringEnd::Continued => {
                                self.single = Some(c);
                                return Ok(());
                            }
                            StringEnd::Unterminated => {
                                return Err(Error::parse(lineno, "unterminated string literal"))
                            }
                        }
                    }
                }
                '(' | '[' | '{' => {
                    self.depth += 1;
                    i += 1;
                }
                ')' | ']' | '}' => {
                    if self.depth == 0 {
                        return Err(Error::parse(lineno, format!("unbalanced `{c}`")));
                    }
                    self.depth -= 1;
                    i += 1;
                }
                '\\' if i + 1 == chars.len() => {
                    self.continuation = true;
                    i += 1;
                }
                '$' | '?' | '`' => {
                    return Err(Error::parse(lineno, format!("invalid token `{c}`")));
                }
                _ => i += 1,
            }
        }

        Ok(())
    }

    /// Called at end of file; an open construct means truncated input.
    pub fn finish(&self, last_line: usize) -> Result<()> {
        if self.is_open() {
            Err(Error::parse(last_line, "unexpected end of file"))
        } else {
            Ok(())
        }
    }
}

enum StringEnd {
    /// Index just past the closing quote.
    Closed(usize),
    /// Line ends with a backslash inside the string.
    Continued,
    Unterminated,
}

/// Scan the interior of a single-quoted string starting at `from`.
fn scan_string_tail(chars: &[char], from: usize, quote: char) -> StringEnd {
    let mut i = from;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            if i + 1 == chars.len() {
                return StringEnd::Continued;
            }
            i += 2;
            continue;
        }
        if c == quote {
            return StringEnd::Closed(i + 1);
        }
        i += 1;
    }
    StringEnd::Unterminated
}

/// Find the close of a triple-quoted string; returns the index just past it.
fn find_triple_close(chars: &[char], from: usize, quote: char) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote)
        {
            return Some(i + 3);
        }
        i += 1;
    }
    None
}
