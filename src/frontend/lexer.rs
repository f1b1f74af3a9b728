//! This lexer tokenizes text according to a lexicon loaded at run time.
//!
//! A lexicon lists one token type per line:
//!
//! ```text
//! *repeat                         ; keyword, becomes KW_repeat
//! IDENTIFIER  [A-Za-z_][A-Za-z0-9_]*
//! ;                               ; no pattern: the name is matched literally
//! ^WHITESPACE \s+                 ; matched, then thrown away
//! ```
//!
//! Markers may also trail the name, so `repeat*` is the same keyword as
//! `*repeat`. Whitespace inside a pattern is dropped, so use `\s` to match
//! a space.
use std::collections::HashSet;
use std::path::Path;
use std::str::Chars;

use regex::Regex;

use super::config;
use super::error::{Error, Result};
use super::token::{Position, Token, TokenType, KEYWORD_PREFIX};

const KEYWORD_MARKER: char = '*';
const IGNORE_MARKER: char = '^';

#[derive(Clone, Debug)]
struct Entry {
    kind: TokenType,
    pattern: Regex,
    ignore: bool,
}

/// An ordered list of token rules. Keywords come first so that they win
/// over any generic identifier pattern; the rest keep declaration order.
#[derive(Clone, Debug)]
pub struct Lexicon {
    entries: Vec<Entry>,
}

impl Lexicon {
    pub fn parse(description: &str) -> Result<Lexicon> {
        let mut keywords: Vec<Entry> = Vec::new();
        let mut others: Vec<Entry> = Vec::new();
        let mut seen: HashSet<TokenType> = HashSet::new();

        for (index, line) in description.lines().enumerate() {
            let mut words = line.split_whitespace();
            let head = match words.next() {
                Some(head) => head,
                None => continue,
            };
            let pattern: String = words.collect();

            let (name, is_keyword, ignore) = split_markers(head);
            if name.is_empty() {
                return Err(Error::grammar(format!(
                    "lexicon line {}: token `{}` has no name",
                    index + 1,
                    head
                )));
            }

            // Keywords and bare names match themselves literally.
            let pattern = if is_keyword || pattern.is_empty() {
                regex::escape(name)
            } else {
                pattern
            };
            let kind = if is_keyword {
                format!("{}{}", KEYWORD_PREFIX, name)
            } else {
                name.to_owned()
            };
            if !seen.insert(kind.clone()) {
                return Err(Error::grammar(format!(
                    "lexicon line {}: token `{}` is declared twice",
                    index + 1,
                    kind
                )));
            }

            let anchored = format!("^(?:{})$", pattern);
            let pattern = Regex::new(&anchored).map_err(|e| {
                Error::grammar(format!(
                    "lexicon line {}: invalid pattern for `{}`: {}",
                    index + 1,
                    kind,
                    e
                ))
            })?;

            let entry = Entry {
                kind,
                pattern,
                ignore,
            };
            if is_keyword {
                keywords.push(entry);
            } else {
                others.push(entry);
            }
        }

        keywords.append(&mut others);
        debug!("loaded lexicon with {} token types", keywords.len());
        Ok(Lexicon { entries: keywords })
    }

    pub fn from_file(path: &Path) -> Result<Lexicon> {
        Lexicon::parse(&config::read_resource(path)?)
    }

    /// Token types in priority order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.kind.as_str())
    }

    pub fn is_ignored(&self, kind: &str) -> bool {
        self.entries.iter().any(|e| e.kind == kind && e.ignore)
    }

    /// Whether the whole of `candidate` is a token of type `kind`.
    pub fn matches(&self, candidate: &str, kind: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.kind == kind && e.pattern.is_match(candidate))
    }

    /// The first entry, in priority order, matching all of `candidate`.
    fn classify(&self, candidate: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.pattern.is_match(candidate))
    }

    /// Lazily tokenizes `source`. The iterator stops after the first error.
    pub fn tokens<'a>(&'a self, source: &'a str) -> Tokens<'a> {
        Tokens {
            lexicon: self,
            chars: source.chars(),
            candidate: String::new(),
            kind: None,
            start: Position::new(1, 1),
            next: Position::new(1, 1),
            pending: None,
            finished: false,
        }
    }

    pub fn tokenize(&self, source: &str) -> Result<Vec<Token>> {
        self.tokens(source).collect()
    }
}

/// Tokenizes `source` eagerly, dropping ignored tokens.
pub fn tokenize(source: &str, lexicon: &Lexicon) -> Result<Vec<Token>> {
    lexicon.tokenize(source)
}

fn lex_error(c: char, at: Position) -> Error {
    Error::Lex {
        position: at,
        fragment: c.to_string(),
    }
}

/// Strips `*` and `^` markers from either end of a lexicon name.
fn split_markers(head: &str) -> (&str, bool, bool) {
    let mut name = head;
    let mut is_keyword = false;
    let mut ignore = false;
    loop {
        if let Some(rest) = strip_marker(name, KEYWORD_MARKER) {
            is_keyword = true;
            name = rest;
        } else if let Some(rest) = strip_marker(name, IGNORE_MARKER) {
            ignore = true;
            name = rest;
        } else {
            return (name, is_keyword, ignore);
        }
    }
}

fn strip_marker(name: &str, marker: char) -> Option<&str> {
    name.strip_prefix(marker)
        .or_else(|| name.strip_suffix(marker))
}

/// Maximal munch by incremental trial: the candidate grows one character
/// at a time for as long as some pattern matches it. The first character
/// that breaks every pattern ends the token and starts the next candidate.
pub struct Tokens<'a> {
    lexicon: &'a Lexicon,
    chars: Chars<'a>,
    candidate: String,
    // Entry matched by `candidate`. Always Some while `candidate` is non-empty.
    kind: Option<usize>,
    start: Position,
    next: Position,
    // Failure found while closing a token; reported after that token.
    pending: Option<Error>,
    finished: bool,
}

impl<'a> Tokens<'a> {
    fn advance(&mut self) -> Option<(char, Position)> {
        let c = self.chars.next()?;
        let at = self.next;
        if c == '\n' {
            self.next = Position::new(at.line + 1, 1);
        } else {
            self.next = Position::new(at.line, at.column + 1);
        }
        Some((c, at))
    }

    /// Closes the current candidate. Returns None for ignored tokens.
    fn emit(&mut self, index: usize) -> Option<Token> {
        let lexicon = self.lexicon;
        let entry = &lexicon.entries[index];
        let lexeme = std::mem::take(&mut self.candidate);
        if entry.ignore {
            return None;
        }
        Some(Token {
            kind: entry.kind.clone(),
            lexeme,
            position: self.start,
        })
    }

    fn fail(&mut self, c: char, at: Position) -> Option<Result<Token>> {
        self.finished = true;
        Some(Err(lex_error(c, at)))
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending.take() {
            self.finished = true;
            return Some(Err(error));
        }
        if self.finished {
            return None;
        }

        while let Some((c, at)) = self.advance() {
            if self.candidate.is_empty() {
                self.start = at;
            }
            self.candidate.push(c);
            if let Some(index) = self.lexicon.classify(&self.candidate) {
                self.kind = Some(index);
                continue;
            }

            // Growing broke every pattern: close what we had before `c`.
            self.candidate.pop();
            let index = match self.kind.take() {
                Some(index) => index,
                None => return self.fail(c, at),
            };
            let token = self.emit(index);

            self.start = at;
            self.candidate.push(c);
            match self.lexicon.classify(&self.candidate) {
                Some(index) => self.kind = Some(index),
                None => match token {
                    Some(_) => self.pending = Some(lex_error(c, at)),
                    None => return self.fail(c, at),
                },
            }

            if let Some(token) = token {
                trace!("token {} at {}", token, token.position);
                return Some(Ok(token));
            }
        }

        self.finished = true;
        match self.kind.take() {
            Some(index) => self.emit(index).map(Ok),
            None => None,
        }
    }
}
