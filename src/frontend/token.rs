//! The vocabulary shared by the lexer, the grammar engine and the
//! parse tree: token types, tokens and production rules.
use std::fmt;

/// Token types are open-ended tags. The lexer produces whatever names its
/// lexicon declares and the grammar refers to the same names.
pub type TokenType = String;

/// No token type has been matched yet.
pub const UNDEFINED: &str = "UNDEFINED";
/// Epsilon. Stands for an empty right-hand side.
pub const EMPTY: &str = "EMPTY";
/// Marks the end of the token stream during parsing.
pub const END_OF_INPUT: &str = "$";
/// Prepended to the name of every keyword token.
pub const KEYWORD_PREFIX: &str = "KW_";

/// A 1-based line and column into the source text.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub position: Position,
}

impl Token {
    pub fn new(kind: &str, lexeme: &str, position: Position) -> Self {
        Token {
            kind: kind.to_owned(),
            lexeme: lexeme.to_owned(),
            position,
        }
    }

    pub fn end_of_input(position: Position) -> Self {
        Token::new(END_OF_INPUT, "", position)
    }

    pub fn is_end_of_input(&self) -> bool {
        self.kind == END_OF_INPUT
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {:?})", self.kind, self.lexeme)
    }
}

/// A production `lhs -> rhs`. An empty right-hand side is stored as a
/// single `EMPTY` symbol.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Rule {
    pub lhs: TokenType,
    pub rhs: Vec<TokenType>,
}

impl Rule {
    pub fn new<S: Into<TokenType>>(lhs: S, rhs: Vec<TokenType>) -> Self {
        let rhs = if rhs.is_empty() {
            vec![EMPTY.to_owned()]
        } else {
            rhs
        };
        Rule { lhs: lhs.into(), rhs }
    }

    /// A rule is usable only if its left-hand side names a nonterminal,
    /// which rules out the reserved tags.
    pub fn is_valid(&self) -> bool {
        !self.lhs.is_empty()
            && self.lhs != UNDEFINED
            && self.lhs != EMPTY
            && self.lhs != END_OF_INPUT
            && !self.rhs.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.len() == 1 && self.rhs[0] == EMPTY
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ->", self.lhs)?;
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}
