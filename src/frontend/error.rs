//! Every failure in the front end is fatal for the current parse. The four
//! kinds are kept apart so callers can tell a bad program from a bad
//! language description or a missing resource.
use std::fmt;

use super::token::Position;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// No lexicon pattern matches the character at `position`.
    Lex { position: Position, fragment: String },
    /// The grammar or lexicon is malformed, or the grammar does not have
    /// the shape the semantic actions expect.
    Grammar { message: String },
    /// The token stream does not derive from the grammar, or the program
    /// is semantically unusable (e.g. an undefined label).
    Syntax {
        position: Option<Position>,
        lexeme: String,
        message: String,
    },
    /// A lexicon, grammar or input resource could not be found.
    ConfigurationMissing { resource: String, reason: String },
}

impl Error {
    pub fn grammar<S: Into<String>>(message: S) -> Self {
        Error::Grammar {
            message: message.into(),
        }
    }

    pub fn syntax<S: Into<String>>(position: Option<Position>, lexeme: &str, message: S) -> Self {
        Error::Syntax {
            position,
            lexeme: lexeme.to_owned(),
            message: message.into(),
        }
    }

    pub fn missing<S: Into<String>, R: Into<String>>(resource: S, reason: R) -> Self {
        Error::ConfigurationMissing {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    /// Process status the binary exits with. Distinct per kind, never 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Lex { .. } => 2,
            Error::Grammar { .. } => 3,
            Error::Syntax { .. } => 4,
            Error::ConfigurationMissing { .. } => 5,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Lex { position, fragment } => {
                write!(f, "lex error at {}: no token matches {:?}", position, fragment)
            }
            Error::Grammar { message } => write!(f, "grammar error: {}", message),
            Error::Syntax {
                position: Some(position),
                lexeme,
                message,
            } => write!(f, "syntax error at {} near {:?}: {}", position, lexeme, message),
            Error::Syntax {
                position: None,
                lexeme,
                message,
            } => write!(f, "syntax error near {:?}: {}", lexeme, message),
            Error::ConfigurationMissing { resource, reason } => {
                write!(f, "missing configuration `{}`: {}", resource, reason)
            }
        }
    }
}

impl std::error::Error for Error {}
