//! The frontend module is in charge of taking qes
//! source text and producing a Program.
//!
//! Nothing in it is specific to qes except the data it is
//! configured with: a lexicon drives the lexer, a grammar
//! drives a table-driven LL(1) parser, and the parse tree
//! it builds is evaluated bottom-up by the actions in
//! `program`.

pub mod config;
pub mod error;
pub mod eval;
pub mod grammar;
pub mod instruction;
pub mod lexer;
pub mod program;
pub mod token;
pub mod tree;

pub use self::config::Config;
pub use self::error::{Error, Result};
pub use self::grammar::{read_grammar, Grammar, ParseCallbacks};
pub use self::instruction::{Instruction, Program, Value, ValueError};
pub use self::lexer::{tokenize, Lexicon};
pub use self::program::{read_program, Frontend, ResolutionContext};
pub use self::token::{Position, Rule, Token, TokenType};
pub use self::tree::{NodeId, ParseTree};
